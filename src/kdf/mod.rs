//! COSE_KDF_Context handling (RFC 9053, Section 5.2).
//!
//! The context structure is the `info` input to HKDF for the direct-HKDF
//! and ECDH families: `[AlgorithmID, PartyUInfo, PartyVInfo, SuppPubInfo]`.
//! It can be built from a structured JSON description or parsed from a raw
//! CBOR list supplied by a caller.

use ciborium::Value;
use serde::Deserialize;

use crate::algs;
use crate::cbor::{self, as_i64, LabelMap};
use crate::error::KeyDistError;


/// One party's identity contribution to the context (identity, nonce,
/// other). Absent entries encode as CBOR null.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartyInfo {
    pub identity: Option<Vec<u8>>,
    pub nonce: Option<Vec<u8>>,
    pub other: Option<Vec<u8>>,
}

impl PartyInfo {
    fn to_value(&self) -> Value {
        let entry = |field: &Option<Vec<u8>>| match field {
            Some(b) => Value::Bytes(b.clone()),
            None => Value::Null,
        };
        Value::Array(vec![
            entry(&self.identity),
            entry(&self.nonce),
            entry(&self.other),
        ])
    }

    fn from_value(value: &Value, name: &str) -> Result<PartyInfo, KeyDistError> {
        let entries = value.as_array().ok_or_else(|| {
            KeyDistError::validation(format!("{name} should be list(size=3)."))
        })?;
        if entries.len() != 3 {
            return Err(KeyDistError::validation(format!(
                "{name} should be list(size=3)."
            )));
        }
        let field = |value: &Value| match value {
            Value::Null => Ok(None),
            Value::Bytes(b) => Ok(Some(b.clone())),
            _ => Err(KeyDistError::validation("Invalid context information.")),
        };
        Ok(PartyInfo {
            identity: field(&entries[0])?,
            nonce: field(&entries[1])?,
            other: field(&entries[2])?,
        })
    }
}

/// The SuppPubInfo portion of the context: the derived key length in bits,
/// the serialized protected header of the enclosing recipient, and an
/// optional application-supplied suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuppPubInfo {
    pub key_data_length: u64,
    pub protected: Vec<u8>,
    pub other: Option<Vec<u8>>,
}

impl SuppPubInfo {
    fn to_value(&self) -> Value {
        let mut entries = vec![
            Value::Integer(self.key_data_length.into()),
            Value::Bytes(self.protected.clone()),
        ];
        if let Some(other) = &self.other {
            entries.push(Value::Bytes(other.clone()));
        }
        Value::Array(entries)
    }

    fn from_value(value: &Value) -> Result<SuppPubInfo, KeyDistError> {
        let entries = value.as_array().ok_or_else(|| {
            KeyDistError::validation("SuppPubInfo should be list(size=2 or 3).")
        })?;
        if entries.len() != 2 && entries.len() != 3 {
            return Err(KeyDistError::validation(
                "SuppPubInfo should be list(size=2 or 3).",
            ));
        }
        let key_data_length = as_i64(&entries[0])
            .and_then(|bits| u64::try_from(bits).ok())
            .ok_or_else(|| KeyDistError::validation("Invalid context information."))?;
        // HKDF cannot emit more than 255 blocks of the hash; SHA-512 puts
        // the ceiling at 16320 bytes.
        if key_data_length == 0 || key_data_length > 255 * 64 * 8 {
            return Err(KeyDistError::validation(format!(
                "Invalid key_data_length: {key_data_length}."
            )));
        }
        let protected = match &entries[1] {
            Value::Bytes(b) => b.clone(),
            _ => return Err(KeyDistError::validation("Invalid context information.")),
        };
        let other = match entries.get(2) {
            None => None,
            Some(Value::Bytes(b)) => Some(b.clone()),
            Some(_) => return Err(KeyDistError::validation("Invalid context information.")),
        };
        Ok(SuppPubInfo {
            key_data_length,
            protected,
            other,
        })
    }
}

/// A validated COSE_KDF_Context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KdfContext {
    alg: i64,
    party_u: PartyInfo,
    party_v: PartyInfo,
    supp_pub: SuppPubInfo,
}

impl KdfContext {
    /// Builds a context for deriving a key for `alg`, wrapped by a
    /// recipient whose serialized protected header is `protected`.
    ///
    /// `alg` must be an algorithm with a defined key size; the derived key
    /// length in bits follows from it.
    pub fn new(
        alg: i64,
        party_u: PartyInfo,
        party_v: PartyInfo,
        protected: Vec<u8>,
    ) -> Result<KdfContext, KeyDistError> {
        let key_data_length = (algs::symmetric_key_size(alg)? * 8) as u64;
        Ok(KdfContext {
            alg,
            party_u,
            party_v,
            supp_pub: SuppPubInfo {
                key_data_length,
                protected,
                other: None,
            },
        })
    }

    /// Parses a context from a raw CBOR list value.
    pub fn from_value(value: &Value) -> Result<KdfContext, KeyDistError> {
        let entries = value
            .as_array()
            .ok_or_else(|| KeyDistError::validation("context should be set."))?;
        if entries.len() != 4 {
            return Err(KeyDistError::validation("Invalid context information."));
        }
        let alg =
            as_i64(&entries[0]).ok_or_else(|| KeyDistError::validation("AlgorithmID should be int."))?;
        // The id must name an algorithm with a defined key size; direct
        // (-6) in particular has none.
        algs::symmetric_key_size(alg)?;
        let party_u = PartyInfo::from_value(&entries[1], "PartyUInfo")?;
        let party_v = PartyInfo::from_value(&entries[2], "PartyVInfo")?;
        let supp_pub = SuppPubInfo::from_value(&entries[3])?;
        Ok(KdfContext {
            alg,
            party_u,
            party_v,
            supp_pub,
        })
    }

    /// Parses a context from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<KdfContext, KeyDistError> {
        let value: Value = ciborium::de::from_reader(bytes)
            .map_err(|_| KeyDistError::decode("Failed to decode."))?;
        KdfContext::from_value(&value)
    }

    /// The algorithm the derived key is for.
    pub fn alg(&self) -> i64 {
        self.alg
    }

    /// The derived key length in bytes.
    pub fn key_len(&self) -> usize {
        (self.supp_pub.key_data_length / 8) as usize
    }

    /// The party U nonce, used as the HKDF salt by the direct-HKDF family
    /// when no explicit salt header is present.
    pub fn party_u_nonce(&self) -> Option<&[u8]> {
        self.party_u.nonce.as_deref()
    }

    /// Serializes the context; this is the HKDF `info` input.
    pub fn to_bytes(&self) -> Result<Vec<u8>, KeyDistError> {
        let value = Value::Array(vec![
            Value::Integer(self.alg.into()),
            self.party_u.to_value(),
            self.party_v.to_value(),
            self.supp_pub.to_value(),
        ]);
        let mut buf = Vec::new();
        ciborium::ser::into_writer(&value, &mut buf)
            .map_err(|_| KeyDistError::encode("Failed to encode."))?;
        Ok(buf)
    }
}

/// One party's contribution in the JSON context description.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartyJson {
    #[serde(default)]
    pub identity: Option<String>,
    #[serde(default)]
    pub nonce: Option<String>,
    #[serde(default)]
    pub other: Option<String>,
}

impl PartyJson {
    fn to_party(&self) -> PartyInfo {
        let field = |f: &Option<String>| f.as_ref().map(|s| s.as_bytes().to_vec());
        PartyInfo {
            identity: field(&self.identity),
            nonce: field(&self.nonce),
            other: field(&self.other),
        }
    }
}

/// A structured JSON-style context description, as accepted by the
/// key-material resolver.
#[derive(Debug, Clone, Deserialize)]
pub struct ContextJson {
    #[serde(default)]
    pub alg: Option<String>,
    #[serde(default)]
    pub party_u: Option<PartyJson>,
    #[serde(default)]
    pub party_v: Option<PartyJson>,
}

impl ContextJson {
    /// Converts the description into a context, binding it to the wrapping
    /// recipient's algorithm via the serialized protected header.
    ///
    /// A description without an `alg` falls back to `alg_hint`, the
    /// algorithm of the message the derived key decrypts.
    pub fn to_context(
        &self,
        recipient_alg: i64,
        alg_hint: Option<i64>,
    ) -> Result<KdfContext, KeyDistError> {
        let alg = match &self.alg {
            Some(name) => algs::alg_from_name(name).ok_or_else(|| {
                KeyDistError::validation(format!("Unsupported or unknown algorithm: {name}."))
            })?,
            // An unusable fallback fails the key-size lookup below.
            None => alg_hint.unwrap_or(0),
        };
        let mut protected = LabelMap::new();
        protected.insert(1, Value::Integer(recipient_alg.into()));
        KdfContext::new(
            alg,
            self.party_u.as_ref().map(PartyJson::to_party).unwrap_or_default(),
            self.party_v.as_ref().map(PartyJson::to_party).unwrap_or_default(),
            cbor::encode_map(&protected)?,
        )
    }
}
