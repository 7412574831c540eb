//! COSE recipient structures (RFC 9052, Section 5.1).
//!
//! A recipient is the `[protected, unprotected, ciphertext, [recipients]?]`
//! array nested inside COSE_Encrypt and COSE_Mac messages. This module
//! models a single recipient ([`Recipient`]), the algorithm families it can
//! carry ([`RecipientAlg`]), and the resolver over a recipient list
//! ([`Recipients`]).

mod algs;
mod set;

#[cfg(test)]
mod tests;

pub use algs::RecipientAlg;
pub use set::{KeyMaterial, Recipients};

use ciborium::Value;
use coset::iana;
use coset::iana::EnumI64;

use crate::algs as alg_ids;
use crate::backend::{HpkeBackend, KeyDistributionBackend};
use crate::cbor::{self, as_i64, LabelMap};
use crate::error::KeyDistError;
use crate::kdf::KdfContext;
use crate::key::{OkpKey, ParsedKey, SymmetricKey};

/// Header label for the HPKE sender information sub-map
/// (draft-ietf-cose-hpke).
pub(crate) const HPKE_SENDER_INFO: i64 = -4;

/// Labels inside the HPKE sender information sub-map.
pub(crate) const HPKE_KEM: i64 = 1;
pub(crate) const HPKE_AEAD: i64 = 2;
pub(crate) const HPKE_ENC: i64 = 3;
pub(crate) const HPKE_KDF: i64 = 5;

/// An HPKE cipher suite: KEM, KDF and AEAD identifiers from the HPKE
/// registry (RFC 9180).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HpkeCipherSuite {
    pub kem: u16,
    pub kdf: u16,
    pub aead: u16,
}

impl HpkeCipherSuite {
    /// Validates the three identifiers against the registries.
    pub fn new(kem: u16, kdf: u16, aead: u16) -> Result<HpkeCipherSuite, KeyDistError> {
        if !matches!(kem, 0x0010 | 0x0011 | 0x0012 | 0x0020 | 0x0021) {
            return Err(KeyDistError::validation(format!(
                "Unsupported or unknown KEM id: {kem}."
            )));
        }
        if !matches!(kdf, 1 | 2 | 3) {
            return Err(KeyDistError::validation(format!(
                "Unsupported or unknown KDF id: {kdf}."
            )));
        }
        if !matches!(aead, 1 | 2 | 3) {
            return Err(KeyDistError::validation(format!(
                "Unsupported or unknown AEAD id: {aead}."
            )));
        }
        Ok(HpkeCipherSuite { kem, kdf, aead })
    }

    /// Reads the suite from the sender information sub-map in an
    /// unprotected header.
    pub(crate) fn from_unprotected(unprotected: &LabelMap) -> Result<HpkeCipherSuite, KeyDistError> {
        let info = match unprotected.get(&HPKE_SENDER_INFO) {
            Some(v) => cbor::value_to_map(v).map_err(|_| {
                KeyDistError::validation("HPKE sender information(-4) not found.")
            })?,
            None => {
                return Err(KeyDistError::validation(
                    "HPKE sender information(-4) not found.",
                ))
            }
        };
        let field = |label: i64, name: &str| -> Result<u16, KeyDistError> {
            info.get(&label)
                .and_then(as_i64)
                .and_then(|v| u16::try_from(v).ok())
                .ok_or_else(|| {
                    KeyDistError::validation(format!(
                        "{name} not found in HPKE sender information(-4)."
                    ))
                })
        };
        HpkeCipherSuite::new(
            field(HPKE_KEM, "kem id(1)")?,
            field(HPKE_KDF, "kdf id(5)")?,
            field(HPKE_AEAD, "aead id(2)")?,
        )
    }
}

/// Sender-side key material attached to a recipient at construction.
#[derive(Debug, Clone, PartialEq)]
pub enum SenderKey {
    /// A symmetric secret: the KEK for the AES key wrap family, the shared
    /// secret for direct HKDF.
    Wrap(SymmetricKey),
    /// A static key-agreement key for the ECDH-SS variants.
    Agreement(OkpKey),
}

/// A single COSE recipient.
///
/// All structural validation happens in [`Recipient::new`] (and thus in
/// [`Recipient::from_list`], which funnels into it); a constructed
/// recipient only changes when an apply operation fills in its ciphertext.
#[derive(Debug, Clone, PartialEq)]
pub struct Recipient {
    protected: LabelMap,
    unprotected: LabelMap,
    ciphertext: Vec<u8>,
    children: Vec<Recipient>,
    alg: RecipientAlg,
    alg_id: i64,
    sender_key: Option<SenderKey>,
}

impl Recipient {
    /// Validates the headers and constructs a recipient.
    ///
    /// The algorithm is resolved from `protected[1]`, falling back to
    /// `unprotected[1]`; the protected value wins when both are present.
    /// An absent algorithm resolves to 0 (unspecified), which is legal for
    /// a pass-through recipient but unusable for any keying operation.
    pub fn new(
        protected: LabelMap,
        unprotected: LabelMap,
        ciphertext: Vec<u8>,
        children: Vec<Recipient>,
        sender_key: Option<SenderKey>,
    ) -> Result<Recipient, KeyDistError> {
        let alg_id = match protected.get(&1) {
            Some(v) => {
                as_i64(v).ok_or_else(|| KeyDistError::validation("protected[1](alg) should be int."))?
            }
            None => match unprotected.get(&1) {
                Some(v) => as_i64(v)
                    .ok_or_else(|| KeyDistError::validation("unprotected[1](alg) should be int."))?,
                None => 0,
            },
        };

        if let Some(v) = unprotected.get(&4) {
            if !matches!(v, Value::Bytes(_)) {
                return Err(KeyDistError::validation("unprotected[4](kid) should be bytes."));
            }
        }

        if let Some(v) = unprotected.get(&5) {
            if !matches!(v, Value::Bytes(_)) {
                return Err(KeyDistError::validation("unprotected[5](iv) should be bytes."));
            }
        }

        if alg_id == alg_ids::ALG_DIRECT {
            if !protected.is_empty() {
                return Err(KeyDistError::validation("protected header should be empty."));
            }
            if !ciphertext.is_empty() {
                return Err(KeyDistError::validation(
                    "ciphertext should be zero-length bytes.",
                ));
            }
            if !children.is_empty() {
                return Err(KeyDistError::validation("recipients should be absent."));
            }
        }

        let alg = RecipientAlg::classify(alg_id, &unprotected, sender_key.as_ref())?;

        Ok(Recipient {
            protected,
            unprotected,
            ciphertext,
            children,
            alg,
            alg_id,
            sender_key,
        })
    }

    /// Builds a direct (-6) recipient announcing the pre-shared key `kid`.
    pub fn direct(kid: Option<&[u8]>) -> Result<Recipient, KeyDistError> {
        let mut unprotected = LabelMap::new();
        unprotected.insert(1, Value::Integer(alg_ids::ALG_DIRECT.into()));
        if let Some(kid) = kid {
            unprotected.insert(4, Value::Bytes(kid.to_vec()));
        }
        Recipient::new(LabelMap::new(), unprotected, Vec::new(), Vec::new(), None)
    }

    /// Parses a recipient from its CBOR array form, recursing into nested
    /// recipient lists.
    pub fn from_list(value: &Value) -> Result<Recipient, KeyDistError> {
        let entries = value
            .as_array()
            .ok_or_else(|| KeyDistError::decode("Invalid recipient format."))?;
        if entries.len() != 3 && entries.len() != 4 {
            return Err(KeyDistError::decode("Invalid recipient format."));
        }

        let protected = match &entries[0] {
            Value::Bytes(b) if b.is_empty() => LabelMap::new(),
            Value::Bytes(b) => cbor::decode_map(b)?,
            _ => return Err(KeyDistError::decode("Invalid recipient format.")),
        };
        let unprotected = cbor::value_to_map(&entries[1])
            .map_err(|_| KeyDistError::decode("Invalid recipient format."))?;
        let ciphertext = match &entries[2] {
            Value::Bytes(b) => b.clone(),
            _ => return Err(KeyDistError::decode("Invalid recipient format.")),
        };

        let children = match entries.get(3) {
            None => Vec::new(),
            Some(Value::Array(nested)) => nested
                .iter()
                .map(Recipient::from_list)
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => return Err(KeyDistError::decode("Invalid recipient format.")),
        };

        Recipient::new(protected, unprotected, ciphertext, children, None)
    }

    /// Serializes the recipient back to its CBOR array form.
    ///
    /// An empty protected map becomes the zero-length byte string, as
    /// RFC 9052 requires.
    pub fn to_list(&self) -> Result<Value, KeyDistError> {
        let protected = if self.protected.is_empty() {
            Vec::new()
        } else {
            cbor::encode_map(&self.protected)?
        };
        let mut entries = vec![
            Value::Bytes(protected),
            cbor::map_to_value(&self.unprotected),
            Value::Bytes(self.ciphertext.clone()),
        ];
        if !self.children.is_empty() {
            let children = self
                .children
                .iter()
                .map(Recipient::to_list)
                .collect::<Result<Vec<_>, _>>()?;
            entries.push(Value::Array(children));
        }
        Ok(Value::Array(entries))
    }

    /// The resolved algorithm identifier (0 when unspecified).
    pub fn alg(&self) -> i64 {
        self.alg_id
    }

    /// The algorithm family variant.
    pub fn alg_family(&self) -> &RecipientAlg {
        &self.alg
    }

    /// The recipient key identifier, if present. The protected value wins,
    /// matching the algorithm precedence.
    ///
    /// Read from the live headers, so a kid announced by an apply
    /// operation is visible immediately.
    pub fn kid(&self) -> Option<&[u8]> {
        match self.protected.get(&4).or_else(|| self.unprotected.get(&4)) {
            Some(Value::Bytes(b)) => Some(b),
            _ => None,
        }
    }

    /// The ciphertext slot (the wrapped key for the wrapping families).
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// Nested recipients, if any.
    pub fn children(&self) -> &[Recipient] {
        &self.children
    }

    /// Applies this recipient to content-encryption key material on the
    /// sender side, filling in the ciphertext and any derived headers, and
    /// returns the CEK the caller must encrypt the content with.
    ///
    /// Which inputs are required depends on the algorithm family; a missing
    /// required input is a usage error with a message naming it.
    pub fn apply<B: KeyDistributionBackend + HpkeBackend>(
        &mut self,
        backend: &mut B,
        key: Option<&SymmetricKey>,
        recipient_key: Option<&OkpKey>,
        context: Option<&KdfContext>,
        aad: &[u8],
    ) -> Result<SymmetricKey, KeyDistError> {
        algs::apply(self, backend, key, recipient_key, context, aad)
    }

    /// Recovers the content-encryption key on the receiving side using
    /// `key`, the recipient's own key material.
    ///
    /// `alg_hint` names the algorithm the recovered key is for when the
    /// recipient structure itself does not (the AES key wrap and HPKE
    /// families transport opaque key bytes).
    pub fn extract<B: KeyDistributionBackend + HpkeBackend>(
        &self,
        backend: &mut B,
        key: &ParsedKey,
        context: Option<&KdfContext>,
        alg_hint: Option<i64>,
        aad: &[u8],
    ) -> Result<SymmetricKey, KeyDistError> {
        algs::extract(self, backend, key, context, alg_hint, aad)
    }

    pub(crate) fn sender_key(&self) -> Option<&SenderKey> {
        self.sender_key.as_ref()
    }

    pub(crate) fn unprotected(&self) -> &LabelMap {
        &self.unprotected
    }

    pub(crate) fn set_ciphertext(&mut self, ciphertext: Vec<u8>) {
        self.ciphertext = ciphertext;
    }

    pub(crate) fn insert_unprotected(&mut self, label: i64, value: Value) {
        self.unprotected.insert(label, value);
    }

    pub(crate) fn insert_protected(&mut self, label: i64, value: Value) {
        self.protected.insert(label, value);
    }

    /// The serialized protected header, as used in KDF context bindings.
    pub(crate) fn encoded_protected(&self) -> Result<Vec<u8>, KeyDistError> {
        if self.protected.is_empty() {
            return Ok(Vec::new());
        }
        cbor::encode_map(&self.protected)
    }

    /// Reads the sender's ephemeral or static public key from the
    /// unprotected header for the ECDH families.
    pub(crate) fn peer_key(&self) -> Result<OkpKey, KeyDistError> {
        let label = iana::HeaderAlgorithmParameter::EphemeralKey.to_i64();
        let value = self
            .unprotected
            .get(&label)
            .or_else(|| {
                self.unprotected
                    .get(&iana::HeaderAlgorithmParameter::StaticKey.to_i64())
            })
            .ok_or_else(|| KeyDistError::validation("ephemeral key(-1) not found."))?;
        let mut map = cbor::value_to_map(value)?;
        // An ephemeral key is announced without an alg of its own; it
        // inherits the recipient's.
        map.entry(3).or_insert(Value::Integer(self.alg_id.into()));
        OkpKey::new(map)
    }
}
