//! COSE key-parameter handling.
//!
//! A COSE key is a CBOR map from small integer labels to values
//! (RFC 9052, Section 7). [`KeyParams`] performs the validation that is
//! common to every key type, while the per-type structures ([`OkpKey`],
//! [`Ec2Key`], [`RsaKey`], [`SymmetricKey`]) layer the type-specific rules
//! on top. All validation happens in the fallible constructors; a key that
//! was successfully constructed is immutable and guaranteed to be
//! internally consistent.

mod ec2;
mod jwk;
mod okp;
mod rsa;
mod symmetric;

#[cfg(test)]
mod tests;

pub use ec2::Ec2Key;
pub use jwk::Jwk;
pub use okp::OkpKey;
pub use rsa::RsaKey;
pub use symmetric::SymmetricKey;

use std::collections::BTreeSet;

use ciborium::Value;
use coset::iana;
use coset::iana::EnumI64;

use crate::cbor::{as_i64, LabelMap};
use crate::error::KeyDistError;

/// Maps a textual key-type alias to its registered integer value.
fn kty_from_name(name: &str) -> Option<i64> {
    let kty = match name {
        "OKP" => iana::KeyType::OKP,
        "EC2" => iana::KeyType::EC2,
        "RSA" => iana::KeyType::RSA,
        "Symmetric" => iana::KeyType::Symmetric,
        "HSS-LMS" => iana::KeyType::HSS_LMS,
        "WalnutDSA" => iana::KeyType::WalnutDSA,
        _ => return None,
    };
    Some(kty.to_i64())
}

/// The validated parameters common to all COSE key types.
///
/// Constructed from a raw label map. The map itself is retained verbatim
/// (unknown labels pass through unvalidated), so [`KeyParams::to_map`]
/// round-trips field-for-field.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyParams {
    params: LabelMap,
    kty: i64,
    kid: Option<Vec<u8>>,
    alg: Option<i64>,
    key_ops: BTreeSet<iana::KeyOperation>,
    base_iv: Option<Vec<u8>>,
}

impl KeyParams {
    /// Validates the common key parameters in `params` and constructs a
    /// `KeyParams` on success.
    ///
    /// `kty(1)` must be present as an integer or a registered textual alias.
    /// `kid(2)`, `alg(3)`, `key_ops(4)` and `base_iv(5)` are optional but
    /// must have the right shape when present. Each violation fails with a
    /// validation error naming the offending label.
    pub fn new(params: LabelMap) -> Result<KeyParams, KeyDistError> {
        let kty = match params.get(&iana::KeyParameter::Kty.to_i64()) {
            None => return Err(KeyDistError::validation("kty(1) not found.")),
            Some(Value::Text(name)) => kty_from_name(name)
                .ok_or_else(|| KeyDistError::validation(format!("Unknown kty: {name}.")))?,
            Some(v) => as_i64(v)
                .ok_or_else(|| KeyDistError::validation("kty(1) should be int or str(tstr)."))?,
        };

        let kid = match params.get(&iana::KeyParameter::Kid.to_i64()) {
            None => None,
            Some(Value::Bytes(b)) => Some(b.clone()),
            Some(_) => return Err(KeyDistError::validation("kid(2) should be bytes(bstr).")),
        };

        let alg = match params.get(&iana::KeyParameter::Alg.to_i64()) {
            None => None,
            Some(v) => Some(
                as_i64(v).ok_or_else(|| KeyDistError::validation("alg(3) should be int."))?,
            ),
        };

        let mut key_ops = BTreeSet::new();
        match params.get(&iana::KeyParameter::KeyOps.to_i64()) {
            None => {}
            Some(Value::Array(ops)) => {
                for op in ops {
                    let op_id = as_i64(op).ok_or_else(|| {
                        KeyDistError::validation("key_ops(4) should be list of int.")
                    })?;
                    let op = iana::KeyOperation::from_i64(op_id).ok_or_else(|| {
                        KeyDistError::validation(format!(
                            "Unknown or not permissible key_ops(4): {op_id}."
                        ))
                    })?;
                    key_ops.insert(op);
                }
            }
            Some(_) => return Err(KeyDistError::validation("key_ops(4) should be list.")),
        }

        let base_iv = match params.get(&iana::KeyParameter::BaseIv.to_i64()) {
            None => None,
            Some(Value::Bytes(b)) => Some(b.clone()),
            Some(_) => {
                return Err(KeyDistError::validation("Base IV(5) should be bytes(bstr)."))
            }
        };

        Ok(KeyParams {
            params,
            kty,
            kid,
            alg,
            key_ops,
            base_iv,
        })
    }

    /// The key type (label 1).
    pub fn kty(&self) -> i64 {
        self.kty
    }

    /// The key identifier (label 2), if present.
    pub fn kid(&self) -> Option<&[u8]> {
        self.kid.as_deref()
    }

    /// The algorithm identifier (label 3), if present.
    pub fn alg(&self) -> Option<i64> {
        self.alg
    }

    /// The declared key operations (label 4). Empty when the label is
    /// absent.
    pub fn key_ops(&self) -> &BTreeSet<iana::KeyOperation> {
        &self.key_ops
    }

    /// The base IV (label 5), if present.
    pub fn base_iv(&self) -> Option<&[u8]> {
        self.base_iv.as_deref()
    }

    /// The curve identifier (label -1), if present as an integer.
    pub fn crv(&self) -> Option<i64> {
        self.params.get(&-1).and_then(as_i64)
    }

    /// Returns the raw value stored for `label`, if any.
    pub fn param(&self, label: i64) -> Option<&Value> {
        self.params.get(&label)
    }

    /// Returns the key as a label map, suitable for embedding into a
    /// recipient or key-set structure.
    pub fn to_map(&self) -> LabelMap {
        self.params.clone()
    }
}

/// Resolves the effective key operations for a key bound to a signature
/// algorithm.
///
/// A private key defaults to sign+verify and must not also claim a
/// derivation capability (key separation); a public key may only verify.
pub(crate) fn resolve_sign_ops(
    private: bool,
    declared: &BTreeSet<iana::KeyOperation>,
) -> Result<BTreeSet<iana::KeyOperation>, KeyDistError> {
    let sign_class = BTreeSet::from([iana::KeyOperation::Sign, iana::KeyOperation::Verify]);
    let derive_class =
        BTreeSet::from([iana::KeyOperation::DeriveKey, iana::KeyOperation::DeriveBits]);
    if private {
        if declared.is_empty() {
            return Ok(sign_class);
        }
        if !declared.is_disjoint(&sign_class) && !declared.is_disjoint(&derive_class) {
            return Err(KeyDistError::validation(
                "Signing key should not be used for key derivation.",
            ));
        }
        if !declared.is_subset(&sign_class) {
            return Err(KeyDistError::validation("Invalid key_ops for signing key."));
        }
        Ok(declared.clone())
    } else {
        if declared.is_empty() {
            return Ok(BTreeSet::from([iana::KeyOperation::Verify]));
        }
        if !declared.is_subset(&BTreeSet::from([iana::KeyOperation::Verify])) {
            return Err(KeyDistError::validation("Invalid key_ops for public key."));
        }
        Ok(declared.clone())
    }
}

/// Resolves the effective key operations for a key bound to a
/// key-agreement algorithm.
///
/// A private key defaults to the derivation operations and must not also
/// claim a signing capability; a public key carries no operations at all.
pub(crate) fn resolve_derive_ops(
    private: bool,
    declared: &BTreeSet<iana::KeyOperation>,
) -> Result<BTreeSet<iana::KeyOperation>, KeyDistError> {
    let sign_class = BTreeSet::from([iana::KeyOperation::Sign, iana::KeyOperation::Verify]);
    let derive_class =
        BTreeSet::from([iana::KeyOperation::DeriveKey, iana::KeyOperation::DeriveBits]);
    if private {
        if declared.is_empty() {
            return Ok(derive_class);
        }
        if !declared.is_disjoint(&sign_class) && !declared.is_disjoint(&derive_class) {
            return Err(KeyDistError::validation(
                "Private key for ECDHE should not be used for signing.",
            ));
        }
        if !declared.is_subset(&derive_class) {
            return Err(KeyDistError::validation(
                "Invalid key_ops for key derivation.",
            ));
        }
        Ok(declared.clone())
    } else if declared.is_empty() {
        Ok(BTreeSet::new())
    } else {
        Err(KeyDistError::validation(
            "Public key for ECDHE should not have key_ops.",
        ))
    }
}

/// A validated COSE key of any supported type.
///
/// Dispatches on `kty(1)` and defers to the type-specific validation.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedKey {
    Okp(OkpKey),
    Ec2(Ec2Key),
    Rsa(RsaKey),
    Symmetric(SymmetricKey),
}

impl ParsedKey {
    /// Classifies `kty(1)` and validates the map as a key of that type.
    pub fn from_map(params: LabelMap) -> Result<ParsedKey, KeyDistError> {
        let kty = match params.get(&iana::KeyParameter::Kty.to_i64()) {
            None => return Err(KeyDistError::validation("kty(1) not found.")),
            Some(Value::Text(name)) => kty_from_name(name)
                .ok_or_else(|| KeyDistError::validation(format!("Unknown kty: {name}.")))?,
            Some(v) => as_i64(v)
                .ok_or_else(|| KeyDistError::validation("kty(1) should be int or str(tstr)."))?,
        };
        match iana::KeyType::from_i64(kty) {
            Some(iana::KeyType::OKP) => OkpKey::new(params).map(ParsedKey::Okp),
            Some(iana::KeyType::EC2) => Ec2Key::new(params).map(ParsedKey::Ec2),
            Some(iana::KeyType::RSA) => RsaKey::new(params).map(ParsedKey::Rsa),
            Some(iana::KeyType::Symmetric) => SymmetricKey::new(params).map(ParsedKey::Symmetric),
            _ => Err(KeyDistError::validation(format!(
                "Unsupported or unknown kty(1): {kty}."
            ))),
        }
    }

    /// The key identifier, if present.
    pub fn kid(&self) -> Option<&[u8]> {
        self.common().kid()
    }

    /// The algorithm identifier, if present.
    pub fn alg(&self) -> Option<i64> {
        match self {
            ParsedKey::Okp(k) => Some(k.alg()),
            ParsedKey::Ec2(k) => Some(k.alg()),
            ParsedKey::Rsa(k) => Some(k.alg()),
            ParsedKey::Symmetric(k) => Some(k.alg()),
        }
    }

    /// Returns the key as a label map.
    pub fn to_map(&self) -> LabelMap {
        self.common().to_map()
    }

    fn common(&self) -> &KeyParams {
        match self {
            ParsedKey::Okp(k) => k.as_params(),
            ParsedKey::Ec2(k) => k.as_params(),
            ParsedKey::Rsa(k) => k.as_params(),
            ParsedKey::Symmetric(k) => k.as_params(),
        }
    }
}

impl From<SymmetricKey> for ParsedKey {
    fn from(value: SymmetricKey) -> Self {
        ParsedKey::Symmetric(value)
    }
}

impl From<OkpKey> for ParsedKey {
    fn from(value: OkpKey) -> Self {
        ParsedKey::Okp(value)
    }
}

impl From<Ec2Key> for ParsedKey {
    fn from(value: Ec2Key) -> Self {
        ParsedKey::Ec2(value)
    }
}

impl From<RsaKey> for ParsedKey {
    fn from(value: RsaKey) -> Self {
        ParsedKey::Rsa(value)
    }
}
