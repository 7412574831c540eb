//! Symmetric keys (RFC 9053, Section 6.2.1).

use std::collections::BTreeSet;

use ciborium::Value;
use coset::iana;
use coset::iana::EnumI64;

use crate::algs;
use crate::cbor::LabelMap;
use crate::error::KeyDistError;
use crate::key::KeyParams;

/// A validated symmetric key.
#[derive(Debug, Clone, PartialEq)]
pub struct SymmetricKey {
    common: KeyParams,
    key: Vec<u8>,
    alg: i64,
    key_ops: BTreeSet<iana::KeyOperation>,
}

impl SymmetricKey {
    /// Validates `params` as a symmetric key.
    ///
    /// `alg(3)` is mandatory because the algorithm decides both the
    /// permitted operations and, for the fixed-length ciphers, the exact
    /// key length.
    pub fn new(params: LabelMap) -> Result<SymmetricKey, KeyDistError> {
        let common = KeyParams::new(params)?;
        if common.kty() != iana::KeyType::Symmetric.to_i64() {
            return Err(KeyDistError::validation("kty(1) should be Symmetric(4)."));
        }

        let key = match common.param(iana::SymmetricKeyParameter::K.to_i64()) {
            None => return Err(KeyDistError::validation("k(-1) not found.")),
            Some(Value::Bytes(b)) => b.clone(),
            Some(_) => return Err(KeyDistError::validation("k(-1) should be bytes(bstr).")),
        };

        let alg = common
            .alg()
            .ok_or_else(|| KeyDistError::validation("alg(3) not found."))?;

        let allowed: BTreeSet<iana::KeyOperation> = if algs::is_mac_alg(alg) {
            BTreeSet::from([iana::KeyOperation::MacCreate, iana::KeyOperation::MacVerify])
        } else if algs::is_cek_alg(alg) {
            BTreeSet::from([
                iana::KeyOperation::Encrypt,
                iana::KeyOperation::Decrypt,
                iana::KeyOperation::WrapKey,
                iana::KeyOperation::UnwrapKey,
            ])
        } else if algs::is_aes_kw_alg(alg) {
            BTreeSet::from([iana::KeyOperation::WrapKey, iana::KeyOperation::UnwrapKey])
        } else if matches!(
            iana::Algorithm::from_i64(alg),
            Some(iana::Algorithm::Direct_HKDF_SHA_256 | iana::Algorithm::Direct_HKDF_SHA_512)
        ) {
            BTreeSet::from([iana::KeyOperation::DeriveKey, iana::KeyOperation::DeriveBits])
        } else if alg == algs::ALG_DIRECT {
            // A direct key inherits whatever the downstream layer does with
            // it, so any declared operation set passes through.
            common.key_ops().clone()
        } else {
            return Err(KeyDistError::validation(format!(
                "Unsupported or unknown alg(3) for Symmetric: {alg}."
            )));
        };

        // HMAC keys may be any length; the block ciphers and ChaCha are
        // fixed-length.
        let hmac = matches!(
            iana::Algorithm::from_i64(alg),
            Some(
                iana::Algorithm::HMAC_256_64
                    | iana::Algorithm::HMAC_256_256
                    | iana::Algorithm::HMAC_384_384
                    | iana::Algorithm::HMAC_512_512
            )
        );
        if !hmac
            && (algs::is_mac_alg(alg) || algs::is_cek_alg(alg) || algs::is_aes_kw_alg(alg))
            && key.len() != algs::symmetric_key_size(alg)?
        {
            return Err(KeyDistError::validation(format!(
                "Invalid key length: {}.",
                key.len()
            )));
        }

        let key_ops = if common.key_ops().is_empty() {
            allowed
        } else {
            for op in common.key_ops() {
                if !allowed.contains(op) {
                    return Err(KeyDistError::validation(format!(
                        "Unknown or not permissible key_ops(4): {}.",
                        op.to_i64()
                    )));
                }
            }
            common.key_ops().clone()
        };

        Ok(SymmetricKey {
            common,
            key,
            alg,
            key_ops,
        })
    }

    /// Builds a symmetric key from raw bytes for `alg`, with an optional
    /// key identifier.
    pub fn from_bytes(
        alg: i64,
        kid: Option<&[u8]>,
        key: &[u8],
    ) -> Result<SymmetricKey, KeyDistError> {
        let mut params = LabelMap::new();
        params.insert(
            iana::KeyParameter::Kty.to_i64(),
            Value::Integer(iana::KeyType::Symmetric.to_i64().into()),
        );
        if let Some(kid) = kid {
            params.insert(iana::KeyParameter::Kid.to_i64(), Value::Bytes(kid.to_vec()));
        }
        params.insert(iana::KeyParameter::Alg.to_i64(), Value::Integer(alg.into()));
        params.insert(
            iana::SymmetricKeyParameter::K.to_i64(),
            Value::Bytes(key.to_vec()),
        );
        SymmetricKey::new(params)
    }

    /// The raw key bytes.
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// The algorithm identifier.
    pub fn alg(&self) -> i64 {
        self.alg
    }

    /// The effective key operations, including algorithm defaults.
    pub fn key_ops(&self) -> &BTreeSet<iana::KeyOperation> {
        &self.key_ops
    }

    /// The key identifier, if present.
    pub fn kid(&self) -> Option<&[u8]> {
        self.common.kid()
    }

    pub(crate) fn as_params(&self) -> &KeyParams {
        &self.common
    }

    /// Returns the key as a label map.
    pub fn to_map(&self) -> LabelMap {
        self.common.to_map()
    }
}
