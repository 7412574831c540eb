//! RSA keys (RFC 8230).

use std::collections::BTreeSet;

use ciborium::Value;
use coset::iana;
use coset::iana::EnumI64;

use crate::algs;
use crate::cbor::LabelMap;
use crate::error::KeyDistError;
use crate::key::{resolve_sign_ops, KeyParams};

/// A validated RSA key.
///
/// A private key must be in CRT form: `d(-3)` alone is rejected because
/// every implementation this crate targets requires the CRT parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct RsaKey {
    common: KeyParams,
    n: Vec<u8>,
    e: Vec<u8>,
    d: Option<Vec<u8>>,
    alg: i64,
    key_ops: BTreeSet<iana::KeyOperation>,
}

/// Fetches a required byte-string parameter of a key.
fn required_bytes(common: &KeyParams, label: i64, name: &str) -> Result<Vec<u8>, KeyDistError> {
    match common.param(label) {
        None => Err(KeyDistError::validation(format!("{name}({label}) not found."))),
        Some(Value::Bytes(b)) => Ok(b.clone()),
        Some(_) => Err(KeyDistError::validation(format!(
            "{name}({label}) should be bytes(bstr)."
        ))),
    }
}

impl RsaKey {
    /// Validates `params` as an RSA key.
    pub fn new(params: LabelMap) -> Result<RsaKey, KeyDistError> {
        let common = KeyParams::new(params)?;
        if common.kty() != iana::KeyType::RSA.to_i64() {
            return Err(KeyDistError::validation("kty(1) should be RSA(3)."));
        }

        let n = required_bytes(&common, iana::RsaKeyParameter::N.to_i64(), "n")?;
        let e = required_bytes(&common, iana::RsaKeyParameter::E.to_i64(), "e")?;

        let d = match common.param(iana::RsaKeyParameter::D.to_i64()) {
            None => None,
            Some(Value::Bytes(b)) => Some(b.clone()),
            Some(_) => return Err(KeyDistError::validation("d(-3) should be bytes(bstr).")),
        };
        if d.is_some() {
            for (label, name) in [
                (iana::RsaKeyParameter::P.to_i64(), "p"),
                (iana::RsaKeyParameter::Q.to_i64(), "q"),
                (iana::RsaKeyParameter::DP.to_i64(), "dP"),
                (iana::RsaKeyParameter::DQ.to_i64(), "dQ"),
                (iana::RsaKeyParameter::QInv.to_i64(), "qInv"),
            ] {
                if common.param(label).is_none() {
                    return Err(KeyDistError::validation(format!(
                        "RSA private key should have {name}({label})."
                    )));
                }
            }
        }

        let alg = common
            .alg()
            .ok_or_else(|| KeyDistError::validation("alg(3) not found."))?;
        if !algs::is_rsa_sign_alg(alg) {
            return Err(KeyDistError::validation(format!(
                "Unsupported or unknown alg(3) for RSA: {alg}."
            )));
        }

        let key_ops = resolve_sign_ops(d.is_some(), common.key_ops())?;

        Ok(RsaKey {
            common,
            n,
            e,
            d,
            alg,
            key_ops,
        })
    }

    /// The resolved algorithm identifier.
    pub fn alg(&self) -> i64 {
        self.alg
    }

    /// The effective key operations.
    pub fn key_ops(&self) -> &BTreeSet<iana::KeyOperation> {
        &self.key_ops
    }

    /// The modulus.
    pub fn n(&self) -> &[u8] {
        &self.n
    }

    /// The public exponent.
    pub fn e(&self) -> &[u8] {
        &self.e
    }

    /// True if the key carries private material.
    pub fn is_private(&self) -> bool {
        self.d.is_some()
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
