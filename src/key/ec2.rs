//! Double-coordinate elliptic curve (EC2) keys for the NIST curves and
//! secp256k1 (RFC 9053, Section 7.1).

use std::collections::BTreeSet;

use ciborium::Value;
use coset::iana;
use coset::iana::EnumI64;

use crate::algs;
use crate::cbor::{as_i64, LabelMap};
use crate::error::KeyDistError;
use crate::key::{resolve_derive_ops, resolve_sign_ops, KeyParams};

/// Returns the byte length of coordinates on `crv`.
fn coordinate_len(crv: iana::EllipticCurve) -> usize {
    match crv {
        iana::EllipticCurve::P_256 | iana::EllipticCurve::Secp256k1 => 32,
        iana::EllipticCurve::P_384 => 48,
        iana::EllipticCurve::P_521 => 66,
        _ => unreachable!("curve is checked during construction"),
    }
}

/// The default signature algorithm for `crv`.
fn default_alg(crv: iana::EllipticCurve) -> iana::Algorithm {
    match crv {
        iana::EllipticCurve::P_256 => iana::Algorithm::ES256,
        iana::EllipticCurve::P_384 => iana::Algorithm::ES384,
        iana::EllipticCurve::P_521 => iana::Algorithm::ES512,
        iana::EllipticCurve::Secp256k1 => iana::Algorithm::ES256K,
        _ => unreachable!("curve is checked during construction"),
    }
}

/// A validated EC2 key.
#[derive(Debug, Clone, PartialEq)]
pub struct Ec2Key {
    common: KeyParams,
    crv: iana::EllipticCurve,
    x: Vec<u8>,
    y: Vec<u8>,
    d: Option<Vec<u8>>,
    alg: i64,
    key_ops: BTreeSet<iana::KeyOperation>,
}

impl Ec2Key {
    /// Validates `params` as an EC2 key.
    ///
    /// Unlike the OKP curves, each EC2 curve maps to exactly one ECDSA
    /// variant, so a missing `alg(3)` defaults to the curve's signature
    /// algorithm instead of failing.
    pub fn new(params: LabelMap) -> Result<Ec2Key, KeyDistError> {
        let common = KeyParams::new(params)?;
        if common.kty() != iana::KeyType::EC2.to_i64() {
            return Err(KeyDistError::validation("kty(1) should be EC2(2)."));
        }

        let crv = match common.param(iana::Ec2KeyParameter::Crv.to_i64()) {
            None => return Err(KeyDistError::validation("crv(-1) not found.")),
            Some(v) => {
                let crv_id = as_i64(v)
                    .ok_or_else(|| KeyDistError::validation("crv(-1) should be int."))?;
                match iana::EllipticCurve::from_i64(crv_id) {
                    Some(
                        crv @ (iana::EllipticCurve::P_256
                        | iana::EllipticCurve::P_384
                        | iana::EllipticCurve::P_521
                        | iana::EllipticCurve::Secp256k1),
                    ) => crv,
                    _ => {
                        return Err(KeyDistError::validation(format!(
                            "Unsupported or unknown crv(-1) for EC2: {crv_id}."
                        )))
                    }
                }
            }
        };

        let x = match common.param(iana::Ec2KeyParameter::X.to_i64()) {
            None => return Err(KeyDistError::validation("x(-2) not found.")),
            Some(Value::Bytes(b)) => b.clone(),
            Some(_) => return Err(KeyDistError::validation("x(-2) should be bytes(bstr).")),
        };
        let y = match common.param(iana::Ec2KeyParameter::Y.to_i64()) {
            None => return Err(KeyDistError::validation("y(-3) not found.")),
            Some(Value::Bytes(b)) => b.clone(),
            Some(_) => return Err(KeyDistError::validation("y(-3) should be bytes(bstr).")),
        };
        let d = match common.param(iana::Ec2KeyParameter::D.to_i64()) {
            None => None,
            Some(Value::Bytes(b)) => Some(b.clone()),
            Some(_) => return Err(KeyDistError::validation("d(-4) should be bytes(bstr).")),
        };

        let len = coordinate_len(crv);
        if x.len() != len || y.len() != len {
            return Err(KeyDistError::validation("Invalid key parameter."));
        }
        if let Some(d) = &d {
            if d.len() != len {
                return Err(KeyDistError::validation("Invalid key parameter."));
            }
        }

        let private = d.is_some();
        let alg = common.alg().unwrap_or_else(|| default_alg(crv).to_i64());

        let key_ops = if algs::is_ec2_sign_alg(alg) {
            // secp256k1 pairs only with ES256K, the NIST curves with the
            // matching SHA-2 variant.
            if alg != default_alg(crv).to_i64() {
                return Err(KeyDistError::validation(format!(
                    "Invalid alg(3) for crv(-1): {alg}."
                )));
            }
            resolve_sign_ops(private, common.key_ops())?
        } else if algs::is_key_agreement_alg(alg) {
            resolve_derive_ops(private, common.key_ops())?
        } else {
            return Err(KeyDistError::validation(format!(
                "Unsupported or unknown alg(3) for EC2: {alg}."
            )));
        };

        Ok(Ec2Key {
            common,
            crv,
            x,
            y,
            d,
            alg,
            key_ops,
        })
    }

    /// The curve this key lives on.
    pub fn crv(&self) -> iana::EllipticCurve {
        self.crv
    }

    /// The resolved algorithm identifier.
    pub fn alg(&self) -> i64 {
        self.alg
    }

    /// The effective key operations, including curve defaults.
    pub fn key_ops(&self) -> &BTreeSet<iana::KeyOperation> {
        &self.key_ops
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
