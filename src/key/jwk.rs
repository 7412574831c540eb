//! JWK-style import (RFC 7517 field names mapped onto the COSE integer
//! registry).

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ciborium::Value;
use coset::iana;
use coset::iana::EnumI64;
use serde::Deserialize;

use crate::algs;
use crate::cbor::LabelMap;
use crate::error::KeyDistError;
use crate::key::{kty_from_name, ParsedKey};

/// A JSON Web Key as it appears on the wire.
///
/// Only deserialized, never constructed by this crate. Fields this crate
/// does not understand are rejected by [`Jwk::to_key`], not silently
/// dropped.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    pub kty: String,
    #[serde(default)]
    pub kid: Option<String>,
    #[serde(default)]
    pub alg: Option<String>,
    #[serde(default)]
    pub key_ops: Option<Vec<String>>,
    #[serde(default)]
    pub crv: Option<String>,
    #[serde(default)]
    pub x: Option<String>,
    #[serde(default)]
    pub y: Option<String>,
    #[serde(default)]
    pub d: Option<String>,
    #[serde(default)]
    pub k: Option<String>,
    #[serde(default)]
    pub n: Option<String>,
    #[serde(default)]
    pub e: Option<String>,
    #[serde(default)]
    pub p: Option<String>,
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub dp: Option<String>,
    #[serde(default)]
    pub dq: Option<String>,
    #[serde(default)]
    pub qi: Option<String>,
    #[serde(default)]
    pub x5c: Option<Vec<String>>,
}

/// Maps a JWK curve name to its registered identifier.
fn crv_from_name(name: &str) -> Option<iana::EllipticCurve> {
    let crv = match name {
        "P-256" => iana::EllipticCurve::P_256,
        "P-384" => iana::EllipticCurve::P_384,
        "P-521" => iana::EllipticCurve::P_521,
        "secp256k1" => iana::EllipticCurve::Secp256k1,
        "X25519" => iana::EllipticCurve::X25519,
        "X448" => iana::EllipticCurve::X448,
        "Ed25519" => iana::EllipticCurve::Ed25519,
        "Ed448" => iana::EllipticCurve::Ed448,
        _ => return None,
    };
    Some(crv)
}

/// Maps a JWK key-operation name to its registered identifier.
fn key_op_from_name(name: &str) -> Option<iana::KeyOperation> {
    let op = match name {
        "sign" => iana::KeyOperation::Sign,
        "verify" => iana::KeyOperation::Verify,
        "encrypt" => iana::KeyOperation::Encrypt,
        "decrypt" => iana::KeyOperation::Decrypt,
        "wrapKey" => iana::KeyOperation::WrapKey,
        "unwrapKey" => iana::KeyOperation::UnwrapKey,
        "deriveKey" => iana::KeyOperation::DeriveKey,
        "deriveBits" => iana::KeyOperation::DeriveBits,
        _ => return None,
    };
    Some(op)
}

fn decode_b64(field: &str, value: &str) -> Result<Vec<u8>, KeyDistError> {
    URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|_| KeyDistError::decode(format!("{field} should be base64url encoded.")))
}

impl Jwk {
    /// Parses a JWK from its JSON text.
    pub fn from_json(text: &str) -> Result<Jwk, KeyDistError> {
        serde_json::from_str(text).map_err(|_| KeyDistError::decode("Failed to decode."))
    }

    /// Converts this JWK into a validated COSE key.
    ///
    /// Name-to-integer mapping failures are decode errors (the input names
    /// something this crate does not know); the converted map then goes
    /// through the same validation as a native COSE key.
    pub fn to_key(&self) -> Result<ParsedKey, KeyDistError> {
        let mut map = LabelMap::new();

        let kty = kty_from_name(&self.kty)
            // JWK spells the EC2 type "EC".
            .or_else(|| (self.kty == "EC").then(|| iana::KeyType::EC2.to_i64()))
            .or_else(|| (self.kty == "oct").then(|| iana::KeyType::Symmetric.to_i64()))
            .ok_or_else(|| KeyDistError::decode(format!("Unknown kty: {}.", self.kty)))?;
        map.insert(
            iana::KeyParameter::Kty.to_i64(),
            Value::Integer(kty.into()),
        );

        if let Some(kid) = &self.kid {
            map.insert(
                iana::KeyParameter::Kid.to_i64(),
                Value::Bytes(kid.as_bytes().to_vec()),
            );
        }

        if let Some(alg) = &self.alg {
            let alg = algs::alg_from_name(alg)
                .ok_or_else(|| KeyDistError::decode(format!("Unsupported or unknown alg: {alg}.")))?;
            map.insert(iana::KeyParameter::Alg.to_i64(), Value::Integer(alg.into()));
        }

        if let Some(ops) = &self.key_ops {
            let mut encoded = Vec::with_capacity(ops.len());
            for op in ops {
                let op = key_op_from_name(op).ok_or_else(|| {
                    KeyDistError::decode(format!("Unknown or not permissible key_ops: {op}."))
                })?;
                encoded.push(Value::Integer(op.to_i64().into()));
            }
            map.insert(iana::KeyParameter::KeyOps.to_i64(), Value::Array(encoded));
        }

        if let Some(crv) = &self.crv {
            let crv = crv_from_name(crv)
                .ok_or_else(|| KeyDistError::decode(format!("Unknown crv: {crv}.")))?;
            map.insert(-1, Value::Integer(crv.to_i64().into()));
        }
        if let Some(x) = &self.x {
            map.insert(-2, Value::Bytes(decode_b64("x", x)?));
        }
        if let Some(y) = &self.y {
            map.insert(-3, Value::Bytes(decode_b64("y", y)?));
        }
        if let Some(d) = &self.d {
            // OKP and EC2 store the private key at -4, RSA at -3; the
            // symmetric type has no d at all.
            let label = if kty == iana::KeyType::RSA.to_i64() {
                -3
            } else {
                -4
            };
            map.insert(label, Value::Bytes(decode_b64("d", d)?));
        }
        if let Some(k) = &self.k {
            if kty != iana::KeyType::Symmetric.to_i64() {
                return Err(KeyDistError::decode("k is only allowed for kty oct."));
            }
            map.insert(-1, Value::Bytes(decode_b64("k", k)?));
        }

        // The RSA members share labels with the curve-key members but the
        // key types are disjoint.
        let rsa_members: [(&str, &Option<String>, i64); 7] = [
            ("n", &self.n, -1),
            ("e", &self.e, -2),
            ("p", &self.p, -4),
            ("q", &self.q, -5),
            ("dp", &self.dp, -6),
            ("dq", &self.dq, -7),
            ("qi", &self.qi, -8),
        ];
        for (name, member, label) in rsa_members {
            if let Some(value) = member {
                if kty != iana::KeyType::RSA.to_i64() {
                    return Err(KeyDistError::decode(format!(
                        "{name} is only allowed for kty RSA."
                    )));
                }
                map.insert(label, Value::Bytes(decode_b64(name, value)?));
            }
        }

        if let Some(x5c) = &self.x5c {
            let mut certs = Vec::with_capacity(x5c.len());
            for cert in x5c {
                // x5c entries use standard (not url-safe) base64 per RFC 7517.
                let der = base64::engine::general_purpose::STANDARD
                    .decode(cert)
                    .map_err(|_| KeyDistError::decode("x5c should be base64 encoded."))?;
                certs.push(Value::Bytes(der));
            }
            map.insert(
                iana::HeaderParameter::X5Chain.to_i64(),
                Value::Array(certs),
            );
        }

        ParsedKey::from_map(map)
    }
}
