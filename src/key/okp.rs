//! Octet Key Pair (OKP) keys: Ed25519/Ed448 for signing, X25519/X448 for
//! key agreement (RFC 9053, Sections 2.2 and 6.3.1).

use std::collections::BTreeSet;

use ciborium::Value;
use coset::iana;
use coset::iana::EnumI64;

use crate::algs;
use crate::backend::{CertVerifier, HkdfHash, KeyDistributionBackend, SignBackend};
use crate::cbor::{as_i64, LabelMap};
use crate::error::KeyDistError;
use crate::key::{resolve_derive_ops, resolve_sign_ops, KeyParams};

/// Returns the byte length of public/private coordinates on `crv`.
fn coordinate_len(crv: iana::EllipticCurve) -> usize {
    match crv {
        iana::EllipticCurve::X25519 | iana::EllipticCurve::Ed25519 => 32,
        iana::EllipticCurve::X448 => 56,
        iana::EllipticCurve::Ed448 => 57,
        _ => unreachable!("curve is checked during construction"),
    }
}

/// A validated OKP key.
#[derive(Debug, Clone, PartialEq)]
pub struct OkpKey {
    common: KeyParams,
    crv: iana::EllipticCurve,
    x: Option<Vec<u8>>,
    d: Option<Vec<u8>>,
    alg: i64,
    key_ops: BTreeSet<iana::KeyOperation>,
    x5c: Vec<Vec<u8>>,
}

impl OkpKey {
    /// Validates `params` as an OKP key.
    ///
    /// The curve decides which algorithms are acceptable: the signing
    /// curves default to EdDSA, while the ECDH curves require the algorithm
    /// to be supplied explicitly because the same curve serves several KDF
    /// variants. A private key must never claim both a signing and a
    /// derivation capability.
    pub fn new(params: LabelMap) -> Result<OkpKey, KeyDistError> {
        let common = KeyParams::new(params)?;
        if common.kty() != iana::KeyType::OKP.to_i64() {
            return Err(KeyDistError::validation("kty(1) should be OKP(1)."));
        }

        let crv = match common.param(iana::OkpKeyParameter::Crv.to_i64()) {
            None => return Err(KeyDistError::validation("crv(-1) not found.")),
            Some(v) => {
                let crv_id = as_i64(v)
                    .ok_or_else(|| KeyDistError::validation("crv(-1) should be int."))?;
                match iana::EllipticCurve::from_i64(crv_id) {
                    Some(
                        crv @ (iana::EllipticCurve::X25519
                        | iana::EllipticCurve::X448
                        | iana::EllipticCurve::Ed25519
                        | iana::EllipticCurve::Ed448),
                    ) => crv,
                    _ => {
                        return Err(KeyDistError::validation(format!(
                            "Unsupported or unknown crv(-1) for OKP: {crv_id}."
                        )))
                    }
                }
            }
        };

        let x = match common.param(iana::OkpKeyParameter::X.to_i64()) {
            None => None,
            Some(Value::Bytes(b)) => Some(b.clone()),
            Some(_) => return Err(KeyDistError::validation("x(-2) should be bytes(bstr).")),
        };
        if let Some(x) = &x {
            if x.len() != coordinate_len(crv) {
                return Err(KeyDistError::validation("Invalid key parameter."));
            }
        }

        let d = match common.param(iana::OkpKeyParameter::D.to_i64()) {
            None => None,
            Some(Value::Bytes(b)) => Some(b.clone()),
            Some(_) => return Err(KeyDistError::validation("d(-4) should be bytes(bstr).")),
        };
        if let Some(d) = &d {
            if d.len() != coordinate_len(crv) {
                return Err(KeyDistError::validation("Invalid key parameter."));
            }
        }

        let signing_curve = matches!(
            crv,
            iana::EllipticCurve::Ed25519 | iana::EllipticCurve::Ed448
        );
        let private = d.is_some();

        let alg = match common.alg() {
            Some(alg) => alg,
            // Signing curves default to EdDSA; ECDH curves serve multiple
            // KDF variants, so the algorithm must be supplied. Without an
            // alg the declared operations are the only signal of intent,
            // so claiming both capabilities is ambiguous.
            None if signing_curve => {
                let ops = common.key_ops();
                let signs = ops.contains(&iana::KeyOperation::Sign)
                    || ops.contains(&iana::KeyOperation::Verify);
                let derives = ops.contains(&iana::KeyOperation::DeriveKey)
                    || ops.contains(&iana::KeyOperation::DeriveBits);
                if private && signs && derives {
                    return Err(KeyDistError::validation(
                        "OKP private key should not be used for both signing and key derivation.",
                    ));
                }
                iana::Algorithm::EdDSA.to_i64()
            }
            None => return Err(KeyDistError::validation("alg(3) not found.")),
        };

        let key_ops = if algs::is_okp_sign_alg(alg) {
            resolve_sign_ops(private, common.key_ops())?
        } else if algs::is_key_agreement_alg(alg) {
            resolve_derive_ops(private, common.key_ops())?
        } else if alg == algs::ALG_HPKE {
            // HPKE keys carry no declarable operations; the signing curves
            // cannot be used for HPKE at all.
            if signing_curve || !common.key_ops().is_empty() {
                return Err(KeyDistError::validation("Invalid key_ops for HPKE."));
            }
            BTreeSet::new()
        } else {
            return Err(KeyDistError::validation(format!(
                "Unsupported or unknown alg(3) for OKP: {alg}."
            )));
        };

        let x5c = parse_x5c(&common)?;

        Ok(OkpKey {
            common,
            crv,
            x,
            d,
            alg,
            key_ops,
            x5c,
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

    /// The effective key operations, including curve/algorithm defaults.
    pub fn key_ops(&self) -> &BTreeSet<iana::KeyOperation> {
        &self.key_ops
    }

    /// The public coordinate, if present.
    pub fn x(&self) -> Option<&[u8]> {
        self.x.as_deref()
    }

    /// True if the key carries private material.
    pub fn is_private(&self) -> bool {
        self.d.is_some()
    }

    pub(crate) fn d(&self) -> Option<&[u8]> {
        self.d.as_deref()
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

    /// Returns a label map describing only the public half of this key.
    pub(crate) fn to_public_map(&self) -> LabelMap {
        let mut map = LabelMap::new();
        map.insert(
            iana::KeyParameter::Kty.to_i64(),
            Value::Integer(iana::KeyType::OKP.to_i64().into()),
        );
        map.insert(
            iana::OkpKeyParameter::Crv.to_i64(),
            Value::Integer(self.crv.to_i64().into()),
        );
        if let Some(x) = &self.x {
            map.insert(iana::OkpKeyParameter::X.to_i64(), Value::Bytes(x.clone()));
        }
        map
    }

    /// Signs `msg` with this key. Only the signing curves can sign, and
    /// only with private material present.
    pub fn sign<B: SignBackend>(&self, backend: &mut B, msg: &[u8]) -> Result<Vec<u8>, KeyDistError> {
        let d = self
            .d
            .as_deref()
            .ok_or_else(|| KeyDistError::validation("Public key cannot be used for signing."))?;
        if !matches!(
            self.crv,
            iana::EllipticCurve::Ed25519 | iana::EllipticCurve::Ed448
        ) {
            return Err(KeyDistError::validation(format!(
                "Invalid crv(-1) for signing: {}.",
                self.crv.to_i64()
            )));
        }
        backend.sign(self.crv, d, msg)
    }

    /// Verifies `sig` over `msg` against this key's public coordinate.
    pub fn verify<B: SignBackend>(
        &self,
        backend: &mut B,
        msg: &[u8],
        sig: &[u8],
    ) -> Result<(), KeyDistError> {
        let x = self
            .x
            .as_deref()
            .ok_or_else(|| KeyDistError::validation("x(-2) not found."))?;
        backend.verify(self.crv, x, msg, sig)
    }

    /// Derives `length` bytes by running a Diffie-Hellman exchange against
    /// `public_key` followed by HKDF over `salt` and `info`.
    ///
    /// The caller key must carry private material and both keys must be on
    /// an ECDH curve; either violation is a usage error.
    pub fn derive_bytes<B: KeyDistributionBackend>(
        &self,
        backend: &mut B,
        length: usize,
        salt: &[u8],
        info: &[u8],
        public_key: Option<&OkpKey>,
    ) -> Result<Vec<u8>, KeyDistError> {
        let d = self.d.as_deref().ok_or_else(|| {
            KeyDistError::validation("Public key cannot be used for key derivation.")
        })?;
        if !matches!(
            self.crv,
            iana::EllipticCurve::X25519 | iana::EllipticCurve::X448
        ) {
            return Err(KeyDistError::validation(format!(
                "Invalid crv(-1) for key derivation: {}.",
                self.crv.to_i64()
            )));
        }
        let public_key =
            public_key.ok_or_else(|| KeyDistError::validation("public_key should be set."))?;
        if !matches!(
            public_key.crv,
            iana::EllipticCurve::X25519 | iana::EllipticCurve::X448
        ) {
            return Err(KeyDistError::validation(
                "public_key should be x25519/x448 public key.",
            ));
        }
        let peer_x = public_key
            .x
            .as_deref()
            .ok_or_else(|| KeyDistError::validation("x(-2) not found."))?;

        let shared = backend.ecdh(self.crv, d, peer_x)?;
        backend.hkdf(HkdfHash::for_alg(self.alg), &shared, salt, info, length)
    }

    /// Validates this key's certificate chain (`x5c`) against the trust
    /// anchors in `ca_certs` using the supplied verifier.
    ///
    /// Returns `Ok(false)` when the key carries no chain. An empty
    /// `ca_certs` list is invalid input, not a request to skip validation.
    pub fn validate_certificate<V: CertVerifier>(
        &self,
        verifier: &V,
        ca_certs: &[Vec<u8>],
    ) -> Result<bool, KeyDistError> {
        if ca_certs.is_empty() {
            return Err(KeyDistError::validation("ca_certs should be set."));
        }
        if self.x5c.is_empty() {
            return Ok(false);
        }
        verifier.validate_x5chain(&self.x5c, ca_certs)?;
        Ok(true)
    }
}

/// Parses the optional certificate chain stored under the x5chain label.
/// A single byte string is accepted as a one-element chain (RFC 9360).
fn parse_x5c(common: &KeyParams) -> Result<Vec<Vec<u8>>, KeyDistError> {
    match common.param(iana::HeaderParameter::X5Chain.to_i64()) {
        None => Ok(Vec::new()),
        Some(Value::Bytes(cert)) => Ok(vec![cert.clone()]),
        Some(Value::Array(certs)) => {
            let mut chain = Vec::with_capacity(certs.len());
            for cert in certs {
                match cert {
                    Value::Bytes(b) => chain.push(b.clone()),
                    _ => {
                        return Err(KeyDistError::validation(
                            "x5c(33) should be list of bytes(bstr).",
                        ))
                    }
                }
            }
            Ok(chain)
        }
        Some(_) => Err(KeyDistError::validation(
            "x5c(33) should be bytes(bstr) or list.",
        )),
    }
}
