//! Algorithm-family behavior bound to a recipient.
//!
//! Selection over the registered identifier sets is exhaustive and happens
//! once, at recipient construction; any identifier outside the sets is a
//! hard failure rather than a pass-through.

mod direct;
mod ecdh;
mod hpke;
mod key_wrap;

use coset::iana;
use coset::iana::EnumI64;

use crate::algs as alg_ids;
use crate::backend::{HpkeBackend, KeyDistributionBackend};
use crate::cbor::LabelMap;
use crate::error::KeyDistError;
use crate::kdf::KdfContext;
use crate::key::{OkpKey, ParsedKey, SymmetricKey};
use crate::recipient::{HpkeCipherSuite, Recipient, SenderKey};

/// The algorithm family of a recipient, selected by its resolved alg id.
#[derive(Debug, Clone, PartialEq)]
pub enum RecipientAlg {
    /// No algorithm announced (resolved id 0). Legal to carry, unusable
    /// for keying operations.
    Unspecified,
    /// direct (-6): the parties already share the CEK.
    Direct,
    /// direct+HKDF-SHA-256/-512 (-10/-11): CEK derived from a shared
    /// secret.
    DirectHkdf(i64),
    /// A128KW/A192KW/A256KW (-3/-4/-5): CEK wrapped under a shared KEK.
    AesKeyWrap(iana::Algorithm),
    /// ECDH-ES/SS+HKDF-256/-512 (-25..-28): CEK is the DH+HKDF output.
    EcdhHkdf(i64),
    /// ECDH-ES/SS+A128/192/256KW (-29..-34): DH+HKDF derives a KEK that
    /// wraps the CEK.
    EcdhWrap { alg: i64, wrap: iana::Algorithm },
    /// HPKE (-1): CEK sealed under the announced cipher suite.
    Hpke(HpkeCipherSuite),
}

impl RecipientAlg {
    /// Classifies `alg_id` into its family, validating family-specific
    /// construction inputs (sender key compatibility, HPKE suite).
    pub(crate) fn classify(
        alg_id: i64,
        unprotected: &LabelMap,
        sender_key: Option<&SenderKey>,
    ) -> Result<RecipientAlg, KeyDistError> {
        if alg_id == 0 {
            return Ok(RecipientAlg::Unspecified);
        }
        if alg_id == alg_ids::ALG_DIRECT {
            return Ok(RecipientAlg::Direct);
        }
        if alg_id == alg_ids::ALG_HPKE {
            return Ok(RecipientAlg::Hpke(HpkeCipherSuite::from_unprotected(
                unprotected,
            )?));
        }
        match iana::Algorithm::from_i64(alg_id) {
            Some(iana::Algorithm::Direct_HKDF_SHA_256 | iana::Algorithm::Direct_HKDF_SHA_512) => {
                Ok(RecipientAlg::DirectHkdf(alg_id))
            }
            Some(
                wrap @ (iana::Algorithm::A128KW
                | iana::Algorithm::A192KW
                | iana::Algorithm::A256KW),
            ) => {
                if let Some(SenderKey::Wrap(kek)) = sender_key {
                    if kek.alg() != alg_id {
                        return Err(KeyDistError::validation(format!(
                            "Unknown alg(3) for AES key wrap: {}.",
                            kek.alg()
                        )));
                    }
                }
                Ok(RecipientAlg::AesKeyWrap(wrap))
            }
            Some(_) if alg_ids::is_ecdh_hkdf_alg(alg_id) => Ok(RecipientAlg::EcdhHkdf(alg_id)),
            Some(alg) if alg_ids::is_ecdh_wrap_alg(alg_id) => {
                let wrap = match alg {
                    iana::Algorithm::ECDH_ES_A128KW | iana::Algorithm::ECDH_SS_A128KW => {
                        iana::Algorithm::A128KW
                    }
                    iana::Algorithm::ECDH_ES_A192KW | iana::Algorithm::ECDH_SS_A192KW => {
                        iana::Algorithm::A192KW
                    }
                    _ => iana::Algorithm::A256KW,
                };
                Ok(RecipientAlg::EcdhWrap { alg: alg_id, wrap })
            }
            _ => Err(KeyDistError::validation(format!(
                "Unsupported or unknown alg(1): {alg_id}."
            ))),
        }
    }
}

pub(super) fn apply<B: KeyDistributionBackend + HpkeBackend>(
    recipient: &mut Recipient,
    backend: &mut B,
    key: Option<&SymmetricKey>,
    recipient_key: Option<&OkpKey>,
    context: Option<&KdfContext>,
    aad: &[u8],
) -> Result<SymmetricKey, KeyDistError> {
    match recipient.alg_family().clone() {
        RecipientAlg::Unspecified => Err(KeyDistError::validation("alg(1) not found.")),
        RecipientAlg::Direct => direct::apply(recipient, key),
        RecipientAlg::DirectHkdf(alg) => direct::apply_hkdf(recipient, backend, alg, key, context),
        RecipientAlg::AesKeyWrap(wrap) => key_wrap::apply(recipient, backend, wrap, key),
        RecipientAlg::EcdhHkdf(alg) => {
            ecdh::apply_hkdf(recipient, backend, alg, recipient_key, context)
        }
        RecipientAlg::EcdhWrap { alg, wrap } => {
            ecdh::apply_wrap(recipient, backend, alg, wrap, key, recipient_key, context)
        }
        RecipientAlg::Hpke(suite) => hpke::apply(recipient, backend, &suite, key, recipient_key, aad),
    }
}

pub(super) fn extract<B: KeyDistributionBackend + HpkeBackend>(
    recipient: &Recipient,
    backend: &mut B,
    key: &ParsedKey,
    context: Option<&KdfContext>,
    alg_hint: Option<i64>,
    aad: &[u8],
) -> Result<SymmetricKey, KeyDistError> {
    match recipient.alg_family().clone() {
        RecipientAlg::Unspecified => Err(KeyDistError::validation("alg(1) not found.")),
        RecipientAlg::Direct => direct::extract(key),
        RecipientAlg::DirectHkdf(alg) => direct::extract_hkdf(recipient, backend, alg, key, context),
        RecipientAlg::AesKeyWrap(wrap) => {
            key_wrap::extract(recipient, backend, wrap, key, alg_hint)
        }
        RecipientAlg::EcdhHkdf(alg) => ecdh::extract_hkdf(recipient, backend, alg, key, context),
        RecipientAlg::EcdhWrap { alg, wrap } => {
            ecdh::extract_wrap(recipient, backend, alg, wrap, key, context, alg_hint)
        }
        RecipientAlg::Hpke(suite) => hpke::extract(recipient, backend, &suite, key, alg_hint, aad),
    }
}

/// Downcasts the recipient's own key to a symmetric key, as required by
/// the shared-secret families.
fn as_symmetric(key: &ParsedKey) -> Result<&SymmetricKey, KeyDistError> {
    match key {
        ParsedKey::Symmetric(k) => Ok(k),
        _ => Err(KeyDistError::validation("kty(1) should be Symmetric(4).")),
    }
}

/// Downcasts the recipient's own key to an OKP key, as required by the
/// key-agreement and HPKE families.
fn as_okp(key: &ParsedKey) -> Result<&OkpKey, KeyDistError> {
    match key {
        ParsedKey::Okp(k) => Ok(k),
        _ => Err(KeyDistError::validation("kty(1) should be OKP(1).")),
    }
}
