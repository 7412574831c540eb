//! The direct (-6) and direct+HKDF (-10/-11) families.

use ciborium::Value;
use coset::iana;
use coset::iana::EnumI64;

use crate::backend::{HkdfHash, KeyDistributionBackend};
use crate::cbor::as_bytes;
use crate::error::KeyDistError;
use crate::kdf::KdfContext;
use crate::key::{ParsedKey, SymmetricKey};
use crate::recipient::Recipient;

use super::as_symmetric;

/// Reads the HKDF salt: an explicit salt header wins over the context's
/// party U nonce; both absent means no salt.
pub(super) fn salt(recipient: &Recipient, context: &KdfContext) -> Vec<u8> {
    recipient
        .unprotected()
        .get(&iana::HeaderAlgorithmParameter::Salt.to_i64())
        .and_then(as_bytes)
        .or_else(|| context.party_u_nonce())
        .map(<[u8]>::to_vec)
        .unwrap_or_default()
}

pub(super) fn apply(
    recipient: &mut Recipient,
    key: Option<&SymmetricKey>,
) -> Result<SymmetricKey, KeyDistError> {
    let key = key.ok_or_else(|| KeyDistError::validation("key should be set."))?;
    if recipient.kid().is_none() {
        if let Some(kid) = key.kid() {
            recipient.insert_unprotected(4, Value::Bytes(kid.to_vec()));
        }
    }
    Ok(key.clone())
}

pub(super) fn extract(key: &ParsedKey) -> Result<SymmetricKey, KeyDistError> {
    Ok(as_symmetric(key)?.clone())
}

pub(super) fn apply_hkdf<B: KeyDistributionBackend>(
    recipient: &mut Recipient,
    backend: &mut B,
    alg: i64,
    key: Option<&SymmetricKey>,
    context: Option<&KdfContext>,
) -> Result<SymmetricKey, KeyDistError> {
    let shared = key.ok_or_else(|| KeyDistError::validation("key should be set."))?;
    let context = context.ok_or_else(|| KeyDistError::validation("context should be set."))?;
    let derived = derive(recipient, backend, alg, shared.key(), context)?;
    if recipient.kid().is_none() {
        if let Some(kid) = shared.kid() {
            recipient.insert_unprotected(4, Value::Bytes(kid.to_vec()));
        }
    }
    SymmetricKey::from_bytes(context.alg(), recipient.kid(), &derived)
}

pub(super) fn extract_hkdf<B: KeyDistributionBackend>(
    recipient: &Recipient,
    backend: &mut B,
    alg: i64,
    key: &ParsedKey,
    context: Option<&KdfContext>,
) -> Result<SymmetricKey, KeyDistError> {
    let shared = as_symmetric(key)?;
    let context = context.ok_or_else(|| KeyDistError::validation("context should be set."))?;
    let derived = derive(recipient, backend, alg, shared.key(), context)?;
    SymmetricKey::from_bytes(context.alg(), recipient.kid(), &derived)
}

fn derive<B: KeyDistributionBackend>(
    recipient: &Recipient,
    backend: &mut B,
    alg: i64,
    ikm: &[u8],
    context: &KdfContext,
) -> Result<Vec<u8>, KeyDistError> {
    let info = context.to_bytes()?;
    backend
        .hkdf(
            HkdfHash::for_alg(alg),
            ikm,
            &salt(recipient, context),
            &info,
            context.key_len(),
        )
        .map_err(|_| KeyDistError::encode("Failed to derive key."))
}
