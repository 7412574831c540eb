//! The AES key wrap family (-3/-4/-5), RFC 3394 with the default IV.

use ciborium::Value;
use coset::iana;
use coset::iana::EnumI64;

use crate::backend::KeyDistributionBackend;
use crate::error::KeyDistError;
use crate::key::{ParsedKey, SymmetricKey};
use crate::recipient::{Recipient, SenderKey};

use super::as_symmetric;

pub(super) fn apply<B: KeyDistributionBackend>(
    recipient: &mut Recipient,
    backend: &mut B,
    wrap: iana::Algorithm,
    key: Option<&SymmetricKey>,
) -> Result<SymmetricKey, KeyDistError> {
    let cek = key.ok_or_else(|| KeyDistError::validation("key should be set."))?;
    let kek = match recipient.sender_key() {
        Some(SenderKey::Wrap(kek)) => kek.clone(),
        _ => return Err(KeyDistError::validation("sender_key should be set.")),
    };
    let wrapped = backend
        .aes_key_wrap(wrap, kek.key(), cek.key())
        .map_err(|_| KeyDistError::encode("Failed to wrap key."))?;
    recipient.set_ciphertext(wrapped);
    if let Some(kid) = cek.kid() {
        recipient.insert_protected(4, Value::Bytes(kid.to_vec()));
    }
    Ok(cek.clone())
}

pub(super) fn extract<B: KeyDistributionBackend>(
    recipient: &Recipient,
    backend: &mut B,
    wrap: iana::Algorithm,
    key: &ParsedKey,
    alg_hint: Option<i64>,
) -> Result<SymmetricKey, KeyDistError> {
    let kek = as_symmetric(key)?;
    if kek.alg() != wrap.to_i64() {
        return Err(KeyDistError::validation(format!(
            "Unknown alg(3) for AES key wrap: {}.",
            kek.alg()
        )));
    }
    let unwrapped = backend
        .aes_key_unwrap(wrap, kek.key(), recipient.ciphertext())
        .map_err(|_| KeyDistError::decode("Failed to unwrap key."))?;
    let alg = alg_hint.ok_or_else(|| KeyDistError::validation("alg(3) not found."))?;
    SymmetricKey::from_bytes(alg, recipient.kid(), &unwrapped)
}
