//! The ECDH key-agreement families: direct HKDF output (-25..-28) and
//! HKDF-derived KEK with AES key wrap (-29..-34).

use ciborium::Value;
use coset::iana;
use coset::iana::EnumI64;

use crate::algs as alg_ids;
use crate::backend::{HkdfHash, KeyDistributionBackend};
use crate::cbor;
use crate::error::KeyDistError;
use crate::kdf::KdfContext;
use crate::key::{OkpKey, ParsedKey, SymmetricKey};
use crate::recipient::{Recipient, SenderKey};

use super::{as_okp, direct};

/// Runs the sender-side agreement: an ES variant generates an ephemeral
/// pair and announces its public half, an SS variant uses the static
/// sender key and announces that instead. Returns the raw shared secret.
fn sender_agreement<B: KeyDistributionBackend>(
    recipient: &mut Recipient,
    backend: &mut B,
    alg: i64,
    peer: &OkpKey,
) -> Result<Vec<u8>, KeyDistError> {
    let peer_x = peer
        .x()
        .ok_or_else(|| KeyDistError::validation("x(-2) not found."))?;
    if alg_ids::is_ecdh_es_alg(alg) {
        let (d, x) = backend.ecdh_keypair(peer.crv())?;
        let mut ephemeral = cbor::LabelMap::new();
        ephemeral.insert(1, Value::Integer(iana::KeyType::OKP.to_i64().into()));
        ephemeral.insert(-1, Value::Integer(peer.crv().to_i64().into()));
        ephemeral.insert(-2, Value::Bytes(x));
        recipient.insert_unprotected(
            iana::HeaderAlgorithmParameter::EphemeralKey.to_i64(),
            cbor::map_to_value(&ephemeral),
        );
        backend.ecdh(peer.crv(), &d, peer_x)
    } else {
        let own = match recipient.sender_key() {
            Some(SenderKey::Agreement(own)) => own.clone(),
            _ => return Err(KeyDistError::validation("sender_key should be set.")),
        };
        let d = own.d().ok_or_else(|| {
            KeyDistError::validation("Public key cannot be used for key derivation.")
        })?;
        let shared = backend.ecdh(own.crv(), d, peer_x)?;
        recipient.insert_unprotected(
            iana::HeaderAlgorithmParameter::StaticKey.to_i64(),
            cbor::map_to_value(&own.to_public_map()),
        );
        Ok(shared)
    }
}

fn derive<B: KeyDistributionBackend>(
    recipient: &Recipient,
    backend: &mut B,
    alg: i64,
    shared: &[u8],
    context: &KdfContext,
) -> Result<Vec<u8>, KeyDistError> {
    let info = context.to_bytes()?;
    backend
        .hkdf(
            HkdfHash::for_alg(alg),
            shared,
            &direct::salt(recipient, context),
            &info,
            context.key_len(),
        )
        .map_err(|_| KeyDistError::encode("Failed to derive key."))
}

pub(super) fn apply_hkdf<B: KeyDistributionBackend>(
    recipient: &mut Recipient,
    backend: &mut B,
    alg: i64,
    recipient_key: Option<&OkpKey>,
    context: Option<&KdfContext>,
) -> Result<SymmetricKey, KeyDistError> {
    let peer =
        recipient_key.ok_or_else(|| KeyDistError::validation("recipient_key should be set."))?;
    let context = context.ok_or_else(|| KeyDistError::validation("context should be set."))?;
    let shared = sender_agreement(recipient, backend, alg, peer)?;
    let derived = derive(recipient, backend, alg, &shared, context)?;
    if recipient.kid().is_none() {
        if let Some(kid) = peer.kid() {
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
    let context = context.ok_or_else(|| KeyDistError::validation("context should be set."))?;
    let shared = receiver_agreement(recipient, backend, key)?;
    let derived = derive(recipient, backend, alg, &shared, context)?;
    SymmetricKey::from_bytes(context.alg(), recipient.kid(), &derived)
}

pub(super) fn apply_wrap<B: KeyDistributionBackend>(
    recipient: &mut Recipient,
    backend: &mut B,
    alg: i64,
    wrap: iana::Algorithm,
    key: Option<&SymmetricKey>,
    recipient_key: Option<&OkpKey>,
    context: Option<&KdfContext>,
) -> Result<SymmetricKey, KeyDistError> {
    let cek = key.ok_or_else(|| KeyDistError::validation("key should be set."))?;
    let peer =
        recipient_key.ok_or_else(|| KeyDistError::validation("recipient_key should be set."))?;
    let context = context.ok_or_else(|| KeyDistError::validation("context should be set."))?;
    let shared = sender_agreement(recipient, backend, alg, peer)?;
    let kek = derive(recipient, backend, alg, &shared, context)?;
    let wrapped = backend
        .aes_key_wrap(wrap, &kek, cek.key())
        .map_err(|_| KeyDistError::encode("Failed to wrap key."))?;
    recipient.set_ciphertext(wrapped);
    if recipient.kid().is_none() {
        if let Some(kid) = peer.kid() {
            recipient.insert_unprotected(4, Value::Bytes(kid.to_vec()));
        }
    }
    Ok(cek.clone())
}

pub(super) fn extract_wrap<B: KeyDistributionBackend>(
    recipient: &Recipient,
    backend: &mut B,
    alg: i64,
    wrap: iana::Algorithm,
    key: &ParsedKey,
    context: Option<&KdfContext>,
    alg_hint: Option<i64>,
) -> Result<SymmetricKey, KeyDistError> {
    let context = context.ok_or_else(|| KeyDistError::validation("context should be set."))?;
    let shared = receiver_agreement(recipient, backend, key)?;
    let kek = derive(recipient, backend, alg, &shared, context)?;
    let unwrapped = backend
        .aes_key_unwrap(wrap, &kek, recipient.ciphertext())
        .map_err(|_| KeyDistError::decode("Failed to unwrap key."))?;
    let cek_alg = alg_hint.ok_or_else(|| KeyDistError::validation("alg(3) not found."))?;
    SymmetricKey::from_bytes(cek_alg, recipient.kid(), &unwrapped)
}

/// Runs the receiver-side agreement against the sender key announced in
/// the recipient header.
fn receiver_agreement<B: KeyDistributionBackend>(
    recipient: &Recipient,
    backend: &mut B,
    key: &ParsedKey,
) -> Result<Vec<u8>, KeyDistError> {
    let own = as_okp(key)?;
    let d = own.d().ok_or_else(|| {
        KeyDistError::validation("Public key cannot be used for key derivation.")
    })?;
    let peer = recipient.peer_key()?;
    let peer_x = peer
        .x()
        .ok_or_else(|| KeyDistError::validation("x(-2) not found."))?;
    backend.ecdh(own.crv(), d, peer_x)
}
