//! The HPKE family (-1, draft-ietf-cose-hpke).

use ciborium::Value;

use crate::backend::HpkeBackend;
use crate::cbor::{self, as_bytes};
use crate::error::KeyDistError;
use crate::key::{OkpKey, ParsedKey, SymmetricKey};
use crate::recipient::{HpkeCipherSuite, Recipient, HPKE_ENC, HPKE_SENDER_INFO};

use super::as_okp;

pub(super) fn apply<B: HpkeBackend>(
    recipient: &mut Recipient,
    backend: &mut B,
    suite: &HpkeCipherSuite,
    key: Option<&SymmetricKey>,
    recipient_key: Option<&OkpKey>,
    aad: &[u8],
) -> Result<SymmetricKey, KeyDistError> {
    let cek = key.ok_or_else(|| KeyDistError::validation("key should be set."))?;
    let peer =
        recipient_key.ok_or_else(|| KeyDistError::validation("recipient_key should be set."))?;
    let peer_x = peer
        .x()
        .ok_or_else(|| KeyDistError::validation("x(-2) not found."))?;

    // The serialized protected header binds the sealed key to this
    // recipient's announced algorithm.
    let info = recipient.encoded_protected()?;
    let (enc, ciphertext) = backend.seal(suite, peer_x, &info, cek.key(), aad)?;

    // The encapsulated key rides in the sender information sub-map.
    let mut sender_info = match recipient.unprotected().get(&HPKE_SENDER_INFO) {
        Some(v) => cbor::value_to_map(v)?,
        None => cbor::LabelMap::new(),
    };
    sender_info.insert(HPKE_ENC, Value::Bytes(enc));
    recipient.insert_unprotected(HPKE_SENDER_INFO, cbor::map_to_value(&sender_info));
    recipient.set_ciphertext(ciphertext);

    if recipient.kid().is_none() {
        if let Some(kid) = peer.kid() {
            recipient.insert_unprotected(4, Value::Bytes(kid.to_vec()));
        }
    }
    Ok(cek.clone())
}

pub(super) fn extract<B: HpkeBackend>(
    recipient: &Recipient,
    backend: &mut B,
    suite: &HpkeCipherSuite,
    key: &ParsedKey,
    alg_hint: Option<i64>,
    aad: &[u8],
) -> Result<SymmetricKey, KeyDistError> {
    let own = as_okp(key)?;
    let d = own
        .d()
        .ok_or_else(|| KeyDistError::validation("d(-4) not found."))?;

    let enc = recipient
        .unprotected()
        .get(&HPKE_SENDER_INFO)
        .and_then(|v| cbor::value_to_map(v).ok())
        .and_then(|info| info.get(&HPKE_ENC).and_then(as_bytes).map(<[u8]>::to_vec))
        .ok_or_else(|| {
            KeyDistError::validation("enc(3) not found in HPKE sender information(-4).")
        })?;

    let info = recipient.encoded_protected()?;
    let plaintext = backend.open(suite, d, &enc, &info, recipient.ciphertext(), aad)?;

    let alg = alg_hint.ok_or_else(|| KeyDistError::validation("alg(3) not found."))?;
    SymmetricKey::from_bytes(alg, recipient.kid(), &plaintext)
}
