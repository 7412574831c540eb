use ciborium::Value;
use coset::iana;
use rstest::rstest;

use super::*;
use crate::backend::{CryptoBackend, HkdfHash, HpkeBackend, KeyDistributionBackend};
use crate::cbor::LabelMap;
use crate::error::KeyDistError;
use crate::kdf::{ContextJson, KdfContext, PartyInfo};
use crate::key::{ParsedKey, SymmetricKey};

/// A deterministic stand-in for the crypto backend. Wrap appends a
/// checksum over the KEK so corrupted ciphertexts are detected; the other
/// primitives are invertible XOR schemes.
struct FakeBackend;

fn kek_checksum(kek: &[u8]) -> u8 {
    kek.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

impl CryptoBackend for FakeBackend {
    fn generate_rand(&mut self, buf: &mut [u8]) -> Result<(), KeyDistError> {
        buf.fill(0x42);
        Ok(())
    }
}

impl KeyDistributionBackend for FakeBackend {
    fn aes_key_wrap(
        &mut self,
        _alg: iana::Algorithm,
        kek: &[u8],
        plaintext: &[u8],
    ) -> Result<Vec<u8>, KeyDistError> {
        let mut out: Vec<u8> = plaintext
            .iter()
            .enumerate()
            .map(|(i, b)| b ^ kek[i % kek.len()])
            .collect();
        out.push(kek_checksum(kek));
        Ok(out)
    }

    fn aes_key_unwrap(
        &mut self,
        _alg: iana::Algorithm,
        kek: &[u8],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, KeyDistError> {
        let (tag, body) = ciphertext
            .split_last()
            .ok_or_else(|| KeyDistError::decode("Failed to unwrap key."))?;
        if *tag != kek_checksum(kek) {
            return Err(KeyDistError::decode("Failed to unwrap key."));
        }
        Ok(body
            .iter()
            .enumerate()
            .map(|(i, b)| b ^ kek[i % kek.len()])
            .collect())
    }

    fn hkdf(
        &mut self,
        _hash: HkdfHash,
        ikm: &[u8],
        salt: &[u8],
        info: &[u8],
        length: usize,
    ) -> Result<Vec<u8>, KeyDistError> {
        let mix = |i: usize| {
            ikm[i % ikm.len()]
                ^ info[i % info.len()]
                ^ salt.get(i % salt.len().max(1)).copied().unwrap_or(0)
        };
        Ok((0..length).map(mix).collect())
    }

    fn ecdh(
        &mut self,
        _crv: iana::EllipticCurve,
        d: &[u8],
        peer_x: &[u8],
    ) -> Result<Vec<u8>, KeyDistError> {
        Ok(d.iter().zip(peer_x).map(|(a, b)| a ^ b).collect())
    }

    fn ecdh_keypair(
        &mut self,
        _crv: iana::EllipticCurve,
    ) -> Result<(Vec<u8>, Vec<u8>), KeyDistError> {
        Ok((vec![0x11; 32], vec![0x22; 32]))
    }
}

impl HpkeBackend for FakeBackend {
    fn seal(
        &mut self,
        _suite: &HpkeCipherSuite,
        recipient_x: &[u8],
        _info: &[u8],
        plaintext: &[u8],
        _aad: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>), KeyDistError> {
        let enc: Vec<u8> = recipient_x.iter().rev().copied().collect();
        let ct = plaintext.iter().map(|b| b ^ 0xaa).collect();
        Ok((enc, ct))
    }

    fn open(
        &mut self,
        _suite: &HpkeCipherSuite,
        _d: &[u8],
        _enc: &[u8],
        _info: &[u8],
        ciphertext: &[u8],
        _aad: &[u8],
    ) -> Result<Vec<u8>, KeyDistError> {
        Ok(ciphertext.iter().map(|b| b ^ 0xaa).collect())
    }
}

fn unprotected_with_alg(alg: i64) -> LabelMap {
    LabelMap::from([(1, Value::Integer(alg.into()))])
}

fn hpke_sender_info() -> Value {
    Value::Map(vec![
        (Value::Integer(1.into()), Value::Integer(0x0020.into())),
        (Value::Integer(5.into()), Value::Integer(1.into())),
        (Value::Integer(2.into()), Value::Integer(1.into())),
    ])
}

#[test]
fn direct_recipient_round_trips() {
    let recipient = Recipient::direct(Some(b"our-secret")).unwrap();
    assert_eq!(recipient.alg(), -6);
    assert_eq!(recipient.kid(), Some(b"our-secret".as_slice()));
    let listed = recipient.to_list().unwrap();
    let reparsed = Recipient::from_list(&listed).unwrap();
    assert_eq!(reparsed, recipient);
}

#[test]
fn empty_protected_map_encodes_as_zero_length_bytes() {
    let recipient = Recipient::direct(None).unwrap();
    let listed = recipient.to_list().unwrap();
    assert_eq!(listed.as_array().unwrap()[0], Value::Bytes(vec![]));
}

#[test]
fn protected_alg_wins_over_unprotected() {
    let protected = unprotected_with_alg(-3);
    let unprotected = unprotected_with_alg(-4);
    let recipient =
        Recipient::new(protected, unprotected, vec![0x01], Vec::new(), None).unwrap();
    assert_eq!(recipient.alg(), -3);
}

#[test]
fn absent_alg_resolves_to_unspecified() {
    let recipient =
        Recipient::new(LabelMap::new(), LabelMap::new(), Vec::new(), Vec::new(), None).unwrap();
    assert_eq!(recipient.alg(), 0);
    assert_eq!(recipient.alg_family(), &RecipientAlg::Unspecified);
}

#[test]
fn unspecified_recipient_cannot_extract() {
    let recipient =
        Recipient::new(LabelMap::new(), LabelMap::new(), Vec::new(), Vec::new(), None).unwrap();
    let key = ParsedKey::Symmetric(SymmetricKey::from_bytes(3, None, &[0x0a; 32]).unwrap());
    assert_eq!(
        recipient.extract(&mut FakeBackend, &key, None, None, &[]),
        Err(KeyDistError::validation("alg(1) not found."))
    );
}

#[rstest]
#[case::nonempty_protected(
    unprotected_with_alg(-6),
    LabelMap::new(),
    vec![],
    "protected header should be empty."
)]
#[case::nonempty_ciphertext(
    LabelMap::new(),
    unprotected_with_alg(-6),
    vec![0x01],
    "ciphertext should be zero-length bytes."
)]
fn direct_constraints(
    #[case] protected: LabelMap,
    #[case] unprotected: LabelMap,
    #[case] ciphertext: Vec<u8>,
    #[case] msg: &str,
) {
    let unprotected = if unprotected.is_empty() {
        unprotected_with_alg(-6)
    } else {
        unprotected
    };
    assert_eq!(
        Recipient::new(protected, unprotected, ciphertext, Vec::new(), None),
        Err(KeyDistError::validation(msg))
    );
}

#[test]
fn direct_rejects_children() {
    let child = Recipient::direct(None).unwrap();
    assert_eq!(
        Recipient::new(
            LabelMap::new(),
            unprotected_with_alg(-6),
            Vec::new(),
            vec![child],
            None
        ),
        Err(KeyDistError::validation("recipients should be absent."))
    );
}

#[test]
fn unregistered_alg_is_a_hard_failure() {
    assert_eq!(
        Recipient::new(
            LabelMap::new(),
            unprotected_with_alg(-999),
            Vec::new(),
            Vec::new(),
            None
        ),
        Err(KeyDistError::validation("Unsupported or unknown alg(1): -999."))
    );
}

#[rstest]
#[case::protected_alg_text(
    LabelMap::from([(1, Value::Text("A128KW".to_string()))]),
    LabelMap::new(),
    "protected[1](alg) should be int."
)]
#[case::unprotected_alg_text(
    LabelMap::new(),
    LabelMap::from([(1, Value::Text("A128KW".to_string()))]),
    "unprotected[1](alg) should be int."
)]
#[case::kid_text(
    LabelMap::new(),
    LabelMap::from([(1, Value::Integer((-3).into())), (4, Value::Text("k".to_string()))]),
    "unprotected[4](kid) should be bytes."
)]
#[case::iv_text(
    LabelMap::new(),
    LabelMap::from([(1, Value::Integer((-3).into())), (5, Value::Text("iv".to_string()))]),
    "unprotected[5](iv) should be bytes."
)]
fn header_shape_errors(
    #[case] protected: LabelMap,
    #[case] unprotected: LabelMap,
    #[case] msg: &str,
) {
    assert_eq!(
        Recipient::new(protected, unprotected, vec![0x01], Vec::new(), None),
        Err(KeyDistError::validation(msg))
    );
}

#[rstest]
#[case::not_an_array(Value::Integer(1.into()))]
#[case::too_short(Value::Array(vec![Value::Bytes(vec![]), Value::Map(vec![])]))]
#[case::protected_not_bytes(Value::Array(vec![
    Value::Map(vec![]),
    Value::Map(vec![]),
    Value::Bytes(vec![]),
]))]
#[case::ciphertext_not_bytes(Value::Array(vec![
    Value::Bytes(vec![]),
    Value::Map(vec![]),
    Value::Text("ct".to_string()),
]))]
#[case::children_not_array(Value::Array(vec![
    Value::Bytes(vec![]),
    Value::Map(vec![]),
    Value::Bytes(vec![]),
    Value::Integer(1.into()),
]))]
fn from_list_rejects_malformed_arrays(#[case] value: Value) {
    assert_eq!(
        Recipient::from_list(&value),
        Err(KeyDistError::decode("Invalid recipient format."))
    );
}

#[test]
fn nested_recipients_parse_recursively() {
    let leaf = Value::Array(vec![
        Value::Bytes(vec![]),
        Value::Map(vec![(Value::Integer(1.into()), Value::Integer((-6).into()))]),
        Value::Bytes(vec![]),
    ]);
    let parent = Value::Array(vec![
        Value::Bytes(vec![]),
        Value::Map(vec![(Value::Integer(1.into()), Value::Integer((-3).into()))]),
        Value::Bytes(vec![0x01]),
        Value::Array(vec![leaf]),
    ]);
    let recipient = Recipient::from_list(&parent).unwrap();
    assert_eq!(recipient.children().len(), 1);
    assert_eq!(recipient.children()[0].alg(), -6);
    assert_eq!(Recipient::from_list(&recipient.to_list().unwrap()).unwrap(), recipient);
}

#[test]
fn aes_kw_wrap_then_unwrap_round_trips() {
    let kek = SymmetricKey::from_bytes(-3, Some(b"our-secret"), &[0x0b; 16]).unwrap();
    let cek = SymmetricKey::from_bytes(1, Some(b"cek-1"), &[0x0c; 16]).unwrap();
    let mut recipient = Recipient::new(
        LabelMap::new(),
        unprotected_with_alg(-3),
        Vec::new(),
        Vec::new(),
        Some(SenderKey::Wrap(kek.clone())),
    )
    .unwrap();

    let applied = recipient
        .apply(&mut FakeBackend, Some(&cek), None, None, &[])
        .unwrap();
    assert_eq!(applied.key(), cek.key());
    assert!(!recipient.ciphertext().is_empty());
    // The sender announced the wrapped key's kid.
    assert_eq!(recipient.kid(), Some(b"cek-1".as_slice()));

    let extracted = recipient
        .extract(&mut FakeBackend, &ParsedKey::Symmetric(kek), None, Some(1), &[])
        .unwrap();
    assert_eq!(extracted.key(), cek.key());
    assert_eq!(extracted.alg(), 1);
    assert_eq!(extracted.kid(), Some(b"cek-1".as_slice()));
}

#[test]
fn aes_kw_unwrap_fails_on_corrupted_ciphertext() {
    let kek = SymmetricKey::from_bytes(-3, None, &[0x0b; 16]).unwrap();
    let cek = SymmetricKey::from_bytes(1, None, &[0x0c; 16]).unwrap();
    let mut recipient = Recipient::new(
        LabelMap::new(),
        unprotected_with_alg(-3),
        Vec::new(),
        Vec::new(),
        Some(SenderKey::Wrap(kek.clone())),
    )
    .unwrap();
    recipient
        .apply(&mut FakeBackend, Some(&cek), None, None, &[])
        .unwrap();

    let mut corrupted = recipient.ciphertext().to_vec();
    *corrupted.last_mut().unwrap() ^= 0x01;
    let tampered = Recipient::new(
        LabelMap::new(),
        unprotected_with_alg(-3),
        corrupted,
        Vec::new(),
        None,
    )
    .unwrap();
    assert_eq!(
        tampered.extract(&mut FakeBackend, &ParsedKey::Symmetric(kek), None, Some(1), &[]),
        Err(KeyDistError::decode("Failed to unwrap key."))
    );
}

#[test]
fn aes_kw_rejects_mismatched_sender_key_alg() {
    let kek = SymmetricKey::from_bytes(-5, None, &[0x0b; 32]).unwrap();
    assert_eq!(
        Recipient::new(
            LabelMap::new(),
            unprotected_with_alg(-3),
            Vec::new(),
            Vec::new(),
            Some(SenderKey::Wrap(kek)),
        ),
        Err(KeyDistError::validation("Unknown alg(3) for AES key wrap: -5."))
    );
}

#[test]
fn direct_hkdf_derives_key_of_context_length() {
    let context = KdfContext::new(
        1,
        PartyInfo::default(),
        PartyInfo::default(),
        vec![0xa1, 0x01, 0x29],
    )
    .unwrap();
    let shared = SymmetricKey::from_bytes(-10, Some(b"shared"), &[0x0d; 32]).unwrap();
    let mut recipient = Recipient::new(
        LabelMap::new(),
        unprotected_with_alg(-10),
        Vec::new(),
        Vec::new(),
        None,
    )
    .unwrap();
    let cek = recipient
        .apply(&mut FakeBackend, Some(&shared), None, Some(&context), &[])
        .unwrap();
    assert_eq!(cek.key().len(), 16);
    assert_eq!(cek.alg(), 1);
    // The sender announced the shared key's kid.
    assert_eq!(recipient.kid(), Some(b"shared".as_slice()));

    let extracted = recipient
        .extract(
            &mut FakeBackend,
            &ParsedKey::Symmetric(shared),
            Some(&context),
            None,
            &[],
        )
        .unwrap();
    assert_eq!(extracted.key(), cek.key());
}

#[test]
fn direct_hkdf_requires_context() {
    let shared = SymmetricKey::from_bytes(-10, None, &[0x0d; 32]).unwrap();
    let mut recipient = Recipient::new(
        LabelMap::new(),
        unprotected_with_alg(-10),
        Vec::new(),
        Vec::new(),
        None,
    )
    .unwrap();
    assert_eq!(
        recipient.apply(&mut FakeBackend, Some(&shared), None, None, &[]),
        Err(KeyDistError::validation("context should be set."))
    );
}

#[test]
fn ecdh_es_apply_announces_ephemeral_key() {
    let peer = crate::key::OkpKey::new(LabelMap::from([
        (1, Value::Integer(1.into())),
        (3, Value::Integer((-25).into())),
        (-1, Value::Integer(4.into())),
        (-2, Value::Bytes(vec![0x33; 32])),
    ]))
    .unwrap();
    let context = KdfContext::new(
        1,
        PartyInfo::default(),
        PartyInfo::default(),
        vec![0xa1, 0x01, 0x38, 0x18],
    )
    .unwrap();
    let mut recipient = Recipient::new(
        LabelMap::new(),
        unprotected_with_alg(-25),
        Vec::new(),
        Vec::new(),
        None,
    )
    .unwrap();
    let cek = recipient
        .apply(&mut FakeBackend, None, Some(&peer), Some(&context), &[])
        .unwrap();
    assert_eq!(cek.key().len(), 16);
    let ephemeral = recipient.peer_key().unwrap();
    assert_eq!(ephemeral.crv(), iana::EllipticCurve::X25519);
    assert_eq!(ephemeral.x(), Some([0x22; 32].as_slice()));
}

#[test]
fn hpke_recipient_requires_sender_info() {
    assert_eq!(
        Recipient::new(
            LabelMap::new(),
            unprotected_with_alg(-1),
            Vec::new(),
            Vec::new(),
            None
        ),
        Err(KeyDistError::validation(
            "HPKE sender information(-4) not found."
        ))
    );
}

#[rstest]
#[case::kem_missing(vec![(5, 1), (2, 1)], "kem id(1) not found in HPKE sender information(-4).")]
#[case::kdf_missing(vec![(1, 0x0020), (2, 1)], "kdf id(5) not found in HPKE sender information(-4).")]
#[case::aead_missing(vec![(1, 0x0020), (5, 1)], "aead id(2) not found in HPKE sender information(-4).")]
fn hpke_sender_info_requires_all_ids(#[case] fields: Vec<(i64, i64)>, #[case] msg: &str) {
    let info = Value::Map(
        fields
            .into_iter()
            .map(|(k, v)| (Value::Integer(k.into()), Value::Integer(v.into())))
            .collect(),
    );
    let mut unprotected = unprotected_with_alg(-1);
    unprotected.insert(-4, info);
    assert_eq!(
        Recipient::new(LabelMap::new(), unprotected, Vec::new(), Vec::new(), None),
        Err(KeyDistError::validation(msg))
    );
}

#[rstest]
#[case::kem(0x9999, 1, 1, "Unsupported or unknown KEM id: 39321.")]
#[case::kdf(0x0020, 9, 1, "Unsupported or unknown KDF id: 9.")]
#[case::aead(0x0020, 1, 9, "Unsupported or unknown AEAD id: 9.")]
fn hpke_suite_rejects_unknown_ids(
    #[case] kem: u16,
    #[case] kdf: u16,
    #[case] aead: u16,
    #[case] msg: &str,
) {
    assert_eq!(
        HpkeCipherSuite::new(kem, kdf, aead),
        Err(KeyDistError::validation(msg))
    );
}

#[test]
fn hpke_seal_stores_enc_and_open_recovers() {
    let recipient_key = crate::key::OkpKey::new(LabelMap::from([
        (1, Value::Integer(1.into())),
        (3, Value::Integer((-1).into())),
        (-1, Value::Integer(4.into())),
        (-2, Value::Bytes(vec![0x44; 32])),
    ]))
    .unwrap();
    let own_key = crate::key::OkpKey::new(LabelMap::from([
        (1, Value::Integer(1.into())),
        (3, Value::Integer((-1).into())),
        (-1, Value::Integer(4.into())),
        (-2, Value::Bytes(vec![0x44; 32])),
        (-4, Value::Bytes(vec![0x55; 32])),
    ]))
    .unwrap();
    let cek = SymmetricKey::from_bytes(1, None, &[0x0e; 16]).unwrap();

    let mut unprotected = unprotected_with_alg(-1);
    unprotected.insert(-4, hpke_sender_info());
    let mut recipient =
        Recipient::new(LabelMap::new(), unprotected, Vec::new(), Vec::new(), None).unwrap();

    recipient
        .apply(&mut FakeBackend, Some(&cek), Some(&recipient_key), None, &[])
        .unwrap();
    assert!(!recipient.ciphertext().is_empty());

    let extracted = recipient
        .extract(
            &mut FakeBackend,
            &ParsedKey::Okp(own_key),
            None,
            Some(1),
            &[],
        )
        .unwrap();
    assert_eq!(extracted.key(), cek.key());
}

#[test]
fn resolver_matches_direct_recipient_by_kid() {
    let recipients = Recipients::new(vec![Recipient::direct(Some(b"k1")).unwrap()]);
    let keys = vec![
        ParsedKey::Symmetric(SymmetricKey::from_bytes(5, Some(b"k1"), &[0x01; 32]).unwrap()),
        ParsedKey::Symmetric(SymmetricKey::from_bytes(5, Some(b"k2"), &[0x02; 32]).unwrap()),
    ];
    let resolved = recipients
        .derive_key(&mut FakeBackend, Some(&keys), None, None)
        .unwrap();
    assert_eq!(resolved.kid(), Some(b"k1".as_slice()));
    assert_eq!(resolved.key(), &[0x01; 32]);
}

#[test]
fn resolver_fails_without_matching_kid() {
    let recipients = Recipients::new(vec![Recipient::direct(Some(b"k9")).unwrap()]);
    let keys = vec![ParsedKey::Symmetric(
        SymmetricKey::from_bytes(5, Some(b"k1"), &[0x01; 32]).unwrap(),
    )];
    assert_eq!(
        recipients.derive_key(&mut FakeBackend, Some(&keys), None, None),
        Err(KeyDistError::validation("Failed to derive a key."))
    );
}

#[test]
fn resolver_requires_keys_or_materials() {
    let recipients = Recipients::new(vec![Recipient::direct(Some(b"k1")).unwrap()]);
    assert_eq!(
        recipients.derive_key(&mut FakeBackend, None, None, None),
        Err(KeyDistError::validation(
            "Either keys or materials should be specified."
        ))
    );
}

#[test]
fn resolver_derives_through_material_context() {
    let mut unprotected = unprotected_with_alg(-10);
    unprotected.insert(4, Value::Bytes(b"dh-key".to_vec()));
    let recipient =
        Recipient::new(LabelMap::new(), unprotected, Vec::new(), Vec::new(), None).unwrap();
    let recipients = Recipients::new(vec![recipient]);

    let context: ContextJson = serde_json::from_str(
        r#"{"alg":"A128GCM","party_u":{"identity":"sender"},"party_v":{"identity":"receiver"}}"#,
    )
    .unwrap();
    let materials = vec![KeyMaterial {
        kid: "dh-key".to_string(),
        value: "aGVsbG8gd29ybGQgaGVsbG8gd29ybGQ".to_string(),
        context,
    }];
    let resolved = recipients
        .derive_key(&mut FakeBackend, None, Some(&materials), None)
        .unwrap();
    assert_eq!(resolved.alg(), 1);
    assert_eq!(resolved.key().len(), 16);
}

#[test]
fn resolver_material_without_alg_inherits_hint() {
    let mut unprotected = unprotected_with_alg(-10);
    unprotected.insert(4, Value::Bytes(b"dh-key".to_vec()));
    let recipient =
        Recipient::new(LabelMap::new(), unprotected, Vec::new(), Vec::new(), None).unwrap();
    let recipients = Recipients::new(vec![recipient]);

    let context: ContextJson =
        serde_json::from_str(r#"{"party_u":{"identity":"sender"}}"#).unwrap();
    let materials = vec![KeyMaterial {
        kid: "dh-key".to_string(),
        value: "aGVsbG8gd29ybGQgaGVsbG8gd29ybGQ".to_string(),
        context,
    }];

    assert_eq!(
        recipients.derive_key(&mut FakeBackend, None, Some(&materials), None),
        Err(KeyDistError::validation(
            "Unsupported or unknown algorithm: 0."
        ))
    );
    let resolved = recipients
        .derive_key(&mut FakeBackend, None, Some(&materials), Some(3))
        .unwrap();
    assert_eq!(resolved.alg(), 3);
    assert_eq!(resolved.key().len(), 32);
}
