use std::collections::BTreeSet;

use ciborium::Value;
use coset::iana;
use rstest::rstest;

use super::*;
use crate::error::KeyDistError;

fn okp_map(crv: i64, x: Option<Vec<u8>>, d: Option<Vec<u8>>) -> LabelMap {
    let mut map = LabelMap::new();
    map.insert(1, Value::Integer(1.into()));
    map.insert(-1, Value::Integer(crv.into()));
    if let Some(x) = x {
        map.insert(-2, Value::Bytes(x));
    }
    if let Some(d) = d {
        map.insert(-4, Value::Bytes(d));
    }
    map
}

#[test]
fn common_params_accept_minimal_key() {
    let mut map = LabelMap::new();
    map.insert(1, Value::Integer(4.into()));
    let params = KeyParams::new(map).expect("kty alone should be enough");
    assert_eq!(params.kty(), 4);
    assert_eq!(params.kid(), None);
    assert_eq!(params.alg(), None);
    assert!(params.key_ops().is_empty());
}

#[test]
fn common_params_accept_textual_kty() {
    let mut map = LabelMap::new();
    map.insert(1, Value::Text("Symmetric".to_string()));
    assert_eq!(KeyParams::new(map).unwrap().kty(), 4);
}

#[rstest]
#[case::kty_missing(LabelMap::new(), "kty(1) not found.")]
#[case::kty_unknown_name(
    LabelMap::from([(1, Value::Text("EdDSA".to_string()))]),
    "Unknown kty: EdDSA."
)]
#[case::kty_bytes(
    LabelMap::from([(1, Value::Bytes(vec![0x01]))]),
    "kty(1) should be int or str(tstr)."
)]
#[case::kid_not_bytes(
    LabelMap::from([(1, Value::Integer(4.into())), (2, Value::Text("kid".to_string()))]),
    "kid(2) should be bytes(bstr)."
)]
#[case::alg_not_int(
    LabelMap::from([(1, Value::Integer(4.into())), (3, Value::Text("HS256".to_string()))]),
    "alg(3) should be int."
)]
#[case::key_ops_not_list(
    LabelMap::from([(1, Value::Integer(4.into())), (4, Value::Integer(1.into()))]),
    "key_ops(4) should be list."
)]
#[case::key_ops_out_of_range(
    LabelMap::from([(1, Value::Integer(4.into())), (4, Value::Array(vec![Value::Integer(11.into())]))]),
    "Unknown or not permissible key_ops(4): 11."
)]
#[case::base_iv_not_bytes(
    LabelMap::from([(1, Value::Integer(4.into())), (5, Value::Text("iv".to_string()))]),
    "Base IV(5) should be bytes(bstr)."
)]
fn common_params_reject_bad_shapes(#[case] map: LabelMap, #[case] msg: &str) {
    assert_eq!(KeyParams::new(map), Err(KeyDistError::validation(msg)));
}

#[test]
fn okp_private_signing_key_defaults() {
    let key = OkpKey::new(okp_map(6, Some(vec![0; 32]), Some(vec![0; 32]))).unwrap();
    assert_eq!(key.crv(), iana::EllipticCurve::Ed25519);
    assert_eq!(key.alg(), -8);
    assert_eq!(
        key.key_ops(),
        &BTreeSet::from([iana::KeyOperation::Sign, iana::KeyOperation::Verify])
    );
    assert!(key.is_private());
}

#[test]
fn okp_public_signing_key_defaults_to_verify() {
    let key = OkpKey::new(okp_map(6, Some(vec![0; 32]), None)).unwrap();
    assert_eq!(
        key.key_ops(),
        &BTreeSet::from([iana::KeyOperation::Verify])
    );
    assert!(!key.is_private());
}

#[test]
fn okp_x25519_private_key_defaults_to_derive_ops() {
    let mut map = okp_map(4, Some(vec![0; 32]), Some(vec![0; 32]));
    map.insert(3, Value::Integer((-25).into()));
    let key = OkpKey::new(map).unwrap();
    assert_eq!(
        key.key_ops(),
        &BTreeSet::from([
            iana::KeyOperation::DeriveKey,
            iana::KeyOperation::DeriveBits
        ])
    );
}

#[rstest]
#[case::wrong_kty(
    LabelMap::from([(1, Value::Integer(2.into())), (-1, Value::Integer(6.into()))]),
    "kty(1) should be OKP(1)."
)]
#[case::crv_missing(
    LabelMap::from([(1, Value::Integer(1.into()))]),
    "crv(-1) not found."
)]
#[case::crv_not_int(
    LabelMap::from([(1, Value::Integer(1.into())), (-1, Value::Text("Ed25519".to_string()))]),
    "crv(-1) should be int."
)]
#[case::crv_ec2(
    LabelMap::from([(1, Value::Integer(1.into())), (-1, Value::Integer(2.into()))]),
    "Unsupported or unknown crv(-1) for OKP: 2."
)]
#[case::x_not_bytes(
    LabelMap::from([(1, Value::Integer(1.into())), (-1, Value::Integer(6.into())), (-2, Value::Text("x".to_string()))]),
    "x(-2) should be bytes(bstr)."
)]
#[case::d_not_bytes(
    LabelMap::from([(1, Value::Integer(1.into())), (-1, Value::Integer(6.into())), (-4, Value::Text("d".to_string()))]),
    "d(-4) should be bytes(bstr)."
)]
fn okp_rejects_bad_shapes(#[case] map: LabelMap, #[case] msg: &str) {
    assert_eq!(OkpKey::new(map), Err(KeyDistError::validation(msg)));
}

#[rstest]
#[case::ed25519_short_x(6, 31)]
#[case::ed25519_long_x(6, 33)]
#[case::x448_wrong_x(5, 32)]
#[case::ed448_wrong_x(7, 56)]
fn okp_rejects_wrong_coordinate_length(#[case] crv: i64, #[case] len: usize) {
    assert_eq!(
        OkpKey::new(okp_map(crv, Some(vec![0; len]), None)),
        Err(KeyDistError::validation("Invalid key parameter."))
    );
}

#[test]
fn okp_x25519_requires_explicit_alg() {
    assert_eq!(
        OkpKey::new(okp_map(4, Some(vec![0; 32]), None)),
        Err(KeyDistError::validation("alg(3) not found."))
    );
}

#[test]
fn okp_private_key_must_not_mix_sign_and_derive_ops() {
    // Without an alg, the mixed ops list itself is the problem.
    let mut map = okp_map(6, Some(vec![0; 32]), Some(vec![0; 32]));
    map.insert(
        4,
        Value::Array(vec![Value::Integer(1.into()), Value::Integer(7.into())]),
    );
    assert_eq!(
        OkpKey::new(map),
        Err(KeyDistError::validation(
            "OKP private key should not be used for both signing and key derivation."
        ))
    );
}

#[test]
fn okp_x5c_accepts_single_cert_bytes() {
    let mut map = okp_map(6, Some(vec![0; 32]), None);
    map.insert(33, Value::Bytes(vec![0xde, 0xad]));
    OkpKey::new(map).unwrap();
}

#[rstest]
#[case::not_bytes_or_list(
    Value::Integer(123.into()),
    "x5c(33) should be bytes(bstr) or list."
)]
#[case::element_not_bytes(
    Value::Array(vec![Value::Text("cert".to_string())]),
    "x5c(33) should be list of bytes(bstr)."
)]
fn okp_x5c_rejects_bad_shapes(#[case] x5c: Value, #[case] msg: &str) {
    let mut map = okp_map(6, Some(vec![0; 32]), None);
    map.insert(33, x5c);
    assert_eq!(OkpKey::new(map), Err(KeyDistError::validation(msg)));
}

#[test]
fn okp_eddsa_key_must_not_claim_derive_ops() {
    let mut map = okp_map(6, Some(vec![0; 32]), Some(vec![0; 32]));
    map.insert(3, Value::Integer((-8).into()));
    map.insert(
        4,
        Value::Array(vec![Value::Integer(1.into()), Value::Integer(7.into())]),
    );
    assert_eq!(
        OkpKey::new(map),
        Err(KeyDistError::validation(
            "Signing key should not be used for key derivation."
        ))
    );
}

#[test]
fn okp_ecdh_private_key_must_not_mix_derive_and_sign_ops() {
    let mut map = okp_map(4, Some(vec![0; 32]), Some(vec![0; 32]));
    map.insert(3, Value::Integer((-25).into()));
    map.insert(
        4,
        Value::Array(vec![Value::Integer(7.into()), Value::Integer(1.into())]),
    );
    assert_eq!(
        OkpKey::new(map),
        Err(KeyDistError::validation(
            "Private key for ECDHE should not be used for signing."
        ))
    );
}

#[test]
fn okp_ecdh_public_key_must_not_declare_ops() {
    let mut map = okp_map(4, Some(vec![0; 32]), None);
    map.insert(3, Value::Integer((-25).into()));
    map.insert(4, Value::Array(vec![Value::Integer(7.into())]));
    assert_eq!(
        OkpKey::new(map),
        Err(KeyDistError::validation(
            "Public key for ECDHE should not have key_ops."
        ))
    );
}

#[test]
fn okp_public_key_must_only_verify() {
    let mut map = okp_map(6, Some(vec![0; 32]), None);
    map.insert(4, Value::Array(vec![Value::Integer(1.into())]));
    assert_eq!(
        OkpKey::new(map),
        Err(KeyDistError::validation("Invalid key_ops for public key."))
    );
}

#[test]
fn okp_hpke_key_on_signing_curve_is_rejected() {
    let mut map = okp_map(6, Some(vec![0; 32]), None);
    map.insert(3, Value::Integer((-1).into()));
    assert_eq!(
        OkpKey::new(map),
        Err(KeyDistError::validation("Invalid key_ops for HPKE."))
    );
}

#[test]
fn okp_hpke_key_on_x25519_is_accepted() {
    let mut map = okp_map(4, Some(vec![0; 32]), None);
    map.insert(3, Value::Integer((-1).into()));
    let key = OkpKey::new(map).unwrap();
    assert_eq!(key.alg(), -1);
    assert!(key.key_ops().is_empty());
}

#[test]
fn okp_rejects_signature_alg_mismatch() {
    let mut map = okp_map(6, Some(vec![0; 32]), None);
    map.insert(3, Value::Integer((-7).into()));
    assert_eq!(
        OkpKey::new(map),
        Err(KeyDistError::validation(
            "Unsupported or unknown alg(3) for OKP: -7."
        ))
    );
}

fn ec2_map(crv: i64, len: usize, private: bool) -> LabelMap {
    let mut map = LabelMap::new();
    map.insert(1, Value::Integer(2.into()));
    map.insert(-1, Value::Integer(crv.into()));
    map.insert(-2, Value::Bytes(vec![0x01; len]));
    map.insert(-3, Value::Bytes(vec![0x02; len]));
    if private {
        map.insert(-4, Value::Bytes(vec![0x03; len]));
    }
    map
}

#[rstest]
#[case::p256(1, 32, iana::Algorithm::ES256 as i64)]
#[case::p384(2, 48, iana::Algorithm::ES384 as i64)]
#[case::p521(3, 66, iana::Algorithm::ES512 as i64)]
#[case::secp256k1(8, 32, iana::Algorithm::ES256K as i64)]
fn ec2_defaults_alg_by_curve(#[case] crv: i64, #[case] len: usize, #[case] alg: i64) {
    let key = Ec2Key::new(ec2_map(crv, len, true)).unwrap();
    assert_eq!(key.alg(), alg);
    assert_eq!(
        key.key_ops(),
        &BTreeSet::from([iana::KeyOperation::Sign, iana::KeyOperation::Verify])
    );
}

#[test]
fn ec2_rejects_alg_curve_mismatch() {
    let mut map = ec2_map(1, 32, true);
    map.insert(3, Value::Integer((-35).into()));
    assert_eq!(
        Ec2Key::new(map),
        Err(KeyDistError::validation("Invalid alg(3) for crv(-1): -35."))
    );
}

#[test]
fn ec2_rejects_wrong_coordinate_length() {
    assert_eq!(
        Ec2Key::new(ec2_map(2, 32, false)),
        Err(KeyDistError::validation("Invalid key parameter."))
    );
}

#[rstest]
#[case::crv_missing(
    LabelMap::from([(1, Value::Integer(2.into()))]),
    "crv(-1) not found."
)]
#[case::okp_curve(
    LabelMap::from([(1, Value::Integer(2.into())), (-1, Value::Integer(6.into()))]),
    "Unsupported or unknown crv(-1) for EC2: 6."
)]
#[case::x_missing(
    LabelMap::from([(1, Value::Integer(2.into())), (-1, Value::Integer(1.into()))]),
    "x(-2) not found."
)]
fn ec2_rejects_bad_shapes(#[case] map: LabelMap, #[case] msg: &str) {
    assert_eq!(Ec2Key::new(map), Err(KeyDistError::validation(msg)));
}

#[test]
fn ec2_ecdh_key_gets_derive_ops() {
    let mut map = ec2_map(1, 32, true);
    map.insert(3, Value::Integer((-25).into()));
    let key = Ec2Key::new(map).unwrap();
    assert_eq!(
        key.key_ops(),
        &BTreeSet::from([
            iana::KeyOperation::DeriveKey,
            iana::KeyOperation::DeriveBits
        ])
    );
}

fn rsa_map(private: bool) -> LabelMap {
    let mut map = LabelMap::new();
    map.insert(1, Value::Integer(3.into()));
    map.insert(3, Value::Integer((-257).into()));
    map.insert(-1, Value::Bytes(vec![0x01; 256]));
    map.insert(-2, Value::Bytes(vec![0x01, 0x00, 0x01]));
    if private {
        for label in -8..=-3 {
            map.insert(label, Value::Bytes(vec![0x02; 16]));
        }
    }
    map
}

#[test]
fn rsa_public_key_is_accepted() {
    let key = RsaKey::new(rsa_map(false)).unwrap();
    assert_eq!(key.alg(), -257);
    assert!(!key.is_private());
    assert_eq!(
        key.key_ops(),
        &BTreeSet::from([iana::KeyOperation::Verify])
    );
}

#[test]
fn rsa_private_key_requires_crt_params() {
    let mut map = rsa_map(true);
    map.remove(&-4);
    assert_eq!(
        RsaKey::new(map),
        Err(KeyDistError::validation("RSA private key should have p(-4)."))
    );
}

#[rstest]
#[case::n_missing(-1, "n(-1) not found.")]
#[case::e_missing(-2, "e(-2) not found.")]
fn rsa_requires_public_params(#[case] label: i64, #[case] msg: &str) {
    let mut map = rsa_map(false);
    map.remove(&label);
    assert_eq!(RsaKey::new(map), Err(KeyDistError::validation(msg)));
}

#[test]
fn rsa_requires_alg() {
    let mut map = rsa_map(false);
    map.remove(&3);
    assert_eq!(
        RsaKey::new(map),
        Err(KeyDistError::validation("alg(3) not found."))
    );
}

#[test]
fn rsa_rejects_non_rsa_alg() {
    let mut map = rsa_map(false);
    map.insert(3, Value::Integer((-7).into()));
    assert_eq!(
        RsaKey::new(map),
        Err(KeyDistError::validation(
            "Unsupported or unknown alg(3) for RSA: -7."
        ))
    );
}

fn symmetric_map(alg: i64, len: usize) -> LabelMap {
    let mut map = LabelMap::new();
    map.insert(1, Value::Integer(4.into()));
    map.insert(3, Value::Integer(alg.into()));
    map.insert(-1, Value::Bytes(vec![0x0a; len]));
    map
}

#[rstest]
#[case::a128gcm(1, 16)]
#[case::a192gcm(2, 24)]
#[case::a256gcm(3, 32)]
#[case::chacha(24, 32)]
#[case::a128kw(-3, 16)]
#[case::a256kw(-5, 32)]
fn symmetric_accepts_exact_key_length(#[case] alg: i64, #[case] len: usize) {
    let key = SymmetricKey::new(symmetric_map(alg, len)).unwrap();
    assert_eq!(key.alg(), alg);
    assert_eq!(key.key().len(), len);
}

#[rstest]
#[case::a128gcm_long(1, 17)]
#[case::a256gcm_short(3, 16)]
#[case::a128kw_long(-3, 32)]
fn symmetric_rejects_wrong_key_length(#[case] alg: i64, #[case] len: usize) {
    assert_eq!(
        SymmetricKey::new(symmetric_map(alg, len)),
        Err(KeyDistError::validation(format!("Invalid key length: {len}.")))
    );
}

#[test]
fn symmetric_hmac_key_may_be_any_length() {
    let key = SymmetricKey::new(symmetric_map(5, 20)).unwrap();
    assert_eq!(
        key.key_ops(),
        &BTreeSet::from([
            iana::KeyOperation::MacCreate,
            iana::KeyOperation::MacVerify
        ])
    );
}

#[test]
fn symmetric_kw_key_defaults_to_wrap_ops() {
    let key = SymmetricKey::new(symmetric_map(-3, 16)).unwrap();
    assert_eq!(
        key.key_ops(),
        &BTreeSet::from([iana::KeyOperation::WrapKey, iana::KeyOperation::UnwrapKey])
    );
}

#[test]
fn symmetric_rejects_foreign_ops_for_kw_alg() {
    let mut map = symmetric_map(-3, 16);
    map.insert(4, Value::Array(vec![Value::Integer(9.into())]));
    assert_eq!(
        SymmetricKey::new(map),
        Err(KeyDistError::validation(
            "Unknown or not permissible key_ops(4): 9."
        ))
    );
}

#[test]
fn symmetric_requires_k() {
    let mut map = symmetric_map(1, 16);
    map.remove(&-1);
    assert_eq!(
        SymmetricKey::new(map),
        Err(KeyDistError::validation("k(-1) not found."))
    );
}

#[test]
fn symmetric_requires_alg() {
    let mut map = symmetric_map(1, 16);
    map.remove(&3);
    assert_eq!(
        SymmetricKey::new(map),
        Err(KeyDistError::validation("alg(3) not found."))
    );
}

#[test]
fn parsed_key_dispatches_on_kty() {
    let key = ParsedKey::from_map(symmetric_map(3, 32)).unwrap();
    assert!(matches!(key, ParsedKey::Symmetric(_)));
    let key = ParsedKey::from_map(okp_map(6, Some(vec![0; 32]), None)).unwrap();
    assert!(matches!(key, ParsedKey::Okp(_)));
}

#[test]
fn parsed_key_rejects_unregistered_kty() {
    let mut map = LabelMap::new();
    map.insert(1, Value::Integer(9.into()));
    assert_eq!(
        ParsedKey::from_map(map),
        Err(KeyDistError::validation("Unsupported or unknown kty(1): 9."))
    );
}

#[test]
fn key_map_round_trips() {
    let map = okp_map(6, Some(vec![0x11; 32]), Some(vec![0x22; 32]));
    let key = OkpKey::new(map.clone()).unwrap();
    assert_eq!(key.to_map(), map);
}

#[test]
fn jwk_symmetric_import() {
    let key = Jwk::from_json(
        r#"{"kty":"oct","kid":"our-secret","alg":"HS256",
            "k":"aGVsbG8gd29ybGQgaGVsbG8gd29ybGQgaGVsbG8hISE"}"#,
    )
    .unwrap()
    .to_key()
    .unwrap();
    assert_eq!(key.kid(), Some(b"our-secret".as_slice()));
    assert_eq!(key.alg(), Some(5));
}

#[test]
fn jwk_okp_import_maps_names() {
    let key = Jwk::from_json(
        r#"{"kty":"OKP","crv":"Ed25519","key_ops":["verify"],
            "x":"L3T3B1ljK22TpYEYiRnBBe7HM1tRFgfvhnuOsPv2YUY"}"#,
    )
    .unwrap()
    .to_key()
    .unwrap();
    let ParsedKey::Okp(okp) = key else {
        panic!("expected an OKP key");
    };
    assert_eq!(okp.crv(), iana::EllipticCurve::Ed25519);
    assert_eq!(
        okp.key_ops(),
        &BTreeSet::from([iana::KeyOperation::Verify])
    );
}

#[rstest]
#[case::unknown_alg(
    r#"{"kty":"oct","alg":"XS256","k":"AAAA"}"#,
    "Unsupported or unknown alg: XS256."
)]
#[case::unknown_crv(
    r#"{"kty":"OKP","crv":"P-512"}"#,
    "Unknown crv: P-512."
)]
#[case::unknown_kty(
    r#"{"kty":"PQC"}"#,
    "Unknown kty: PQC."
)]
fn jwk_rejects_unknown_names(#[case] json: &str, #[case] msg: &str) {
    assert_eq!(
        Jwk::from_json(json).unwrap().to_key(),
        Err(KeyDistError::decode(msg))
    );
}
