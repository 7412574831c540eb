//! Algorithm-registry helpers.
//!
//! Thin predicates and lookups over the COSE algorithm registry
//! (RFC 9053). Registered identifiers come from [`coset::iana`]; the HPKE
//! identifier used by the COSE-HPKE draft is not part of coset's registry
//! and is carried here as a crate constant.

use coset::iana;
use coset::iana::EnumI64;

use crate::error::KeyDistError;

/// Algorithm identifier for HPKE (draft-ietf-cose-hpke).
pub const ALG_HPKE: i64 = -1;

/// Algorithm identifier for direct key use.
pub const ALG_DIRECT: i64 = iana::Algorithm::Direct as i64;

/// Returns true if `alg` is a signature algorithm usable with OKP keys.
pub(crate) fn is_okp_sign_alg(alg: i64) -> bool {
    alg == iana::Algorithm::EdDSA.to_i64()
}

/// Returns true if `alg` is a signature algorithm usable with EC2 keys.
pub(crate) fn is_ec2_sign_alg(alg: i64) -> bool {
    matches!(
        iana::Algorithm::from_i64(alg),
        Some(
            iana::Algorithm::ES256
                | iana::Algorithm::ES384
                | iana::Algorithm::ES512
                | iana::Algorithm::ES256K
        )
    )
}

/// Returns true if `alg` is a signature algorithm usable with RSA keys.
pub(crate) fn is_rsa_sign_alg(alg: i64) -> bool {
    matches!(
        iana::Algorithm::from_i64(alg),
        Some(
            iana::Algorithm::RS256
                | iana::Algorithm::RS384
                | iana::Algorithm::RS512
                | iana::Algorithm::PS256
                | iana::Algorithm::PS384
                | iana::Algorithm::PS512
        )
    )
}

/// Returns true if `alg` is an ECDH algorithm that derives the content key
/// directly through HKDF.
pub(crate) fn is_ecdh_hkdf_alg(alg: i64) -> bool {
    matches!(
        iana::Algorithm::from_i64(alg),
        Some(
            iana::Algorithm::ECDH_ES_HKDF_256
                | iana::Algorithm::ECDH_ES_HKDF_512
                | iana::Algorithm::ECDH_SS_HKDF_256
                | iana::Algorithm::ECDH_SS_HKDF_512
        )
    )
}

/// Returns true if `alg` is an ECDH algorithm that wraps a separately
/// generated content key.
pub(crate) fn is_ecdh_wrap_alg(alg: i64) -> bool {
    matches!(
        iana::Algorithm::from_i64(alg),
        Some(
            iana::Algorithm::ECDH_ES_A128KW
                | iana::Algorithm::ECDH_ES_A192KW
                | iana::Algorithm::ECDH_ES_A256KW
                | iana::Algorithm::ECDH_SS_A128KW
                | iana::Algorithm::ECDH_SS_A192KW
                | iana::Algorithm::ECDH_SS_A256KW
        )
    )
}

/// Returns true if `alg` is any registered key-agreement algorithm.
pub(crate) fn is_key_agreement_alg(alg: i64) -> bool {
    is_ecdh_hkdf_alg(alg) || is_ecdh_wrap_alg(alg)
}

/// Returns true if `alg` is an ephemeral-static (ES) key-agreement
/// algorithm, which requires a freshly generated sender key per message.
pub(crate) fn is_ecdh_es_alg(alg: i64) -> bool {
    matches!(
        iana::Algorithm::from_i64(alg),
        Some(
            iana::Algorithm::ECDH_ES_HKDF_256
                | iana::Algorithm::ECDH_ES_HKDF_512
                | iana::Algorithm::ECDH_ES_A128KW
                | iana::Algorithm::ECDH_ES_A192KW
                | iana::Algorithm::ECDH_ES_A256KW
        )
    )
}

/// Returns true if `alg` is an AES key wrap algorithm.
pub(crate) fn is_aes_kw_alg(alg: i64) -> bool {
    matches!(
        iana::Algorithm::from_i64(alg),
        Some(iana::Algorithm::A128KW | iana::Algorithm::A192KW | iana::Algorithm::A256KW)
    )
}

/// Returns true if `alg` is a MAC algorithm.
pub(crate) fn is_mac_alg(alg: i64) -> bool {
    matches!(
        iana::Algorithm::from_i64(alg),
        Some(
            iana::Algorithm::HMAC_256_64
                | iana::Algorithm::HMAC_256_256
                | iana::Algorithm::HMAC_384_384
                | iana::Algorithm::HMAC_512_512
                | iana::Algorithm::AES_MAC_128_64
                | iana::Algorithm::AES_MAC_256_64
                | iana::Algorithm::AES_MAC_128_128
                | iana::Algorithm::AES_MAC_256_128
        )
    )
}

/// Returns true if `alg` is a content-encryption algorithm.
pub(crate) fn is_cek_alg(alg: i64) -> bool {
    matches!(
        iana::Algorithm::from_i64(alg),
        Some(
            iana::Algorithm::A128GCM
                | iana::Algorithm::A192GCM
                | iana::Algorithm::A256GCM
                | iana::Algorithm::AES_CCM_16_64_128
                | iana::Algorithm::AES_CCM_16_64_256
                | iana::Algorithm::AES_CCM_64_64_128
                | iana::Algorithm::AES_CCM_64_64_256
                | iana::Algorithm::AES_CCM_16_128_128
                | iana::Algorithm::AES_CCM_16_128_256
                | iana::Algorithm::AES_CCM_64_128_128
                | iana::Algorithm::AES_CCM_64_128_256
                | iana::Algorithm::ChaCha20Poly1305
        )
    )
}

/// Determines the key size in bytes that a symmetric key for the given
/// algorithm must have.
pub(crate) fn symmetric_key_size(alg: i64) -> Result<usize, KeyDistError> {
    match iana::Algorithm::from_i64(alg) {
        Some(
            iana::Algorithm::A128GCM
            | iana::Algorithm::AES_CCM_16_64_128
            | iana::Algorithm::AES_CCM_64_64_128
            | iana::Algorithm::AES_CCM_16_128_128
            | iana::Algorithm::AES_CCM_64_128_128
            | iana::Algorithm::AES_MAC_128_64
            | iana::Algorithm::AES_MAC_128_128
            | iana::Algorithm::A128KW,
        ) => Ok(16),
        Some(iana::Algorithm::A192GCM | iana::Algorithm::A192KW) => Ok(24),
        Some(
            iana::Algorithm::A256GCM
            | iana::Algorithm::AES_CCM_16_64_256
            | iana::Algorithm::AES_CCM_64_64_256
            | iana::Algorithm::AES_CCM_16_128_256
            | iana::Algorithm::AES_CCM_64_128_256
            | iana::Algorithm::AES_MAC_256_64
            | iana::Algorithm::AES_MAC_256_128
            | iana::Algorithm::A256KW
            | iana::Algorithm::ChaCha20Poly1305
            | iana::Algorithm::HMAC_256_256
            | iana::Algorithm::HMAC_256_64,
        ) => Ok(32),
        Some(iana::Algorithm::HMAC_384_384) => Ok(48),
        Some(iana::Algorithm::HMAC_512_512) => Ok(64),
        _ => Err(KeyDistError::validation(format!(
            "Unsupported or unknown algorithm: {alg}."
        ))),
    }
}

/// Maps a JWK/JOSE-style algorithm name to its registered identifier.
pub(crate) fn alg_from_name(name: &str) -> Option<i64> {
    let alg = match name {
        "direct" => iana::Algorithm::Direct,
        "EdDSA" => iana::Algorithm::EdDSA,
        "ES256" => iana::Algorithm::ES256,
        "ES384" => iana::Algorithm::ES384,
        "ES512" => iana::Algorithm::ES512,
        "ES256K" => iana::Algorithm::ES256K,
        "RS256" => iana::Algorithm::RS256,
        "RS384" => iana::Algorithm::RS384,
        "RS512" => iana::Algorithm::RS512,
        "PS256" => iana::Algorithm::PS256,
        "PS384" => iana::Algorithm::PS384,
        "PS512" => iana::Algorithm::PS512,
        "HS256" => iana::Algorithm::HMAC_256_256,
        "HS384" => iana::Algorithm::HMAC_384_384,
        "HS512" => iana::Algorithm::HMAC_512_512,
        "A128GCM" => iana::Algorithm::A128GCM,
        "A192GCM" => iana::Algorithm::A192GCM,
        "A256GCM" => iana::Algorithm::A256GCM,
        "AES-CCM-16-64-128" => iana::Algorithm::AES_CCM_16_64_128,
        "AES-CCM-16-64-256" => iana::Algorithm::AES_CCM_16_64_256,
        "AES-CCM-64-64-128" => iana::Algorithm::AES_CCM_64_64_128,
        "AES-CCM-64-64-256" => iana::Algorithm::AES_CCM_64_64_256,
        "ChaCha20/Poly1305" => iana::Algorithm::ChaCha20Poly1305,
        "A128KW" => iana::Algorithm::A128KW,
        "A192KW" => iana::Algorithm::A192KW,
        "A256KW" => iana::Algorithm::A256KW,
        "direct+HKDF-SHA-256" => iana::Algorithm::Direct_HKDF_SHA_256,
        "direct+HKDF-SHA-512" => iana::Algorithm::Direct_HKDF_SHA_512,
        "ECDH-ES+HKDF-256" => iana::Algorithm::ECDH_ES_HKDF_256,
        "ECDH-ES+HKDF-512" => iana::Algorithm::ECDH_ES_HKDF_512,
        "ECDH-SS+HKDF-256" => iana::Algorithm::ECDH_SS_HKDF_256,
        "ECDH-SS+HKDF-512" => iana::Algorithm::ECDH_SS_HKDF_512,
        "ECDH-ES+A128KW" => iana::Algorithm::ECDH_ES_A128KW,
        "ECDH-ES+A192KW" => iana::Algorithm::ECDH_ES_A192KW,
        "ECDH-ES+A256KW" => iana::Algorithm::ECDH_ES_A256KW,
        "ECDH-SS+A128KW" => iana::Algorithm::ECDH_SS_A128KW,
        "ECDH-SS+A192KW" => iana::Algorithm::ECDH_SS_A192KW,
        "ECDH-SS+A256KW" => iana::Algorithm::ECDH_SS_A256KW,
        "HPKE" => return Some(ALG_HPKE),
        _ => return None,
    };
    Some(alg.to_i64())
}
