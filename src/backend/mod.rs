/*
 * Copyright (c) 2024-2025 The NAMIB Project Developers.
 * Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
 * https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
 * <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
 * option. This file may not be copied, modified, or distributed
 * except according to those terms.
 *
 * SPDX-License-Identifier: MIT OR Apache-2.0
 */

//! Capability interfaces for the cryptographic primitives this crate
//! orchestrates.
//!
//! The validation and recipient-construction logic never implements a
//! primitive itself; it calls one of the traits defined here. A
//! RustCrypto-based implementation of all traits is provided in
//! [`rustcrypto`] behind the `rustcrypto` feature.

#[cfg(feature = "rustcrypto")]
pub mod rustcrypto;

use coset::iana;

use crate::error::KeyDistError;
use crate::recipient::HpkeCipherSuite;

/// The hash function variant used for HKDF derivations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HkdfHash {
    Sha256,
    Sha512,
}

impl HkdfHash {
    /// Selects the HKDF hash implied by a COSE HKDF/ECDH algorithm
    /// identifier. Algorithms outside the HKDF families default to SHA-256.
    pub fn for_alg(alg: i64) -> HkdfHash {
        use coset::iana::EnumI64;
        match iana::Algorithm::from_i64(alg) {
            Some(
                iana::Algorithm::Direct_HKDF_SHA_512
                | iana::Algorithm::ECDH_ES_HKDF_512
                | iana::Algorithm::ECDH_SS_HKDF_512,
            ) => HkdfHash::Sha512,
            _ => HkdfHash::Sha256,
        }
    }
}

/// Base trait for cryptographic backends.
pub trait CryptoBackend {
    /// Fills `buf` with cryptographically secure random bytes.
    fn generate_rand(&mut self, buf: &mut [u8]) -> Result<(), KeyDistError>;
}

/// Backend operations required for COSE key-distribution algorithms
/// (AES key wrap, HKDF and Diffie-Hellman key agreement).
pub trait KeyDistributionBackend: CryptoBackend {
    /// Wraps `plaintext` (a key) under `kek` using the AES key wrap variant
    /// given as `alg` (RFC 3394, default IV).
    fn aes_key_wrap(
        &mut self,
        alg: iana::Algorithm,
        kek: &[u8],
        plaintext: &[u8],
    ) -> Result<Vec<u8>, KeyDistError>;

    /// Unwraps `ciphertext` under `kek` using the AES key wrap variant
    /// given as `alg`. Integrity failures surface as decode errors.
    fn aes_key_unwrap(
        &mut self,
        alg: iana::Algorithm,
        kek: &[u8],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, KeyDistError>;

    /// Runs HKDF with the given hash over `ikm`, producing `length` bytes.
    fn hkdf(
        &mut self,
        hash: HkdfHash,
        ikm: &[u8],
        salt: &[u8],
        info: &[u8],
        length: usize,
    ) -> Result<Vec<u8>, KeyDistError>;

    /// Performs a Diffie-Hellman exchange on `crv` between the private
    /// scalar `d` and the peer public coordinate `peer_x`.
    fn ecdh(
        &mut self,
        crv: iana::EllipticCurve,
        d: &[u8],
        peer_x: &[u8],
    ) -> Result<Vec<u8>, KeyDistError>;

    /// Generates a fresh key pair on `crv`, returning `(d, x)`.
    fn ecdh_keypair(
        &mut self,
        crv: iana::EllipticCurve,
    ) -> Result<(Vec<u8>, Vec<u8>), KeyDistError>;
}

/// Backend operations for signature creation and verification.
pub trait SignBackend: CryptoBackend {
    /// Signs `msg` with the private key `d` on `crv`.
    fn sign(
        &mut self,
        crv: iana::EllipticCurve,
        d: &[u8],
        msg: &[u8],
    ) -> Result<Vec<u8>, KeyDistError>;

    /// Verifies `sig` over `msg` against the public key `x` on `crv`.
    ///
    /// A failed check must surface as a [`KeyDistError::Verify`] so callers
    /// can distinguish "authentication failed" from "malformed input".
    fn verify(
        &mut self,
        crv: iana::EllipticCurve,
        x: &[u8],
        msg: &[u8],
        sig: &[u8],
    ) -> Result<(), KeyDistError>;
}

/// Backend operations for HPKE sealing and opening.
pub trait HpkeBackend: CryptoBackend {
    /// Seals `plaintext` to the recipient public key `recipient_x` under
    /// the given cipher suite, returning the encapsulated key and the
    /// ciphertext.
    fn seal(
        &mut self,
        suite: &HpkeCipherSuite,
        recipient_x: &[u8],
        info: &[u8],
        plaintext: &[u8],
        aad: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>), KeyDistError>;

    /// Opens `ciphertext` with the recipient private key `d` and the
    /// encapsulated key `enc`.
    fn open(
        &mut self,
        suite: &HpkeCipherSuite,
        d: &[u8],
        enc: &[u8],
        info: &[u8],
        ciphertext: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>, KeyDistError>;
}

/// Capability for validating a certificate chain (`x5c`) against a set of
/// trust anchors.
pub trait CertVerifier {
    /// Validates `chain` against `ca_certs`, failing with a verify error if
    /// the chain does not terminate at one of the given anchors.
    fn validate_x5chain(
        &self,
        chain: &[Vec<u8>],
        ca_certs: &[Vec<u8>],
    ) -> Result<(), KeyDistError>;
}
