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

//! Backend implementation based on the RustCrypto crates.

use rand::{CryptoRng, RngCore};

use crate::backend::CryptoBackend;
use crate::error::KeyDistError;

mod hpke_impl;
mod key_distribution;
mod sign;


/// Context for the RustCrypto cryptographic backend.
///
/// Algorithm support:
/// - Key distribution
///     - [x] A128KW / A192KW / A256KW
///     - [x] HKDF-SHA-256 / HKDF-SHA-512
///     - [x] X25519 key agreement
///     - [ ] X448 key agreement
/// - Signatures
///     - [x] EdDSA over Ed25519
///     - [ ] EdDSA over Ed448
/// - HPKE (base mode)
///     - KEM: [x] DHKEM(X25519, HKDF-SHA256); [ ] the NIST-curve KEMs
///     - KDF: [x] HKDF-SHA256 / HKDF-SHA384 / HKDF-SHA512
///     - AEAD: [x] AES-128-GCM / AES-256-GCM / ChaCha20Poly1305
pub struct RustCryptoContext<RNG: RngCore + CryptoRng> {
    rng: RNG,
}

impl<RNG: RngCore + CryptoRng> RustCryptoContext<RNG> {
    /// Creates a new RustCrypto context using the given random number
    /// generator `rng`.
    pub fn new(rng: RNG) -> RustCryptoContext<RNG> {
        RustCryptoContext { rng }
    }
}

impl<RNG: RngCore + CryptoRng> CryptoBackend for RustCryptoContext<RNG> {
    fn generate_rand(&mut self, buf: &mut [u8]) -> Result<(), KeyDistError> {
        self.rng.fill_bytes(buf);
        Ok(())
    }
}
