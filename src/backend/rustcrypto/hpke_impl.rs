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

use hpke::aead::{Aead, AesGcm128, AesGcm256, ChaCha20Poly1305};
use hpke::kdf::{HkdfSha256, HkdfSha384, HkdfSha512, Kdf};
use hpke::kem::{Kem, X25519HkdfSha256};
use hpke::{Deserializable, OpModeR, OpModeS, Serializable};
use rand::{CryptoRng, RngCore};

use crate::backend::HpkeBackend;
use crate::error::KeyDistError;
use crate::recipient::HpkeCipherSuite;

use super::RustCryptoContext;

/// HPKE registry identifier of DHKEM(X25519, HKDF-SHA256), the only KEM
/// this backend supports.
const KEM_X25519_HKDF_SHA256: u16 = 0x0020;

fn seal_with<A: Aead, K: Kdf, RNG: RngCore + CryptoRng>(
    rng: &mut RNG,
    recipient_x: &[u8],
    info: &[u8],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<(Vec<u8>, Vec<u8>), KeyDistError> {
    let pk = <X25519HkdfSha256 as Kem>::PublicKey::from_bytes(recipient_x)
        .map_err(|_| KeyDistError::validation("Invalid key parameter."))?;
    let (enc, ciphertext) = hpke::single_shot_seal::<A, K, X25519HkdfSha256, _>(
        &OpModeS::Base,
        &pk,
        info,
        plaintext,
        aad,
        rng,
    )
    .map_err(|_| KeyDistError::encode("Failed to seal."))?;
    Ok((enc.to_bytes().to_vec(), ciphertext))
}

fn open_with<A: Aead, K: Kdf>(
    d: &[u8],
    enc: &[u8],
    info: &[u8],
    ciphertext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, KeyDistError> {
    let sk = <X25519HkdfSha256 as Kem>::PrivateKey::from_bytes(d)
        .map_err(|_| KeyDistError::validation("Invalid key parameter."))?;
    let enc = <X25519HkdfSha256 as Kem>::EncappedKey::from_bytes(enc)
        .map_err(|_| KeyDistError::decode("Failed to open."))?;
    hpke::single_shot_open::<A, K, X25519HkdfSha256>(
        &OpModeR::Base,
        &sk,
        &enc,
        info,
        ciphertext,
        aad,
    )
    .map_err(|_| KeyDistError::decode("Failed to open."))
}

macro_rules! dispatch_suite {
    ($suite:expr, $callback:ident $(, $rng_ty:ty)?; ($($args:expr),*)) => {
        match ($suite.kdf, $suite.aead) {
            (1, 1) => $callback::<AesGcm128, HkdfSha256 $(, $rng_ty)?>($($args),*),
            (1, 2) => $callback::<AesGcm256, HkdfSha256 $(, $rng_ty)?>($($args),*),
            (1, 3) => $callback::<ChaCha20Poly1305, HkdfSha256 $(, $rng_ty)?>($($args),*),
            (2, 1) => $callback::<AesGcm128, HkdfSha384 $(, $rng_ty)?>($($args),*),
            (2, 2) => $callback::<AesGcm256, HkdfSha384 $(, $rng_ty)?>($($args),*),
            (2, 3) => $callback::<ChaCha20Poly1305, HkdfSha384 $(, $rng_ty)?>($($args),*),
            (3, 1) => $callback::<AesGcm128, HkdfSha512 $(, $rng_ty)?>($($args),*),
            (3, 2) => $callback::<AesGcm256, HkdfSha512 $(, $rng_ty)?>($($args),*),
            (3, 3) => $callback::<ChaCha20Poly1305, HkdfSha512 $(, $rng_ty)?>($($args),*),
            (kdf, _) => Err(KeyDistError::validation(format!(
                "Unsupported or unknown KDF id: {kdf}."
            ))),
        }
    };
}

impl<RNG: RngCore + CryptoRng> HpkeBackend for RustCryptoContext<RNG> {
    fn seal(
        &mut self,
        suite: &HpkeCipherSuite,
        recipient_x: &[u8],
        info: &[u8],
        plaintext: &[u8],
        aad: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>), KeyDistError> {
        if suite.kem != KEM_X25519_HKDF_SHA256 {
            return Err(KeyDistError::validation(format!(
                "Unsupported or unknown KEM id: {}.",
                suite.kem
            )));
        }
        let rng = &mut self.rng;
        dispatch_suite!(suite, seal_with, RNG; (rng, recipient_x, info, plaintext, aad))
    }

    fn open(
        &mut self,
        suite: &HpkeCipherSuite,
        d: &[u8],
        enc: &[u8],
        info: &[u8],
        ciphertext: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>, KeyDistError> {
        if suite.kem != KEM_X25519_HKDF_SHA256 {
            return Err(KeyDistError::validation(format!(
                "Unsupported or unknown KEM id: {}.",
                suite.kem
            )));
        }
        dispatch_suite!(suite, open_with; (d, enc, info, ciphertext, aad))
    }
}
