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

use aes::cipher::{BlockCipher, BlockDecrypt, BlockEncrypt, BlockSizeUser};
use aes::{Aes128, Aes192, Aes256};
use aes_kw::Kek;
use coset::iana;
use crypto_common::{Key, KeyInit};
use hkdf::Hkdf;
use rand::{CryptoRng, RngCore};
use sha2::{Sha256, Sha512};
use typenum::consts::U16;
use x25519_dalek::{PublicKey, StaticSecret};

use crate::backend::{HkdfHash, KeyDistributionBackend};
use crate::error::KeyDistError;

use super::RustCryptoContext;

/// Performs an AES key wrap of `plaintext` under `kek` using the AES
/// variant provided as `AES` (RFC 3394, default IV).
fn aes_key_wrap_with_alg<
    AES: KeyInit + BlockCipher + BlockSizeUser<BlockSize = U16> + BlockEncrypt + BlockDecrypt,
>(
    kek: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>, KeyDistError> {
    if kek.len() != AES::key_size() {
        return Err(KeyDistError::validation(format!(
            "Invalid key length: {}.",
            kek.len()
        )));
    }
    let kek = Kek::<AES>::new(Key::<AES>::from_slice(kek));
    kek.wrap_vec(plaintext)
        .map_err(|_| KeyDistError::encode("Failed to wrap key."))
}

/// Performs an AES key unwrap of `ciphertext` under `kek` using the AES
/// variant provided as `AES`.
fn aes_key_unwrap_with_alg<
    AES: KeyInit + BlockCipher + BlockSizeUser<BlockSize = U16> + BlockEncrypt + BlockDecrypt,
>(
    kek: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>, KeyDistError> {
    if kek.len() != AES::key_size() {
        return Err(KeyDistError::validation(format!(
            "Invalid key length: {}.",
            kek.len()
        )));
    }
    let kek = Kek::<AES>::new(Key::<AES>::from_slice(kek));
    kek.unwrap_vec(ciphertext)
        .map_err(|_| KeyDistError::decode("Failed to unwrap key."))
}

/// Minimal shim over [`Hkdf`] so both hash variants share one code path.
trait HkdfExpand {
    fn derive(ikm: &[u8], salt: &[u8], info: &[u8], length: usize)
        -> Result<Vec<u8>, KeyDistError>;
}

macro_rules! impl_hkdf_expand {
    ($hash:ty) => {
        impl HkdfExpand for Hkdf<$hash> {
            fn derive(
                ikm: &[u8],
                salt: &[u8],
                info: &[u8],
                length: usize,
            ) -> Result<Vec<u8>, KeyDistError> {
                let salt = (!salt.is_empty()).then_some(salt);
                let hkdf = Hkdf::<$hash>::new(salt, ikm);
                let mut okm = vec![0u8; length];
                hkdf.expand(info, &mut okm)
                    .map_err(|_| KeyDistError::encode("Failed to derive key."))?;
                Ok(okm)
            }
        }
    };
}

impl_hkdf_expand!(Sha256);
impl_hkdf_expand!(Sha512);

fn x25519_scalar(d: &[u8]) -> Result<StaticSecret, KeyDistError> {
    let d: [u8; 32] = d
        .try_into()
        .map_err(|_| KeyDistError::validation("Invalid key parameter."))?;
    Ok(StaticSecret::from(d))
}

fn x25519_point(x: &[u8]) -> Result<PublicKey, KeyDistError> {
    let x: [u8; 32] = x
        .try_into()
        .map_err(|_| KeyDistError::validation("Invalid key parameter."))?;
    Ok(PublicKey::from(x))
}

impl<RNG: RngCore + CryptoRng> KeyDistributionBackend for RustCryptoContext<RNG> {
    fn aes_key_wrap(
        &mut self,
        alg: iana::Algorithm,
        kek: &[u8],
        plaintext: &[u8],
    ) -> Result<Vec<u8>, KeyDistError> {
        match alg {
            iana::Algorithm::A128KW => aes_key_wrap_with_alg::<Aes128>(kek, plaintext),
            iana::Algorithm::A192KW => aes_key_wrap_with_alg::<Aes192>(kek, plaintext),
            iana::Algorithm::A256KW => aes_key_wrap_with_alg::<Aes256>(kek, plaintext),
            a => Err(KeyDistError::validation(format!(
                "Unsupported or unknown algorithm: {}.",
                a as i64
            ))),
        }
    }

    fn aes_key_unwrap(
        &mut self,
        alg: iana::Algorithm,
        kek: &[u8],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, KeyDistError> {
        match alg {
            iana::Algorithm::A128KW => aes_key_unwrap_with_alg::<Aes128>(kek, ciphertext),
            iana::Algorithm::A192KW => aes_key_unwrap_with_alg::<Aes192>(kek, ciphertext),
            iana::Algorithm::A256KW => aes_key_unwrap_with_alg::<Aes256>(kek, ciphertext),
            a => Err(KeyDistError::validation(format!(
                "Unsupported or unknown algorithm: {}.",
                a as i64
            ))),
        }
    }

    fn hkdf(
        &mut self,
        hash: HkdfHash,
        ikm: &[u8],
        salt: &[u8],
        info: &[u8],
        length: usize,
    ) -> Result<Vec<u8>, KeyDistError> {
        match hash {
            HkdfHash::Sha256 => <Hkdf<Sha256> as HkdfExpand>::derive(ikm, salt, info, length),
            HkdfHash::Sha512 => <Hkdf<Sha512> as HkdfExpand>::derive(ikm, salt, info, length),
        }
    }

    fn ecdh(
        &mut self,
        crv: iana::EllipticCurve,
        d: &[u8],
        peer_x: &[u8],
    ) -> Result<Vec<u8>, KeyDistError> {
        if crv != iana::EllipticCurve::X25519 {
            return Err(KeyDistError::validation(format!(
                "Unsupported or unknown crv(-1): {}.",
                crv as i64
            )));
        }
        let secret = x25519_scalar(d)?;
        let peer = x25519_point(peer_x)?;
        Ok(secret.diffie_hellman(&peer).as_bytes().to_vec())
    }

    fn ecdh_keypair(
        &mut self,
        crv: iana::EllipticCurve,
    ) -> Result<(Vec<u8>, Vec<u8>), KeyDistError> {
        if crv != iana::EllipticCurve::X25519 {
            return Err(KeyDistError::validation(format!(
                "Unsupported or unknown crv(-1): {}.",
                crv as i64
            )));
        }
        let secret = StaticSecret::random_from_rng(&mut self.rng);
        let public = PublicKey::from(&secret);
        Ok((secret.to_bytes().to_vec(), public.as_bytes().to_vec()))
    }
}
