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

use coset::iana;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::{CryptoRng, RngCore};

use crate::backend::SignBackend;
use crate::error::KeyDistError;

use super::RustCryptoContext;

fn ed25519_signing_key(d: &[u8]) -> Result<SigningKey, KeyDistError> {
    let d: [u8; 32] = d
        .try_into()
        .map_err(|_| KeyDistError::validation("Invalid key parameter."))?;
    Ok(SigningKey::from_bytes(&d))
}

fn ed25519_verifying_key(x: &[u8]) -> Result<VerifyingKey, KeyDistError> {
    let x: [u8; 32] = x
        .try_into()
        .map_err(|_| KeyDistError::validation("Invalid key parameter."))?;
    VerifyingKey::from_bytes(&x)
        .map_err(|_| KeyDistError::validation("Invalid key parameter."))
}

impl<RNG: RngCore + CryptoRng> SignBackend for RustCryptoContext<RNG> {
    fn sign(
        &mut self,
        crv: iana::EllipticCurve,
        d: &[u8],
        msg: &[u8],
    ) -> Result<Vec<u8>, KeyDistError> {
        if crv != iana::EllipticCurve::Ed25519 {
            return Err(KeyDistError::validation(format!(
                "Unsupported or unknown crv(-1): {}.",
                crv as i64
            )));
        }
        let key = ed25519_signing_key(d)?;
        Ok(key.sign(msg).to_bytes().to_vec())
    }

    fn verify(
        &mut self,
        crv: iana::EllipticCurve,
        x: &[u8],
        msg: &[u8],
        sig: &[u8],
    ) -> Result<(), KeyDistError> {
        if crv != iana::EllipticCurve::Ed25519 {
            return Err(KeyDistError::validation(format!(
                "Unsupported or unknown crv(-1): {}.",
                crv as i64
            )));
        }
        let key = ed25519_verifying_key(x)?;
        let sig =
            Signature::from_slice(sig).map_err(|_| KeyDistError::verify("Failed to verify."))?;
        key.verify(msg, &sig)
            .map_err(|_| KeyDistError::verify("Failed to verify."))
    }
}
