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

//! COSE key-parameter validation and recipient handling for CBOR Web
//! Tokens.
//!
//! This crate implements the key-distribution layer of COSE
//! ([RFC 9052](https://www.rfc-editor.org/rfc/rfc9052)/[RFC 9053](https://www.rfc-editor.org/rfc/rfc9053)):
//! validated COSE key structures for the OKP, EC2, RSA and symmetric key
//! types, the recipient structures nested inside COSE_Encrypt and
//! COSE_Mac messages, and the algorithm families that transport or derive
//! the content-encryption key through them (direct, direct+HKDF, AES key
//! wrap, ECDH with and without key wrap, and HPKE as specified by
//! `draft-ietf-cose-hpke`).
//!
//! All validation is performed by fallible constructors: a key or
//! recipient that was successfully constructed satisfies its invariants
//! and does not change afterwards. Error messages name the offending COSE
//! label and the violated expectation without exposing key material.
//!
//! Implementations of the raw cryptographic primitives are pluggable
//! through the capability traits in [`backend`]; a backend based on the
//! RustCrypto crates is provided behind the `rustcrypto` feature (enabled
//! by default).
//!
//! # Example
//!
//! Announcing a pre-shared key to a recipient and resolving it back on
//! the receiving side:
//!
//! ```
//! use cose_keydist::backend::rustcrypto::RustCryptoContext;
//! use cose_keydist::key::{ParsedKey, SymmetricKey};
//! use cose_keydist::recipient::{Recipient, Recipients};
//!
//! # fn main() -> Result<(), cose_keydist::KeyDistError> {
//! // Sender: announce the pre-shared key by its identifier.
//! let recipient = Recipient::direct(Some(b"our-secret"))?;
//! let recipients = Recipients::new(vec![recipient]);
//!
//! // Receiver: resolve the announced key against the local key store.
//! let keys = vec![ParsedKey::Symmetric(SymmetricKey::from_bytes(
//!     5, // HMAC 256/256
//!     Some(b"our-secret"),
//!     &[0x42; 32],
//! )?)];
//! let mut backend = RustCryptoContext::new(rand::thread_rng());
//! let cek = recipients.derive_key(&mut backend, Some(&keys), None, None)?;
//! assert_eq!(cek.kid(), Some(b"our-secret".as_slice()));
//! # Ok(())
//! # }
//! ```

pub mod algs;
pub mod backend;
pub mod cbor;
pub mod error;
pub mod kdf;
pub mod key;
pub mod recipient;

pub use error::KeyDistError;
pub use key::{Ec2Key, Jwk, OkpKey, ParsedKey, RsaKey, SymmetricKey};
pub use recipient::{
    HpkeCipherSuite, KeyMaterial, Recipient, RecipientAlg, Recipients, SenderKey,
};
