//! This module contains common error types used across this crate.

use core::fmt::{Display, Formatter};

/// Error type used for all fallible operations on COSE keys and recipient
/// structures.
///
/// The four variants mirror the failure classes that callers need to tell
/// apart: caller mistakes ([`Validation`](KeyDistError::Validation)),
/// malformed or unopenable input ([`Decode`](KeyDistError::Decode)),
/// failures while producing output ([`Encode`](KeyDistError::Encode)) and
/// failed authenticity checks ([`Verify`](KeyDistError::Verify)).
///
/// The contained message always names the offending COSE label (e.g.
/// `crv(-1) should be int.`) so that callers can diagnose the problem
/// without the error exposing any key material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyDistError {
    /// The caller passed structurally or semantically invalid input, such as
    /// a wrong type for a label, a missing required field, a disallowed key
    /// operation combination or an unsupported algorithm identifier.
    Validation(String),
    /// A wire-format decode or a cryptographic unwrap/derive/open operation
    /// failed.
    Decode(String),
    /// A wrap/seal/derive operation failed while producing a structure.
    Encode(String),
    /// A signature or MAC check failed.
    ///
    /// Distinguished from [`Decode`](KeyDistError::Decode) because it means
    /// "authentication failed" rather than "malformed input".
    Verify(String),
}

impl KeyDistError {
    /// Creates a [`Validation`](KeyDistError::Validation) error with the
    /// given message.
    pub fn validation<T: Into<String>>(message: T) -> KeyDistError {
        KeyDistError::Validation(message.into())
    }

    /// Creates a [`Decode`](KeyDistError::Decode) error with the given
    /// message.
    pub fn decode<T: Into<String>>(message: T) -> KeyDistError {
        KeyDistError::Decode(message.into())
    }

    /// Creates an [`Encode`](KeyDistError::Encode) error with the given
    /// message.
    pub fn encode<T: Into<String>>(message: T) -> KeyDistError {
        KeyDistError::Encode(message.into())
    }

    /// Creates a [`Verify`](KeyDistError::Verify) error with the given
    /// message.
    pub fn verify<T: Into<String>>(message: T) -> KeyDistError {
        KeyDistError::Verify(message.into())
    }

    /// Returns the contained message.
    pub fn message(&self) -> &str {
        match self {
            KeyDistError::Validation(m)
            | KeyDistError::Decode(m)
            | KeyDistError::Encode(m)
            | KeyDistError::Verify(m) => m,
        }
    }
}

impl Display for KeyDistError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for KeyDistError {}
