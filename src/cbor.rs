//! CBOR helpers for the integer-labeled maps used throughout COSE
//! structures.
//!
//! COSE headers and key parameters are maps from small integer labels to
//! arbitrary CBOR values. This module provides the canonical in-memory
//! representation for such maps ([`LabelMap`]) together with the
//! encode/decode plumbing on top of [`ciborium`].

use std::collections::BTreeMap;

use ciborium::Value;

use crate::error::KeyDistError;

/// A mapping from COSE integer labels to CBOR values.
///
/// `BTreeMap` keeps labels ordered, which makes the CBOR encoding
/// deterministic. A fresh map is constructed per structure; maps are never
/// shared between instances.
pub type LabelMap = BTreeMap<i64, Value>;

/// Encodes a label map as a CBOR map.
pub fn encode_map(map: &LabelMap) -> Result<Vec<u8>, KeyDistError> {
    let value = map_to_value(map);
    let mut buf = Vec::new();
    ciborium::ser::into_writer(&value, &mut buf)
        .map_err(|_| KeyDistError::encode("Failed to encode."))?;
    Ok(buf)
}

/// Decodes CBOR bytes into a label map.
///
/// Fails with a decode error if the bytes are not a CBOR map or if any map
/// key is not an integer.
pub fn decode_map(bytes: &[u8]) -> Result<LabelMap, KeyDistError> {
    let value: Value =
        ciborium::de::from_reader(bytes).map_err(|_| KeyDistError::decode("Failed to decode."))?;
    value_to_map(&value)
}

/// Converts a label map into a [`Value::Map`] with integer keys.
pub fn map_to_value(map: &LabelMap) -> Value {
    Value::Map(
        map.iter()
            .map(|(label, value)| (Value::Integer((*label).into()), value.clone()))
            .collect(),
    )
}

/// Converts a [`Value::Map`] into a label map, rejecting non-integer keys.
pub fn value_to_map(value: &Value) -> Result<LabelMap, KeyDistError> {
    let entries = value
        .as_map()
        .ok_or_else(|| KeyDistError::decode("Failed to decode."))?;
    let mut map = LabelMap::new();
    for (label, entry) in entries {
        let label =
            as_i64(label).ok_or_else(|| KeyDistError::decode("label should be int."))?;
        map.insert(label, entry.clone());
    }
    Ok(map)
}

/// Extracts an `i64` from an integer value.
pub fn as_i64(value: &Value) -> Option<i64> {
    value.as_integer().and_then(|i| i64::try_from(i).ok())
}

/// Extracts a byte string from a value.
pub fn as_bytes(value: &Value) -> Option<&[u8]> {
    value.as_bytes().map(Vec::as_slice)
}
