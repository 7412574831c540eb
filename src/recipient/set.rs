//! Resolution of a content-encryption key from a recipient list.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ciborium::Value;
use serde::Deserialize;

use crate::algs as alg_ids;
use crate::backend::{HpkeBackend, KeyDistributionBackend};
use crate::error::KeyDistError;
use crate::kdf::ContextJson;
use crate::key::{ParsedKey, SymmetricKey};
use crate::recipient::Recipient;

/// Out-of-band key material referenced by kid, with the KDF context
/// description needed to turn it into a key.
#[derive(Debug, Clone, Deserialize)]
pub struct KeyMaterial {
    pub kid: String,
    /// Base64url-encoded secret bytes.
    pub value: String,
    pub context: ContextJson,
}

/// The ordered recipient list of a COSE message layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Recipients {
    recipients: Vec<Recipient>,
}

impl Recipients {
    pub fn new(recipients: Vec<Recipient>) -> Recipients {
        Recipients { recipients }
    }

    /// Parses a recipient list from its CBOR array form.
    pub fn from_array(value: &Value) -> Result<Recipients, KeyDistError> {
        let entries = value
            .as_array()
            .ok_or_else(|| KeyDistError::decode("Invalid recipient format."))?;
        let recipients = entries
            .iter()
            .map(Recipient::from_list)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Recipients { recipients })
    }

    /// Serializes the list back to its CBOR array form.
    pub fn to_array(&self) -> Result<Value, KeyDistError> {
        let entries = self
            .recipients
            .iter()
            .map(Recipient::to_list)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Value::Array(entries))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Recipient> {
        self.recipients.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.recipients.is_empty()
    }

    /// Resolves the content-encryption key announced by this list.
    ///
    /// The scan is ordered and first-match. A recipient announcing direct
    /// use (-6) is matched by kid against `keys`; a derivation recipient is
    /// matched by kid against `materials`, whose context description then
    /// drives the HKDF. `alg_hint` names the algorithm of the resolved key
    /// where the recipient itself does not.
    pub fn derive_key<B: KeyDistributionBackend + HpkeBackend>(
        &self,
        backend: &mut B,
        keys: Option<&[ParsedKey]>,
        materials: Option<&[KeyMaterial]>,
        alg_hint: Option<i64>,
    ) -> Result<SymmetricKey, KeyDistError> {
        if keys.is_none() && materials.is_none() {
            return Err(KeyDistError::validation(
                "Either keys or materials should be specified.",
            ));
        }
        for recipient in &self.recipients {
            if let Some(materials) = materials {
                if let Some(found) = recipient
                    .kid()
                    .and_then(|kid| materials.iter().find(|m| m.kid.as_bytes() == kid))
                {
                    return derive_from_material(backend, recipient, found, alg_hint);
                }
            }
            if let Some(keys) = keys {
                if recipient.alg() != alg_ids::ALG_DIRECT {
                    continue;
                }
                if let Some(found) = recipient
                    .kid()
                    .and_then(|kid| keys.iter().find(|k| k.kid() == Some(kid)))
                {
                    return recipient.extract(backend, found, None, alg_hint, &[]);
                }
            }
        }
        Err(KeyDistError::validation("Failed to derive a key."))
    }
}

fn derive_from_material<B: KeyDistributionBackend + HpkeBackend>(
    backend: &mut B,
    recipient: &Recipient,
    material: &KeyMaterial,
    alg_hint: Option<i64>,
) -> Result<SymmetricKey, KeyDistError> {
    let secret = URL_SAFE_NO_PAD
        .decode(&material.value)
        .map_err(|_| KeyDistError::decode("value should be base64url encoded."))?;
    let context = material.context.to_context(recipient.alg(), alg_hint)?;
    let shared = SymmetricKey::from_bytes(recipient.alg(), recipient.kid(), &secret)?;
    recipient.extract(
        backend,
        &ParsedKey::Symmetric(shared),
        Some(&context),
        None,
        &[],
    )
}
