//! Shared DTO helpers for the v1 API.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{AxonError, Result};
use crate::models::PersonaKey;

/// Resolve the persona scope from either an explicit key or a token id.
///
/// An explicit `personaKey` wins. A bare `tokenId` is placed under `prefix`.
pub fn resolve_persona_key(
    prefix: &str,
    token_id: Option<&str>,
    persona_key: Option<&str>,
) -> Result<PersonaKey> {
    if let Some(key) = persona_key.filter(|k| !k.trim().is_empty()) {
        return PersonaKey::parse(key);
    }

    match token_id.filter(|t| !t.trim().is_empty()) {
        Some(token_id) => PersonaKey::from_token_id(prefix, token_id),
        None => Err(AxonError::Validation(
            "tokenId or personaKey is required".to_string(),
        )),
    }
}

/// Token ids arrive as strings or JSON numbers depending on the client.
pub fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
