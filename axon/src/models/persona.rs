use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AxonError, Result};

pub const DEFAULT_PERSONA_PREFIX: &str = "persona";

/// Scope identifier for all documents and chat data belonging to one persona.
///
/// The wire form is `<prefix>:<tokenId>`, e.g. `persona:42`. The token id is
/// the on-chain identifier used to find the persona's durable metadata record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PersonaKey {
    value: String,
    split: usize,
}

impl PersonaKey {
    /// Build a key from a token id under the given prefix.
    pub fn from_token_id(prefix: &str, token_id: &str) -> Result<Self> {
        let prefix = prefix.trim();
        let token_id = token_id.trim();
        if !is_valid_segment(prefix) || !is_valid_segment(token_id) {
            return Err(AxonError::InvalidPersonaKey(format!("{prefix}:{token_id}")));
        }

        Ok(Self {
            value: format!("{prefix}:{token_id}"),
            split: prefix.len(),
        })
    }

    /// Parse the `<prefix>:<tokenId>` form.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let (prefix, token_id) = trimmed
            .split_once(':')
            .ok_or_else(|| AxonError::InvalidPersonaKey(trimmed.to_string()))?;

        if !is_valid_segment(prefix) || !is_valid_segment(token_id) {
            return Err(AxonError::InvalidPersonaKey(trimmed.to_string()));
        }

        Ok(Self {
            value: trimmed.to_string(),
            split: prefix.len(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn prefix(&self) -> &str {
        &self.value[..self.split]
    }

    pub fn token_id(&self) -> &str {
        &self.value[self.split + 1..]
    }
}

fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

impl fmt::Display for PersonaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl FromStr for PersonaKey {
    type Err = AxonError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PersonaKey {
    type Error = AxonError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<PersonaKey> for String {
    fn from(key: PersonaKey) -> Self {
        key.value
    }
}

impl AsRef<str> for PersonaKey {
    fn as_ref(&self) -> &str {
        &self.value
    }
}

/// Durable pointer from a persona token id to its content-addressed metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaRecord {
    pub token_id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    /// `ipfs://<cid>`, a bare CID, or an http(s) URL.
    pub metadata_uri: String,
    pub image_cid: Option<String>,
    pub wallet_address: Option<String>,
}

impl PersonaRecord {
    pub fn new(token_id: impl Into<String>, metadata_uri: impl Into<String>) -> Self {
        Self {
            token_id: token_id.into(),
            name: None,
            description: None,
            metadata_uri: metadata_uri.into(),
            image_cid: None,
            wallet_address: None,
        }
    }
}
