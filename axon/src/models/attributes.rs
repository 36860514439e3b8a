use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{AxonError, Result};

const NOT_SPECIFIED: &str = "Not specified.";

/// Document fields that may hold the persona attribute sub-object.
const ATTRIBUTE_FIELDS: &[&str] = &["personalData", "persona_attributes", "personaAttributes"];

/// Descriptive data the chat model uses to adopt a persona's voice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonaAttributes {
    #[serde(default, deserialize_with = "string_or_none")]
    pub bio: Option<String>,
    #[serde(default, deserialize_with = "string_or_none")]
    pub background: Option<String>,
    #[serde(default, deserialize_with = "list_or_csv")]
    pub interests: Vec<String>,
    #[serde(default, deserialize_with = "list_or_csv")]
    pub goals: Vec<String>,
    #[serde(
        default,
        alias = "personalityTraits",
        deserialize_with = "list_or_csv"
    )]
    pub personality_traits: Vec<String>,
}

impl PersonaAttributes {
    /// Extract the attribute sub-object from a persona metadata document.
    ///
    /// The document itself must be a JSON object. A document without any
    /// attribute field yields empty attributes, which format as "Not specified.".
    pub fn from_document(document: &Value) -> Result<Self> {
        let object = document.as_object().ok_or_else(|| {
            AxonError::Gateway("Persona metadata document is not a JSON object".to_string())
        })?;

        let Some(sub) = ATTRIBUTE_FIELDS
            .iter()
            .find_map(|field| object.get(*field))
            .filter(|value| !value.is_null())
        else {
            tracing::warn!("Persona metadata document has no persona attribute object");
            return Ok(Self::default());
        };

        serde_json::from_value(sub.clone()).map_err(|e| {
            AxonError::Gateway(format!("Persona attribute object is malformed: {e}"))
        })
    }

    /// Human-readable attribute block placed at the top of the chat prompt.
    pub fn format_block(&self) -> String {
        format!(
            "- Bio: {}\n- Background: {}\n- Interests: {}\n- Goals: {}\n- Personality Traits: {}",
            text_or_default(self.bio.as_deref()),
            text_or_default(self.background.as_deref()),
            list_or_default(&self.interests),
            list_or_default(&self.goals),
            list_or_default(&self.personality_traits),
        )
    }
}

fn text_or_default(value: Option<&str>) -> &str {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(NOT_SPECIFIED)
}

fn list_or_default(values: &[String]) -> String {
    let joined = values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .collect::<Vec<_>>()
        .join(", ");

    if joined.is_empty() {
        NOT_SPECIFIED.to_string()
    } else {
        joined
    }
}

fn string_or_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Accept either a JSON array of strings or a single comma-separated string.
fn list_or_csv<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect(),
        _ => Vec::new(),
    })
}
