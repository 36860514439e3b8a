//! Persona chat request/response DTOs for the v1 API.

use serde::{Deserialize, Serialize};

use super::common::{resolve_persona_key, string_or_number};
use crate::error::{AxonError, Result};
use crate::models::{ChatRequest, ConversationTurn, Role};

/// Number of messages preceding the question that are kept as history.
const MESSAGE_HISTORY_LIMIT: usize = 5;

/// Request body for `POST /v1/chat` and `POST /v1/chat:stream`.
///
/// Either `question` (with optional `history`) or a `messages` array whose
/// last entry is the question. The persona is named by `tokenId` or
/// `personaKey`.
#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequestDto {
    /// The question to answer.
    #[serde(default)]
    pub question: Option<String>,
    /// Earlier turns, oldest first. Used with `question`.
    #[serde(default)]
    pub history: Vec<ChatMessageDto>,
    /// Full conversation, oldest first. The last message is the question.
    #[serde(default)]
    pub messages: Vec<ChatMessageDto>,
    /// Persona token id; the scope becomes `persona:<tokenId>`.
    #[serde(default, deserialize_with = "string_or_number")]
    #[schema(value_type = Option<String>)]
    pub token_id: Option<String>,
    /// Explicit persona scope (`<prefix>:<tokenId>`).
    #[serde(default)]
    pub persona_key: Option<String>,
}

/// One chat message. Text comes from `parts` of type `text` when present,
/// otherwise from `content`.
#[derive(Debug, Clone, Default, Deserialize, Serialize, utoipa::ToSchema)]
pub struct ChatMessageDto {
    /// `user`, or anything else for the persona's side.
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub parts: Vec<MessagePartDto>,
}

#[derive(Debug, Clone, Deserialize, Serialize, utoipa::ToSchema)]
pub struct MessagePartDto {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
}

impl ChatMessageDto {
    pub fn text(&self) -> String {
        let from_parts = self
            .parts
            .iter()
            .filter(|part| part.kind == "text")
            .filter_map(|part| part.text.as_deref())
            .collect::<Vec<_>>()
            .join(" ");

        if !from_parts.trim().is_empty() {
            from_parts
        } else {
            self.content.clone().unwrap_or_default()
        }
    }

    fn to_turn(&self) -> ConversationTurn {
        ConversationTurn {
            role: Role::from_label(&self.role),
            content: self.text(),
        }
    }
}

impl ChatRequestDto {
    pub fn into_request(self, persona_prefix: &str) -> Result<ChatRequest> {
        let persona_key = resolve_persona_key(
            persona_prefix,
            self.token_id.as_deref(),
            self.persona_key.as_deref(),
        )?;

        if let Some(question) = self.question.filter(|q| !q.trim().is_empty()) {
            let history = self.history.iter().map(ChatMessageDto::to_turn).collect();
            return Ok(ChatRequest {
                question,
                persona_key,
                history,
            });
        }

        let Some((last, earlier)) = self.messages.split_last() else {
            return Err(AxonError::Validation(
                "question or messages is required".to_string(),
            ));
        };

        let start = earlier.len().saturating_sub(MESSAGE_HISTORY_LIMIT);
        Ok(ChatRequest {
            question: last.text(),
            persona_key,
            history: earlier[start..].iter().map(ChatMessageDto::to_turn).collect(),
        })
    }
}

/// Response for `POST /v1/chat`.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponseDto {
    pub answer: String,
    pub persona_key: String,
}
