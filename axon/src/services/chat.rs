use crate::error::{AxonError, Result};
use crate::llm::TextStream;
use crate::models::{ChatRequest, ChatResponse};

use super::RagChain;

/// Request-level validation in front of the RAG chain.
#[derive(Clone)]
pub struct ChatService {
    rag: RagChain,
}

impl ChatService {
    pub fn new(rag: RagChain) -> Self {
        Self { rag }
    }

    pub fn rag(&self) -> &RagChain {
        &self.rag
    }

    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let question = validate_question(&request.question)?;
        tracing::info!(
            persona_key = %request.persona_key,
            history = request.history.len(),
            "Answering persona chat"
        );

        let answer = self
            .rag
            .answer(question, &request.persona_key, &request.history)
            .await?;

        Ok(ChatResponse { answer })
    }

    pub async fn chat_stream(&self, request: &ChatRequest) -> Result<TextStream> {
        let question = validate_question(&request.question)?;
        tracing::info!(persona_key = %request.persona_key, "Streaming persona chat");

        self.rag
            .answer_stream(question, &request.persona_key, &request.history)
            .await
    }
}

fn validate_question(question: &str) -> Result<&str> {
    let trimmed = question.trim();
    if trimmed.is_empty() {
        return Err(AxonError::Validation("Question must not be empty".to_string()));
    }
    Ok(trimmed)
}
