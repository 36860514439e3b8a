use std::sync::Arc;
use std::time::Instant;

use crate::config::RetrievalConfig;
use crate::db::DatabaseBackend;
use crate::embeddings::Embedder;
use crate::error::Result;
use crate::llm::prompts::{format_context, format_history, persona_chat_prompt};
use crate::llm::{ChatModel, TextStream};
use crate::models::{ConversationTurn, PersonaKey};

use super::PersonaMetadataCache;

/// Retrieval-augmented answer generation for one persona.
///
/// Steps run strictly in order: persona attributes, history window, scoped
/// retrieval, prompt assembly, model call.
#[derive(Clone)]
pub struct RagChain {
    db: Arc<dyn DatabaseBackend>,
    personas: PersonaMetadataCache,
    embeddings: Arc<dyn Embedder>,
    model: Arc<dyn ChatModel>,
    top_k: u32,
    history_window: usize,
}

impl RagChain {
    pub fn new(
        db: Arc<dyn DatabaseBackend>,
        personas: PersonaMetadataCache,
        embeddings: Arc<dyn Embedder>,
        model: Arc<dyn ChatModel>,
        config: &RetrievalConfig,
    ) -> Self {
        Self {
            db,
            personas,
            embeddings,
            model,
            top_k: config.top_k,
            history_window: config.history_window,
        }
    }

    pub fn personas(&self) -> &PersonaMetadataCache {
        &self.personas
    }

    /// Assemble the model prompt for `question` without calling the model.
    pub async fn build_prompt(
        &self,
        question: &str,
        persona_key: &PersonaKey,
        history: &[ConversationTurn],
    ) -> Result<String> {
        let attributes = self.personas.get_persona_attributes(persona_key).await?;
        let history_block = format_history(recent_turns(history, self.history_window));

        let query_embedding = self.embeddings.embed_query(question).await?;
        let started = Instant::now();
        let chunks = self
            .db
            .search_similar(&query_embedding, persona_key, self.top_k)
            .await?;
        tracing::debug!(
            persona_key = %persona_key,
            chunks = chunks.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Retrieved context"
        );

        Ok(persona_chat_prompt(
            &attributes.format_block(),
            &history_block,
            &format_context(&chunks),
            question,
        ))
    }

    /// Returns the model's output verbatim.
    pub async fn answer(
        &self,
        question: &str,
        persona_key: &PersonaKey,
        history: &[ConversationTurn],
    ) -> Result<String> {
        let prompt = self.build_prompt(question, persona_key, history).await?;
        self.model.complete(&prompt).await
    }

    /// Same prompt as [`answer`](Self::answer), delivered as text deltas.
    pub async fn answer_stream(
        &self,
        question: &str,
        persona_key: &PersonaKey,
        history: &[ConversationTurn],
    ) -> Result<TextStream> {
        let prompt = self.build_prompt(question, persona_key, history).await?;
        self.model.complete_stream(&prompt).await
    }
}

/// The last `window` turns, in their original order.
pub fn recent_turns(history: &[ConversationTurn], window: usize) -> &[ConversationTurn] {
    &history[history.len().saturating_sub(window)..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recent_turns_keeps_tail_in_order() {
        let history: Vec<_> = (1..=8)
            .map(|i| ConversationTurn::user(format!("turn {i}")))
            .collect();

        let window = recent_turns(&history, 5);
        let contents: Vec<_> = window.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["turn 4", "turn 5", "turn 6", "turn 7", "turn 8"]);
    }

    #[test]
    fn test_recent_turns_short_history() {
        let history = vec![ConversationTurn::user("only")];
        assert_eq!(recent_turns(&history, 5).len(), 1);
        assert!(recent_turns(&[], 5).is_empty());
        assert!(recent_turns(&history, 0).is_empty());
    }
}
