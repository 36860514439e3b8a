//! Prompt templates for persona chat.
//!
//! Templates use plain `format!()` interpolation, so every slot is checked at
//! compile time.

use crate::models::{ConversationTurn, ScoredChunk};

/// Instruction telling the model to admit missing knowledge instead of inventing it.
pub const INSUFFICIENT_INFORMATION_INSTRUCTION: &str = "If the context does not contain the answer, say that you don't have enough information to answer. Do not make up information.";

const NO_HISTORY: &str = "No previous conversation.";
const NO_CONTEXT: &str = "No relevant documents were found.";

/// Format conversation turns as `User:` / `Persona:` lines, oldest first.
///
/// # Example
/// ```
/// use axon::llm::prompts::format_history;
/// use axon::models::ConversationTurn;
///
/// let history = format_history(&[
///     ConversationTurn::user("Hi"),
///     ConversationTurn::assistant("Hello there"),
/// ]);
/// assert_eq!(history, "User: Hi\nPersona: Hello there");
/// ```
pub fn format_history(turns: &[ConversationTurn]) -> String {
    turns
        .iter()
        .filter(|turn| !turn.content.trim().is_empty())
        .map(|turn| format!("{}: {}", turn.role.speaker(), turn.content.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Join retrieved chunk texts with a blank line between them, in rank order.
pub fn format_context(chunks: &[ScoredChunk]) -> String {
    chunks
        .iter()
        .map(|chunk| chunk.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Build the single prompt sent to the chat model for one persona question.
///
/// # Arguments
/// * `attributes` - Formatted persona attribute block
/// * `history` - Formatted conversation history, possibly empty
/// * `context` - Retrieved document context, possibly empty
/// * `question` - The user's question, verbatim
pub fn persona_chat_prompt(attributes: &str, history: &str, context: &str, question: &str) -> String {
    let history = if history.trim().is_empty() {
        NO_HISTORY
    } else {
        history
    };
    let context = if context.trim().is_empty() {
        NO_CONTEXT
    } else {
        context
    };

    format!(
        r#"You are a digital persona. Speak in the first person, in the voice described by the persona profile below.
Answer the user's question based ONLY on the CONTEXT section. Use the persona profile for tone and personality, not as a source of facts that are missing from the context.
Never say that you are an AI, an assistant or a language model. Stay in character.
{INSUFFICIENT_INFORMATION_INSTRUCTION}

PERSONA PROFILE:
{attributes}

CONVERSATION HISTORY:
{history}

CONTEXT:
{context}

QUESTION:
{question}"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PersonaAttributes;

    fn scored(content: &str) -> ScoredChunk {
        ScoredChunk {
            id: "c1".to_string(),
            persona_key: "persona:1".to_string(),
            source: "doc.txt".to_string(),
            content: content.to_string(),
            chunk_hash: None,
            score: 0.9,
        }
    }

    #[test]
    fn test_prompt_contains_every_block_in_order() {
        let attributes = PersonaAttributes::default().format_block();
        let prompt = persona_chat_prompt(
            &attributes,
            "User: hi\nPersona: hello",
            "My favorite color is teal.",
            "What is your favorite color?",
        );

        let profile = prompt.find("PERSONA PROFILE:").unwrap();
        let history = prompt.find("CONVERSATION HISTORY:").unwrap();
        let context = prompt.find("CONTEXT:\nMy favorite color is teal.").unwrap();
        let question = prompt.find("QUESTION:\nWhat is your favorite color?").unwrap();
        assert!(profile < history && history < context && context < question);
        assert!(prompt.contains("- Bio: Not specified."));
    }

    #[test]
    fn test_prompt_carries_grounding_instructions() {
        let prompt = persona_chat_prompt("- Bio: x", "", "", "Anything?");
        assert!(prompt.contains("ONLY on the CONTEXT"));
        assert!(prompt.contains(INSUFFICIENT_INFORMATION_INSTRUCTION));
        assert!(prompt.contains("Never say that you are an AI"));
    }

    #[test]
    fn test_empty_blocks_get_placeholders() {
        let prompt = persona_chat_prompt("- Bio: x", "  ", "", "Q?");
        assert!(prompt.contains(NO_HISTORY));
        assert!(prompt.contains(NO_CONTEXT));
    }

    #[test]
    fn test_format_context_uses_blank_line_separator() {
        let context = format_context(&[scored("one"), scored("two")]);
        assert_eq!(context, "one\n\ntwo");
    }

    #[test]
    fn test_format_history_skips_blank_turns() {
        let history = format_history(&[
            ConversationTurn::user("  "),
            ConversationTurn::user("Where do you live?"),
            ConversationTurn::assistant("By the sea."),
        ]);
        assert_eq!(history, "User: Where do you live?\nPersona: By the sea.");
    }
}
