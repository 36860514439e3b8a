use std::collections::HashSet;

use text_splitter::{ChunkConfig, TextSplitter};
use unicode_segmentation::UnicodeSegmentation;

use crate::config::ProcessingConfig;
use crate::models::{DocumentChunk, PersonaKey};

use super::fingerprint::chunk_hash;

/// Splits extracted text into overlapping chunks scoped to a persona.
///
/// Splitting is recursive: paragraph breaks first, then line breaks, then
/// sentences and words. Chunk sizes are measured in characters.
#[derive(Debug, Clone)]
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    min_content_chars: usize,
}

impl TextChunker {
    pub fn new(config: &ProcessingConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            min_content_chars: config.min_content_chars,
        }
    }

    /// Chunk one document's text. Output is deterministic for the same input.
    ///
    /// Texts shorter than the minimum are skipped. Repeated identical chunks
    /// within the document are kept once.
    pub fn chunk_document(
        &self,
        source: &str,
        persona_key: &PersonaKey,
        text: &str,
    ) -> Vec<DocumentChunk> {
        let trimmed = text.trim();
        if trimmed.chars().count() < self.min_content_chars {
            tracing::warn!(
                source,
                chars = trimmed.chars().count(),
                "Skipping file: not enough text content"
            );
            return Vec::new();
        }

        let mut seen = HashSet::new();
        self.split(trimmed)
            .into_iter()
            .filter_map(|content| {
                let hash = chunk_hash(&content);
                seen.insert(hash.clone()).then_some((content, hash))
            })
            .enumerate()
            .map(|(position, (content, hash))| DocumentChunk {
                source: source.to_string(),
                persona_key: persona_key.clone(),
                content,
                chunk_hash: Some(hash),
                position,
            })
            .collect()
    }

    /// Split raw text into chunk strings without any scoping.
    pub fn split(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let config = match ChunkConfig::new(self.chunk_size).with_overlap(self.chunk_overlap) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::debug!(error = %e, "Invalid splitter config, using sentence merge");
                return self.merge_sentences(text);
            }
        };

        let chunks: Vec<String> = TextSplitter::new(config)
            .chunks(text)
            .map(str::trim)
            .filter(|chunk| !chunk.is_empty())
            .map(str::to_string)
            .collect();

        if chunks.is_empty() {
            return self.merge_sentences(text);
        }

        chunks
    }

    fn merge_sentences(&self, text: &str) -> Vec<String> {
        let sentences = split_into_sentences(text);
        if sentences.is_empty() {
            return Vec::new();
        }

        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut current_sentences: Vec<String> = Vec::new();

        for sentence in sentences {
            let current_len = current.chars().count();
            let sentence_len = sentence.chars().count();
            let potential = if current.is_empty() {
                sentence_len
            } else {
                current_len + 1 + sentence_len
            };

            if potential > self.chunk_size && !current.is_empty() {
                chunks.push(current.clone());
                let overlap = self.overlap_sentences(&current_sentences);
                current = overlap.join(" ");
                current_sentences = overlap;
            }

            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&sentence);
            current_sentences.push(sentence);
        }

        if !current.is_empty() {
            chunks.push(current);
        }

        chunks
    }

    fn overlap_sentences(&self, sentences: &[String]) -> Vec<String> {
        let mut overlap_len = 0;
        let mut overlap = Vec::new();

        for sentence in sentences.iter().rev() {
            let len = sentence.chars().count();
            if overlap_len + len > self.chunk_overlap {
                break;
            }
            overlap_len += len + 1;
            overlap.push(sentence.clone());
        }

        overlap.reverse();
        overlap
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::new(&ProcessingConfig::default())
    }
}

fn split_into_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();

    for grapheme in text.graphemes(true) {
        current.push_str(grapheme);

        if is_sentence_boundary(&current) {
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                sentences.push(trimmed.to_string());
            }
            current.clear();
        }
    }

    if !current.trim().is_empty() {
        sentences.push(current.trim().to_string());
    }

    sentences
}

fn is_sentence_boundary(text: &str) -> bool {
    const ABBREVIATIONS: &[&str] = &[
        "Mr.", "Mrs.", "Ms.", "Dr.", "Prof.", "Sr.", "Jr.", "vs.", "etc.", "i.e.", "e.g.",
    ];

    match text.chars().last() {
        Some('\n') => true,
        Some('.' | '!' | '?') => text
            .split_whitespace()
            .last()
            .is_none_or(|word| !ABBREVIATIONS.contains(&word)),
        _ => false,
    }
}
