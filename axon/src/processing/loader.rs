use std::panic::{self, AssertUnwindSafe};

use crate::config::ProcessingConfig;
use crate::error::{AxonError, Result};
use crate::models::UploadedFile;

/// Turns an uploaded file into plain text.
///
/// Extraction never fails the caller: unreadable files and files that look
/// like binary data come back as an empty string.
#[derive(Debug, Clone)]
pub struct DocumentLoader {
    binary_sample_threshold: usize,
    binary_non_ascii_ratio: f64,
}

impl DocumentLoader {
    pub fn new(config: &ProcessingConfig) -> Self {
        Self {
            binary_sample_threshold: config.binary_sample_threshold,
            binary_non_ascii_ratio: config.binary_non_ascii_ratio,
        }
    }

    pub fn load(&self, file: &UploadedFile) -> String {
        match self.try_load(file) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(file = %file.name, error = %e, "Failed to read file, treating as empty");
                String::new()
            }
        }
    }

    /// Extract text, surfacing read errors instead of swallowing them.
    pub fn try_load(&self, file: &UploadedFile) -> Result<String> {
        let text = if file.is_pdf() {
            extract_pdf_text(&file.bytes)?
        } else {
            String::from_utf8_lossy(&file.bytes).into_owned()
        };

        if self.looks_binary(&text) {
            tracing::warn!(file = %file.name, "Skipping file due to probable binary content");
            return Ok(String::new());
        }

        Ok(text.trim().to_string())
    }

    /// Non-ASCII ratio check, applied only to texts longer than the sample threshold.
    pub fn looks_binary(&self, text: &str) -> bool {
        let total = text.chars().count();
        if total <= self.binary_sample_threshold {
            return false;
        }

        let non_ascii = text.chars().filter(|c| !c.is_ascii()).count();
        non_ascii as f64 / total as f64 > self.binary_non_ascii_ratio
    }
}

impl Default for DocumentLoader {
    fn default() -> Self {
        Self::new(&ProcessingConfig::default())
    }
}

/// Extract every page and join pages with a blank line.
fn extract_pdf_text(bytes: &[u8]) -> Result<String> {
    // pdf-extract panics on some malformed inputs
    let pages = panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(bytes)
    }))
    .map_err(|_| AxonError::Processing("PDF extraction panicked".to_string()))?
    .map_err(|e| AxonError::Processing(format!("PDF extraction failed: {e}")))?;

    Ok(pages
        .iter()
        .map(|page| page.trim())
        .filter(|page| !page.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_file(name: &str, content: &str) -> UploadedFile {
        UploadedFile::new(name, Some("text/plain".to_string()), content.as_bytes().to_vec())
    }

    #[test]
    fn test_plain_text_is_trimmed() {
        let loader = DocumentLoader::default();
        let text = loader.load(&text_file("notes.txt", "  My favorite color is teal.  \n"));
        assert_eq!(text, "My favorite color is teal.");
    }

    #[test]
    fn test_mostly_non_ascii_text_is_discarded() {
        let loader = DocumentLoader::default();
        let content = "é".repeat(150);
        assert!(loader.load(&text_file("blob.txt", &content)).is_empty());
    }

    #[test]
    fn test_short_non_ascii_text_is_kept() {
        let loader = DocumentLoader::default();
        let content = "日本語のテキスト";
        assert_eq!(loader.load(&text_file("jp.txt", content)), content);
    }

    #[test]
    fn test_invalid_utf8_becomes_replacement_and_is_filtered() {
        let loader = DocumentLoader::default();
        let file = UploadedFile::new("image.png", None, vec![0xFF; 400]);
        assert!(loader.load(&file).is_empty());
    }

    #[test]
    fn test_threshold_boundary_is_exclusive() {
        let loader = DocumentLoader::default();
        // exactly 100 characters is never inspected
        assert!(!loader.looks_binary(&"ü".repeat(100)));
        assert!(loader.looks_binary(&"ü".repeat(101)));
        // half non-ASCII is not more than half
        let half = format!("{}{}", "a".repeat(100), "ü".repeat(100));
        assert!(!loader.looks_binary(&half));
    }

    #[test]
    fn test_broken_pdf_degrades_to_empty() {
        let loader = DocumentLoader::default();
        let file = UploadedFile::new(
            "broken.pdf",
            Some("application/pdf".to_string()),
            b"definitely not a pdf".to_vec(),
        );
        assert!(loader.try_load(&file).is_err());
        assert!(loader.load(&file).is_empty());
    }
}
