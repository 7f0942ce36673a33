//! Text extraction collaborator

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};
use crate::types::ContentType;

/// Turns uploaded bytes into plain text
pub trait TextExtractor: Send + Sync {
    /// Extract text, or fail with `UnsupportedFormat` / `ExtractionFailed`
    fn extract(&self, filename: &str, content_type: ContentType, bytes: &[u8]) -> Result<String>;

    fn supports(&self, content_type: ContentType) -> bool;
}

/// Extractor for formats that are already UTF-8 text
#[derive(Debug, Clone, Default)]
pub struct PlainTextExtractor;

impl PlainTextExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, filename: &str, content_type: ContentType, bytes: &[u8]) -> Result<String> {
        if !self.supports(content_type) {
            return Err(Error::UnsupportedFormat(format!(
                "{} ({})",
                filename,
                content_type.display_name()
            )));
        }

        let text = std::str::from_utf8(bytes)
            .map_err(|e| Error::extraction(filename, format!("invalid UTF-8: {e}")))?;
        let text = text.trim_start_matches('\u{feff}');

        let text = match content_type {
            ContentType::Html => strip_html(text),
            _ => text.to_string(),
        };

        if text.trim().is_empty() {
            return Err(Error::extraction(filename, "no text content"));
        }

        Ok(text)
    }

    fn supports(&self, content_type: ContentType) -> bool {
        content_type.is_plain_text()
    }
}

static HTML_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<script.*?</script>|<style.*?</style>|<[^>]+>").expect("Invalid regex")
});

/// Drop tags, scripts and styles, collapsing the whitespace left behind
fn strip_html(html: &str) -> String {
    let text = HTML_TAG.replace_all(html, " ");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
