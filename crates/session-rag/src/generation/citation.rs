//! Citation building, snippet truncation and highlighting

use crate::types::{Citation, RelevanceInfo};

use super::prompt::PromptPassage;

/// Build the citation for a passage that went into the prompt
pub fn citation_for(passage: &PromptPassage, terms: &[String], excerpt_chars: usize) -> Citation {
    let excerpt = truncate_snippet(&passage.text, excerpt_chars);
    let term_refs: Vec<&str> = terms.iter().map(String::as_str).collect();

    Citation {
        document_id: passage.document_id,
        chunk_id: passage.chunk_id,
        chunk_index: passage.chunk_index,
        filename: passage.source.filename.clone(),
        page_number: passage.source.page_number,
        excerpt_highlighted: highlight_snippet(&excerpt, &term_refs),
        excerpt,
        similarity: passage.similarity,
        relevance: RelevanceInfo::from_similarity(passage.similarity),
    }
}

/// Highlight query terms in citation snippets
pub fn highlight_snippet(snippet: &str, query_terms: &[&str]) -> String {
    let mut highlighted = snippet.to_string();

    for term in query_terms {
        if term.chars().count() < 3 {
            continue; // Skip very short terms
        }

        let re = regex::RegexBuilder::new(&format!(r"\b{}\b", regex::escape(term)))
            .case_insensitive(true)
            .build();

        if let Ok(re) = re {
            highlighted = re
                .replace_all(&highlighted, |caps: &regex::Captures| {
                    format!("<mark>{}</mark>", &caps[0])
                })
                .to_string();
        }
    }

    highlighted
}

/// Truncate snippet to at most `max_chars` characters, preferring a word boundary
pub fn truncate_snippet(snippet: &str, max_chars: usize) -> String {
    if snippet.chars().count() <= max_chars {
        return snippet.to_string();
    }

    let end = snippet
        .char_indices()
        .nth(max_chars)
        .map(|(i, _)| i)
        .unwrap_or(snippet.len());

    // Try to end at a word boundary
    match snippet[..end].rfind(' ') {
        Some(pos) if pos > 0 => format!("{}...", &snippet[..pos]),
        _ => format!("{}...", &snippet[..end]),
    }
}
