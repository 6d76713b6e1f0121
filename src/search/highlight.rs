//! Snippet extraction around matched spans.

use super::matcher::MatchSpans;
use crate::types::{Field, Highlights, SearchDocument};

/// Characters of context kept on each side of a match.
pub const SNIPPET_CONTEXT: usize = 20;

/// Only these fields are worth showing as snippets.
pub const HIGHLIGHT_FIELDS: &[Field] = &[Field::Name, Field::Title, Field::Description];

/// Cuts a `start - 20 .. end + 20` window (clamped) out of `value` for each span.
///
/// Spans are character ranges. Overlapping spans are not merged, so they yield
/// overlapping snippets.
pub fn extract_snippets(value: &str, spans: &[std::ops::Range<usize>]) -> Vec<String> {
    let chars: Vec<char> = value.chars().collect();
    spans
        .iter()
        .filter(|span| span.start < chars.len())
        .map(|span| {
            let start = span.start.saturating_sub(SNIPPET_CONTEXT);
            let end = span.end.saturating_add(SNIPPET_CONTEXT).min(chars.len());
            chars[start..end].iter().collect()
        })
        .collect()
}

/// Builds highlights for a document, or `None` when no highlightable field matched.
pub fn build_highlights(document: &SearchDocument, spans: &MatchSpans) -> Option<Highlights> {
    let highlights: Highlights = HIGHLIGHT_FIELDS
        .iter()
        .filter_map(|&field| {
            let field_spans = spans.get(field);
            if field_spans.is_empty() {
                return None;
            }
            let snippets = extract_snippets(&document.field_text(field), field_spans);
            (!snippets.is_empty()).then(|| (field.as_str().to_string(), snippets))
        })
        .collect();

    (!highlights.is_empty()).then_some(highlights)
}
