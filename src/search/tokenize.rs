//! Text normalization and keyword derivation for search indexing.

use ahash::AHashSet;

/// Maximum number of keywords kept per document.
pub(crate) const MAX_KEYWORDS: usize = 20;

/// Title/description words must be longer than this to become keywords.
const MIN_KEYWORD_WORD_LEN: usize = 3;

/// Derives the keyword list for a document.
///
/// Order of insertion, which is also the truncation priority:
/// 1. the raw name
/// 2. for hyphenated names, the dehyphenated form and each part
/// 3. lowercased title and description words longer than three characters
/// 4. related command names
///
/// Duplicates keep their first position. The list is capped at [`MAX_KEYWORDS`].
pub(crate) fn extract_keywords(
    name: &str,
    title: &str,
    description: &str,
    related: &[String],
) -> Vec<String> {
    let mut keywords = KeywordSet::default();
    keywords.push(name);

    if name.contains('-') {
        keywords.push(&name.replace('-', ""));
        for part in name.split('-') {
            keywords.push(part);
        }
    }

    let text = format!("{} {}", title, description);
    for word in text.split_whitespace() {
        if word.chars().count() > MIN_KEYWORD_WORD_LEN {
            keywords.push(&word.to_lowercase());
        }
    }

    for command in related {
        keywords.push(command.trim());
    }

    keywords.finish()
}

/// Insertion-ordered set of non-empty terms.
#[derive(Default)]
struct KeywordSet {
    seen: AHashSet<String>,
    ordered: Vec<String>,
}

impl KeywordSet {
    fn push(&mut self, term: &str) {
        if term.is_empty() || self.seen.contains(term) {
            return;
        }
        self.seen.insert(term.to_string());
        self.ordered.push(term.to_string());
    }

    fn finish(mut self) -> Vec<String> {
        self.ordered.truncate(MAX_KEYWORDS);
        self.ordered
    }
}

/// Lowercases text one character at a time.
///
/// Unlike `str::to_lowercase`, the output has exactly as many characters as the
/// input, so match positions in the normalized text index the original too.
pub(crate) fn normalize(text: &str) -> String {
    text.chars()
        .map(|c| c.to_lowercase().next().unwrap_or(c))
        .collect()
}

/// Number of whitespace-separated tokens, at least 1.
pub(crate) fn token_count(text: &str) -> usize {
    text.split_whitespace().count().max(1)
}
