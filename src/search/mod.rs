//! Local fuzzy search infrastructure.
//!
//! This module provides the persisted fuzzy index, the weighted matcher that
//! runs over it, and the helpers that turn matches into scored, highlighted results.

pub(crate) mod engine;
pub(crate) mod highlight;
pub(crate) mod index;
pub(crate) mod matcher;
pub(crate) mod scoring;
pub(crate) mod tokenize;

pub use engine::{FuzzyEngine, FuzzyMatch};
pub use highlight::{HIGHLIGHT_FIELDS, SNIPPET_CONTEXT, build_highlights, extract_snippets};
pub use index::{FuzzyIndex, INDEXED_FIELDS, IndexRecord, IndexedValue};
pub use matcher::{FieldMatch, MatchOptions, MatchSpans, match_spans, match_text};
pub use scoring::relevance_from_distance;

pub(crate) use scoring::prefix_relevance;
pub(crate) use tokenize::extract_keywords;
