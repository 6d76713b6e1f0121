//! Approximate substring matching over normalized field text.
//!
//! A field's distance is `errors / pattern_len + position / location_distance`:
//! typos cost in proportion to the query length, and matches further into the
//! field cost more. Everything here is a pure function over character slices.

use super::tokenize::normalize;
use crate::types::{Field, SearchDocument};
use rapidfuzz::distance::levenshtein;
use std::collections::BTreeMap;
use std::ops::Range;

/// Knobs that shape a single match.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchOptions {
    /// Largest distance accepted as a match (0.0 exact only, 1.0 anything).
    pub threshold: f64,
    /// Queries and matched spans shorter than this never match.
    pub min_match_char_length: usize,
    /// Characters of offset that cost a full 1.0 of distance.
    pub location_distance: usize,
    /// Match anywhere in the field without a position penalty.
    pub ignore_location: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            threshold: 0.3,
            min_match_char_length: 2,
            location_distance: 100,
            ignore_location: false,
        }
    }
}

/// Best match of a pattern within one field value.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMatch {
    pub distance: f64,
    /// Character range of the matched window.
    pub span: Range<usize>,
}

/// Matched character ranges per field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchSpans(BTreeMap<Field, Vec<Range<usize>>>);

impl MatchSpans {
    pub(crate) fn push(&mut self, field: Field, span: Range<usize>) {
        self.0.entry(field).or_default().push(span);
    }

    pub fn get(&self, field: Field) -> &[Range<usize>] {
        self.0.get(&field).map_or(&[], Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &[Range<usize>])> {
        self.0.iter().map(|(field, spans)| (*field, spans.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Finds the best window of `text` matching `pattern`, if within the threshold.
///
/// Both inputs must already be normalized. Windows of `len - 1 ..= len + 1`
/// characters are compared so a single insertion or deletion is tolerated at
/// the same cost as a substitution.
pub fn match_chars(pattern: &[char], text: &[char], options: &MatchOptions) -> Option<FieldMatch> {
    let m = pattern.len();
    if m == 0 || m < options.min_match_char_length || text.is_empty() {
        return None;
    }

    let location_distance = options.location_distance.max(1) as f64;
    let last_start = if options.ignore_location {
        text.len() - 1
    } else {
        // Past this offset the position penalty alone exceeds the threshold
        let reach = (options.threshold * location_distance).floor() as usize;
        reach.min(text.len() - 1)
    };

    let mut best: Option<FieldMatch> = None;
    for start in 0..=last_start {
        let proximity = if options.ignore_location {
            0.0
        } else {
            start as f64 / location_distance
        };
        if best.as_ref().is_some_and(|b| b.distance <= proximity) {
            break;
        }

        let remaining = text.len() - start;
        for len in [m, m.saturating_sub(1), m + 1] {
            let len = len.min(remaining);
            if len == 0 || len < options.min_match_char_length {
                continue;
            }

            let window = &text[start..start + len];
            let errors = levenshtein::distance(pattern.iter().copied(), window.iter().copied());
            let distance = (errors as f64 / m as f64 + proximity).min(1.0);
            if distance > options.threshold {
                continue;
            }
            if best.as_ref().is_none_or(|b| distance < b.distance) {
                best = Some(FieldMatch {
                    distance,
                    span: start..start + len,
                });
            }
        }
    }

    best
}

/// Convenience wrapper over [`match_chars`] for unnormalized strings.
pub fn match_text(pattern: &str, text: &str, options: &MatchOptions) -> Option<FieldMatch> {
    let pattern: Vec<char> = normalize(pattern.trim()).chars().collect();
    let text: Vec<char> = normalize(text).chars().collect();
    match_chars(&pattern, &text, options)
}

/// Computes match spans for a document directly from its field values.
///
/// Independent of any index, so highlight extraction can be tested and reused
/// without a loaded engine. Keywords are multi-valued and have no single text
/// to point into, so they never produce spans.
pub fn match_spans(
    document: &SearchDocument,
    query: &str,
    fields: &[Field],
    options: &MatchOptions,
) -> MatchSpans {
    let mut spans = MatchSpans::default();
    for &field in fields {
        if field == Field::Keywords {
            continue;
        }
        if let Some(found) = match_text(query, &document.field_text(field), options) {
            spans.push(field, found.span);
        }
    }
    spans
}
