//! Fuzzy query engine over a loaded [`FuzzyIndex`].

use super::index::{FuzzyIndex, INDEX_VERSION, IndexRecord};
use super::matcher::{MatchOptions, MatchSpans, match_chars};
use super::scoring::{FieldScore, combine_distances, normalize_weights};
use super::tokenize::normalize;
use crate::build::{DOCUMENTS_FILE, FUSE_INDEX_FILE};
use crate::config::FuzzyConfig;
use crate::error::Result;
use crate::types::{Field, SearchDocument};
use anyhow::Context;
use std::path::Path;

/// One ranked match.
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyMatch {
    /// Position in [`FuzzyEngine::documents`].
    pub doc: usize,
    /// 0.0 is a perfect match, 1.0 the worst accepted.
    pub distance: f64,
    pub spans: MatchSpans,
}

/// A searchable column: which field, where it lives in a record, and its weight.
#[derive(Debug, Clone, Copy)]
struct Column {
    field: Field,
    position: usize,
    weight: f64,
}

/// Weighted multi-field fuzzy matcher.
///
/// Built once per process from the build artifacts and shared behind an `Arc`;
/// searching never mutates it.
#[derive(Debug)]
pub struct FuzzyEngine {
    index: FuzzyIndex,
    documents: Vec<SearchDocument>,
    config: FuzzyConfig,
    columns: Vec<Column>,
}

impl FuzzyEngine {
    /// Wraps a prebuilt index and the document list it was built from.
    pub fn new(
        index: FuzzyIndex,
        documents: Vec<SearchDocument>,
        config: FuzzyConfig,
    ) -> Result<Self> {
        anyhow::ensure!(
            index.version == INDEX_VERSION,
            "Unsupported fuzzy index version {} (expected {})",
            index.version,
            INDEX_VERSION
        );
        if let Some(record) = index.records.iter().find(|r| r.doc >= documents.len()) {
            anyhow::bail!(
                "Fuzzy index refers to document {} but only {} documents were loaded",
                record.doc,
                documents.len()
            );
        }

        let weights: Vec<(Field, f64)> = config.weights.iter().map(|(f, w)| (*f, *w)).collect();
        let columns = Self::columns_for(&index, &weights);
        if columns.is_empty() {
            tracing::warn!("No weighted field is present in the fuzzy index; every search will be empty");
        }

        Ok(Self {
            index,
            documents,
            config,
            columns,
        })
    }

    /// Builds the index in memory instead of loading it.
    pub fn from_documents(documents: Vec<SearchDocument>, config: FuzzyConfig) -> Result<Self> {
        let index = FuzzyIndex::build(&documents);
        Self::new(index, documents, config)
    }

    /// Loads `fuse-index.json` and `documents.json` from an artifact directory.
    pub async fn load(dir: &Path, config: FuzzyConfig) -> Result<Self> {
        let start = std::time::Instant::now();

        let index_path = dir.join(FUSE_INDEX_FILE);
        let index_json = tokio::fs::read(&index_path)
            .await
            .with_context(|| format!("Failed to read fuzzy index {}", index_path.display()))?;
        let docs_path = dir.join(DOCUMENTS_FILE);
        let docs_json = tokio::fs::read(&docs_path)
            .await
            .with_context(|| format!("Failed to read documents {}", docs_path.display()))?;

        // Deserialize in spawn_blocking since large corpora take a while
        let (index, documents) = tokio::task::spawn_blocking(move || -> Result<_> {
            let index: FuzzyIndex =
                serde_json::from_slice(&index_json).context("Malformed fuzzy index")?;
            let documents: Vec<SearchDocument> =
                serde_json::from_slice(&docs_json).context("Malformed documents list")?;
            Ok((index, documents))
        })
        .await
        .context("Index loading task panicked")??;

        let engine = Self::new(index, documents, config)?;
        tracing::info!(
            "Loaded fuzzy index from {} ({} documents) in {:?}",
            dir.display(),
            engine.documents.len(),
            start.elapsed()
        );
        Ok(engine)
    }

    fn columns_for(index: &FuzzyIndex, weights: &[(Field, f64)]) -> Vec<Column> {
        let present: Vec<(Field, f64)> = weights
            .iter()
            .copied()
            .filter(|(field, _)| index.key_position(*field).is_some())
            .collect();

        normalize_weights(&present)
            .into_iter()
            .filter_map(|(field, weight)| {
                index.key_position(field).map(|position| Column {
                    field,
                    position,
                    weight,
                })
            })
            .collect()
    }

    pub fn documents(&self) -> &[SearchDocument] {
        &self.documents
    }

    pub fn document(&self, doc: usize) -> Option<&SearchDocument> {
        self.documents.get(doc)
    }

    pub const fn config(&self) -> &FuzzyConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Searches the configured weighted fields.
    ///
    /// Results are sorted by ascending distance; ties keep corpus order.
    pub fn search(&self, query: &str, limit: Option<usize>) -> Vec<FuzzyMatch> {
        self.search_with(query, limit, None)
    }

    /// Like [`FuzzyEngine::search`], overriding the configured threshold.
    pub fn search_with(
        &self,
        query: &str,
        limit: Option<usize>,
        threshold: Option<f64>,
    ) -> Vec<FuzzyMatch> {
        let mut options = self.config.match_options();
        if let Some(threshold) = threshold {
            options.threshold = threshold;
        }
        self.run(query, &self.columns, limit, &options)
    }

    /// Searches only `fields`, equally weighted, optionally with another threshold.
    pub fn search_fields(
        &self,
        query: &str,
        fields: &[Field],
        limit: Option<usize>,
        threshold: Option<f64>,
    ) -> Vec<FuzzyMatch> {
        let weights: Vec<(Field, f64)> = fields.iter().map(|&f| (f, 1.0)).collect();
        let columns = Self::columns_for(&self.index, &weights);

        let mut options = self.config.match_options();
        if let Some(threshold) = threshold {
            options.threshold = threshold;
        }
        self.run(query, &columns, limit, &options)
    }

    fn run(
        &self,
        query: &str,
        columns: &[Column],
        limit: Option<usize>,
        options: &MatchOptions,
    ) -> Vec<FuzzyMatch> {
        let pattern: Vec<char> = normalize(query.trim()).chars().collect();
        if pattern.len() < options.min_match_char_length || columns.is_empty() {
            return Vec::new();
        }

        let mut matches: Vec<FuzzyMatch> = self
            .index
            .records
            .iter()
            .filter_map(|record| score_record(record, &pattern, columns, options))
            .collect();

        matches.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        if let Some(limit) = limit {
            matches.truncate(limit);
        }
        matches
    }
}

/// Scores one record; `None` when no weighted field matched.
///
/// A name equal to the whole query is a perfect record, so `ls` outranks
/// `lsblk` for the query `ls` however well their other fields match.
fn score_record(
    record: &IndexRecord,
    pattern: &[char],
    columns: &[Column],
    options: &MatchOptions,
) -> Option<FuzzyMatch> {
    let mut fields = Vec::with_capacity(columns.len());
    let mut spans = MatchSpans::default();
    let mut exact_name = false;

    for column in columns {
        let Some(values) = record.values.get(column.position) else {
            continue;
        };

        // Multi-valued fields count once, with their best value
        let mut best: Option<(f64, f64)> = None;
        for value in values {
            let text: Vec<char> = value.text.chars().collect();
            if column.field == Field::Name && text == pattern {
                exact_name = true;
            }
            if let Some(found) = match_chars(pattern, &text, options) {
                if best.is_none_or(|(d, _)| found.distance < d) {
                    best = Some((found.distance, value.norm));
                }
                if column.field != Field::Keywords {
                    spans.push(column.field, found.span);
                }
            }
        }

        if let Some((distance, norm)) = best {
            fields.push(FieldScore {
                distance,
                weight: column.weight,
                norm,
            });
        }
    }

    combine_distances(&fields).map(|distance| FuzzyMatch {
        doc: record.doc,
        distance: if exact_name { 0.0 } else { distance },
        spans,
    })
}
