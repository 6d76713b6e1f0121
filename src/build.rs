//! Offline index builder.
//!
//! One pass over the corpus produces five artifacts, all derived from the same
//! deduplicated document list so document ids agree between them:
//!
//! | file | contents |
//! |------|----------|
//! | `name-index.json` | `name → SearchDocument` (last write wins on collisions) |
//! | `category-index.json` | `category → [summary]` in corpus order |
//! | `fuse-index.json` | the serialized [`FuzzyIndex`] |
//! | `documents.json` | every `SearchDocument`, in corpus order |
//! | `common-commands.json` | summaries of `isCommon` documents |
//!
//! Every run is a full rebuild. Maps serialize with sorted keys, so an unchanged
//! corpus produces byte-identical output.

use crate::corpus::{RawCommand, read_corpus};
use crate::error::Result;
use crate::search::{FuzzyIndex, extract_keywords};
use crate::types::{DocumentSummary, SearchDocument};
use anyhow::Context;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const NAME_INDEX_FILE: &str = "name-index.json";
pub const CATEGORY_INDEX_FILE: &str = "category-index.json";
pub const FUSE_INDEX_FILE: &str = "fuse-index.json";
pub const DOCUMENTS_FILE: &str = "documents.json";
pub const COMMON_COMMANDS_FILE: &str = "common-commands.json";

/// A corpus file left out of the build, and why.
#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Summary of one build run.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    pub documents: usize,
    pub categories: usize,
    pub common: usize,
    /// Records replaced by a later file with the same id.
    pub duplicates: usize,
    pub skipped: Vec<SkippedFile>,
    pub elapsed: Duration,
}

/// The five lookup structures derived from a corpus.
#[derive(Debug, Clone)]
pub struct ArtifactSet {
    pub name_index: BTreeMap<String, SearchDocument>,
    pub category_index: BTreeMap<String, Vec<DocumentSummary>>,
    pub fuzzy_index: FuzzyIndex,
    pub documents: Vec<SearchDocument>,
    pub common_commands: Vec<DocumentSummary>,
}

/// Turns a raw record into its searchable document.
pub fn document_from_record(raw: &RawCommand) -> SearchDocument {
    let name = raw.name.trim().to_string();
    SearchDocument {
        id: SearchDocument::make_id(&name, raw.section),
        keywords: extract_keywords(&name, &raw.title, &raw.description, &raw.related_commands),
        name,
        section: raw.section,
        title: raw.title.clone(),
        description: raw.description.clone(),
        category: raw.category().to_string(),
        content: raw.content(),
        is_common: raw.is_common,
        examples: raw
            .examples
            .iter()
            .map(|example| example.command().to_string())
            .collect(),
    }
}

/// Drops earlier documents whose id reappears later.
///
/// The surviving record sits where it was read, so the result keeps file order
/// and the name index's last-write-wins follows that order too. Returns the
/// surviving documents and the number replaced.
pub fn dedup_documents(documents: Vec<SearchDocument>) -> (Vec<SearchDocument>, usize) {
    let mut positions: HashMap<String, usize> = HashMap::with_capacity(documents.len());
    let mut slots: Vec<Option<SearchDocument>> = Vec::with_capacity(documents.len());
    let mut replaced = 0;

    for document in documents {
        if let Some(position) = positions.insert(document.id.clone(), slots.len()) {
            tracing::warn!("Duplicate document id '{}', keeping the later record", document.id);
            slots[position] = None;
            replaced += 1;
        }
        slots.push(Some(document));
    }

    (slots.into_iter().flatten().collect(), replaced)
}

impl ArtifactSet {
    /// Derives every artifact from an already deduplicated document list.
    pub fn from_documents(documents: Vec<SearchDocument>) -> Self {
        let mut name_index = BTreeMap::new();
        let mut category_index: BTreeMap<String, Vec<DocumentSummary>> = BTreeMap::new();
        let mut common_commands = Vec::new();

        for document in &documents {
            if let Some(previous) = name_index.insert(document.name.clone(), document.clone()) {
                tracing::debug!(
                    "Name '{}' maps to {} now, replacing {}",
                    document.name,
                    document.id,
                    previous.id
                );
            }

            category_index
                .entry(document.category.clone())
                .or_default()
                .push(document.summary());

            if document.is_common {
                common_commands.push(document.summary());
            }
        }

        let fuzzy_index = FuzzyIndex::build(&documents);

        Self {
            name_index,
            category_index,
            fuzzy_index,
            documents,
            common_commands,
        }
    }

    /// Writes all artifacts as pretty JSON, creating `dir` if needed.
    pub async fn write(&self, dir: &Path) -> Result<()> {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

        write_json(&dir.join(NAME_INDEX_FILE), &self.name_index).await?;
        write_json(&dir.join(CATEGORY_INDEX_FILE), &self.category_index).await?;
        write_json(&dir.join(FUSE_INDEX_FILE), &self.fuzzy_index).await?;
        write_json(&dir.join(DOCUMENTS_FILE), &self.documents).await?;
        write_json(&dir.join(COMMON_COMMANDS_FILE), &self.common_commands).await?;
        Ok(())
    }
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_vec_pretty(value)
        .with_context(|| format!("Failed to serialize {}", path.display()))?;
    tokio::fs::write(path, content)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// Reads the corpus and derives the artifacts without writing anything.
///
/// Broken files are logged and listed in the report; they never fail the build.
pub async fn build_artifacts(input: &Path) -> Result<(ArtifactSet, BuildReport)> {
    let start = std::time::Instant::now();
    let records = read_corpus(input).await?;

    let mut documents = Vec::with_capacity(records.len());
    let mut skipped = Vec::new();
    for (path, record) in records {
        match record {
            Ok(raw) => documents.push(document_from_record(&raw)),
            Err(e) => {
                tracing::warn!("Skipping corpus file: {}", e);
                skipped.push(SkippedFile {
                    path,
                    reason: e.to_string(),
                });
            }
        }
    }

    let (documents, duplicates) = dedup_documents(documents);
    let artifacts = ArtifactSet::from_documents(documents);

    let report = BuildReport {
        documents: artifacts.documents.len(),
        categories: artifacts.category_index.len(),
        common: artifacts.common_commands.len(),
        duplicates,
        skipped,
        elapsed: start.elapsed(),
    };

    tracing::info!(
        "Built search artifacts: {} documents, {} categories, {} common, {} skipped in {:?}",
        report.documents,
        report.categories,
        report.common,
        report.skipped.len(),
        report.elapsed
    );

    Ok((artifacts, report))
}

/// Full rebuild: read `input`, write every artifact to `output`.
pub async fn run_build(input: &Path, output: &Path) -> Result<BuildReport> {
    let (artifacts, report) = build_artifacts(input).await?;
    artifacts.write(output).await?;
    tracing::debug!("Wrote artifacts to {}", output.display());
    Ok(report)
}
