//! Raw per-command records and the directory reader that loads them.
//!
//! Each `*.json` file under the corpus directory holds one command record as
//! exported by the documentation site. Loading is lenient: a broken file yields
//! a [`CorpusError`] for that file only.

use crate::error::{CorpusError, Result};
use anyhow::Context;
use ignore::WalkBuilder;
use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_CATEGORY: &str = "general";

/// One command-line option as described on its manual page.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawOption {
    pub flag: String,
    pub description: String,
}

/// Examples come either as bare command strings or with an explanation.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawExample {
    Plain(String),
    Detailed {
        command: String,
        #[serde(default)]
        description: String,
    },
}

impl RawExample {
    pub fn command(&self) -> &str {
        match self {
            Self::Plain(command) | Self::Detailed { command, .. } => command,
        }
    }
}

/// A command record exactly as stored on disk.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCommand {
    pub name: String,
    #[serde(default = "default_section")]
    pub section: u32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub synopsis: Option<String>,
    #[serde(default)]
    pub options: Vec<RawOption>,
    #[serde(default)]
    pub examples: Vec<RawExample>,
    #[serde(default, alias = "seeAlso")]
    pub related_commands: Vec<String>,
    #[serde(default)]
    pub is_common: bool,
}

const fn default_section() -> u32 {
    1
}

impl RawCommand {
    pub fn category(&self) -> &str {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CATEGORY)
    }

    /// Full-text blob: title, description, synopsis, options and examples.
    pub fn content(&self) -> String {
        let mut parts: Vec<&str> = vec![&self.title, &self.description];
        if let Some(synopsis) = &self.synopsis {
            parts.push(synopsis);
        }
        for option in &self.options {
            parts.push(&option.flag);
            parts.push(&option.description);
        }
        for example in &self.examples {
            parts.push(example.command());
            if let RawExample::Detailed { description, .. } = example {
                parts.push(description);
            }
        }

        parts
            .into_iter()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Outcome of reading one corpus file.
pub type RecordResult = std::result::Result<RawCommand, CorpusError>;

/// Lists every `*.json` file below `dir` in sorted path order.
pub async fn list_record_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let metadata = tokio::fs::metadata(dir)
        .await
        .with_context(|| format!("Corpus directory not found: {}", dir.display()))?;
    anyhow::ensure!(
        metadata.is_dir(),
        "Corpus path is not a directory: {}",
        dir.display()
    );

    let dir = dir.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let mut files: Vec<PathBuf> = WalkBuilder::new(&dir)
            .build()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_some_and(|t| t.is_file()))
            .map(ignore::DirEntry::into_path)
            .filter(|p| p.extension().and_then(|ext| ext.to_str()) == Some("json"))
            .collect();

        // Sorted so name-index collisions resolve the same way on every run
        files.sort();
        files
    })
    .await
    .context("Corpus walk task panicked")
}

/// Reads and parses a single record file.
pub async fn read_record(path: &Path) -> RecordResult {
    let bytes = tokio::fs::read(path).await.map_err(|source| CorpusError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let record: RawCommand =
        serde_json::from_slice(&bytes).map_err(|source| CorpusError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    if record.name.trim().is_empty() {
        return Err(CorpusError::MissingName {
            path: path.to_path_buf(),
        });
    }

    Ok(record)
}

/// Reads every record under `dir`, pairing each file with its outcome.
///
/// Only a missing or unreadable corpus directory is an error; per-file
/// failures are returned in place.
pub async fn read_corpus(dir: &Path) -> Result<Vec<(PathBuf, RecordResult)>> {
    let files = list_record_files(dir).await?;
    tracing::debug!("Reading {} corpus files from {}", files.len(), dir.display());

    let mut records = Vec::with_capacity(files.len());
    for path in files {
        let record = read_record(&path).await;
        records.push((path, record));
    }
    Ok(records)
}
