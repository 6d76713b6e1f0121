use crate::types::{SearchResponse, SearchResult};
use clap::{Parser, Subcommand};
use std::fmt::Write;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mansearch")]
#[command(about = "Build and query a searchable index of command manual pages", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build search artifacts from a directory of JSON command records
    Build {
        /// Corpus directory
        #[arg(short, long)]
        input: PathBuf,
        /// Directory to write the artifacts into
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Search commands
    Search {
        query: String,
        /// Artifact directory for the local fuzzy tier
        #[arg(short, long, default_value = "dist")]
        artifacts: PathBuf,
        #[arg(short, long)]
        section: Option<u32>,
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Remote base URL, overriding the config file
        #[arg(long)]
        remote: Option<String>,
        #[arg(short, long)]
        threshold: Option<f64>,
        /// Do not fall back to fuzzy matching on an empty remote answer
        #[arg(long)]
        no_fuzzy: bool,
        /// Print the raw response as JSON
        #[arg(long)]
        json: bool,
    },
    /// Suggest command names for a prefix
    Suggest {
        prefix: String,
        #[arg(short, long, default_value = "dist")]
        artifacts: PathBuf,
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
        #[arg(long)]
        remote: Option<String>,
    },
}

/// Renders a response as one block per result.
pub fn format_response(query: &str, response: &SearchResponse) -> String {
    if response.results.is_empty() {
        return format!("No results for '{}'\n", query);
    }

    let mut out = String::new();
    if response.is_fuzzy() {
        let _ = writeln!(out, "Approximate matches for '{}':", query);
    } else {
        let _ = writeln!(out, "Results for '{}' ({} total):", query, response.total);
    }
    for result in &response.results {
        out.push('\n');
        format_result(&mut out, result);
    }
    out
}

fn format_result(out: &mut String, result: &SearchResult) {
    let doc = &result.document;
    let _ = writeln!(out, "{}({})  {:.2}", doc.name, doc.section, result.score);
    if !doc.title.is_empty() {
        let _ = writeln!(out, "    {}", doc.title);
    }
    if let Some(highlights) = &result.highlights {
        for (field, snippets) in highlights {
            for snippet in snippets {
                let _ = writeln!(out, "    [{}] …{}…", field, snippet);
            }
        }
    }
}
