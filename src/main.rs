use anyhow::Context;
use clap::Parser;
use mansearch::cli::{Cli, Commands, format_response};
use mansearch::{Config, SearchClient, SearchQuery, run_build};
use std::path::Path;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    mansearch::tracing::init();

    let cli = Cli::parse();
    let mut config = Config::load();

    match cli.command {
        Commands::Build { input, output } => {
            let report = run_build(&input, &output).await?;
            for skipped in &report.skipped {
                eprintln!("skipped {}: {}", skipped.path.display(), skipped.reason);
            }
            println!(
                "Built {} documents ({} categories, {} common, {} duplicates) in {:?}",
                report.documents,
                report.categories,
                report.common,
                report.duplicates,
                report.elapsed
            );
        }
        Commands::Search {
            query,
            artifacts,
            section,
            limit,
            remote,
            threshold,
            no_fuzzy,
            json,
        } => {
            if remote.is_some() {
                config.remote.base_url = remote;
            }
            let client = open_client(&config, &artifacts).await?;

            let mut search = SearchQuery::new(&query)
                .limit(limit.unwrap_or(config.search.default_limit))
                .threshold(threshold.unwrap_or(config.fuzzy.threshold))
                .fuzzy(!no_fuzzy);
            if let Some(section) = section {
                search = search.section(section);
            }

            let response = client.search(search).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                print!("{}", format_response(&query, &response));
            }
        }
        Commands::Suggest {
            prefix,
            artifacts,
            limit,
            remote,
        } => {
            if remote.is_some() {
                config.remote.base_url = remote;
            }
            let client = open_client(&config, &artifacts).await?;
            for name in client.suggest(&prefix, limit).await {
                println!("{}", name);
            }
        }
    }

    Ok(())
}

/// Builds a client, loading the local tier if the artifacts exist.
async fn open_client(config: &Config, artifacts: &Path) -> anyhow::Result<SearchClient> {
    let client = SearchClient::from_config(config).context("Failed to create search client")?;
    if let Err(e) = client.load_engine(artifacts, config).await {
        tracing::warn!("Local search unavailable: {:#}", e);
    }
    Ok(client)
}
