//! Command-line entry point for the policy scanner.
//!
//! Three operations: bulk-import companies from CSV, process a batch of
//! pending companies, and semantic search over indexed policy text.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use server_core::config::Config;
use server_core::domains::batch::{import_csv, BatchProcessor};
use server_core::domains::companies::PgCompanyStore;
use server_core::kernel::ai::OpenAIClient;
use server_core::kernel::discovery::HomepageLinkDiscoverer;
use server_core::kernel::extractor::LlmFactExtractor;
use server_core::kernel::scraper::PolicyFetcher;
use server_core::kernel::vector_store::PgVectorIndexer;
use server_core::kernel::ServerDeps;

#[derive(Parser)]
#[command(name = "policyscan", about = "Policy discovery and extraction pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import companies from a CSV file as pending work items
    Import {
        /// Path to a CSV file with id, name and domain columns
        file: PathBuf,
    },
    /// Lease pending companies and run the policy pipeline on each
    ProcessPending {
        /// Maximum number of companies to lease
        #[arg(long, default_value_t = 10)]
        limit: i64,
    },
    /// Semantic search over indexed policy text
    Search {
        /// Free-text query
        query: String,
        /// Maximum number of hits
        #[arg(long, default_value_t = 5)]
        limit: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    match cli.command {
        Command::Import { file } => {
            let source = File::open(&file)
                .with_context(|| format!("Failed to open {}", file.display()))?;
            let store = PgCompanyStore::new(pool);
            let summary = import_csv(source, &store).await;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::ProcessPending { limit } => {
            let ai = Arc::new(OpenAIClient::new(
                config.openai_api_key.clone(),
                config.openai_model.clone(),
                config.embedding_model.clone(),
            ));
            let deps = ServerDeps::new(
                Arc::new(PgCompanyStore::new(pool.clone())),
                Arc::new(HomepageLinkDiscoverer::new()?),
                Arc::new(PolicyFetcher::new()?),
                Arc::new(PgVectorIndexer::new(pool, ai.clone())),
                Arc::new(LlmFactExtractor::new(ai)),
            );
            let summary = BatchProcessor::new(deps).process_pending(limit).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Search { query, limit } => {
            let ai = Arc::new(OpenAIClient::new(
                config.openai_api_key.clone(),
                config.openai_model.clone(),
                config.embedding_model.clone(),
            ));
            let indexer = PgVectorIndexer::new(pool, ai);
            let hits = indexer.search(&query, limit).await?;
            println!("{}", serde_json::to_string_pretty(&hits)?);
        }
    }

    Ok(())
}
