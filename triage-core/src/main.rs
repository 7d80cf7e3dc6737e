use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use triage_context::ChunkConfig;
use triage_core::classify::{ClassifierGateway, GeminiClient};
use triage_core::config::TriageConfig;
use triage_core::index::{IndexHandle, SnapshotStore};
use triage_core::ingest::{ingest_crawled, ingest_dir};
use triage_core::pipeline::TriagePipeline;
use triage_core::storage::SqliteTriageStore;
use triage_embed::HashEmbedder;

/// Retrieval-augmented support ticket triage.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a TOML config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Chunk documentation, embed it, and persist a fresh index snapshot.
    Ingest {
        /// Directory of plain-text docs (defaults to the configured docs_dir).
        #[arg(long)]
        docs_dir: Option<PathBuf>,

        /// Crawled-docs JSON file; overrides --docs-dir when given.
        #[arg(long)]
        crawled: Option<PathBuf>,
    },
    /// Query the persisted snapshot and print the top matches.
    Search {
        query: String,

        #[arg(short, default_value_t = 4)]
        k: usize,
    },
    /// Classify a ticket and log it, without retrieval.
    Classify {
        text: String,

        /// Identifier from the source ticketing system.
        #[arg(long)]
        external_id: Option<String>,
    },
    /// Run the full triage pipeline for one ticket.
    Respond {
        text: String,

        /// Identifier from the source ticketing system.
        #[arg(long)]
        external_id: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = TriageConfig::load(args.config.as_deref())?;
    config.embedding.validate()?;
    let embedder = HashEmbedder::with_config(config.embedding.clone());

    match args.command {
        Commands::Ingest { docs_dir, crawled } => {
            let chunk_config = ChunkConfig::new(config.chunk_size, config.overlap)?;
            let snapshot = match crawled {
                Some(crawled) => ingest_crawled(&crawled, &chunk_config, &embedder).await?,
                None => {
                    let docs_dir = docs_dir.unwrap_or_else(|| config.docs_dir.clone());
                    ingest_dir(&docs_dir, &chunk_config, &embedder).await?
                }
            };
            SnapshotStore::new(&config.store_dir).save(&snapshot)?;
            println!("Ingested {} chunks into {}", snapshot.len(), config.store_dir.display());
        }
        Commands::Search { query, k } => {
            let snapshot = SnapshotStore::new(&config.store_dir)
                .load()?
                .context("no index snapshot found; run `triage ingest` first")?;
            let results = snapshot.query(&query, k, &embedder).await?;
            if results.is_empty() {
                println!("No matches.");
            }
            for (i, scored) in results.iter().enumerate() {
                let preview: String = scored.chunk.text.chars().take(120).collect();
                println!(
                    "{}. {} (score={:.3})\n   {}",
                    i + 1,
                    scored.chunk.doc_id,
                    scored.score,
                    preview.replace('\n', " ")
                );
            }
        }
        Commands::Classify { text, external_id } => {
            let client = GeminiClient::from_env()?;
            let store = Arc::new(SqliteTriageStore::open(&config.db_path).await?);
            let pipeline = TriagePipeline::new(
                ClassifierGateway::new(client),
                IndexHandle::new(),
                Arc::new(embedder),
                store,
            );
            let (ticket_ref, classification) =
                pipeline.classify_only(&text, external_id.as_deref()).await?;
            println!("ticket #{ticket_ref}");
            println!("{}", serde_json::to_string_pretty(&classification)?);
        }
        Commands::Respond { text, external_id } => {
            let snapshot = SnapshotStore::new(&config.store_dir).load()?;
            let index = match snapshot {
                Some(snapshot) => IndexHandle::with_snapshot(snapshot),
                None => {
                    tracing::warn!("No index snapshot found, responding without retrieval");
                    IndexHandle::new()
                }
            };

            let client = GeminiClient::from_env()?;
            let store = Arc::new(SqliteTriageStore::open(&config.db_path).await?);
            let pipeline = TriagePipeline::new(
                ClassifierGateway::new(client),
                index,
                Arc::new(embedder),
                store,
            )
            .with_top_k(config.top_k);

            let outcome = pipeline.respond(&text, external_id.as_deref()).await?;
            println!(
                "ticket #{} classified as {} / {}",
                outcome.ticket_ref,
                outcome.classification.product_area.as_str(),
                outcome.classification.urgency.as_str()
            );
            println!("\n{}", outcome.answer);
        }
    }

    Ok(())
}
