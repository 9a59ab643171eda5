use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use signpost_llm::{LlmConfig, OpenAiClient, RetryPolicy};
use signpost_retriever::chunk_index::ChunkIndex;
use signpost_retriever::indexing::{Indexer, IndexerConfig, Summarizer};
use signpost_retriever::pathways::PathwayCatalog;
use signpost_retriever::retrieval::{ResourceFinder, RetrievalConfig};
use signpost_retriever::store::AzureBlobStore;

/// Index a document container and answer resource queries against it.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base directory for the index database and fingerprint record
    #[arg(short, long, default_value = ".")]
    base_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one indexing pass over the content store
    Index,
    /// Find resource documents (and pathways) for a query
    Query {
        /// The user's question
        query: String,
        /// Maximum ranked documents (general documents are always added)
        #[arg(short = 'k', long, default_value_t = 4)]
        top_k: usize,
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
    /// Show index statistics
    Stats,
}

#[derive(Debug, Clone, PartialEq)]
enum OutputFormat {
    Summary,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "summary" => Ok(OutputFormat::Summary),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid format: {s}")),
        }
    }
}

#[derive(Serialize)]
struct QueryOutput<'a> {
    resources: &'a [signpost_retriever::retrieval::ResourceLink],
    pathways: Vec<&'a signpost_retriever::pathways::Pathway>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn env_var(name: &str) -> anyhow::Result<String> {
    std::env::var(name).map_err(|_| anyhow::anyhow!("{name} must be set"))
}

fn blob_store() -> anyhow::Result<AzureBlobStore> {
    let account = env_var("AZURE_STORAGE_ACCOUNT")?;
    let container =
        std::env::var("AZURE_STORAGE_CONTAINER").unwrap_or_else(|_| "resources".to_string());
    let sas = env_var("AZURE_STORAGE_SAS")?;
    Ok(AzureBlobStore::new(&account, &container, &sas))
}

fn llm_client() -> anyhow::Result<OpenAiClient> {
    let api_key = env_var("OPENAI_API_KEY")?;
    Ok(OpenAiClient::new(LlmConfig::new(api_key))?)
}

async fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.command {
        Commands::Index => {
            let store = blob_store()?;
            let client = llm_client()?;
            let index = ChunkIndex::open(&args.base_dir).await?;
            let summarizer = Summarizer::new(Arc::new(client.clone()), RetryPolicy::default());

            let indexer = Indexer::new(
                Arc::new(store),
                index,
                Arc::new(client),
                summarizer,
                args.base_dir.clone(),
                IndexerConfig::default(),
            );
            let stats = indexer.run().await?;

            println!("Indexing pass complete:");
            println!("  Listed: {}", stats.listed);
            println!("  Indexed: {}", stats.indexed);
            println!("  Unchanged: {}", stats.unchanged);
            println!("  Cleared: {}", stats.cleared);
            println!("  Chunks written: {}", stats.chunks_written);
            let skipped = stats.skipped_fetch
                + stats.skipped_unsupported
                + stats.skipped_extract
                + stats.skipped_summarize;
            if skipped > 0 {
                println!(
                    "  Skipped: {skipped} (fetch {}, unsupported {}, extract {}, summarize {})",
                    stats.skipped_fetch,
                    stats.skipped_unsupported,
                    stats.skipped_extract,
                    stats.skipped_summarize
                );
            }
            if stats.commit_failures > 0 {
                println!("  Commit failures: {}", stats.commit_failures);
            }
            Ok(())
        }
        Commands::Query {
            query,
            top_k,
            format,
        } => {
            let store = blob_store()?;
            let client = llm_client()?;

            // A missing index is not an error for queries; the finder
            // resolves to an empty result.
            let index = match ChunkIndex::open_existing(&args.base_dir).await {
                Ok(index) => Some(index),
                Err(e) => {
                    tracing::warn!(error = %e, "no usable index");
                    None
                }
            };

            let finder = ResourceFinder::new(
                index,
                Arc::new(client),
                store.resource_base(),
                RetrievalConfig::default(),
            );
            let resources = finder.find(&query, top_k).await;

            let catalog = PathwayCatalog::load(&args.base_dir);
            let pathways = catalog.matches(&query, 5);

            match format {
                OutputFormat::Json => {
                    let output = QueryOutput {
                        resources: &resources,
                        pathways,
                    };
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                OutputFormat::Summary => {
                    println!("Found {} resources:", resources.len());
                    for link in &resources {
                        println!("  {} | {}", link.name, link.summary);
                        println!("    {}", link.url);
                    }
                    if !pathways.is_empty() {
                        println!("Pathways:");
                        for pathway in pathways {
                            println!("  {} | {}", pathway.title, pathway.url);
                        }
                    }
                }
            }
            Ok(())
        }
        Commands::Stats => {
            let index = ChunkIndex::open_existing(&args.base_dir).await?;
            let stats = index.stats().await?;
            println!("Index statistics:");
            println!("  Chunks: {}", stats.chunks);
            println!("  Sources: {}", stats.sources);
            println!("  General-purpose sources: {}", stats.general_sources);
            Ok(())
        }
    }
}
