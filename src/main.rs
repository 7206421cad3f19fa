//! Knowledge Explorer - command line entry point
//!
//! Generates knowledge graphs from a library snapshot and maintains its
//! content embeddings.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use knowledge_explorer::embeddings::{
    EmbeddingProvider, HashEmbeddingProvider, HttpEmbeddingProvider,
};
use knowledge_explorer::graph::{
    filter_graph, GraphFilters, GraphGenerator, GraphWarning, NodeType, StrategyKind,
    TraversalEngine,
};
use knowledge_explorer::store::InMemoryLibrary;
use knowledge_explorer::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "knowledge-explorer")]
#[command(about = "Explore related resources as a weighted knowledge graph")]
struct Cli {
    /// Path to the YAML config file (defaults to ./config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a graph around a focus resource and print it as JSON
    Generate {
        /// Library snapshot (JSON)
        #[arg(short, long)]
        library: PathBuf,

        #[arg(short, long)]
        project: String,

        /// Focus resource id
        #[arg(short, long)]
        focus: String,

        /// Traversal depth (overrides config)
        #[arg(short, long)]
        depth: Option<usize>,

        /// Node cap, focus included (overrides config)
        #[arg(long)]
        max_nodes: Option<usize>,

        /// Generation-time weight threshold (overrides config)
        #[arg(long)]
        min_weight: Option<f64>,

        /// Comma-separated strategies (overrides config)
        #[arg(long, value_delimiter = ',')]
        strategies: Option<Vec<StrategyKind>>,

        /// Keep only nodes whose label contains this text
        #[arg(long)]
        search: Option<String>,

        /// Keep only these node types (comma-separated)
        #[arg(long, value_delimiter = ',')]
        node_types: Option<Vec<NodeType>>,

        /// Keep only these relations (comma-separated)
        #[arg(long, value_delimiter = ',')]
        relations: Option<Vec<String>>,

        /// Interactive weight threshold applied to the generated graph
        #[arg(long)]
        view_min_weight: Option<f64>,

        /// Write the JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Fill in missing content embeddings of a library snapshot
    Embed {
        /// Library snapshot (JSON), rewritten in place unless --output is set
        #[arg(short, long)]
        library: PathBuf,

        /// Use the local hash-based provider instead of the HTTP endpoint
        #[arg(long)]
        offline: bool,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,knowledge_explorer=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = Config::from_yaml_and_env(cli.config.as_deref())?;

    match cli.command {
        Commands::Generate {
            library,
            project,
            focus,
            depth,
            max_nodes,
            min_weight,
            strategies,
            search,
            node_types,
            relations,
            view_min_weight,
            output,
        } => {
            let mut request = config.request(project, focus);
            if let Some(depth) = depth {
                request = request.with_depth(depth);
            }
            if let Some(max_nodes) = max_nodes {
                request = request.with_max_nodes(max_nodes);
            }
            if let Some(min_weight) = min_weight {
                request = request.with_min_weight(min_weight);
            }
            if let Some(strategies) = strategies {
                request = request.with_strategies(strategies);
            }
            let filters = GraphFilters {
                search_query: search,
                node_types: node_types.map(|t| t.into_iter().collect()),
                relation_types: relations.map(|r| r.into_iter().collect()),
                min_weight: view_min_weight,
            };
            run_generate(&config, &library, request, filters, output).await
        }
        Commands::Embed {
            library,
            offline,
            output,
        } => run_embed(&config, &library, offline, output).await,
    }
}

async fn run_generate(
    config: &Config,
    library_path: &std::path::Path,
    request: knowledge_explorer::graph::GenerateRequest,
    filters: GraphFilters,
    output: Option<PathBuf>,
) -> Result<()> {
    let library = Arc::new(InMemoryLibrary::load_json(library_path).await?);
    let engine = TraversalEngine::with_default_strategies(
        library.clone(),
        library,
        &config.strategy_settings,
    );

    let full = engine.generate_graph(&request).await?;
    for warning in &full.warnings {
        match warning {
            GraphWarning::StrategyFailed {
                strategy,
                depth,
                message,
            } => tracing::warn!("Strategy {} failed at depth {}: {}", strategy, depth, message),
            GraphWarning::BudgetExceeded {
                depth,
                max_nodes,
                dropped,
            } => tracing::warn!(
                "Graph is partial: {} nodes dropped at depth {} (cap {})",
                dropped,
                depth,
                max_nodes
            ),
        }
    }

    let view = if filters.is_empty() {
        full
    } else {
        filter_graph(&full, &filters)
    };
    let json = serde_json::to_string_pretty(&view)?;

    match output {
        Some(path) => {
            tokio::fs::write(&path, json)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!("Graph written to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

async fn run_embed(
    config: &Config,
    library_path: &std::path::Path,
    offline: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    let library = InMemoryLibrary::load_json(library_path).await?;

    let provider: Box<dyn EmbeddingProvider> = if offline {
        Box::new(HashEmbeddingProvider::new(config.embeddings.dimensions))
    } else {
        match HttpEmbeddingProvider::from_config(&config.embeddings)? {
            Some(provider) => Box::new(provider),
            None => anyhow::bail!("Embeddings are disabled; set EMBEDDING_URL or use --offline"),
        }
    };

    tracing::info!(
        "Embedding with {} ({} dimensions)",
        provider.model_name(),
        provider.dimensions()
    );
    let updated = library.fill_missing_embeddings(provider.as_ref()).await?;

    let target = output.unwrap_or_else(|| library_path.to_path_buf());
    library.save_json(&target).await?;
    tracing::info!("Embedded {} resources, saved to {}", updated, target.display());
    Ok(())
}
