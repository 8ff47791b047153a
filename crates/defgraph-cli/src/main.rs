//! defgraph CLI - Command-line interface
//!
//! Usage:
//!   defgraph build [--force]
//!   defgraph stats
//!   defgraph indegrees [--top N]
//!   defgraph neighborhood <word> [--method 1|2|3] [--transform log1p] [--json]

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use defgraph_core::{AppConfig, LoggingConfig, Neighborhood, NeighborhoodMethod};
use defgraph_opted::OptedSource;
use defgraph_store::DictionaryGraph;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "defgraph")]
#[command(about = "Dictionary definition graph CLI")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the graph if it is missing or outdated
    Build {
        /// Rebuild even when the stored version is current
        #[arg(long)]
        force: bool,
    },
    /// Print vertex and edge counts
    Stats,
    /// List the most referenced words
    Indegrees {
        /// Number of words to list
        #[arg(long, default_value_t = 20)]
        top: u32,
    },
    /// Extract the ego-network of a word
    Neighborhood {
        /// Center word
        word: String,
        /// 1 = all edges, 2 = prune hubs, 3 = weight by 1/f(indegree)
        #[arg(long, default_value_t = 1)]
        method: u8,
        /// Transform f applied to indegrees by method 3
        #[arg(long, value_enum, default_value_t = Transform::Identity)]
        transform: Transform,
        /// Print labels and matrix entries as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Transform {
    Identity,
    Log1p,
    Sqrt,
    Double,
}

impl Transform {
    fn apply(self, count: f64) -> f64 {
        match self {
            Self::Identity => count,
            Self::Log1p => count.ln_1p(),
            Self::Sqrt => count.sqrt(),
            Self::Double => count * 2.0,
        }
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    if logging.json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path)?.with_env_override()?,
        None => AppConfig::from_env()?,
    };
    Ok(config)
}

async fn open_built(config: &AppConfig) -> anyhow::Result<DictionaryGraph> {
    let mut graph = DictionaryGraph::open(config).await?;
    if graph.is_stale().await? {
        anyhow::bail!(
            "graph for {} is missing or outdated, run `defgraph build` first",
            graph.name()
        );
    }
    Ok(graph)
}

fn print_neighborhood(neighborhood: &Neighborhood) {
    println!(
        "{} vertices, {} edges",
        neighborhood.len(),
        neighborhood.matrix.nnz()
    );
    for (i, j, weight) in neighborhood.matrix.iter() {
        println!(
            "{} -> {}\t{:.6}",
            neighborhood.labels[i], neighborhood.labels[j], weight
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config)?;
    init_tracing(&config.logging);

    match cli.command {
        Commands::Build { force } => {
            tracing::info!(
                "Using store {}",
                config.database.database_path().display()
            );
            let mut graph = DictionaryGraph::open(&config).await?;
            let source = OptedSource::new(&config.build.source_dir);
            let built = if force {
                graph.rebuild(&source).await?;
                true
            } else {
                graph.ensure_built(&source).await?
            };
            let size = graph.size().await?;
            let status = if built { "built" } else { "up to date" };
            println!(
                "{} {}: {} vertices, {} edges",
                graph.name(),
                status,
                size.vertices,
                size.edges
            );
            graph.close().await?;
        }
        Commands::Stats => {
            let mut graph = open_built(&config).await?;
            let size = graph.size().await?;
            println!("vertices: {}", size.vertices);
            println!("edges: {}", size.edges);
            if let Some(built_at) = graph.built_at().await? {
                println!("built at: {built_at}");
            }
            graph.close().await?;
        }
        Commands::Indegrees { top } => {
            let mut graph = open_built(&config).await?;
            for (word, count) in graph.reader().top_indegrees(top).await? {
                println!("{count}\t{word}");
            }
            graph.close().await?;
        }
        Commands::Neighborhood {
            word,
            method,
            transform,
            json,
        } => {
            let method = NeighborhoodMethod::try_from(method)?;
            let mut graph = open_built(&config).await?;
            let f = move |count: f64| transform.apply(count);
            let neighborhood = graph
                .neighborhood(&word, method, Some(&f))
                .await
                .with_context(|| format!("neighborhood of '{word}' failed"))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&neighborhood)?);
            } else {
                print_neighborhood(&neighborhood);
            }
            graph.close().await?;
        }
    }

    Ok(())
}
