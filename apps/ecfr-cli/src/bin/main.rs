use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ecfr_core::types::QueryHit;
use ecfr_core::{Config, Error, PipelineConfig};
use ecfr_embed::load_embedder;
use ecfr_vector::{ArtifactStore, BuildOutcome, BuildPipeline, QueryService};

const SMOKE_QUERY: &str = "What are the requirements for incorporation by reference?";

#[derive(Parser)]
#[command(name = "ecfr")]
#[command(about = "Build and query a vector database over eCFR regulation text", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding config.toml / config.<env>.toml
    #[arg(long, global = true, default_value = ".")]
    config_dir: PathBuf,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Chunk, embed and index the collected corpus
    Build(BuildArgs),
    /// Search the latest vector database
    Query {
        text: String,
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        /// Model the database was built with, if not the configured one
        #[arg(long)]
        model: Option<String>,
        /// Print hits as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show metadata of the latest build
    Status,
}

#[derive(Args)]
struct BuildArgs {
    #[arg(long)]
    corpus_root: Option<String>,
    #[arg(long)]
    output_root: Option<String>,
    #[arg(long)]
    chunk_size: Option<usize>,
    #[arg(long)]
    chunk_overlap: Option<usize>,
    #[arg(long)]
    model: Option<String>,
    /// Only use the first N sections
    #[arg(long)]
    limit: Option<usize>,
    #[arg(long, default_value = SMOKE_QUERY)]
    smoke_query: String,
    #[arg(long)]
    skip_smoke_query: bool,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load_from(&cli.config_dir)
        .with_context(|| format!("Error loading config from {}", cli.config_dir.display()))?;
    let pipeline = config.pipeline()?;

    match cli.command {
        Commands::Build(args) => build(pipeline, args),
        Commands::Query { text, top_k, model, json } => {
            query(&pipeline, &text, top_k.unwrap_or(0), model.as_deref(), json)
        }
        Commands::Status => status(&pipeline),
    }
}

fn build(mut cfg: PipelineConfig, args: BuildArgs) -> anyhow::Result<()> {
    if let Some(v) = args.corpus_root { cfg.corpus_root = v; }
    if let Some(v) = args.output_root { cfg.output_root = v; }
    if let Some(v) = args.chunk_size { cfg.chunk_size = v; }
    if let Some(v) = args.chunk_overlap { cfg.chunk_overlap = v; }
    cfg.validate()?;

    let embedder = load_embedder(&cfg, args.model.as_deref())?;
    let outcome = BuildPipeline::new(cfg.clone(), embedder.as_ref()).run_limited(args.limit)?;
    let meta = match outcome {
        BuildOutcome::Built(meta) => meta,
        BuildOutcome::Empty => {
            println!("No vector database built: no content found under {}", cfg.corpus_root_path().display());
            return Ok(());
        }
    };
    println!(
        "Built vector database {}: {} chunks, dim {}, model {}",
        meta.timestamp, meta.num_chunks, meta.embedding_dim, meta.model_name
    );

    if args.skip_smoke_query {
        return Ok(());
    }
    let svc = QueryService::open(&cfg.output_root_path(), embedder)?.with_top_k_default(cfg.top_k_default);
    let hits = svc.search(&args.smoke_query, 0)?;
    println!("\nSample query: {}", args.smoke_query);
    print_hits(&hits, 300);
    Ok(())
}

fn query(cfg: &PipelineConfig, text: &str, top_k: usize, model: Option<&str>, json: bool) -> anyhow::Result<()> {
    let embedder = load_embedder(cfg, model)?;
    let hits = ecfr_vector::query_latest(cfg, embedder, text, top_k);
    if json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
    } else {
        println!("Found {} results for: \"{}\"", hits.len(), text);
        print_hits(&hits, 0);
    }
    Ok(())
}

fn status(cfg: &PipelineConfig) -> anyhow::Result<()> {
    let store = ArtifactStore::new(cfg.output_root_path());
    match store.latest_metadata() {
        Ok(meta) => {
            println!("{}", serde_json::to_string_pretty(&meta)?);
            Ok(())
        }
        Err(Error::NotFound(msg)) => {
            println!("No vector database found ({})", msg);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// `max_chars == 0` prints the full text.
fn print_hits(hits: &[QueryHit], max_chars: usize) {
    for (i, hit) in hits.iter().enumerate() {
        println!("\n  {}. score={:.4}  {}", i + 1, hit.score, hit.source);
        if !hit.section_title.is_empty() {
            println!("     {}", hit.section_title);
        }
        let text: String = if max_chars > 0 && hit.text.chars().count() > max_chars {
            format!("{}...", hit.text.chars().take(max_chars).collect::<String>())
        } else {
            hit.text.clone()
        };
        println!("     {}", text);
    }
}
