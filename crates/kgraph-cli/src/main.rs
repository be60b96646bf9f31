//! KGraph CLI - Command-line interface
//!
//! Usage:
//!   kgraph build --input <records.jsonl>
//!   kgraph prune [--threshold 90] [--label Entity]... [--dry-run]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::Instrument;
use tracing_subscriber::EnvFilter;

use kgraph_core::AppConfig;
use kgraph_extractor::loader::{load_records, LoadOptions};
use kgraph_extractor::{ExtractionPipeline, HttpAnnotator, RuleBasedRe};
use kgraph_graph::{DuplicateMerger, GraphIngestor, GraphStore, InMemoryGraphStore, SurrealDbStore};

const TOP_RELATIONS: usize = 5;

#[derive(Parser)]
#[command(name = "kgraph")]
#[command(about = "Knowledge graph construction and deduplication")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(long, short, global = true, env = "KGRAPH_CONFIG")]
    config: Option<PathBuf>,

    /// Graph backend; `memory` only lives for one `build` run
    #[arg(long, value_enum, global = true, default_value_t = StoreKind::Surrealdb)]
    store: StoreKind,

    /// Emit JSON log lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum StoreKind {
    Surrealdb,
    Memory,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract triples from JSONL records and ingest them into the graph
    Build {
        /// Records file, one JSON object per line
        #[arg(long, short)]
        input: PathBuf,

        /// Read at most this many lines
        #[arg(long)]
        max_records: Option<usize>,

        /// Annotation service endpoint
        #[arg(long)]
        annotator_url: Option<String>,

        /// Triples per transaction
        #[arg(long)]
        batch_size: Option<usize>,

        /// Documents annotated at the same time
        #[arg(long)]
        concurrency: Option<usize>,
    },
    /// Merge near-duplicate entities
    Prune {
        /// Similarity a pair must exceed (0-100)
        #[arg(long)]
        threshold: Option<u8>,

        /// Node label to prune, repeatable
        #[arg(long = "label")]
        labels: Vec<String>,

        /// Report clusters without merging
        #[arg(long)]
        dry_run: bool,
    },
}

fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    if matches!(
        (&cli.command, cli.store),
        (Commands::Prune { .. }, StoreKind::Memory)
    ) {
        bail!("prune needs a persistent graph, --store memory starts empty; use --store surrealdb");
    }

    let mut config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?.with_env_override()?,
        None => AppConfig::from_env()?,
    };

    if cli.json_logs {
        config.logging.json_format = true;
    }

    match &cli.command {
        Commands::Build {
            max_records,
            annotator_url,
            batch_size,
            concurrency,
            ..
        } => {
            if max_records.is_some() {
                config.extraction.max_records = *max_records;
            }
            if let Some(url) = annotator_url {
                config.annotator.url = url.clone();
            }
            if let Some(batch_size) = batch_size {
                config.ingest.batch_size = *batch_size;
            }
            if let Some(concurrency) = concurrency {
                config.extraction.concurrency = *concurrency;
            }
        }
        Commands::Prune {
            threshold, labels, ..
        } => {
            if let Some(threshold) = threshold {
                config.dedup.similarity_threshold = *threshold;
            }
            if !labels.is_empty() {
                config.dedup.labels = labels.clone();
            }
        }
    }

    config.validate()?;
    Ok(config)
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));

    if config.logging.json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn open_store(kind: StoreKind, config: &AppConfig) -> anyhow::Result<Arc<dyn GraphStore>> {
    Ok(match kind {
        StoreKind::Surrealdb => Arc::new(
            SurrealDbStore::new(&config.database)
                .await
                .context("cannot reach the graph database")?,
        ),
        StoreKind::Memory => Arc::new(InMemoryGraphStore::new()),
    })
}

async fn build(input: PathBuf, store: StoreKind, config: AppConfig) -> anyhow::Result<()> {
    let started = Utc::now();

    let options = LoadOptions {
        min_text_length: config.extraction.min_text_length,
        max_records: config.extraction.max_records,
    };
    let report = load_records(&input, &options)
        .with_context(|| format!("cannot read records from {}", input.display()))?;
    tracing::info!(
        records = report.records.len(),
        malformed = report.malformed,
        too_short = report.too_short,
        "Loaded records"
    );
    if report.records.is_empty() {
        bail!("no usable records in {}", input.display());
    }

    let store = open_store(store, &config).await?;

    let annotator = Arc::new(HttpAnnotator::from_config(&config.annotator)?);
    let pipeline = ExtractionPipeline::new(annotator)
        .with_extractor(RuleBasedRe::new().with_min_score(config.extraction.min_score))
        .with_max_chars(config.annotator.max_chars)
        .with_concurrency(config.extraction.concurrency);

    let outcome = pipeline.run(&report.records).await;
    let stats = &outcome.stats;

    println!("\nExtraction summary");
    println!("  documents processed: {}", stats.documents);
    println!("  documents skipped:   {}", stats.failed_documents);
    println!("  valid documents:     {}", stats.valid_documents);
    println!("  entities:            {}", stats.entities);
    println!("  relations:           {}", stats.relations);
    println!("  top relations:");
    for (relation, count) in stats.top_relations(TOP_RELATIONS) {
        println!("    {relation}: {count}");
    }

    if outcome.triples.is_empty() {
        bail!("no relations extracted, nothing to ingest");
    }

    let ingestor = GraphIngestor::new(store.clone())
        .with_label(config.ingest.node_label.clone())
        .with_batch_size(config.ingest.batch_size);
    let ingested = ingestor.ingest(&outcome.triples, &outcome.metadata).await?;
    let nodes = store.node_count(&config.ingest.node_label).await?;

    let finished = Utc::now();
    println!("\nGraph summary ({})", store.name());
    println!("  triples ingested:    {}", ingested.triples);
    println!("  batches:             {}", ingested.batches);
    println!("  {} nodes:        {}", config.ingest.node_label, nodes);
    println!(
        "  elapsed:             {}s (finished {})",
        (finished - started).num_seconds(),
        finished.to_rfc3339()
    );

    Ok(())
}

async fn prune(store: StoreKind, dry_run: bool, config: AppConfig) -> anyhow::Result<()> {
    let store = open_store(store, &config).await?;
    let merger = DuplicateMerger::new(store).with_threshold(config.dedup.similarity_threshold);

    let mut total_merged = 0;
    for label in &config.dedup.labels {
        let (report, clusters) = merger.prune(label, dry_run).await?;

        println!("\n{label}: {} names, {} clusters", report.names, report.clusters);
        for cluster in &clusters {
            println!("  {} <- {}", cluster.master, cluster.duplicates.join(", "));
        }
        total_merged += report.merged;
    }

    if dry_run {
        println!("\nDry run, nothing merged");
    } else {
        println!("\nMerged {total_merged} duplicate nodes");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_tracing(&config);

    let run_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("run", %run_id);
    tracing::info!(parent: &span, started = %Utc::now().to_rfc3339(), "Starting kgraph");

    let store = cli.store;
    match cli.command {
        Commands::Build { input, .. } => build(input, store, config).instrument(span).await,
        Commands::Prune { dry_run, .. } => prune(store, dry_run, config).instrument(span).await,
    }
}
