//! CLI for the interconnected-VoIP provider enrichment pipeline.
//!
//! Each subcommand runs one pipeline stage against a JSON file store, so
//! an interrupted run resumes from the last durable stage. `run` executes
//! every stage in order.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use resolution::traits::documents::{HttpDocumentFetcher, RateLimitedFetcher};
use resolution::traits::searcher::TavilyWebSearcher;
use resolution::traits::source::EcfsFilingSource;
use resolution::traits::store::EntityStore;
use resolution::traits::synthesizer::OpenAiSynthesizer;
use resolution::types::report::RunReport;
use resolution::{JsonFileStore, Pipeline, PipelineConfig, PlainTextExtractor, DEFAULT_QUERIES};
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ipes")]
#[command(about = "FCC numbering-authorization filing enrichment pipeline")]
struct Cli {
    /// Directory holding the filing and entity stores.
    #[arg(long, global = true, default_value = "data")]
    data_dir: String,

    /// Per-entity worker pool size.
    #[arg(long, global = true, default_value_t = 5)]
    concurrency: usize,

    /// Re-enrich entities that already carry enrichment.
    #[arg(long, global = true)]
    force_refresh: bool,

    /// Emit the run report as JSON instead of a summary.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every stage: ingest through rules.
    Run {
        /// Listing queries; defaults to the numbering-authorization pair.
        #[arg(long = "query")]
        queries: Vec<String>,
    },

    /// List, filter, and persist raw filings.
    Ingest {
        #[arg(long = "query")]
        queries: Vec<String>,
    },

    /// Group stored filings into company entities.
    Aggregate,

    /// Fetch documents and extract evidence fields.
    Extract,

    /// Derive filing-activity signals.
    Signals,

    /// Run web search and synthesis over the entity set.
    Fuse,

    /// Apply the post-fusion rule engine.
    Rules,

    /// Write the entity set to CSV.
    Export {
        /// Output path.
        #[arg(long, default_value = "entities.csv")]
        output: String,
    },
}

type CliPipeline = Pipeline<
    JsonFileStore,
    RateLimitedFetcher<HttpDocumentFetcher>,
    PlainTextExtractor,
    TavilyWebSearcher,
    OpenAiSynthesizer,
>;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let pipeline = build_pipeline(&cli)?;

    // Ctrl+C stops scheduling new work; completed stages stay durable.
    let cancel = pipeline.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, finishing in-flight work");
            cancel.cancel();
        }
    });

    match &cli.command {
        Commands::Run { queries } => {
            let source = EcfsFilingSource::from_env()?;
            let queries = resolve_queries(queries);
            let report = pipeline.run(&source, &queries).await?;
            print_report(&report, cli.json)?;
        }
        Commands::Ingest { queries } => {
            let source = EcfsFilingSource::from_env()?;
            let queries = resolve_queries(queries);
            let report = pipeline.ingest(&source, &queries).await?;
            print_report(&report, cli.json)?;
        }
        Commands::Aggregate => {
            let report = pipeline.aggregate().await?;
            print_report(&report, cli.json)?;
        }
        Commands::Extract => {
            let report = pipeline.extract_evidence().await?;
            print_report(&report, cli.json)?;
        }
        Commands::Signals => {
            pipeline.derive_signals().await?;
            println!("signals derived");
        }
        Commands::Fuse => {
            let report = pipeline.fuse().await?;
            print_report(&report, cli.json)?;
        }
        Commands::Rules => {
            let corrections = pipeline.apply_rules().await?;
            println!("{corrections} corrections applied");
        }
        Commands::Export { output } => {
            let entities = pipeline.store().all_entities().await?;
            resolution::export::write_csv(&entities, output)?;
            println!("{} entities written to {output}", entities.len());
        }
    }

    Ok(())
}

fn build_pipeline(cli: &Cli) -> Result<CliPipeline> {
    let store = JsonFileStore::open(&cli.data_dir)
        .with_context(|| format!("opening store at {}", cli.data_dir))?;

    let fetcher = RateLimitedFetcher::new(HttpDocumentFetcher::new()?, 2);

    let searcher = TavilyWebSearcher::from_env().context("web search credentials")?;
    let synthesizer = OpenAiSynthesizer::from_env().context("synthesis credentials")?;

    let mut config = PipelineConfig::new().with_concurrency(cli.concurrency);
    if cli.force_refresh {
        config = config.force_refresh();
    }

    Ok(Pipeline::new(
        store,
        fetcher,
        PlainTextExtractor,
        Arc::new(searcher),
        Arc::new(synthesizer),
        config,
    ))
}

fn resolve_queries(queries: &[String]) -> Vec<&str> {
    if queries.is_empty() {
        DEFAULT_QUERIES.to_vec()
    } else {
        queries.iter().map(|q| q.as_str()).collect()
    }
}

fn print_report(report: &RunReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!(
        "raw {} / kept {} / rejected {} / duplicates {}",
        report.raw_count, report.kept_count, report.rejected_count, report.duplicate_count
    );
    println!(
        "entities {} (non-applicant {}, government excluded {}, no filer {})",
        report.entity_count,
        report.non_applicant_count,
        report.excluded_government,
        report.excluded_no_filer
    );
    if report.fusion_skipped > 0 {
        println!("fusion skipped {} already-enriched entities", report.fusion_skipped);
    }
    if !report.degradations.is_empty() {
        println!("degraded ({}):", report.degradations.len());
        for d in &report.degradations {
            println!("  {:?} {}: {}", d.kind, d.subject, d.detail);
        }
    }
    Ok(())
}
