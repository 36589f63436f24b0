//! # regscope CLI
//!
//! `ingest` pulls eCFR search results into the local DuckDB file, `search`
//! runs one aggregated search in the terminal, `serve` exposes the JSON
//! surface, and `stats` reports the row count.

mod display;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use regscope_ai::{LexiconScorer, SentimentScorer, VaderScorer};
use regscope_api::AppState;
use regscope_query::{Aggregator, LiveBackend, LocalBackend, SearchMode, SearchRequest};
use regscope_store::{RegulationStore, UpsertMode};
use regscope_sync::{EcfrClient, EcfrConfig, IngestOptions, IngestStats, run_ingest};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Regulatory text search over the eCFR.
#[derive(Parser, Debug)]
#[command(name = "regscope", version, about, long_about = None)]
struct Cli {
    /// Raise log verbosity (-v debug, -vv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// DuckDB database file.
    #[arg(long, env = "REGSCOPE_DB", default_value = "regscope.duckdb", global = true)]
    db: PathBuf,

    /// Score tone against this lexicon (`token<TAB>valence` per line)
    /// instead of stock VADER.
    #[arg(long, env = "REGSCOPE_LEXICON", global = true)]
    lexicon: Option<PathBuf>,

    /// eCFR base URL.
    #[arg(
        long,
        env = "REGSCOPE_SOURCE_URL",
        default_value = "https://www.ecfr.gov",
        global = true
    )]
    source_url: String,

    /// Timeout for each eCFR request, in seconds.
    #[arg(long, env = "REGSCOPE_TIMEOUT_SECS", default_value_t = 30, global = true)]
    timeout_secs: u64,

    /// Search the local store or proxy every search to eCFR.
    #[arg(long, env = "REGSCOPE_MODE", value_enum, default_value_t = ModeArg::Local, global = true)]
    mode: ModeArg,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Download every search result page into the local store.
    Ingest {
        /// Search term sent to eCFR; `*` pulls everything.
        #[arg(long, default_value = "*")]
        query: String,

        #[arg(long, default_value_t = 100)]
        per_page: u32,

        /// Replace rows sharing (title, part, section, starts_on) instead of appending.
        #[arg(long)]
        natural_key: bool,
    },

    /// Run one search and print the report.
    Search {
        query: String,

        #[arg(long, default_value_t = 1)]
        page: u32,

        #[arg(long, default_value_t = 20)]
        per_page: u32,

        /// Result ordering (live mode only).
        #[arg(long)]
        order: Option<String>,

        /// Pagination unit (live mode only).
        #[arg(long)]
        paginate_by: Option<String>,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Serve the JSON API.
    Serve {
        #[arg(long, env = "REGSCOPE_BIND", default_value = "127.0.0.1:5000")]
        bind: String,

        /// Ingest first when the local store is empty.
        #[arg(long)]
        bootstrap: bool,
    },

    /// Show store row count.
    Stats,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Local,
    Live,
}

impl From<ModeArg> for SearchMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Local => SearchMode::Local,
            ModeArg::Live => SearchMode::Live,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Commands::Ingest {
            query,
            per_page,
            natural_key,
        } => {
            let mut store = open_store(&cli.db)?;
            let client = ecfr_client(&cli)?;
            let options = IngestOptions {
                query: query.clone(),
                per_page: *per_page,
                mode: if *natural_key {
                    UpsertMode::NaturalKey
                } else {
                    UpsertMode::Append
                },
            };
            let stats = ingest(&client, &mut store, &options).await?;
            println!(
                "Ingested {} records from {} pages ({} skipped, {} pages failed) in {:.1}s",
                stats.processed,
                stats.total_pages,
                stats.skipped,
                stats.failed_pages.len(),
                stats.elapsed_secs
            );
            println!("Store now holds {} rows", store.count()?);
        }

        Commands::Search {
            query,
            page,
            per_page,
            order,
            paginate_by,
            json,
        } => {
            let client = ecfr_client(&cli)?;
            let aggregator = build_aggregator(&cli, client, false).await?;
            let request = SearchRequest {
                query: query.clone(),
                page: *page,
                per_page: *per_page,
                order: order.clone(),
                paginate_by: paginate_by.clone(),
            };
            let report = aggregator.search(&request).await?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                display::print_report(&report);
            }
        }

        Commands::Serve { bind, bootstrap } => {
            let client = ecfr_client(&cli)?;
            let aggregator = build_aggregator(&cli, client.clone(), *bootstrap).await?;
            let router = regscope_api::app(AppState::new(aggregator, client));

            let listener = tokio::net::TcpListener::bind(bind)
                .await
                .with_context(|| format!("cannot bind {bind}"))?;
            info!(%bind, mode = SearchMode::from(cli.mode).as_str(), "serving");
            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await
                .context("server error")?;
        }

        Commands::Stats => {
            let store = open_store(&cli.db)?;
            println!("{}: {} rows", cli.db.display(), store.count()?);
        }
    }
    Ok(())
}

fn open_store(path: &Path) -> Result<RegulationStore> {
    let store = RegulationStore::open_persistent(path)
        .with_context(|| format!("cannot open {}", path.display()))?;
    store
        .initialize()
        .with_context(|| format!("cannot initialize schema in {}", path.display()))?;
    Ok(store)
}

fn ecfr_client(cli: &Cli) -> Result<EcfrClient> {
    EcfrClient::new(EcfrConfig {
        base_url: cli.source_url.clone(),
        timeout_secs: cli.timeout_secs,
        ..Default::default()
    })
    .context("cannot build eCFR client")
}

fn load_scorer(lexicon: Option<&Path>) -> Result<Arc<dyn SentimentScorer>> {
    match lexicon {
        Some(path) => {
            let scorer = LexiconScorer::load(path).context("cannot load tone lexicon")?;
            Ok(Arc::new(scorer))
        }
        None => Ok(Arc::new(VaderScorer::new())),
    }
}

async fn ingest(
    client: &EcfrClient,
    store: &mut RegulationStore,
    options: &IngestOptions,
) -> Result<IngestStats> {
    let stats = run_ingest(client, store, options)
        .await
        .context("ingestion failed")?;
    if !stats.failed_pages.is_empty() {
        warn!(pages = ?stats.failed_pages, "some pages could not be fetched");
    }
    Ok(stats)
}

/// Scorer plus the backend for the configured mode. With `bootstrap`, an
/// empty local store is filled before it is handed over.
async fn build_aggregator(cli: &Cli, client: EcfrClient, bootstrap: bool) -> Result<Aggregator> {
    let scorer = load_scorer(cli.lexicon.as_deref())?;
    match cli.mode {
        ModeArg::Local => {
            let mut store = open_store(&cli.db)?;
            if bootstrap && store.count()? == 0 {
                info!(db = %cli.db.display(), "store is empty, ingesting before serving");
                ingest(&client, &mut store, &IngestOptions::default()).await?;
            }
            // Searches reopen the file read-only, leaving it free for `regscope ingest`.
            drop(store);
            Ok(Aggregator::new(LocalBackend::open_per_search(&cli.db), scorer))
        }
        ModeArg::Live => {
            if bootstrap {
                warn!("--bootstrap has no effect in live mode");
            }
            Ok(Aggregator::new(LiveBackend::new(Arc::new(client)), scorer))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
