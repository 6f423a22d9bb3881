use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use curtain_core::{
    load_config, load_config_from_env, validate_config, Curtain, InitOptions, ProgressCallback,
    RecordFetch, SearchRequest, SortDirection, SortSpec, StatSnapshot,
};

#[derive(Parser)]
#[command(name = "curtain")]
#[command(about = "Search a Pazpar2 broker and print the converged results as JSON", long_about = None)]
struct Cli {
    /// Configuration file (defaults to $CURTAIN_CONFIG, then curtain.toml;
    /// without either, settings come from CURTAIN_* variables)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a CCL query and wait for every target to finish
    Search {
        query: String,
        /// Facet to compute; repeat for several
        #[arg(long = "facet")]
        facets: Vec<String>,
        #[arg(long)]
        filter: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = curtain_core::search::DEFAULT_PAGE_SIZE)]
        page_size: u32,
        #[arg(long, default_value = "relevance")]
        sort: String,
        /// Sort ascending instead of descending
        #[arg(long)]
        ascending: bool,
    },
    /// Fetch a record with the content of all its holdings
    Record {
        id: String,
        #[arg(long)]
        filter: Option<String>,
        /// Print the raw content of one holding instead
        #[arg(long)]
        offset: Option<usize>,
    },
    /// Check that the configured session is still alive
    Ping,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    if let Err(e) = run(cli).await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);

    // stdout carries the JSON results, logs go to stderr
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli
        .config
        .or_else(|| std::env::var("CURTAIN_CONFIG").ok().map(PathBuf::from))
        .or_else(|| Some(PathBuf::from("curtain.toml")).filter(|p| p.exists()));

    let config = match config_path {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            load_config(&path).with_context(|| format!("Failed to load config from {:?}", path))?
        }
        None => {
            info!("No configuration file, reading CURTAIN_* variables");
            load_config_from_env().context("Failed to load config from the environment")?
        }
    };
    validate_config(&config).context("Configuration validation failed")?;
    info!("Broker: {}", config.broker.url);

    let curtain = Curtain::from_config(&config).context("Failed to create broker client")?;
    let session = curtain
        .init(InitOptions {
            session: config.session.id.clone(),
            safe: config.session.safe,
        })
        .await
        .context("Failed to establish a broker session")?;
    info!(session = %session, "Session ready");

    match cli.command {
        Commands::Search {
            query,
            facets,
            filter,
            page,
            page_size,
            sort,
            ascending,
        } => {
            let direction = if ascending {
                SortDirection::Ascending
            } else {
                SortDirection::Descending
            };
            let mut request = SearchRequest::new(query)
                .with_page(page, page_size)
                .with_sort(SortSpec::new(sort, direction));
            if let Some(filter) = filter {
                request = request.with_filter(filter);
            }

            let progress: ProgressCallback = Arc::new(|stat: &StatSnapshot| {
                info!(
                    working = stat.working,
                    hits = stat.hits,
                    progress = stat.progress,
                    "Search progress"
                );
            });

            let results = curtain
                .search(&request, &facets, Some(progress))
                .await
                .context("Search failed")?;
            print_json(&results)?;
        }
        Commands::Record {
            id,
            filter,
            offset: None,
        } => {
            let record = curtain
                .get_record(&id, filter.as_deref())
                .await
                .with_context(|| format!("Failed to fetch record {}", id))?;
            print_json(&record)?;
        }
        Commands::Record {
            id,
            offset: Some(offset),
            ..
        } => {
            let fetched = curtain
                .record(&id, Some(offset))
                .await
                .with_context(|| format!("Failed to fetch record {} at offset {}", id, offset))?;
            match fetched {
                RecordFetch::Raw(raw) => std::io::stdout()
                    .write_all(&raw)
                    .context("Failed to write record content")?,
                RecordFetch::Document(record) => print_json(&record)?,
            }
        }
        Commands::Ping => {
            curtain.ping().await.context("Ping failed")?;
            println!("{}", serde_json::json!({ "session": session, "valid": true }));
        }
    }

    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}
