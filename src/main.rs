use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use s3_doc_migrate::config::MigrationConfig;
use s3_doc_migrate::ingestion::{
    sniff, CompositeObserver, FileObserver, MigrationObserver, MigrationOptions, Severity, SniffOutcome,
    TracingObserver,
};
use s3_doc_migrate::pipeline::{list_source_keys, CollectionTable, Migrator, DEFAULT_SOURCE_KEYS};
use s3_doc_migrate::storage::StorageClient;
use s3_doc_migrate::store::JsonDirStore;

#[derive(Debug, Parser)]
#[command(name = "s3-doc-migrate", version, about = "Migrate CSV / enveloped-JSON exports into a document store")]
struct Cli {
    /// Read settings from this file instead of `.env`.
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    /// Read at most this many data rows per source during the load pass.
    #[arg(long, global = true)]
    limit: Option<usize>,

    /// Also append pipeline events to this file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Print reports as JSON.
    #[arg(long, global = true)]
    json: bool,

    /// Process every object under this key prefix instead of the default keys.
    #[arg(long, global = true)]
    prefix: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load every source, then run the quality check (default).
    Run { keys: Vec<String> },
    /// Load pass only.
    Load { keys: Vec<String> },
    /// Quality check only.
    Check { keys: Vec<String> },
    /// Detect the format of one source and print its columns.
    Sniff { key: String },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = MigrationConfig::from_env(cli.env_file.as_deref()).context("loading configuration")?;
    tracing::debug!(?config, "configuration loaded");

    let storage = StorageClient::open(&config);
    let command = cli.command.unwrap_or(Command::Run { keys: Vec::new() });

    if let Command::Sniff { key } = &command {
        let bytes = storage.get(&config.bucket, key)?;
        let outcome = sniff(&bytes, cli.limit);
        if cli.json {
            let value = match &outcome {
                SniffOutcome::Parsed {
                    dataset,
                    format,
                    rejected,
                } => serde_json::json!({
                    "key": key,
                    "format": format,
                    "rows": dataset.row_count(),
                    "columns": dataset.columns(),
                    "rejected": rejected,
                }),
                SniffOutcome::Unparseable { attempts } => serde_json::json!({
                    "key": key,
                    "format": null,
                    "attempts": attempts,
                }),
            };
            println!("{}", serde_json::to_string_pretty(&value)?);
            return Ok(());
        }
        match outcome {
            SniffOutcome::Parsed {
                dataset, format, ..
            } => {
                println!("{key}: {format}, {} rows", dataset.row_count());
                for column in dataset.columns() {
                    println!("  {column}");
                }
            }
            SniffOutcome::Unparseable { attempts } => {
                println!("{key}: unparseable");
                for a in attempts {
                    println!("  {}: {}", a.candidate, a.reason);
                }
            }
        }
        return Ok(());
    }

    let mut observers: Vec<Arc<dyn MigrationObserver>> = vec![Arc::new(TracingObserver)];
    if let Some(path) = &cli.log_file {
        observers.push(Arc::new(FileObserver::new(path)));
    }
    let options = MigrationOptions {
        limit: cli.limit,
        observer: Some(Arc::new(CompositeObserver::new(observers))),
        alert_at_or_above: Severity::Critical,
    };

    let keys = match &command {
        Command::Run { keys } | Command::Load { keys } | Command::Check { keys } if !keys.is_empty() => keys.clone(),
        _ => match &cli.prefix {
            Some(prefix) => list_source_keys(&storage, &config, prefix)
                .with_context(|| format!("listing sources under '{prefix}'"))?,
            None => DEFAULT_SOURCE_KEYS.iter().map(|k| k.to_string()).collect(),
        },
    };
    let collections = CollectionTable::from_nameable_keys(&keys);

    let store = JsonDirStore::new();
    let migrator = Migrator::new(&config, &storage, &store, collections, options);

    match command {
        Command::Load { .. } => {
            let reports = migrator.load_all(&keys);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&reports)?);
            } else {
                for report in reports {
                    println!("\n{report}");
                }
            }
        }
        Command::Check { .. } => {
            let reports = migrator.check_all(&keys);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&reports)?);
            } else {
                for report in reports {
                    println!("\n{report}");
                }
            }
        }
        _ => {
            let summary = migrator.run(&keys);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print!("{summary}");
            }
        }
    }
    Ok(())
}
