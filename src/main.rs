use std::cmp::Ordering;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use statekeep::config::config_path;
use statekeep::{codec, FileStorage, Settings, StorageEngine};

/// Inspect and seed persisted state envelopes
#[derive(Debug, Parser)]
#[command(name = "statekeep", version)]
struct Cli {
    /// Settings file (defaults to ~/.statekeep/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the stored version and state
    Inspect {
        /// Envelope file (defaults to the configured storage path)
        file: Option<PathBuf>,
    },
    /// Report how a stored envelope relates to a target version
    Check {
        file: Option<PathBuf>,
        /// Target version (defaults to the configured version)
        #[arg(long, allow_negative_numbers = true)]
        target: Option<i64>,
    },
    /// Write an empty envelope (`state: null`) at the given version
    Init {
        file: Option<PathBuf>,
        #[arg(long, allow_negative_numbers = true)]
        at_version: Option<i64>,
        /// Overwrite existing content
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = Settings::load(&cli.config.unwrap_or_else(config_path))?;

    match cli.command {
        Command::Inspect { file } => inspect(&settings, file).await,
        Command::Check { file, target } => check(&settings, file, target).await,
        Command::Init {
            file,
            at_version,
            force,
        } => init(&settings, file, at_version, force).await,
    }
}

fn storage_for(settings: &Settings, file: Option<PathBuf>) -> FileStorage {
    FileStorage::new(file.unwrap_or_else(|| settings.storage_path.clone()))
}

async fn read_envelope(storage: &FileStorage) -> Result<Option<codec::VersionedEnvelope>> {
    let raw = storage
        .load()
        .await
        .with_context(|| format!("Failed to read {}", storage.path().display()))?;
    match raw {
        Some(raw) if !raw.is_empty() => {
            let envelope = codec::decode(&raw)
                .with_context(|| format!("{} is not a valid envelope", storage.path().display()))?;
            Ok(Some(envelope))
        }
        _ => Ok(None),
    }
}

async fn inspect(settings: &Settings, file: Option<PathBuf>) -> Result<()> {
    let storage = storage_for(settings, file);
    let Some(envelope) = read_envelope(&storage).await? else {
        println!("{}: no persisted state", storage.path().display());
        return Ok(());
    };

    println!("version: {}", envelope.version);
    println!("state: {}", serde_json::to_string_pretty(&envelope.state)?);
    Ok(())
}

async fn check(settings: &Settings, file: Option<PathBuf>, target: Option<i64>) -> Result<()> {
    let storage = storage_for(settings, file);
    let target = target.unwrap_or(settings.version);
    let Some(envelope) = read_envelope(&storage).await? else {
        println!("no persisted state; nothing to migrate");
        return Ok(());
    };

    match envelope.version.cmp(&target) {
        Ordering::Equal => println!("up to date at version {}", target),
        Ordering::Less => println!(
            "needs migration from version {} to {}",
            envelope.version, target
        ),
        Ordering::Greater => bail!(
            "stored version {} is newer than target {}; downgrading is not supported",
            envelope.version,
            target
        ),
    }
    Ok(())
}

async fn init(
    settings: &Settings,
    file: Option<PathBuf>,
    at_version: Option<i64>,
    force: bool,
) -> Result<()> {
    let storage = storage_for(settings, file);
    let version = at_version.unwrap_or(settings.version);

    if !force && storage.load().await?.is_some_and(|raw| !raw.is_empty()) {
        bail!(
            "{} already holds state; pass --force to overwrite",
            storage.path().display()
        );
    }

    let raw = codec::encode(&Value::Null, version, settings.pretty)?;
    storage.save(&raw).await?;
    println!("wrote empty envelope at version {} to {}", version, storage.path().display());
    Ok(())
}
