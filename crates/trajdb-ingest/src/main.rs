// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Trajectory Ingest CLI
//!
//! Imports camera frames and trajectory CSV files into MobilityDB or QuestDB.
//!
//! # Usage
//!
//! ```bash
//! # MobilityDB, default layout under /app (DB_HOST, DB_PORT, ...)
//! trajdb-ingest --sink mobilitydb
//!
//! # QuestDB, data mounted elsewhere (QUESTDB_HOST, QUESTDB_PORT, ...)
//! trajdb-ingest --sink questdb --root /mnt/bags
//!
//! # Custom layout, parse only, print a JSON summary
//! trajdb-ingest --sink mobilitydb --layout layout.yaml --dry-run --summary-json
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use trajdb_ingest::{
    Config, DbConfig, Ingestor, Layout, Loader, MemoryLoader, PgLoader, RunSummary, SinkKind,
};

#[derive(Parser, Debug)]
#[command(name = "trajdb-ingest")]
#[command(about = "Import robot trajectories and camera frames into a temporal database", long_about = None)]
struct Args {
    /// Destination database
    #[arg(short, long, value_enum)]
    sink: SinkKind,

    /// Data root (overrides the layout's root)
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// YAML layout file (default: built-in layout for the sink)
    #[arg(short, long)]
    layout: Option<PathBuf>,

    /// Parse and encode everything without touching the database
    #[arg(long)]
    dry_run: bool,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    summary_json: bool,

    /// Default log level when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: tracing::Level,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(args.log_level.into()),
        )
        .init();

    let config = build_config(&args)?;

    tracing::info!("Trajectory ingest starting...");
    tracing::info!("  Sink: {}", config.sink);
    tracing::info!("  Root: {}", config.layout.root.display());
    tracing::info!(
        "  Sources: {} image dirs, {} trajectory files",
        config.layout.images.len(),
        config.layout.trajectories.len()
    );

    let summary = if config.dry_run {
        tracing::info!("Dry run: nothing will be written");
        let mut loader = MemoryLoader::new(config.sink);
        run(&config, &mut loader)
    } else {
        tracing::info!(
            "  Database: {}@{}:{}/{}",
            config.db.user,
            config.db.host,
            config.db.port,
            config.db.database
        );
        let mut loader = PgLoader::connect(config.sink, &config.db)
            .with_context(|| format!("Cannot connect to {}", config.sink))?;
        let summary = run(&config, &mut loader);
        if let Err(e) = loader.close() {
            tracing::warn!("Closing connection: {}", e);
        }
        summary
    };

    if args.summary_json {
        println!("{}", summary.to_json().context("Serializing run summary")?);
    }

    Ok(())
}

fn build_config(args: &Args) -> Result<Config> {
    let mut builder = Config::builder(args.sink).dry_run(args.dry_run);

    if let Some(path) = &args.layout {
        let layout = Layout::from_file(path)
            .with_context(|| format!("Loading layout {}", path.display()))?;
        builder = builder.layout(layout);
    }
    if let Some(root) = &args.root {
        builder = builder.root(root);
    }
    if !args.dry_run {
        let db = DbConfig::from_env(args.sink).context("Reading connection settings")?;
        builder = builder.db(db);
    }

    Ok(builder.build())
}

fn run<L: Loader>(config: &Config, loader: &mut L) -> RunSummary {
    let summary = Ingestor::new(config, loader).run();

    for stage in &summary.stages {
        tracing::debug!(
            "  {} [{}]: {:?} accepted={} skipped={} written={}",
            stage.label,
            stage.path.display(),
            stage.outcome,
            stage.accepted,
            stage.skipped,
            stage.rows_written
        );
    }
    if !summary.is_clean() {
        tracing::warn!("Import finished with errors");
    }

    summary
}
