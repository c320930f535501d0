pub mod clustering;
pub mod db;
pub mod pipeline;
pub mod preprocess;
pub mod settings;
pub mod utils;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::LevelFilter;
use serde::Serialize;

use db::Database;
use pipeline::{run_pipeline, PipelineOptions};
use preprocess::run_preprocess;
use settings::PipelineSettings;

#[derive(Parser, Debug)]
#[command(
    name = "booker-cluster",
    version,
    about = "Groups room reservations into recurring clusters and extracts their weekly slots"
)]
pub struct Cli {
    /// JSON settings file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// SQLite database path (overrides settings and BOOKER_DB_PATH)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Rebuild processed_events from events
    Preprocess,
    /// Assign cluster ids and rebuild the pattern table
    Cluster,
    /// Preprocess, then cluster
    Run,
    /// Print the stored pattern table
    Patterns,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = PipelineSettings::load(cli.config.as_deref())?;
    if let Some(path) = cli.db.clone() {
        settings.database_path = path;
    }

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        utils::logging::level_from_name(&settings.log_level)
    };
    utils::logging::init(level);

    log::info!("booker-cluster starting ({:?})", cli.command);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    runtime.block_on(execute(cli.command, &settings))
}

async fn execute(command: Command, settings: &PipelineSettings) -> Result<()> {
    let database = Database::new(settings.database_path.clone())?;
    let options = PipelineOptions {
        mirror_clustered_events: settings.mirror_clustered_events,
        ..PipelineOptions::default()
    };

    match command {
        Command::Preprocess => print_json(&run_preprocess(&database).await?),
        Command::Cluster => print_json(&run_pipeline(&database, &options).await?),
        Command::Run => {
            let preprocessed = run_preprocess(&database).await?;
            let clustered = run_pipeline(&database, &options).await?;
            print_json(&serde_json::json!({
                "preprocess": preprocessed,
                "cluster": clustered,
            }))
        }
        Command::Patterns => print_json(&database.get_cluster_patterns().await?),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render output")?;
    println!("{rendered}");
    Ok(())
}
