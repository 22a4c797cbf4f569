//! `wspublish`: publish, update, delete and list workshop items.

mod config;
mod output;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use wspublish_pipeline::{ListMode, Pipeline, PipelineError, PipelineOptions, TOOL_TAG};
use wspublish_workshop::{LocalWorkshop, LocalWorkshopConfig, PublishedFileId, WorkshopSession};

use crate::config::CliConfig;

#[derive(Parser)]
#[command(name = "wspublish", version)]
#[command(about = "Publish items to the workshop", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file (default: ~/.config/wspublish/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Application id to publish for
    #[arg(long, global = true)]
    app_id: Option<u32>,

    /// Directory backing the local workshop store
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Milliseconds between callback dispatches
    #[arg(long, global = true)]
    interval_ms: Option<u64>,

    /// Give up on a platform call after this many seconds (0 = never)
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Directory holding the item folders
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Upload an item folder as a new listing
    Publish {
        /// Item folder name
        name: String,
    },
    /// Replace the content of an existing listing
    Update {
        /// Item folder name
        name: String,
        /// Listing id
        #[arg(value_parser = PublishedFileId::parse)]
        id: PublishedFileId,
        /// Change note
        message: Option<String>,
    },
    /// Delete a listing
    Delete {
        #[arg(value_parser = PublishedFileId::parse)]
        id: PublishedFileId,
    },
    /// Show quota and listings, then delete every listing
    List {
        /// Only report; do not delete anything
        #[arg(long)]
        keep: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,wspublish=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    println!("{}", output::banner());

    match run(cli).await {
        Ok(()) => {
            println!("Operation Completed!");
            ExitCode::SUCCESS
        }
        Err(e) => {
            match e.downcast_ref::<PipelineError>() {
                Some(failed) => println!("{failed}. Exiting."),
                None => println!("{e:#}. Exiting."),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = CliConfig::load(cli.config.as_deref()).context("loading config")?;
    if let Some(app_id) = cli.app_id {
        config.app_id = app_id;
    }
    if let Some(store) = cli.store {
        config.store_dir = store;
    }
    if let Some(ms) = cli.interval_ms {
        config.update_interval_ms = ms;
    }
    if let Some(secs) = cli.timeout_secs {
        config.timeout_secs = secs;
    }

    let mut backend = LocalWorkshopConfig::new(&config.store_dir, config.app_id());
    backend.quota_bytes = config.quota_bytes;
    let session = WorkshopSession::new(
        LocalWorkshop::initialize(backend).context("initializing workshop backend")?,
    );
    tracing::info!(
        app_id = %session.app_id(),
        store = %config.store_dir.display(),
        "workshop session started"
    );

    let cancel = CancellationToken::new();
    let ctrl_c = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupted, cancelling");
                cancel.cancel();
            }
        }
    });

    let options = PipelineOptions {
        update_interval: config.update_interval(),
        timeout: config.timeout(),
        visibility: config.visibility,
        tool_tag: TOOL_TAG.to_string(),
    };

    let (tx, rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(output::print_events(rx));
    let result = {
        let pipeline = Pipeline::new(session.client(), options)
            .with_events(tx)
            .with_cancel(cancel);
        execute(&pipeline, cli.command, &cli.root).await
    };
    join_printer(printer).await;
    ctrl_c.abort();

    for line in result? {
        println!("{line}");
    }
    Ok(())
}

/// Waits for the progress printer. Its failure never fails the command.
async fn join_printer(printer: JoinHandle<()>) {
    if let Err(e) = printer.await {
        tracing::warn!(error = %e, "progress printer stopped abnormally");
    }
}

/// Runs one subcommand and returns the summary lines to print.
async fn execute(
    pipeline: &Pipeline<'_>,
    command: Command,
    root: &Path,
) -> anyhow::Result<Vec<String>> {
    let lines = match command {
        Command::Publish { name } => {
            let outcome = pipeline.publish(root, &name).await?;
            vec![output::outcome_line("Published", &outcome)]
        }
        Command::Update { name, id, message } => {
            let outcome = pipeline.update(root, &name, id, message.as_deref()).await?;
            vec![output::outcome_line("Updated", &outcome)]
        }
        Command::Delete { id } => {
            pipeline.delete(id).await?;
            Vec::new()
        }
        Command::List { keep } => {
            let mode = if keep { ListMode::Keep } else { ListMode::Purge };
            let report = pipeline.list(mode).await?;
            output::report_lines(&report)
        }
    };
    Ok(lines)
}
