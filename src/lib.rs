pub mod cli;
pub mod commands;
pub mod dedup;
pub mod error;
pub mod infer;
pub mod io_utils;
pub mod loader;
pub mod parser;
pub mod reconcile;
pub mod record;
pub mod store;

use std::{env, process::ExitCode, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::{LevelFilter, debug};

use crate::{
    cli::{Cli, Commands},
    error::{EXIT_UNSPECIFIED_ERROR, LoadError},
};

pub use crate::{
    loader::{FeedLoader, ImportOutcome, LoadReport},
    parser::{Feed, FileFormat},
    record::{Record, TableIdentifier},
    store::{SchemaStore, SqliteStore},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("feed_loader", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if !err.use_stderr() => {
            err.print()?;
            return Ok(());
        }
        Err(err) => {
            let _ = err.print();
            return Err(LoadError::config("invalid command-line arguments").into());
        }
    };
    match cli.command {
        Commands::Data(args) => {
            let report = commands::execute(&args)?;
            debug!("Load report: {report:?}");
            Ok(())
        }
    }
}

/// Exit code for a failed run: configuration problems are reported apart
/// from every other failure.
pub fn exit_code(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<LoadError>() {
        Some(load_error) => load_error.exit_code(),
        None => ExitCode::from(EXIT_UNSPECIFIED_ERROR),
    }
}
