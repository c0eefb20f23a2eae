//! The `data` subcommand: validate the input, open the store, run the loader
//! and report the outcome.

use std::path::Path;

use anyhow::{Context, Result};
use log::info;

use crate::{
    cli::DataArgs,
    error::LoadError,
    io_utils,
    loader::{FeedLoader, LoadReport},
    parser::FileFormat,
    store::SqliteStore,
};

pub fn execute(args: &DataArgs) -> Result<LoadReport> {
    let input = args
        .input
        .as_deref()
        .filter(|path| !path.as_os_str().is_empty())
        .ok_or_else(|| LoadError::config("an input feed path is required"))?;
    let format = FileFormat::detect(
        input,
        args.format.as_deref(),
        args.delimiter,
        args.input_encoding.as_deref(),
    )?;
    let reader = io_utils::open_input(input)?;

    info!(
        "Importing '{}' into {:?}",
        input.display(),
        args.database
    );
    let feed = format
        .parse(&source_name(input), reader)
        .with_context(|| format!("Parsing feed {input:?}"))?;

    let store = SqliteStore::open(&args.database)
        .map_err(|source| LoadError::Schema {
            table: feed.table().to_string(),
            source,
        })
        .with_context(|| format!("Opening database {:?}", args.database))?;
    let mut loader = FeedLoader::new(store);
    let report = loader
        .load(feed)
        .with_context(|| format!("Importing {input:?}"))?;
    loader
        .into_store()
        .close()
        .with_context(|| format!("Closing database {:?}", args.database))?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Serializing load report")?
        );
    } else {
        println!("{}", report.outcome().message());
    }
    Ok(report)
}

fn source_name(path: &Path) -> String {
    if io_utils::is_dash(path) {
        return "stdin".to_string();
    }
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "feed".to_string())
}
