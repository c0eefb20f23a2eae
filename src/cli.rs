use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Load XML and CSV feeds into SQLite, growing the table schema from the data",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Import a feed file into the table named after its root element
    Data(DataArgs),
}

#[derive(Debug, Args)]
pub struct DataArgs {
    /// Feed file to import (.xml, .csv or .tsv; `-` reads stdin and requires --format)
    pub input: Option<PathBuf>,
    /// SQLite database file holding the target tables
    #[arg(short, long, default_value = "feed.db")]
    pub database: PathBuf,
    /// Feed format, overriding the file extension (xml, csv, tsv)
    #[arg(short, long)]
    pub format: Option<String>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of CSV input (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Print the load report as JSON instead of a summary message
    #[arg(long)]
    pub json: bool,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_delimiter_accepts_names_and_characters() {
        assert_eq!(parse_delimiter("tab").unwrap(), b'\t');
        assert_eq!(parse_delimiter("semicolon").unwrap(), b';');
        assert_eq!(parse_delimiter(":").unwrap(), b':');
        assert!(parse_delimiter("").is_err());
        assert!(parse_delimiter("ab").is_err());
        assert!(parse_delimiter("é").is_err());
    }

    #[test]
    fn data_path_is_optional_at_parse_time() {
        let cli = Cli::try_parse_from(["feed-loader", "data"]).unwrap();
        let Commands::Data(args) = cli.command;
        assert!(args.input.is_none());
        assert_eq!(args.database, PathBuf::from("feed.db"));
    }
}
