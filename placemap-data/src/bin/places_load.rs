//! CLI entrypoint for the places bulk loader.
#![forbid(unsafe_code)]

use clap::Parser;
use std::{path::PathBuf, process};

use placemap_data::{LoadError, LoadOptions, load_export_to_path};

fn main() {
    let arguments = Arguments::parse();
    if let Err(error) = run(arguments) {
        eprintln!("places-load: {error}");
        process::exit(1);
    }
}

fn run(arguments: Arguments) -> Result<(), LoadError> {
    let options = LoadOptions::default()
        .with_batch_size(arguments.batch_size)
        .with_jsonl(arguments.jsonl)
        .with_dry_run(arguments.dry_run);
    let summary = load_export_to_path(&arguments.database, &arguments.input, &options)?;
    if arguments.dry_run {
        println!(
            "Dry run: {} records ready to load ({} skipped)",
            summary.loaded, summary.skipped
        );
    } else {
        println!(
            "Loaded {} records into {} ({} skipped)",
            summary.loaded,
            arguments.database.display(),
            summary.skipped
        );
    }
    Ok(())
}

#[derive(Debug, Parser)]
#[command(name = "places-load", about = "Load a places JSON export into the query database")]
struct Arguments {
    /// Path to the places.json or places.jsonl export
    input: PathBuf,
    /// SQLite database to load into
    #[arg(short, long, value_name = "path", default_value = "places.db")]
    database: PathBuf,
    /// Rows written per transaction
    #[arg(long, value_name = "count", default_value_t = 1000)]
    batch_size: usize,
    /// Treat the input as JSON Lines regardless of its extension
    #[arg(long)]
    jsonl: bool,
    /// Parse and count records without writing to the database
    #[arg(long)]
    dry_run: bool,
}
