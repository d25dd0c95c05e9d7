use std::fs::OpenOptions;
use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use myjql::repl;
use myjql::storage::table::{Table, DEFAULT_PAGE_SIZE};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "myjql", version = VERSION, about = "Single-file key-value store with an on-disk B+-tree.")]
struct Cli {
    /// Path to the database file (created if it doesn't exist).
    db_file: String,
}

fn main() -> ExitCode {
    // Matches the reference tool's own message exactly; checked ahead of
    // clap's parsing since clap's generated usage text isn't this message.
    if std::env::args().len() < 2 {
        println!("Must supply a database filename.");
        return ExitCode::FAILURE;
    }
    let cli = Cli::parse();

    let log_file = OpenOptions::new()
        .append(true)
        .create(true)
        .open("myjql.log")
        .expect("failed to open log file");
    let filter = std::env::var("RUST_LOG")
        .or_else(|_| std::env::var("MYJQL_LOG"))
        .map(EnvFilter::new)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(filter)
        .init();

    let mut table = match Table::open(&cli.db_file, DEFAULT_PAGE_SIZE) {
        Ok(table) => table,
        Err(e) => {
            println!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let stdout = io::stdout();
    let mut output = stdout.lock();

    let result = repl::run(&mut table, &cli.db_file, &mut input, &mut output);
    let _ = table.close();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            println!("\nError: {}", e);
            ExitCode::FAILURE
        }
    }
}
