//! User Record - Command Line Interface
//!
//! Runs the leaky or fixed workload and prints a heap summary

use clap::{ArgAction, Parser, ValueEnum};
use log::LevelFilter;
use std::ffi::CString;
use std::io;
use std::path::PathBuf;
use std::process;
use user_record::demo::{self, DemoConfig};
use user_record::TrackingAllocator;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    /// Destroy records with the buggy routine (leaks the record)
    Leaky,
    /// Destroy records with the correct routine
    Fixed,
}

impl From<Mode> for demo::Mode {
    fn from(val: Mode) -> Self {
        match val {
            Mode::Leaky => demo::Mode::Leaky,
            Mode::Fixed => demo::Mode::Fixed,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "user-record")]
#[command(about = "Create and destroy user records, then report what leaked", long_about = None)]
#[command(version)]
struct Args {
    /// Destroy routine to exercise
    #[arg(short = 'm', long = "mode", value_enum, default_value = "leaky")]
    mode: Mode,

    /// Number of create/inspect/destroy cycles
    #[arg(short = 'n', long = "iterations", default_value_t = 1000)]
    iterations: usize,

    /// Record name (defaults to "Leaky User" or "Fixed User")
    #[arg(long = "name")]
    name: Option<String>,

    /// Record id (defaults to 123 or 456)
    #[arg(long = "id", allow_negative_numbers = true)]
    id: Option<i32>,

    /// Log allocator stats every N iterations (0 disables)
    #[arg(short = 'r', long = "report-every", default_value_t = 100)]
    report_every: usize,

    /// Output file for the heap summary (writes to stdout if not specified)
    #[arg(short = 'O', long = "out-file")]
    output_file: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let args = Args::parse();

    let level = match args.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let name = match args.name.map(CString::new).transpose() {
        Ok(name) => name,
        Err(e) => {
            eprintln!("Invalid record name: {}", e);
            process::exit(1);
        }
    };

    let config = DemoConfig {
        mode: args.mode.into(),
        iterations: args.iterations,
        name,
        id: args.id,
        report_every: args.report_every,
    };

    let tracker = TrackingAllocator::new();
    let summary = match demo::run(&config, &tracker) {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("Workload aborted: {}", e);
            process::exit(1);
        }
    };

    let written = match args.output_file {
        Some(ref output_path) => summary.to_file(output_path),
        None => summary.write_to(io::stdout().lock()),
    };
    if let Err(e) = written {
        eprintln!("Error writing heap summary: {}", e);
        process::exit(1);
    }
}
