//! CLI argument parsing for the scopeprof demo binary

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for profile dumps
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable indented call tree (default)
    Text,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "scopeprof")]
#[command(version)]
#[command(about = "Scoped call-duration profiler demos", long_about = None)]
pub struct Cli {
    /// Enable debug tracing output on stderr
    #[arg(long, global = true)]
    pub debug: bool,

    /// Output format of the final dump
    #[arg(long = "format", value_enum, default_value = "text", global = true)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fork worker threads that sleep and process at random, then dump
    Threads {
        /// Number of worker threads
        #[arg(short = 'w', long = "workers", default_value = "10")]
        workers: usize,

        /// Sleep/process rounds per worker
        #[arg(short = 'n', long = "iterations", default_value = "10")]
        iterations: usize,

        /// Upper bound of each random sleep, in milliseconds
        #[arg(long = "max-sleep-ms", value_name = "MS", default_value = "100")]
        max_sleep_ms: u64,
    },

    /// Time opening, reading and closing a file
    ReadFile {
        /// File to read
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
}
