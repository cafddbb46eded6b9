//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// aw - drive request actions through an actionwire coordinator
#[derive(Parser)]
#[command(
    name = "aw",
    about = "Turn request-carrying actions into HTTP calls and outcome actions",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Normalize a request descriptor and print the resulting request
    Build {
        /// Descriptor as JSON: an object, or a quoted URL string
        #[arg(value_name = "DESCRIPTOR")]
        descriptor: String,
    },

    /// Dispatch actions from a JSONL file and print every action on the bus
    ///
    /// Lines are dispatched in order. A plain action (one without a request)
    /// waits until every request above it has launched, so a line like
    /// {"type":"FOO_CANCEL"} cancels the earlier requests that declare
    /// cancelOnType FOO_CANCEL and are still in flight.
    Run {
        /// JSONL file of actions ("-" or absent reads stdin)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,

        /// Print colored one-line summaries instead of JSON
        #[arg(short, long)]
        pretty: bool,

        /// Append every bus action to this JSONL file
        #[arg(long = "log-actions", value_name = "PATH")]
        log_actions: Option<PathBuf>,
    },
}
