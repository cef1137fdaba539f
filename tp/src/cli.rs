//! CLI command definitions and subcommands

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// TripPlanner - confidence-driven travel itinerary planner
#[derive(Parser)]
#[command(
    name = "tripplanner",
    about = "Confidence-driven travel itinerary planner",
    version,
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
    /// Plan an itinerary from a free-text request
    Plan {
        /// The travel request, e.g. "3-day trip to Paris for 2 people"
        query: String,

        /// Reuse a specific session id instead of generating one
        #[arg(short, long)]
        session_id: Option<String>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Answer clarification questions and resume a stopped session
    Resume {
        /// Session id that asked for clarification
        session_id: String,

        /// Additional details answering the questions
        details: String,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Show the status of a session
    Status {
        /// Session id to inspect
        session_id: String,
    },

    /// Show the execution trace of a session
    Trace {
        /// Session id to inspect
        session_id: String,
    },

    /// List stored sessions
    Sessions {
        /// Remove records past their TTL before listing
        #[arg(long)]
        purge_expired: bool,
    },
}

/// Output format for plan results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
