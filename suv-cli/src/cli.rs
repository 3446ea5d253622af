//! CLI argument parsing using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// SUV academic portal client
#[derive(Parser, Debug)]
#[command(name = "suvctl", about = "Query the SUV academic portal", version)]
pub struct Args {
    /// Portal host, optionally with port (falls back to SUV_HOST)
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// File the session token is kept in between runs
    #[arg(long, global = true, default_value = "~/.cache/suvctl/session")]
    pub session_file: PathBuf,

    /// Request timeout, e.g. "30s" or "1m 30s"
    #[arg(long, global = true, default_value = "30s", value_parser = humantime::parse_duration)]
    pub timeout: Duration,

    /// Trace every request and response
    #[arg(short = 'D', long, global = true)]
    pub detailed: bool,

    /// Print records as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Log in and save the session token
    Login {
        /// User code (falls back to SUV_USER, then a prompt)
        #[arg(short, long)]
        user: Option<String>,
    },
    /// Close the session on the portal and forget the saved token
    Logout,
    /// Show whether a session token is saved
    Status,
    /// Show grades for the current period
    Grades,
    /// Search the portal directory
    Search {
        #[command(subcommand)]
        target: SearchTarget,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum SearchTarget {
    /// Search students by code, full name, or DNI (first match wins, in that order)
    Student {
        #[arg(long, default_value = "")]
        code: String,
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long, default_value = "")]
        lastname: String,
        #[arg(long, default_value = "")]
        dni: String,
    },
    /// Search professors by name
    Professor {
        #[arg(long)]
        name: String,
        #[arg(long)]
        lastname: String,
    },
}
