//! CLI argument structures

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Aggregate per-department sales totals from CSV uploads
#[derive(Parser)]
#[command(name = "sales-rollup")]
#[command(about = "sales-rollup - Aggregate department sales from CSV files", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to a YAML configuration file
    #[arg(short = 'c', long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API and background dispatcher
    #[command(name = "serve")]
    Serve {
        /// Address to bind, overriding the configuration
        #[arg(short = 'b', long, value_name = "ADDR")]
        bind: Option<String>,
    },

    /// Submit a CSV file as a job and wait for the result
    #[command(name = "submit")]
    Submit {
        /// CSV file with Department Name, Date and Number of Sales columns
        file: PathBuf,

        /// Base URL of a running server; runs in-process when omitted
        #[arg(short = 's', long, value_name = "URL")]
        server: Option<String>,

        /// Write the result CSV here instead of stdout
        #[arg(short = 'o', long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Aggregate a CSV file synchronously, without creating a job
    #[command(name = "aggregate")]
    Aggregate {
        /// CSV file to aggregate
        file: PathBuf,

        /// Write the result CSV here instead of stdout
        #[arg(short = 'o', long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Show the status of a job on a running server
    #[command(name = "status")]
    Status {
        /// Job identifier returned at submission
        job_id: String,

        /// Base URL of the server holding the job
        #[arg(short = 's', long, value_name = "URL")]
        server: String,
    },
}
