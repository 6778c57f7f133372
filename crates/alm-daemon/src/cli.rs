//! CLI argument parsing for the `alm` binary.
//!
//! CLI flags override every other configuration source.

use clap::{Parser, Subcommand};

/// Ansible log monitor
///
/// Extracts error statements from Ansible logs and serves knowledge-base
/// context from the published RAG index.
#[derive(Parser, Debug)]
#[command(name = "alm")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/alm/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the error statements extracted from a log file
    Extract {
        /// Log file to read
        file: String,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Probe the build pointer; exits 0 when a READY build is published
    CheckReady,

    /// Poll until a READY build is published or the timeout elapses
    WaitReady {
        /// Override rag.ready_timeout_secs
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Load the published index and print its summary
    Load,

    /// Embed a summary and print the retrieved context
    Context {
        /// Summary text to embed
        #[arg(long)]
        text: String,

        /// Number of records (default rag.top_k)
        #[arg(short)]
        k: Option<usize>,
    },
}
