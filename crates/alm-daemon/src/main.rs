//! Ansible log monitor CLI
//!
//! # Usage
//!
//! ```bash
//! alm extract <FILE> [--json]
//! alm check-ready
//! alm wait-ready [--timeout-secs N]
//! alm load
//! alm context --text <SUMMARY> [-k N]
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/alm/config.toml)
//! 3. Environment variables (ALM_*)
//! 4. CLI flags

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use alm_daemon::{
    check_ready, extract_file, init, load_index, print_context, wait_ready, Cli, Commands,
};

fn exit_code(ok: bool) -> ExitCode {
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let settings = init(cli.config.as_deref(), cli.log_level.as_deref())?;

    match cli.command {
        Commands::Extract { file, json } => {
            extract_file(&file, json)?;
        }
        Commands::CheckReady => {
            return Ok(exit_code(check_ready(&settings).await?));
        }
        Commands::WaitReady { timeout_secs } => {
            return Ok(exit_code(wait_ready(&settings, timeout_secs).await?));
        }
        Commands::Load => {
            load_index(&settings).await?;
        }
        Commands::Context { text, k } => {
            print_context(&settings, &text, k).await?;
        }
    }

    Ok(ExitCode::SUCCESS)
}
