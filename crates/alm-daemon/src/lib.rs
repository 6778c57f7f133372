//! Library side of the `alm` binary.
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands};
pub use commands::{
    check_ready, extract_file, init, load_index, print_context, render_statements, wait_ready,
};
