//! CLI module - argument parsing and the merge subcommand

mod args;
pub mod merge;

pub use args::*;
pub use merge::{load_and_merge, run_merge};
