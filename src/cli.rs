use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// Simple, file-backed construction-site tracker CLI.
/// Storage defaults to per-site JSON files under ~/.ct, or a path passed via --db.
#[derive(Parser)]
#[command(name = "ct", version, about = "Construction-site execution tracking CLI")]
pub struct Cli {
    /// Path to the JSON database file.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Acting user (ID or name). Assignments outside this user's management
    /// subtree are refused.
    #[arg(long = "as", global = true, value_name = "USER")]
    pub acting: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}
