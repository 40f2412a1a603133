use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "streamstat",
    version,
    about = "Polls live streams and keeps hourly/daily audience rollups"
)]
pub struct CliArgs {
    /// Config file; defaults to streamstat.toml in the data dir.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Data directory; overrides STREAMSTAT_DATA_DIR.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Default)]
pub enum Command {
    /// Poll on the configured interval until Ctrl+C.
    #[default]
    Run,
    /// Run a single cycle and print its outcome.
    Once,
    /// Aggregates for one channel.
    Stats {
        login: String,
        /// 24h, 7d, 30d or all.
        #[arg(long)]
        range: Option<String>,
    },
    /// Channels ranked by hours watched.
    Top {
        #[arg(long)]
        range: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Most recent category spans of a channel.
    Spans {
        login: String,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Delete rollup rows past their retention horizon now.
    Prune,
}
