use clap::ArgAction;
use clap::Parser;
use std::num::NonZero;
use std::path::PathBuf;

/// Index a directory and fuzzy-match its entries the way the reference popup
/// does.
#[derive(Debug, Parser)]
#[command(version)]
pub struct Cli {
    /// Whether to output results in JSON format.
    #[clap(long, default_value = "false")]
    pub json: bool,

    /// Print each result as inline reference markup.
    #[clap(long, default_value = "false", conflicts_with = "json")]
    pub references: bool,

    /// Maximum number of results to return.
    #[clap(long, short = 'l', default_value = "50")]
    pub limit: NonZero<usize>,

    /// Directory to index.
    #[clap(long, short = 'C')]
    pub cwd: Option<PathBuf>,

    /// Include matching file indices in the output.
    #[arg(long, default_value = "false")]
    pub compute_indices: bool,

    /// Walker and matcher threads. The walk is I/O bound, so more rarely helps.
    #[clap(long, default_value = "2")]
    pub threads: NonZero<usize>,

    /// Exclude patterns
    #[arg(short, long, action = ArgAction::Append)]
    pub exclude: Vec<String>,

    /// Number of entries listed when the pattern is empty.
    #[clap(long, default_value = "20")]
    pub recent: NonZero<usize>,

    /// Index entries even when `.gitignore` excludes them.
    #[clap(long, default_value = "false")]
    pub no_gitignore: bool,

    /// How long to wait for the walk to finish before searching anyway.
    #[clap(long, default_value = "10000")]
    pub ready_timeout_ms: u64,

    /// Search pattern. Lists recent entries when omitted.
    pub pattern: Option<String>,
}
