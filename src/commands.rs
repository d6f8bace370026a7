use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "media-consolidator")]
#[command(about = "Deduplicate and reorganize a media library", long_about = None)]
pub struct Cli {
    /// Settings file (falls back to MC_CONFIG, then Config.toml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Args)]
pub struct LiveArgs {
    /// Actually move files. Without it the run only logs what it would do
    #[arg(long)]
    pub live: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Wipe the index and rebuild it from the target root and source dirs
    Scan {
        /// Source roots; defaults to `source_dirs` from the settings file
        roots: Vec<String>,
    },
    /// Fingerprint indexed files to find exact duplicates
    Hash,
    /// Score metadata and pick one survivor per duplicate set
    Analyze,
    /// Compute destination paths for every kept file
    Plan,
    /// Move files according to the plan
    Execute(LiveArgs),
    /// Run every phase, executing only if the audit passes
    All {
        #[command(flatten)]
        live: LiveArgs,
        roots: Vec<String>,
    },
    /// Reverse the moves of the previous run
    Undo(LiveArgs),
    /// Check that every record has a complete disposition
    Audit,
    /// Write the current plan to a CSV file
    ExportPlan {
        file: String,
    },
    /// Display the number of entries in the hash cache
    CountHashCache,
    /// Print configuration values
    PrintConfig,
}
