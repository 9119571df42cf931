pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "confluence")]
#[command(about = "Merge RSS/Atom feeds into one image-annotated feed", long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true)]
    pub config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch all sources, merge, and write the output documents
    Run {
        /// Override the configured output article budget
        #[arg(long)]
        max_items: Option<usize>,

        /// Override the number of parallel feed workers
        #[arg(short, long)]
        workers: Option<usize>,
    },
    /// List the configured sources
    Sources,
    /// Delete all cached articles, image lookups and fingerprints
    ClearCache,
}
