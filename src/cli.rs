use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "musaix-analyzer", version, about = "Audio analysis worker: features, summary and embedding")]
pub struct Cli {
    /// Config file (TOML). Defaults to musaix.toml or the user config dir.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve job and health endpoints (default)
    Serve {
        /// Listen address, overrides [server] bind
        #[arg(long)]
        bind: Option<String>,
    },
    /// Analyze a local audio file and print the result as JSON
    Analyze {
        /// Input audio file (MP3, WAV, FLAC, OGG, AAC)
        input: PathBuf,

        /// Write the JSON result here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Check that a file decodes; exits non-zero when it does not
    Validate {
        input: PathBuf,
    },
}
