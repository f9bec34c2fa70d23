//! CLI module - Command line interface definitions and handlers

mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::Config;
use crate::demux::LeadingBytes;
use crate::matcher::MatchPolicy;
use crate::signatures::Format;

pub use commands::{run_config, run_formats, run_split};

/// sigdemux - split a byte stream of concatenated files by signature
///
/// Reads a file, stdin, or the stdout of a spawned converter and writes one
/// numbered file per detected header of the chosen format.
#[derive(Parser, Debug)]
#[command(name = "sigdemux")]
#[command(author = "Ryan Cashmoney <tunclon@proton.me>")]
#[command(version)]
#[command(about = "Split a stream of concatenated files at their signatures", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Alternate config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Effective configuration for this invocation.
    ///
    /// An explicit `--config` file must exist and parse, except for the
    /// `config` subcommand, which runs on defaults until `config init`
    /// creates the file.
    pub fn load_config(&self) -> anyhow::Result<Config> {
        match self.config {
            Some(ref path) if path.exists() || !matches!(self.command, Commands::Config(_)) => {
                Config::load_from(path)
            }
            Some(ref path) => {
                tracing::debug!(path = %path.display(), "Config file missing, using defaults");
                Ok(Config::default())
            }
            None => Ok(Config::load()),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Split a stream into one file per signature
    Split(SplitArgs),

    /// List supported formats and their signatures
    Formats(FormatsArgs),

    /// Manage the configuration file
    Config(ConfigArgs),
}

#[derive(Debug, Clone, Args)]
pub struct SplitArgs {
    /// Format of the concatenated files (jpeg, png, mp4, ...)
    #[arg(long, short)]
    pub format: Format,

    /// Source file, or - for stdin (default: stdin)
    #[arg(long, short)]
    pub input: Option<PathBuf>,

    /// Output directory (default: from config)
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Bytes per read
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Where bytes before the first signature go
    #[arg(long, value_enum)]
    pub leading: Option<LeadingArg>,

    /// How competing signature alternatives are resolved
    #[arg(long, value_enum)]
    pub policy: Option<PolicyArg>,

    /// File name prefix
    #[arg(long)]
    pub prefix: Option<String>,

    /// Dry run - detect and hash without writing
    #[arg(long, short = 'n')]
    pub dry_run: bool,

    /// Skip manifest.json
    #[arg(long)]
    pub no_manifest: bool,

    /// Replace existing files
    #[arg(long)]
    pub overwrite: bool,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,

    /// Command whose stdout is the source, e.g. `-- ffmpeg -i in.mp4 -f image2pipe -`
    #[arg(last = true, num_args = 1..)]
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Args)]
pub struct FormatsArgs {
    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigAction {
    /// Write a commented sample config if none exists
    Init,
    /// Print the effective configuration
    Show,
    /// Print the config file location
    Path,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LeadingArg {
    Separate,
    Fold,
}

impl From<LeadingArg> for LeadingBytes {
    fn from(arg: LeadingArg) -> Self {
        match arg {
            LeadingArg::Separate => LeadingBytes::Separate,
            LeadingArg::Fold => LeadingBytes::Fold,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyArg {
    Earliest,
    FirstRegistered,
}

impl From<PolicyArg> for MatchPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Earliest => MatchPolicy::Earliest,
            PolicyArg::FirstRegistered => MatchPolicy::FirstRegistered,
        }
    }
}
