//! sigdemux - split a byte stream of concatenated files by signature
//!
//! Converters that write many same-format files to one pipe give no
//! delimiter other than each file's header; this tool cuts the stream back
//! into separate files.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sigdemux::cli::{self, Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = cli.load_config()?;

    let level = if cli.verbose {
        "debug"
    } else {
        config.general.log_level.as_str()
    };

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr).compact())
        .with(EnvFilter::from_default_env().add_directive(format!("sigdemux={level}").parse()?))
        .init();

    match cli.command {
        Commands::Split(ref args) => cli::run_split(args, &config)?,
        Commands::Formats(ref args) => cli::run_formats(args)?,
        Commands::Config(ref args) => cli::run_config(args.action, cli.config.clone(), &config)?,
    }

    Ok(())
}
