//! Subcommand handlers

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use super::{ConfigAction, FormatsArgs, SplitArgs};
use crate::config::Config;
use crate::demux::{DemuxStats, StreamDemuxer};
use crate::export::{ExportResult, SegmentWriter};
use crate::signatures::{Format, MediaKind, SignatureRegistry};

/// Reader adapter that reports running byte totals to a spinner
struct CountingReader<R> {
    inner: R,
    count: u64,
    progress: ProgressBar,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count += n as u64;
        self.progress
            .set_message(format!("Demultiplexing... {}", format_size(self.count, BINARY)));
        Ok(n)
    }
}

#[derive(Serialize)]
struct SplitSummary<'a> {
    format: Format,
    stats: &'a DemuxStats,
    export: &'a ExportResult,
}

fn spinner(quiet: bool) -> Result<ProgressBar> {
    if quiet {
        return Ok(ProgressBar::hidden());
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner().template("{spinner:.cyan} {msg} [{elapsed_precise}]")?,
    );
    pb.enable_steady_tick(Duration::from_millis(80));
    Ok(pb)
}

fn open_input(path: Option<&Path>) -> Result<Box<dyn Read>> {
    match path {
        None => Ok(Box::new(io::stdin().lock())),
        Some(p) if p == Path::new("-") => Ok(Box::new(io::stdin().lock())),
        Some(p) => {
            let file = File::open(p)
                .with_context(|| format!("Failed to open input: {}", p.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
    }
}

fn spawn_source(command: &[String]) -> Result<Child> {
    let (program, args) = command.split_first().context("Empty source command")?;
    tracing::debug!(program = %program, ?args, "Spawning source process");
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .spawn()
        .with_context(|| format!("Failed to spawn {}", program))
}

/// Handle `sigdemux split`
pub fn run_split(args: &SplitArgs, config: &Config) -> Result<()> {
    let mut demux_options = config.demux.to_options();
    if let Some(size) = args.chunk_size {
        demux_options.chunk_size = size;
    }
    if let Some(leading) = args.leading {
        demux_options.leading_bytes = leading.into();
    }
    if let Some(policy) = args.policy {
        demux_options.match_policy = policy.into();
    }

    // all configuration is checked before the source is opened
    let registry = SignatureRegistry::builtin()?;
    let demuxer = StreamDemuxer::new(&registry, args.format, demux_options)?;

    let mut export_options = config.export.to_options();
    if let Some(ref output) = args.output {
        export_options.output_dir = output.clone();
    }
    if let Some(ref prefix) = args.prefix {
        export_options.prefix = prefix.clone();
    }
    export_options.write_manifest &= !args.no_manifest;
    export_options.overwrite |= args.overwrite;
    export_options.dry_run = args.dry_run;
    let output_dir = export_options.output_dir.clone();

    let mut writer = SegmentWriter::new(args.format, export_options)?;

    let mut child = None;
    let source: Box<dyn Read> = if args.command.is_empty() {
        open_input(args.input.as_deref())?
    } else {
        if args.input.is_some() {
            bail!("--input cannot be combined with a source command");
        }
        let mut spawned = spawn_source(&args.command)?;
        let stdout = spawned.stdout.take().context("Source process has no stdout")?;
        child = Some(spawned);
        Box::new(stdout)
    };

    if !args.json {
        println!(
            "{} Splitting {} stream into {}\n",
            "⚡".bright_yellow(),
            args.format.name().bright_white().bold(),
            output_dir.display()
        );
    }

    let pb = spinner(args.json)?;
    pb.set_message("Demultiplexing...");
    let reader = CountingReader {
        inner: source,
        count: 0,
        progress: pb.clone(),
    };

    // the reader is dropped here, so a source still writing sees a closed pipe
    let outcome = demuxer.demux_into(reader, &mut writer);
    let status = match child {
        Some(mut child) => Some(child.wait().context("Failed to wait for source process")?),
        None => None,
    };

    let stats = match outcome {
        Ok(stats) => stats,
        Err(e) => {
            if let Some(status) = status {
                tracing::debug!(%status, "Source process ended after demux failure");
            }
            pb.abandon_with_message(format!("{} Demux failed", "✗".bright_red()));
            return Err(e.into());
        }
    };
    if let Some(status) = status.filter(|status| !status.success()) {
        pb.abandon();
        bail!("Source command exited with {}", status);
    }
    let result = writer.finish()?;

    pb.finish_with_message(format!(
        "{} Read {} in {} chunks",
        "✓".bright_green(),
        format_size(stats.bytes_read, BINARY),
        stats.chunks
    ));

    if args.json {
        let summary = SplitSummary {
            format: args.format,
            stats: &stats,
            export: &result,
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    print_split_summary(&stats, &result);
    Ok(())
}

fn print_split_summary(stats: &DemuxStats, result: &ExportResult) {
    let verb = if result.dry_run { "Would write" } else { "Wrote" };
    println!(
        "\n{} {} {} files ({})",
        "✓".bright_green(),
        verb,
        result.segments.to_string().bright_white().bold(),
        format_size(result.total_bytes, BINARY)
    );
    println!("  Signatures matched: {}", stats.signatures_matched);

    if stats.leading_bytes > 0 {
        println!(
            "  {} {} before the first signature",
            "⚠".yellow(),
            format_size(stats.leading_bytes, BINARY)
        );
    }
    if stats.signatures_matched == 0 && stats.bytes_read > 0 {
        println!("  {} No signature found; the whole stream is one file", "⚠".yellow());
    }
    if let Some(ref manifest) = result.manifest_path {
        println!("  Manifest: {}", manifest.display().to_string().dimmed());
    }
}

#[derive(Serialize)]
struct FormatListing {
    format: Format,
    name: &'static str,
    extension: &'static str,
    kind: MediaKind,
    supported: bool,
    signatures: Vec<SignatureListing>,
}

#[derive(Serialize)]
struct SignatureListing {
    name: &'static str,
    pattern: String,
}

/// Handle `sigdemux formats`
pub fn run_formats(args: &FormatsArgs) -> Result<()> {
    let registry = SignatureRegistry::builtin()?;

    let listings: Vec<FormatListing> = Format::ALL
        .iter()
        .map(|&format| {
            let signatures = registry
                .get_signatures(format)
                .map(|sigs| {
                    sigs.iter()
                        .map(|sig| SignatureListing {
                            name: sig.name,
                            pattern: sig.to_string(),
                        })
                        .collect()
                })
                .unwrap_or_default();
            FormatListing {
                format,
                name: format.name(),
                extension: format.extension(),
                kind: format.kind(),
                supported: registry.contains(format),
                signatures,
            }
        })
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&listings)?);
        return Ok(());
    }

    for listing in &listings {
        let status = if listing.supported {
            "✓".bright_green()
        } else {
            "✗".bright_red()
        };
        println!(
            "{} {} {}",
            status,
            format!("{:<12}", listing.name).bright_white().bold(),
            format!(".{}", listing.extension).dimmed()
        );
        if !listing.supported {
            println!("    {}", "no fixed header, cannot be split".dimmed());
        }
        for sig in &listing.signatures {
            println!("    {:<20} {}", sig.name, sig.pattern.cyan());
        }
    }

    Ok(())
}

/// Handle `sigdemux config`
pub fn run_config(
    action: ConfigAction,
    config_path: Option<PathBuf>,
    config: &Config,
) -> Result<()> {
    let path = config_path.unwrap_or_else(Config::default_path);

    match action {
        ConfigAction::Init => {
            if Config::init_at(&path)? {
                println!("{} Created {}", "✓".bright_green(), path.display());
            } else {
                println!("{} Config already exists: {}", "ℹ".bright_blue(), path.display());
            }
        }
        ConfigAction::Show => {
            let content = toml::to_string_pretty(config).context("Failed to serialize config")?;
            print!("{}", content);
        }
        ConfigAction::Path => {
            println!("{}", path.display());
            if !path.exists() {
                tracing::debug!("Config file does not exist yet");
            }
        }
    }

    Ok(())
}
