//! Export module - Write demultiplexed segments to disk with verification
//!
//! Each segment becomes one numbered file; a blake3 digest of every segment
//! is recorded and optionally written out as a JSON manifest.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::demux::{Segment, SegmentSink};
use crate::error::DemuxError;
use crate::signatures::Format;

/// Manifest file name inside the output directory
pub const MANIFEST_FILE: &str = "manifest.json";

/// Export configuration options
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Destination directory
    pub output_dir: PathBuf,
    /// File name prefix before the segment number
    pub prefix: String,
    /// Extension override; defaults to the format's canonical extension
    pub extension: Option<String>,
    /// Write manifest.json on finish
    pub write_manifest: bool,
    /// Replace files that already exist
    pub overwrite: bool,
    /// Hash and record only, touch nothing on disk
    pub dry_run: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            prefix: "segment_".to_string(),
            extension: None,
            write_manifest: true,
            overwrite: false,
            dry_run: false,
        }
    }
}

/// Manifest entry for one written segment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub index: usize,
    pub file: String,
    /// Offset of the segment in the source stream
    pub offset: u64,
    pub size: u64,
    pub blake3: String,
    pub starts_with_signature: bool,
}

/// Manifest file format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportManifest {
    pub version: u32,
    pub created_at: String,
    pub format: Format,
    pub output_dir: String,
    pub total_segments: usize,
    pub total_bytes: u64,
    pub entries: Vec<ManifestEntry>,
}

/// Result of an export run
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportResult {
    pub segments: usize,
    pub total_bytes: u64,
    pub files: Vec<PathBuf>,
    pub manifest_path: Option<PathBuf>,
    pub dry_run: bool,
}

/// Sink that writes every accepted segment to its own file
pub struct SegmentWriter {
    format: Format,
    options: ExportOptions,
    extension: String,
    entries: Vec<ManifestEntry>,
    files: Vec<PathBuf>,
    total_bytes: u64,
}

impl SegmentWriter {
    /// Create the writer and, unless in dry-run mode, the output directory
    pub fn new(format: Format, options: ExportOptions) -> Result<Self> {
        if !options.dry_run {
            fs::create_dir_all(&options.output_dir).with_context(|| {
                format!("Failed to create output directory: {}", options.output_dir.display())
            })?;
        }

        let extension = options
            .extension
            .clone()
            .unwrap_or_else(|| format.extension().to_string());

        Ok(Self {
            format,
            options,
            extension,
            entries: Vec::new(),
            files: Vec::new(),
            total_bytes: 0,
        })
    }

    /// File name for segment `index`
    pub fn file_name(&self, index: usize) -> String {
        format!("{}{:05}.{}", self.options.prefix, index, self.extension)
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    fn write_segment(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        let file = if self.options.overwrite {
            File::create(path)?
        } else {
            OpenOptions::new().write(true).create_new(true).open(path)?
        };

        let mut writer = BufWriter::new(file);
        writer.write_all(data)?;
        writer.flush()
    }

    /// Write the manifest if enabled and summarize the run
    pub fn finish(self) -> Result<ExportResult> {
        let mut result = ExportResult {
            segments: self.entries.len(),
            total_bytes: self.total_bytes,
            files: self.files,
            manifest_path: None,
            dry_run: self.options.dry_run,
        };

        if self.options.write_manifest && !self.options.dry_run {
            let manifest = ExportManifest {
                version: 1,
                created_at: Utc::now().to_rfc3339(),
                format: self.format,
                output_dir: self.options.output_dir.to_string_lossy().to_string(),
                total_segments: self.entries.len(),
                total_bytes: self.total_bytes,
                entries: self.entries,
            };

            let manifest_path = self.options.output_dir.join(MANIFEST_FILE);
            let manifest_json = serde_json::to_string_pretty(&manifest)?;
            fs::write(&manifest_path, manifest_json)
                .with_context(|| format!("Failed to write manifest: {}", manifest_path.display()))?;
            result.manifest_path = Some(manifest_path);
        }

        Ok(result)
    }
}

impl SegmentSink for SegmentWriter {
    fn accept(&mut self, segment: Segment) -> crate::error::Result<()> {
        let file = self.file_name(segment.index());
        let path = self.options.output_dir.join(&file);
        let hash = blake3::hash(segment.bytes());

        if self.options.dry_run {
            tracing::info!("Would write: {} ({} bytes)", path.display(), segment.len());
        } else {
            self.write_segment(&path, segment.bytes())
                .map_err(|source| DemuxError::Sink {
                    index: segment.index(),
                    source,
                })?;
            tracing::debug!(file = %path.display(), size = segment.len(), "Segment written");
        }

        self.total_bytes += segment.len() as u64;
        self.entries.push(ManifestEntry {
            index: segment.index(),
            file,
            offset: segment.offset(),
            size: segment.len() as u64,
            blake3: hex::encode(hash.as_bytes()),
            starts_with_signature: segment.starts_with_signature(),
        });
        self.files.push(path);
        Ok(())
    }
}

/// Load a manifest written by [`SegmentWriter::finish`]
pub fn load_manifest(path: &Path) -> Result<ExportManifest> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
    let manifest = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse manifest: {}", path.display()))?;
    Ok(manifest)
}

/// Compute blake3 hash of a file
pub fn compute_file_hash(path: &Path) -> Result<String> {
    let mut file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut hasher = blake3::Hasher::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize().as_bytes()))
}
