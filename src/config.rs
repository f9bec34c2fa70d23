//! Configuration Module - User preferences from config.toml
//!
//! Supports:
//! - Log level
//! - Demultiplexer defaults (chunk size, leading bytes, match policy)
//! - Export defaults (output directory, file prefix, manifest, overwrite)

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::demux::{DemuxOptions, LeadingBytes, DEFAULT_CHUNK_SIZE};
use crate::export::ExportOptions;
use crate::matcher::MatchPolicy;

/// sigdemux configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub demux: DemuxConfig,
    pub export: ExportConfig,
}

/// General application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Demultiplexer defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemuxConfig {
    /// Bytes per read
    pub chunk_size: usize,
    pub leading_bytes: LeadingBytes,
    pub match_policy: MatchPolicy,
}

impl Default for DemuxConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            leading_bytes: LeadingBytes::default(),
            match_policy: MatchPolicy::default(),
        }
    }
}

impl DemuxConfig {
    pub fn to_options(&self) -> DemuxOptions {
        DemuxOptions {
            chunk_size: self.chunk_size,
            leading_bytes: self.leading_bytes,
            match_policy: self.match_policy,
        }
    }
}

/// Export settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Default destination directory
    pub output_dir: PathBuf,
    pub file_prefix: String,
    pub write_manifest: bool,
    pub overwrite: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            file_prefix: "segment_".to_string(),
            write_manifest: true,
            overwrite: false,
        }
    }
}

impl ExportConfig {
    pub fn to_options(&self) -> ExportOptions {
        ExportOptions {
            output_dir: self.output_dir.clone(),
            prefix: self.file_prefix.clone(),
            extension: None,
            write_manifest: self.write_manifest,
            overwrite: self.overwrite,
            dry_run: false,
        }
    }
}

impl Config {
    /// Load config from default path or return defaults
    pub fn load() -> Self {
        Self::load_from(&Self::default_path()).unwrap_or_default()
    }

    /// Load config from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;

        Ok(config)
    }

    /// Save config to default path
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path())
    }

    /// Save config to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;

        Ok(())
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "tunclon", "sigdemux")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".sigdemux")
                    .join("config.toml")
            })
    }

    /// Write the commented sample config if nothing exists at `path`.
    /// Returns false when a file was already there.
    pub fn init_at(path: &Path) -> Result<bool> {
        if path.exists() {
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, generate_sample_config())
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        tracing::info!("Created default config at {}", path.display());
        Ok(true)
    }
}

/// Generate a sample config file with comments
pub fn generate_sample_config() -> String {
    format!(
        r#"# sigdemux configuration
# Location: ~/.config/sigdemux/config.toml
# (on Windows: %APPDATA%\tunclon\sigdemux\config\config.toml)

[general]
# Log level: trace, debug, info, warn, error
log_level = "info"

[demux]
# Bytes requested per read; must be at least one signature long
chunk_size = {DEFAULT_CHUNK_SIZE}

# Bytes before the first signature: "separate" (own segment) or "fold" (into the first file)
leading_bytes = "separate"

# Alternative resolution: "earliest" or "first-registered"
match_policy = "earliest"

[export]
# Where split files are written
output_dir = "."

# Files are named <prefix><index>.<ext>, e.g. segment_00000.jpg
file_prefix = "segment_"

# Write manifest.json with blake3 digests
write_manifest = true

# Replace existing files
overwrite = false
"#
    )
}
