//! sigdemux Library
//!
//! Splits a single byte stream carrying many concatenated files of one
//! format back into the individual files, using the format's header
//! signature as the only delimiter.
//!
//! # Features
//!
//! - **Bounded memory per read**: the source is consumed in fixed-size chunks
//! - **Boundary safe**: signatures split across two reads are still found
//! - **Byte conservation**: concatenating the segments rebuilds the input
//! - **Wildcard headers**: size fields inside RIFF, ISO-BMFF and JPEG headers
//!   are ignored when matching
//! - **Blake3 manifests**: exported segments are hashed and recorded
//!
//! # Example
//!
//! ```no_run
//! use std::fs::File;
//! use sigdemux::{demux, Format};
//!
//! fn main() -> anyhow::Result<()> {
//!     let stream = demux(File::open("frames.mjpeg")?, Format::Jpeg)?;
//!     for segment in &stream {
//!         println!("#{} at {}: {} bytes", segment.index(), segment.offset(), segment.len());
//!     }
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod demux;
pub mod error;
pub mod export;
pub mod matcher;
pub mod signatures;

// Re-export commonly used types
pub use config::Config;
pub use demux::{
    demux, demux_each, DemuxOptions, DemuxSession, DemuxState, DemuxStats, LeadingBytes,
    MultiStream, Segment, SegmentSink, StreamDemuxer, DEFAULT_CHUNK_SIZE,
};
pub use error::{DemuxError, ErrorKind, Result};
pub use export::{ExportOptions, ExportResult, SegmentWriter};
pub use matcher::{MatchPolicy, MatchResult, PatternMatcher};
pub use signatures::{Format, Signature, SignatureRegistry, Wildcard};
