//! Error types for signature lookup and stream demultiplexing.

use std::io;

use thiserror::Error;

/// Broad classification of a [`DemuxError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The session was asked for something the registry or options cannot
    /// provide. Always raised before the source stream is touched.
    Configuration,
    /// The signature table itself is malformed.
    InvariantViolation,
    /// Reading the source stream failed.
    Io,
    /// A segment sink refused a segment.
    Sink,
}

#[derive(Error, Debug)]
pub enum DemuxError {
    #[error("Unsupported format: {format} has no registered signature")]
    UnsupportedFormat { format: String },

    #[error("Chunk size {chunk_size} is below the {format} signature length ({signature_len})")]
    ChunkSizeTooSmall {
        format: String,
        chunk_size: usize,
        signature_len: usize,
    },

    #[error("{format} alternative {index} is {found} bytes, expected {expected}")]
    SignatureLengthMismatch {
        format: String,
        index: usize,
        expected: usize,
        found: usize,
    },

    #[error("Empty signature registered for {format} (alternative {index})")]
    EmptySignature { format: String, index: usize },

    #[error("No signature alternatives registered for {format}")]
    NoAlternatives { format: String },

    #[error("Wildcard span {start}..{end} is invalid for {format} signature of {len} bytes")]
    InvalidWildcard {
        format: String,
        start: usize,
        end: usize,
        len: usize,
    },

    #[error("Format {format} is registered more than once")]
    DuplicateFormat { format: String },

    #[error("Stream read failed: {0}")]
    Io(#[from] io::Error),

    #[error("Segment {index} was rejected by the sink: {source}")]
    Sink {
        index: usize,
        #[source]
        source: io::Error,
    },
}

impl DemuxError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DemuxError::UnsupportedFormat { .. } | DemuxError::ChunkSizeTooSmall { .. } => {
                ErrorKind::Configuration
            }
            DemuxError::SignatureLengthMismatch { .. }
            | DemuxError::EmptySignature { .. }
            | DemuxError::NoAlternatives { .. }
            | DemuxError::InvalidWildcard { .. }
            | DemuxError::DuplicateFormat { .. } => ErrorKind::InvariantViolation,
            DemuxError::Io(_) => ErrorKind::Io,
            DemuxError::Sink { .. } => ErrorKind::Sink,
        }
    }

    pub(crate) fn unsupported(format: impl ToString) -> Self {
        DemuxError::UnsupportedFormat {
            format: format.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DemuxError>;
