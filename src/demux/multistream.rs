//! Ordered container for demultiplexed segments.

use std::ops::Index;
use std::slice;

/// One reconstructed file: a contiguous byte range of the source stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    index: usize,
    offset: u64,
    data: Vec<u8>,
    starts_with_signature: bool,
}

impl Segment {
    pub(crate) fn new(
        index: usize,
        offset: u64,
        data: Vec<u8>,
        starts_with_signature: bool,
    ) -> Self {
        Self {
            index,
            offset,
            data,
            starts_with_signature,
        }
    }

    /// Position in discovery order, starting at 0
    pub fn index(&self) -> usize {
        self.index
    }

    /// Byte offset of the first byte of this segment in the source stream
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// False only for leading bytes seen before any signature, or for a
    /// stream that never contained one
    pub fn starts_with_signature(&self) -> bool {
        self.starts_with_signature
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

impl AsRef<[u8]> for Segment {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

/// Append-only during demultiplexing, randomly indexable afterwards.
///
/// Owns every segment buffer; dropping the stream releases them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiStream {
    segments: Vec<Segment>,
}

impl MultiStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    pub fn iter(&self) -> slice::Iter<'_, Segment> {
        self.segments.iter()
    }

    /// Sum of all segment lengths
    pub fn total_len(&self) -> u64 {
        self.segments.iter().map(|s| s.len() as u64).sum()
    }

    /// Rebuild the source stream by concatenating every segment in order
    pub fn concat(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.total_len() as usize);
        for segment in &self.segments {
            out.extend_from_slice(segment.bytes());
        }
        out
    }

    pub fn into_segments(self) -> Vec<Segment> {
        self.segments
    }
}

impl Index<usize> for MultiStream {
    type Output = Segment;

    fn index(&self, index: usize) -> &Segment {
        &self.segments[index]
    }
}

impl IntoIterator for MultiStream {
    type Item = Segment;
    type IntoIter = std::vec::IntoIter<Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.into_iter()
    }
}

impl<'a> IntoIterator for &'a MultiStream {
    type Item = &'a Segment;
    type IntoIter = slice::Iter<'a, Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}
