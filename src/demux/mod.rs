//! Stream demultiplexer - split one byte stream into files by signature.
//!
//! A converter asked to emit many same-format files through one pipe gives
//! no delimiter other than each file's own header. The demultiplexer reads
//! the stream in bounded chunks and cuts a new segment every time a full
//! signature of the session format is confirmed.
//!
//! # Design
//!
//! - **Carry buffer**: bytes that open a signature prefix at the end of a
//!   chunk are held back and rescanned together with the next chunk, so
//!   signatures straddling read boundaries are still found
//! - **Accumulation buffer**: bytes of the file currently being rebuilt;
//!   emitted as a [`Segment`] when the next signature is confirmed
//! - **Byte conservation**: every byte read lands in exactly one segment,
//!   including leading bytes and an unresolved carry at end of stream
//! - **Pull-based**: one blocking read, full processing, then the next read;
//!   a zero-byte read is the only stop signal

mod multistream;

use std::io::{self, Read};

use serde::{Deserialize, Serialize};

use crate::error::{DemuxError, Result};
use crate::matcher::{Cursor, MatchPolicy, MatchResult, PatternMatcher};
use crate::signatures::{Format, Signature, SignatureRegistry};

pub use multistream::{MultiStream, Segment};

/// Default read size
pub const DEFAULT_CHUNK_SIZE: usize = 16 * 1024;

/// Attribution of bytes that precede the first signature
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LeadingBytes {
    /// Leading bytes become their own segment
    #[default]
    Separate,
    /// Leading bytes are prepended to the first real segment
    Fold,
}

/// Options for a demultiplexing session
#[derive(Debug, Clone)]
pub struct DemuxOptions {
    /// Bytes requested per read; must cover at least one signature
    pub chunk_size: usize,
    pub leading_bytes: LeadingBytes,
    pub match_policy: MatchPolicy,
}

impl Default for DemuxOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            leading_bytes: LeadingBytes::default(),
            match_policy: MatchPolicy::default(),
        }
    }
}

/// Where the session is in the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemuxState {
    AwaitingFirstSignature,
    InsideFile,
    /// A signature was confirmed and the previous segment is being emitted
    AtBoundary,
    /// The source is exhausted; remaining bytes are being flushed
    Draining,
    Finished,
}

/// Counters collected over one session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemuxStats {
    pub bytes_read: u64,
    /// Non-empty chunks processed
    pub chunks: u64,
    pub signatures_matched: usize,
    pub segments_emitted: usize,
    /// Bytes seen before the first signature
    pub leading_bytes: u64,
}

/// Receives segments in discovery order.
///
/// Returning an error aborts the session; the error surfaces from the
/// demultiplexing entry point.
pub trait SegmentSink {
    fn accept(&mut self, segment: Segment) -> Result<()>;
}

impl SegmentSink for MultiStream {
    fn accept(&mut self, segment: Segment) -> Result<()> {
        self.push(segment);
        Ok(())
    }
}

struct CallbackSink<F>(F);

impl<F: FnMut(Segment)> SegmentSink for CallbackSink<F> {
    fn accept(&mut self, segment: Segment) -> Result<()> {
        (self.0)(segment);
        Ok(())
    }
}

/// Push-driven state machine for one stream.
///
/// [`StreamDemuxer`] drives it from a reader; callers that already own the
/// reads can [`feed`](Self::feed) slices of any size directly and must call
/// [`finish`](Self::finish) once the source is exhausted.
///
/// Under [`MatchPolicy::Earliest`] every alternative keeps its own
/// [`Cursor`] across reads, and a boundary is only committed once no other
/// alternative can still complete at an earlier offset. The segments then
/// depend on the bytes alone, never on how the reads were sized.
/// [`MatchPolicy::FirstRegistered`] resolves alternatives per window and is
/// kept for compatibility with the legacy rule.
pub struct DemuxSession<'a> {
    matcher: PatternMatcher<'a>,
    signature_len: usize,
    leading: LeadingBytes,
    state: DemuxState,
    accumulation: Vec<u8>,
    /// Bytes not yet attributed, starting at stream offset `pending_base`
    pending: Vec<u8>,
    pending_base: u64,
    cursors: Vec<Cursor>,
    window: Vec<u8>,
    opens_with_signature: bool,
    emitted_bytes: u64,
    next_index: usize,
    stats: DemuxStats,
}

impl<'a> DemuxSession<'a> {
    /// `signatures` must come from a validated registry entry
    pub(crate) fn new(signatures: &'a [Signature], options: &DemuxOptions) -> Self {
        let signature_len = signatures.first().map_or(0, Signature::len);
        Self {
            matcher: PatternMatcher::new(signatures, options.match_policy),
            signature_len,
            leading: options.leading_bytes,
            state: DemuxState::AwaitingFirstSignature,
            accumulation: Vec::new(),
            pending: Vec::new(),
            pending_base: 0,
            cursors: vec![Cursor::at(0); signatures.len()],
            window: Vec::with_capacity(options.chunk_size + signature_len),
            opens_with_signature: false,
            emitted_bytes: 0,
            next_index: 0,
            stats: DemuxStats::default(),
        }
    }

    pub fn state(&self) -> DemuxState {
        self.state
    }

    pub fn stats(&self) -> &DemuxStats {
        &self.stats
    }

    /// Bytes currently held back as a possible signature prefix
    pub fn carry_len(&self) -> usize {
        self.pending.len()
    }

    /// Process one chunk. The chunk is fully copied out before returning.
    pub fn feed<S: SegmentSink + ?Sized>(&mut self, chunk: &[u8], sink: &mut S) -> Result<()> {
        if chunk.is_empty() {
            return Ok(());
        }
        self.stats.bytes_read += chunk.len() as u64;
        self.stats.chunks += 1;

        match self.matcher.policy() {
            MatchPolicy::Earliest => {
                self.pending.extend_from_slice(chunk);
                self.resolve_pending(false, sink)
            }
            MatchPolicy::FirstRegistered => {
                let mut window = std::mem::take(&mut self.window);
                window.clear();
                window.append(&mut self.pending);
                window.extend_from_slice(chunk);

                let result = self.scan_window(&window, sink);

                self.window = window;
                result
            }
        }
    }

    /// Advance every cursor over the pending bytes and commit each boundary
    /// that can no longer be pre-empted. At end of stream open candidates can
    /// never complete, so every found match is final.
    fn resolve_pending<S: SegmentSink + ?Sized>(
        &mut self,
        end_of_stream: bool,
        sink: &mut S,
    ) -> Result<()> {
        let signatures = self.matcher.signatures();
        // stream offset up to which pending bytes are attributed
        let mut committed = self.pending_base;

        loop {
            for (cursor, signature) in self.cursors.iter_mut().zip(signatures) {
                cursor.advance(signature, &self.pending, self.pending_base);
            }

            let Some((alternative, start)) = self.settled_match(end_of_stream) else {
                break;
            };

            let from = (committed - self.pending_base) as usize;
            let cut = (start - self.pending_base) as usize;
            let end = cut + self.signature_len;

            self.accumulation.extend_from_slice(&self.pending[from..cut]);
            self.on_signature(alternative, sink)?;
            self.accumulation.extend_from_slice(&self.pending[cut..end]);

            committed = self.pending_base + end as u64;
            self.cursors.fill(Cursor::at(committed));
        }

        let keep_from = if end_of_stream {
            self.pending_base + self.pending.len() as u64
        } else {
            self.cursors
                .iter()
                .map(Cursor::lower_bound)
                .min()
                .unwrap_or(committed)
                .max(committed)
        };

        let from = (committed - self.pending_base) as usize;
        let cut = (keep_from - self.pending_base) as usize;
        self.accumulation.extend_from_slice(&self.pending[from..cut]);
        self.pending.drain(..cut);
        self.pending_base = keep_from;
        Ok(())
    }

    /// Earliest complete match that no open candidate can pre-empt.
    /// Equal starts go to the earlier-registered alternative.
    fn settled_match(&self, end_of_stream: bool) -> Option<(usize, u64)> {
        let (best, start) = self
            .cursors
            .iter()
            .enumerate()
            .filter_map(|(i, cursor)| cursor.found().map(|start| (i, start)))
            .min_by_key(|&(i, start)| (start, i))?;

        let settled = end_of_stream
            || self.cursors.iter().enumerate().all(|(i, cursor)| {
                let bound = cursor.lower_bound();
                cursor.found().is_some() || bound > start || (bound == start && i > best)
            });

        settled.then_some((best, start))
    }

    /// Legacy path: alternatives resolved within one window
    fn scan_window<S: SegmentSink + ?Sized>(&mut self, window: &[u8], sink: &mut S) -> Result<()> {
        let mut pos = 0;

        loop {
            match self.matcher.find(window, pos..window.len()) {
                MatchResult::Complete { position, alternative } => {
                    self.accumulation.extend_from_slice(&window[pos..position]);
                    self.on_signature(alternative, sink)?;

                    let end = position + self.signature_len;
                    self.accumulation.extend_from_slice(&window[position..end]);
                    pos = end;
                }
                MatchResult::Partial { position, .. } => {
                    self.accumulation.extend_from_slice(&window[pos..position]);
                    self.pending.extend_from_slice(&window[position..]);
                    return Ok(());
                }
                MatchResult::NoMatch => {
                    self.accumulation.extend_from_slice(&window[pos..]);
                    return Ok(());
                }
            }
        }
    }

    /// A full signature closes the file being accumulated and opens the next
    fn on_signature<S: SegmentSink + ?Sized>(
        &mut self,
        alternative: usize,
        sink: &mut S,
    ) -> Result<()> {
        let first = self.state == DemuxState::AwaitingFirstSignature;
        if first {
            self.stats.leading_bytes = self.emitted_bytes + self.accumulation.len() as u64;
        }
        self.stats.signatures_matched += 1;

        let emit = !self.accumulation.is_empty()
            && (!first || self.leading == LeadingBytes::Separate);
        if emit {
            self.transition(DemuxState::AtBoundary);
            self.emit(sink)?;
        }
        if self.accumulation.is_empty() {
            self.opens_with_signature = true;
        }

        tracing::trace!(
            alternative,
            signature = self.matcher.signatures()[alternative].name,
            offset = self.emitted_bytes + self.accumulation.len() as u64,
            "Signature confirmed"
        );

        self.transition(DemuxState::InsideFile);
        Ok(())
    }

    fn emit<S: SegmentSink + ?Sized>(&mut self, sink: &mut S) -> Result<()> {
        let data = std::mem::take(&mut self.accumulation);
        let segment =
            Segment::new(self.next_index, self.emitted_bytes, data, self.opens_with_signature);

        tracing::debug!(
            index = segment.index(),
            offset = segment.offset(),
            size = segment.len(),
            starts_with_signature = segment.starts_with_signature(),
            "Segment emitted"
        );

        self.emitted_bytes += segment.len() as u64;
        self.next_index += 1;
        self.opens_with_signature = false;
        self.stats.segments_emitted += 1;
        sink.accept(segment)
    }

    fn transition(&mut self, next: DemuxState) {
        if self.state != next {
            tracing::trace!(from = ?self.state, to = ?next, "Demux state change");
            self.state = next;
        }
    }

    /// Flush the remaining bytes, including an unresolved carry, as the final
    /// segment. No continuation can complete the carry anymore.
    pub fn finish<S: SegmentSink + ?Sized>(mut self, sink: &mut S) -> Result<DemuxStats> {
        if self.matcher.policy() == MatchPolicy::Earliest {
            self.resolve_pending(true, sink)?;
        }
        self.transition(DemuxState::Draining);

        let mut carry = std::mem::take(&mut self.pending);
        self.accumulation.append(&mut carry);
        if self.stats.signatures_matched == 0 {
            self.stats.leading_bytes = self.stats.bytes_read;
        }
        if !self.accumulation.is_empty() {
            self.emit(sink)?;
        }

        self.transition(DemuxState::Finished);
        Ok(self.stats)
    }
}

/// Demultiplexer for one format, validated against a registry.
///
/// Construction performs every configuration check, so an unsupported format
/// fails before a single byte of the source is read.
#[derive(Debug, Clone)]
pub struct StreamDemuxer {
    format: Format,
    signatures: &'static [Signature],
    options: DemuxOptions,
}

impl StreamDemuxer {
    pub fn new(
        registry: &SignatureRegistry,
        format: Format,
        options: DemuxOptions,
    ) -> Result<Self> {
        let signatures = registry.get_signatures(format)?;
        let signature_len = registry.signature_len(format)?;

        if options.chunk_size < signature_len {
            return Err(DemuxError::ChunkSizeTooSmall {
                format: format.to_string(),
                chunk_size: options.chunk_size,
                signature_len,
            });
        }

        Ok(Self {
            format,
            signatures,
            options,
        })
    }

    /// Built-in registry, default options
    pub fn for_format(format: Format) -> Result<Self> {
        Self::new(&SignatureRegistry::builtin()?, format, DemuxOptions::default())
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn options(&self) -> &DemuxOptions {
        &self.options
    }

    pub fn session(&self) -> DemuxSession<'static> {
        DemuxSession::new(self.signatures, &self.options)
    }

    /// Read `reader` to the end and collect every segment
    pub fn demux<R: Read>(&self, reader: R) -> Result<MultiStream> {
        let mut stream = MultiStream::new();
        self.demux_into(reader, &mut stream)?;
        Ok(stream)
    }

    /// Invoke `on_segment` once per segment, in discovery order
    pub fn demux_each<R, F>(&self, reader: R, on_segment: F) -> Result<DemuxStats>
    where
        R: Read,
        F: FnMut(Segment),
    {
        self.demux_into(reader, &mut CallbackSink(on_segment))
    }

    pub fn demux_into<R, S>(&self, mut reader: R, sink: &mut S) -> Result<DemuxStats>
    where
        R: Read,
        S: SegmentSink + ?Sized,
    {
        tracing::debug!(
            format = %self.format,
            alternatives = self.signatures.len(),
            chunk_size = self.options.chunk_size,
            leading_bytes = ?self.options.leading_bytes,
            match_policy = ?self.options.match_policy,
            "Starting demux session"
        );

        let mut session = self.session();
        let mut chunk = vec![0u8; self.options.chunk_size];

        loop {
            let n = match reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(DemuxError::Io(e)),
            };
            session.feed(&chunk[..n], sink)?;
        }

        let stats = session.finish(sink)?;

        tracing::info!(
            format = %self.format,
            bytes_read = stats.bytes_read,
            chunks = stats.chunks,
            signatures = stats.signatures_matched,
            segments = stats.segments_emitted,
            leading_bytes = stats.leading_bytes,
            "Demux complete"
        );

        Ok(stats)
    }
}

/// Demultiplex `reader` with the built-in registry and default options
pub fn demux<R: Read>(reader: R, format: Format) -> Result<MultiStream> {
    StreamDemuxer::for_format(format)?.demux(reader)
}

/// Callback variant of [`demux`]
pub fn demux_each<R, F>(reader: R, format: Format, on_segment: F) -> Result<DemuxStats>
where
    R: Read,
    F: FnMut(Segment),
{
    StreamDemuxer::for_format(format)?.demux_each(reader, on_segment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::signatures::{FormatSignatures, Wildcard};

    const SIG_A: &[u8] = b"OggS";

    /// Reader that hands out at most `max` bytes per call
    struct Trickle<'a> {
        data: &'a [u8],
        max: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.data.len().min(self.max).min(buf.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    /// Reader that fails after handing out its data
    struct Failing<'a> {
        data: &'a [u8],
    }

    impl Read for Failing<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.data.is_empty() {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "writer died"));
            }
            let n = self.data.len().min(buf.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    fn demuxer(format: Format, options: DemuxOptions) -> StreamDemuxer {
        StreamDemuxer::new(&SignatureRegistry::builtin().unwrap(), format, options).unwrap()
    }

    fn split(format: Format, data: &[u8]) -> Vec<Vec<u8>> {
        demuxer(format, DemuxOptions::default())
            .demux(data)
            .unwrap()
            .into_iter()
            .map(Segment::into_bytes)
            .collect()
    }

    fn cat(parts: &[&[u8]]) -> Vec<u8> {
        parts.concat()
    }

    fn avi(size: u32, body: &[u8]) -> Vec<u8> {
        let mut out = b"RIFF".to_vec();
        out.extend_from_slice(&size.to_le_bytes());
        out.extend_from_slice(b"AVI ");
        out.extend_from_slice(body);
        out
    }

    #[test]
    fn test_two_files_split_at_second_signature() {
        let source = cat(&[SIG_A, b"AAA", SIG_A, b"BB"]);
        let segments = split(Format::Ogg, &source);
        assert_eq!(segments, vec![cat(&[SIG_A, b"AAA"]), cat(&[SIG_A, b"BB"])]);
    }

    #[test]
    fn test_leading_bytes_separate() {
        let source = cat(&[b"leadingjunk", SIG_A, b"X"]);
        let stream = demuxer(Format::Ogg, DemuxOptions::default()).demux(&source[..]).unwrap();

        assert_eq!(stream.len(), 2);
        assert_eq!(stream[0].bytes(), b"leadingjunk");
        assert!(!stream[0].starts_with_signature());
        assert_eq!(stream[1].bytes(), cat(&[SIG_A, b"X"]).as_slice());
        assert!(stream[1].starts_with_signature());
        assert_eq!(stream[1].offset(), 11);
    }

    #[test]
    fn test_leading_bytes_fold() {
        let source = cat(&[b"leadingjunk", SIG_A, b"X", SIG_A, b"Y"]);
        let options = DemuxOptions {
            leading_bytes: LeadingBytes::Fold,
            ..Default::default()
        };
        let stream = demuxer(Format::Ogg, options).demux(&source[..]).unwrap();

        assert_eq!(stream.len(), 2);
        assert_eq!(stream[0].bytes(), cat(&[b"leadingjunk", SIG_A, b"X"]).as_slice());
        assert!(!stream[0].starts_with_signature());
        assert_eq!(stream[1].bytes(), cat(&[SIG_A, b"Y"]).as_slice());
        assert!(stream[1].starts_with_signature());
    }

    #[test]
    fn test_fold_without_leading_bytes_matches_separate() {
        let source = cat(&[SIG_A, b"1", SIG_A, b"2"]);
        let options = DemuxOptions {
            leading_bytes: LeadingBytes::Fold,
            ..Default::default()
        };
        let folded = demuxer(Format::Ogg, options).demux(&source[..]).unwrap();
        let separate = demuxer(Format::Ogg, DemuxOptions::default()).demux(&source[..]).unwrap();
        assert_eq!(folded, separate);
    }

    #[test]
    fn test_empty_source_yields_nothing() {
        let stream = demuxer(Format::Ogg, DemuxOptions::default()).demux(&b""[..]).unwrap();
        assert!(stream.is_empty());
    }

    #[test]
    fn test_short_source_yields_one_unmatched_segment() {
        // a bare signature prefix: held as carry, flushed at end of stream
        let stream = demuxer(Format::Ogg, DemuxOptions::default()).demux(&b"Og"[..]).unwrap();
        assert_eq!(stream.len(), 1);
        assert_eq!(stream[0].bytes(), b"Og");
        assert!(!stream[0].starts_with_signature());
    }

    #[test]
    fn test_unsupported_format_fails_before_reading() {
        let registry = SignatureRegistry::builtin().unwrap();
        let err = StreamDemuxer::new(&registry, Format::Raw, DemuxOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let mut reader = Trickle { data: b"OggS", max: 4 };
        assert!(demux(&mut reader, Format::Svg).is_err());
        assert_eq!(reader.data.len(), 4, "no bytes may be consumed");
    }

    #[test]
    fn test_chunk_smaller_than_signature_rejected() {
        let registry = SignatureRegistry::builtin().unwrap();
        let options = DemuxOptions {
            chunk_size: 8,
            ..Default::default()
        };
        let err = StreamDemuxer::new(&registry, Format::Wma, options).unwrap_err();
        assert!(matches!(
            err,
            DemuxError::ChunkSizeTooSmall { chunk_size: 8, signature_len: 16, .. }
        ));
    }

    #[test]
    fn test_signature_straddling_reads() {
        let source = cat(&[SIG_A, b"first-file", SIG_A, b"second"]);
        // the second signature starts at 14; 3-byte reads cut it at 15
        let mut reader = Trickle { data: &source, max: 3 };
        let stream = demuxer(Format::Ogg, DemuxOptions::default()).demux(&mut reader).unwrap();

        assert_eq!(stream.len(), 2);
        assert_eq!(stream[0].bytes(), cat(&[SIG_A, b"first-file"]).as_slice());
        assert_eq!(stream[1].bytes(), cat(&[SIG_A, b"second"]).as_slice());
    }

    #[test]
    fn test_carry_that_never_completes_is_kept() {
        let source = cat(&[SIG_A, b"body", b"Ogg"]);
        let mut reader = Trickle { data: &source, max: 1 };
        let stream = demuxer(Format::Ogg, DemuxOptions::default()).demux(&mut reader).unwrap();
        assert_eq!(stream.len(), 1);
        assert_eq!(stream[0].bytes(), source.as_slice());
    }

    #[test]
    fn test_riff_files_with_different_sizes() {
        let first = avi(1000, b"movi-one");
        let second = avi(0x7FFF_FFFF, b"movi-two");
        let source = cat(&[&first, &second]);

        let segments = split(Format::Avi, &source);
        assert_eq!(segments, vec![first, second]);
    }

    #[test]
    fn test_jpeg_variants_each_detected() {
        let jfif = [
            0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0x01, 0x11, 0x22,
        ];
        let exif = [0xFF, 0xD8, 0xFF, 0xE1, 0x1C, 0x45, b'E', b'x', b'i', b'f', 0x00, 0x00, 0x33];
        let icc = [0xFF, 0xD8, 0xFF, 0xE2, 0x02, 0x0C, b'I', b'C', b'C', b'_', b'P', b'R', 0x44];
        let spiff = [0xFF, 0xD8, 0xFF, 0xE8, 0x00, 0x20, b'S', b'P', b'I', b'F', b'F', 0x00, 0x55];

        let source = cat(&[&exif, &jfif, &spiff, &icc, &jfif]);
        let segments = split(Format::Jpeg, &source);
        assert_eq!(
            segments,
            vec![exif.to_vec(), jfif.to_vec(), spiff.to_vec(), icc.to_vec(), jfif.to_vec()]
        );
    }

    #[test]
    fn test_no_signature_yields_single_segment() {
        let stream = demuxer(Format::Png, DemuxOptions::default())
            .demux(&b"just some bytes"[..])
            .unwrap();
        assert_eq!(stream.len(), 1);
        assert_eq!(stream[0].bytes(), b"just some bytes");
    }

    #[test]
    fn test_back_to_back_signatures() {
        let source = cat(&[SIG_A, SIG_A, SIG_A]);
        let segments = split(Format::Ogg, &source);
        assert_eq!(segments, vec![SIG_A.to_vec(), SIG_A.to_vec(), SIG_A.to_vec()]);
    }

    #[test]
    fn test_callback_receives_segments_in_order() {
        let source = cat(&[SIG_A, b"1", SIG_A, b"22", SIG_A, b"333"]);
        let mut seen = Vec::new();
        let stats = demux_each(&source[..], Format::Ogg, |segment| {
            seen.push((segment.index(), segment.offset(), segment.len()))
        })
        .unwrap();

        assert_eq!(seen, vec![(0, 0, 5), (1, 5, 6), (2, 11, 7)]);
        assert_eq!(stats.segments_emitted, 3);
        assert_eq!(stats.signatures_matched, 3);
        assert_eq!(stats.bytes_read, source.len() as u64);
        assert_eq!(stats.leading_bytes, 0);
    }

    #[test]
    fn test_read_error_propagates() {
        let source = cat(&[SIG_A, b"partial"]);
        let err = demuxer(Format::Ogg, DemuxOptions::default())
            .demux(Failing { data: &source })
            .unwrap_err();
        match err {
            DemuxError::Io(inner) => assert_eq!(inner.kind(), io::ErrorKind::BrokenPipe),
            other => panic!("expected Io, got {other:?}"),
        }
    }

    #[test]
    fn test_sink_error_aborts_session() {
        struct Refusing;
        impl SegmentSink for Refusing {
            fn accept(&mut self, segment: Segment) -> Result<()> {
                Err(DemuxError::Sink {
                    index: segment.index(),
                    source: io::Error::new(io::ErrorKind::Other, "disk full"),
                })
            }
        }

        let source = cat(&[SIG_A, b"1", SIG_A, b"2"]);
        let err = demuxer(Format::Ogg, DemuxOptions::default())
            .demux_into(&source[..], &mut Refusing)
            .unwrap_err();
        assert!(matches!(err, DemuxError::Sink { index: 0, .. }));
    }

    #[test]
    fn test_session_states() {
        const SIGS: &[Signature] = &[Signature::exact("ogg", b"OggS")];
        let mut sink = MultiStream::new();
        let mut session = DemuxSession::new(SIGS, &DemuxOptions::default());
        assert_eq!(session.state(), DemuxState::AwaitingFirstSignature);

        session.feed(b"junk", &mut sink).unwrap();
        assert_eq!(session.state(), DemuxState::AwaitingFirstSignature);

        session.feed(b"Og", &mut sink).unwrap();
        assert_eq!(session.carry_len(), 2);

        session.feed(b"gSdata", &mut sink).unwrap();
        assert_eq!(session.state(), DemuxState::InsideFile);
        assert_eq!(session.carry_len(), 0);
        assert_eq!(sink.len(), 1);

        let stats = session.finish(&mut sink).unwrap();
        assert_eq!(stats.leading_bytes, 4);
        assert_eq!(sink.len(), 2);
        assert_eq!(sink[1].bytes(), b"OggSdata");
    }

    #[test]
    fn test_first_registered_policy_is_applied() {
        const ALTS: &[Signature] =
            &[Signature::exact("one", b"XYZ1"), Signature::exact("two", b"XYZ2")];
        static TABLE: &[FormatSignatures] = &[FormatSignatures {
            format: Format::Flv,
            signatures: ALTS,
        }];
        let registry = SignatureRegistry::from_table(TABLE).unwrap();
        let source = b"XYZ2aaXYZ1bb";

        let mut earliest = MultiStream::new();
        let earliest_stats = StreamDemuxer::new(&registry, Format::Flv, DemuxOptions::default())
            .unwrap()
            .demux_into(&source[..], &mut earliest)
            .unwrap();
        assert_eq!(earliest.len(), 2);
        assert!(earliest[0].starts_with_signature());
        assert_eq!(earliest_stats.signatures_matched, 2);

        let legacy = StreamDemuxer::new(
            &registry,
            Format::Flv,
            DemuxOptions {
                match_policy: MatchPolicy::FirstRegistered,
                ..Default::default()
            },
        )
        .unwrap();
        let mut stream = MultiStream::new();
        let stats = legacy.demux_into(&source[..], &mut stream).unwrap();
        // the XYZ2 header at 0 is passed over for the XYZ1 one at 6
        assert_eq!(stats.signatures_matched, 1);
        assert_eq!(stats.leading_bytes, 6);
        assert_eq!(stream[0].bytes(), b"XYZ2aa");
        assert!(!stream[0].starts_with_signature());
        assert_eq!(stream.concat(), source.to_vec());
    }

    #[test]
    fn test_session_keeps_alternative_state_across_feeds() {
        // avc1's candidate fails inside the first feed; the real header follows
        let source = cat(&[&b"\0\0\0\0ftypavcxZ"[..], b"ftypavc1payload"]);
        let demuxer = StreamDemuxer::for_format(Format::Mp4).unwrap();

        let mut whole = MultiStream::new();
        let mut session = demuxer.session();
        session.feed(&source, &mut whole).unwrap();
        session.finish(&mut whole).unwrap();

        let mut split = MultiStream::new();
        let mut session = demuxer.session();
        session.feed(&source[..13], &mut split).unwrap();
        session.feed(&source[13..], &mut split).unwrap();
        session.finish(&mut split).unwrap();

        assert_eq!(split, whole);
        assert_eq!(whole.len(), 1);
    }

    #[test]
    fn test_wma_alternatives() {
        let asf = [
            0x30, 0x26, 0xB2, 0x75, 0x8E, 0x66, 0xCF, 0x11, 0xA6, 0xD9, 0x00, 0xAA, 0x00, 0x62,
            0xCE, 0x6C, 0x01,
        ];
        let mut riff = b"RIFF".to_vec();
        riff.extend_from_slice(&4096u32.to_le_bytes());
        riff.extend_from_slice(b"WAVEfmt \x02");

        let source = cat(&[&asf, &riff, &asf]);
        let segments = split(Format::Wma, &source);
        assert_eq!(segments, vec![asf.to_vec(), riff, asf.to_vec()]);
    }

    #[test]
    fn test_wildcard_span_constant_matches_registry() {
        let registry = SignatureRegistry::builtin().unwrap();
        let wav = registry.get_signatures(Format::Wav).unwrap();
        assert_eq!(wav[0].wildcard, Wildcard::RIFF_CHUNK_SIZE);
    }
}
