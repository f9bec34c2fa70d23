//! Signature registry for stream demultiplexing.
//!
//! Each format maps to one or more fixed-length header patterns. Positions
//! that hold per-file data (container box sizes, RIFF chunk sizes, JPEG
//! segment lengths) are marked as wildcards on the signature itself, so the
//! matcher never needs to know which family a format belongs to.

mod table;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DemuxError, Result};

pub use table::BUILTIN;

/// Output formats a demultiplexing session can be configured for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[serde(rename = "3gp")]
    ThreeGp,
    Mp4,
    Mov,
    Avi,
    Wav,
    Webp,
    Jpeg,
    Png,
    Bmp,
    Gif,
    Tiff,
    Ico,
    Mp3,
    Flac,
    Ogg,
    Matroska,
    Flv,
    Wma,
    Pdf,
    /// Headerless pixel data, intentionally left without a signature
    Raw,
    /// Text based, intentionally left without a signature
    Svg,
}

/// Coarse media category, used for listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    Document,
}

impl Format {
    pub const ALL: [Format; 21] = [
        Format::ThreeGp,
        Format::Mp4,
        Format::Mov,
        Format::Avi,
        Format::Wav,
        Format::Webp,
        Format::Jpeg,
        Format::Png,
        Format::Bmp,
        Format::Gif,
        Format::Tiff,
        Format::Ico,
        Format::Mp3,
        Format::Flac,
        Format::Ogg,
        Format::Matroska,
        Format::Flv,
        Format::Wma,
        Format::Pdf,
        Format::Raw,
        Format::Svg,
    ];

    /// Canonical lowercase name
    pub fn name(&self) -> &'static str {
        match self {
            Format::ThreeGp => "3gp",
            Format::Mp4 => "mp4",
            Format::Mov => "mov",
            Format::Avi => "avi",
            Format::Wav => "wav",
            Format::Webp => "webp",
            Format::Jpeg => "jpeg",
            Format::Png => "png",
            Format::Bmp => "bmp",
            Format::Gif => "gif",
            Format::Tiff => "tiff",
            Format::Ico => "ico",
            Format::Mp3 => "mp3",
            Format::Flac => "flac",
            Format::Ogg => "ogg",
            Format::Matroska => "matroska",
            Format::Flv => "flv",
            Format::Wma => "wma",
            Format::Pdf => "pdf",
            Format::Raw => "raw",
            Format::Svg => "svg",
        }
    }

    /// File extension used when writing segments to disk
    pub fn extension(&self) -> &'static str {
        match self {
            Format::Jpeg => "jpg",
            Format::Tiff => "tif",
            Format::Matroska => "mkv",
            other => other.name(),
        }
    }

    pub fn kind(&self) -> MediaKind {
        match self {
            Format::Webp
            | Format::Jpeg
            | Format::Png
            | Format::Bmp
            | Format::Gif
            | Format::Tiff
            | Format::Ico
            | Format::Raw
            | Format::Svg => MediaKind::Image,
            Format::ThreeGp
            | Format::Mp4
            | Format::Mov
            | Format::Avi
            | Format::Matroska
            | Format::Flv => MediaKind::Video,
            Format::Wav | Format::Mp3 | Format::Flac | Format::Ogg | Format::Wma => {
                MediaKind::Audio
            }
            Format::Pdf => MediaKind::Document,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Format {
    type Err = DemuxError;

    fn from_str(s: &str) -> Result<Self> {
        let format = match s.trim().to_ascii_lowercase().as_str() {
            "3gp" | "3gpp" => Format::ThreeGp,
            "mp4" | "m4v" => Format::Mp4,
            "mov" | "qt" | "quicktime" => Format::Mov,
            "avi" => Format::Avi,
            "wav" | "wave" => Format::Wav,
            "webp" => Format::Webp,
            "jpeg" | "jpg" | "mjpeg" => Format::Jpeg,
            "png" | "apng" => Format::Png,
            "bmp" => Format::Bmp,
            "gif" => Format::Gif,
            "tiff" | "tif" => Format::Tiff,
            "ico" => Format::Ico,
            "mp3" => Format::Mp3,
            "flac" => Format::Flac,
            "ogg" | "oga" | "ogv" | "opus" => Format::Ogg,
            "matroska" | "mkv" | "mka" | "webm" => Format::Matroska,
            "flv" => Format::Flv,
            "wma" | "asf" => Format::Wma,
            "pdf" => Format::Pdf,
            "raw" | "rawvideo" => Format::Raw,
            "svg" => Format::Svg,
            _ => return Err(DemuxError::unsupported(s.trim())),
        };
        Ok(format)
    }
}

/// Byte offsets inside a signature whose values are not compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wildcard {
    None,
    /// Half-open range `start..end` of ignored offsets
    Span { start: usize, end: usize },
}

impl Wildcard {
    /// ISO-BMFF `ftyp` box size (3GP, MP4, MOV)
    pub const ISO_BMFF_BOX_SIZE: Wildcard = Wildcard::Span { start: 0, end: 4 };
    /// RIFF chunk size (AVI, WAV, WEBP)
    pub const RIFF_CHUNK_SIZE: Wildcard = Wildcard::Span { start: 4, end: 8 };
    /// APPn segment length following the SOI + APPn markers
    pub const JPEG_SEGMENT_LENGTH: Wildcard = Wildcard::Span { start: 4, end: 6 };

    pub const fn contains(&self, offset: usize) -> bool {
        match *self {
            Wildcard::None => false,
            Wildcard::Span { start, end } => offset >= start && offset < end,
        }
    }
}

/// One header pattern. Bytes at wildcard offsets are placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub name: &'static str,
    pub pattern: &'static [u8],
    pub wildcard: Wildcard,
}

impl Signature {
    pub const fn exact(name: &'static str, pattern: &'static [u8]) -> Self {
        Self {
            name,
            pattern,
            wildcard: Wildcard::None,
        }
    }

    pub const fn with_wildcard(
        name: &'static str,
        pattern: &'static [u8],
        wildcard: Wildcard,
    ) -> Self {
        Self {
            name,
            pattern,
            wildcard,
        }
    }

    pub fn len(&self) -> usize {
        self.pattern.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pattern.is_empty()
    }

    pub fn is_wildcard(&self, offset: usize) -> bool {
        self.wildcard.contains(offset)
    }

    /// Whether `byte` satisfies the expectation at `offset`
    #[inline]
    pub fn accepts(&self, offset: usize, byte: u8) -> bool {
        self.is_wildcard(offset) || self.pattern[offset] == byte
    }

    /// Full-length comparison against the start of `data`
    pub fn matches(&self, data: &[u8]) -> bool {
        data.len() >= self.len()
            && data
                .iter()
                .zip(self.pattern)
                .enumerate()
                .all(|(offset, (&byte, _))| self.accepts(offset, byte))
    }
}

/// Renders as hex, with `??` at wildcard positions
impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (offset, byte) in self.pattern.iter().enumerate() {
            if offset > 0 {
                f.write_str(" ")?;
            }
            if self.is_wildcard(offset) {
                f.write_str("??")?;
            } else {
                write!(f, "{:02X}", byte)?;
            }
        }
        Ok(())
    }
}

/// Table row: the alternatives registered for one format, in priority order
#[derive(Debug, Clone, Copy)]
pub struct FormatSignatures {
    pub format: Format,
    pub signatures: &'static [Signature],
}

/// Whether `offset` of `signature` is exempt from comparison
pub fn is_wildcard(signature: &Signature, offset: usize) -> bool {
    signature.is_wildcard(offset)
}

/// Validated, immutable format -> signatures lookup.
///
/// Construction checks every table invariant up front so a session can never
/// discover a malformed entry mid-scan.
#[derive(Debug, Clone)]
pub struct SignatureRegistry {
    table: BTreeMap<Format, &'static [Signature]>,
}

impl SignatureRegistry {
    /// Registry over the built-in signature table
    pub fn builtin() -> Result<Self> {
        Self::from_table(BUILTIN)
    }

    pub fn from_table(entries: &[FormatSignatures]) -> Result<Self> {
        let mut table = BTreeMap::new();

        for entry in entries {
            validate_entry(entry)?;
            if table.insert(entry.format, entry.signatures).is_some() {
                return Err(DemuxError::DuplicateFormat {
                    format: entry.format.to_string(),
                });
            }
        }

        tracing::debug!(formats = table.len(), "Signature registry validated");

        Ok(Self { table })
    }

    /// Alternatives for `format`, in registration order
    pub fn get_signatures(&self, format: Format) -> Result<&'static [Signature]> {
        self.table
            .get(&format)
            .copied()
            .ok_or_else(|| DemuxError::unsupported(format))
    }

    /// Common length shared by every alternative of `format`
    pub fn signature_len(&self, format: Format) -> Result<usize> {
        // validation guarantees a non-empty list with one shared length
        self.get_signatures(format).map(|sigs| sigs[0].len())
    }

    pub fn contains(&self, format: Format) -> bool {
        self.table.contains_key(&format)
    }

    pub fn formats(&self) -> impl Iterator<Item = Format> + '_ {
        self.table.keys().copied()
    }

    pub fn max_signature_len(&self) -> usize {
        self.table
            .values()
            .map(|sigs| sigs[0].len())
            .max()
            .unwrap_or(0)
    }
}

fn validate_entry(entry: &FormatSignatures) -> Result<()> {
    let format = entry.format.to_string();
    let first = entry
        .signatures
        .first()
        .ok_or_else(|| DemuxError::NoAlternatives {
            format: format.clone(),
        })?;
    let expected = first.len();

    for (index, sig) in entry.signatures.iter().enumerate() {
        if sig.is_empty() {
            return Err(DemuxError::EmptySignature {
                format: format.clone(),
                index,
            });
        }
        if sig.len() != expected {
            return Err(DemuxError::SignatureLengthMismatch {
                format: format.clone(),
                index,
                expected,
                found: sig.len(),
            });
        }
        if let Wildcard::Span { start, end } = sig.wildcard {
            // at least one concrete byte must remain to anchor a match
            if start >= end || end > sig.len() || end - start >= sig.len() {
                return Err(DemuxError::InvalidWildcard {
                    format: format.clone(),
                    start,
                    end,
                    len: sig.len(),
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const FOUR: &[Signature] = &[Signature::exact("four", b"ABCD")];
    const MIXED: &[Signature] = &[
        Signature::exact("four", b"ABCD"),
        Signature::exact("five", b"ABCDE"),
    ];
    const ALL_WILD: &[Signature] = &[Signature::with_wildcard(
        "wild",
        b"ABCD",
        Wildcard::Span { start: 0, end: 4 },
    )];

    #[test]
    fn test_builtin_registry_validates() {
        let registry = SignatureRegistry::builtin().unwrap();
        assert!(registry.contains(Format::Jpeg));
        assert!(registry.max_signature_len() >= 16);
    }

    #[test]
    fn test_every_builtin_format_has_uniform_length() {
        for entry in BUILTIN {
            let len = entry.signatures[0].len();
            for sig in entry.signatures {
                assert_eq!(sig.len(), len, "{} alternative {} differs", entry.format, sig.name);
            }
        }
    }

    #[test]
    fn test_raw_and_svg_are_unsupported() {
        let registry = SignatureRegistry::builtin().unwrap();
        for format in [Format::Raw, Format::Svg] {
            let err = registry.get_signatures(format).unwrap_err();
            assert!(matches!(err, DemuxError::UnsupportedFormat { .. }));
            assert_eq!(err.kind(), ErrorKind::Configuration);
        }
    }

    #[test]
    fn test_every_other_format_is_registered() {
        let registry = SignatureRegistry::builtin().unwrap();
        for format in Format::ALL {
            let expected = !matches!(format, Format::Raw | Format::Svg);
            assert_eq!(registry.contains(format), expected, "{format}");
        }
    }

    #[test]
    fn test_family_wildcard_rules() {
        let registry = SignatureRegistry::builtin().unwrap();

        for format in [Format::ThreeGp, Format::Mp4, Format::Mov] {
            for sig in registry.get_signatures(format).unwrap() {
                assert!((0..4).all(|o| is_wildcard(sig, o)), "{format} {}", sig.name);
                assert!(!is_wildcard(sig, 4));
            }
        }

        for format in [Format::Avi, Format::Wav, Format::Webp] {
            for sig in registry.get_signatures(format).unwrap() {
                assert!(!is_wildcard(sig, 3));
                assert!((4..8).all(|o| is_wildcard(sig, o)), "{format}");
                assert!(!is_wildcard(sig, 8));
            }
        }

        let jpeg = registry.get_signatures(Format::Jpeg).unwrap();
        assert_eq!(jpeg.len(), 4);
        for sig in jpeg {
            let wild: Vec<usize> = (0..sig.len()).filter(|&o| is_wildcard(sig, o)).collect();
            assert_eq!(wild, vec![4, 5]);
        }

        for sig in registry.get_signatures(Format::Png).unwrap() {
            assert!((0..sig.len()).all(|o| !is_wildcard(sig, o)));
        }
    }

    #[test]
    fn test_wma_alternatives_carry_their_own_rule() {
        let registry = SignatureRegistry::builtin().unwrap();
        let wma = registry.get_signatures(Format::Wma).unwrap();
        assert_eq!(wma.len(), 3);
        assert_eq!(wma[0].wildcard, Wildcard::None);
        assert_eq!(wma[1].wildcard, Wildcard::RIFF_CHUNK_SIZE);
        assert_eq!(wma[2].wildcard, Wildcard::RIFF_CHUNK_SIZE);
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let err = SignatureRegistry::from_table(&[FormatSignatures {
            format: Format::Png,
            signatures: MIXED,
        }])
        .unwrap_err();
        assert!(matches!(
            err,
            DemuxError::SignatureLengthMismatch { index: 1, expected: 4, found: 5, .. }
        ));
        assert_eq!(err.kind(), ErrorKind::InvariantViolation);
    }

    #[test]
    fn test_empty_alternatives_rejected() {
        let err = SignatureRegistry::from_table(&[FormatSignatures {
            format: Format::Png,
            signatures: &[],
        }])
        .unwrap_err();
        assert!(matches!(err, DemuxError::NoAlternatives { .. }));
    }

    #[test]
    fn test_fully_wild_signature_rejected() {
        let err = SignatureRegistry::from_table(&[FormatSignatures {
            format: Format::Png,
            signatures: ALL_WILD,
        }])
        .unwrap_err();
        assert!(matches!(err, DemuxError::InvalidWildcard { .. }));
    }

    #[test]
    fn test_duplicate_format_rejected() {
        let entry = FormatSignatures {
            format: Format::Ogg,
            signatures: FOUR,
        };
        let err = SignatureRegistry::from_table(&[entry, entry]).unwrap_err();
        assert!(matches!(err, DemuxError::DuplicateFormat { .. }));
    }

    #[test]
    fn test_format_parsing_and_aliases() {
        assert_eq!("jpg".parse::<Format>().unwrap(), Format::Jpeg);
        assert_eq!("JPEG".parse::<Format>().unwrap(), Format::Jpeg);
        assert_eq!("webm".parse::<Format>().unwrap(), Format::Matroska);
        assert_eq!(" 3gp ".parse::<Format>().unwrap(), Format::ThreeGp);
        assert!(matches!(
            "heic".parse::<Format>(),
            Err(DemuxError::UnsupportedFormat { .. })
        ));
        for format in Format::ALL {
            assert_eq!(format.name().parse::<Format>().unwrap(), format);
        }
    }

    #[test]
    fn test_signature_display_marks_wildcards() {
        let registry = SignatureRegistry::builtin().unwrap();
        let avi = registry.get_signatures(Format::Avi).unwrap()[0];
        assert_eq!(avi.to_string(), "52 49 46 46 ?? ?? ?? ?? 41 56 49 20");
    }

    #[test]
    fn test_signature_matches_ignores_wildcards() {
        let registry = SignatureRegistry::builtin().unwrap();
        let avi = registry.get_signatures(Format::Avi).unwrap()[0];
        assert!(avi.matches(b"RIFF\x10\x20\x30\x40AVI LIST"));
        assert!(avi.matches(b"RIFF\xFF\xFF\xFF\xFFAVI "));
        assert!(!avi.matches(b"RIFF\x10\x20\x30\x40WAVE"));
        assert!(!avi.matches(b"RIFF"));
    }
}
