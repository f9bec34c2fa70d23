//! Built-in signature table.
//!
//! Every alternative registered for a format has the same length. Wildcard
//! positions hold `0x00` placeholders; they are never compared.

use super::{Format, FormatSignatures, Signature, Wildcard};

// === ISO-BMFF: [box size] "ftyp" [major brand] ===

const THREE_GP: &[Signature] = &[
    Signature::with_wildcard("3GP (3gp4)", b"\0\0\0\0ftyp3gp4", Wildcard::ISO_BMFF_BOX_SIZE),
    Signature::with_wildcard("3GP (3gp5)", b"\0\0\0\0ftyp3gp5", Wildcard::ISO_BMFF_BOX_SIZE),
    Signature::with_wildcard("3GP (3gp6)", b"\0\0\0\0ftyp3gp6", Wildcard::ISO_BMFF_BOX_SIZE),
];

const MP4: &[Signature] = &[
    Signature::with_wildcard("MP4 (isom)", b"\0\0\0\0ftypisom", Wildcard::ISO_BMFF_BOX_SIZE),
    Signature::with_wildcard("MP4 (iso2)", b"\0\0\0\0ftypiso2", Wildcard::ISO_BMFF_BOX_SIZE),
    Signature::with_wildcard("MP4 (mp41)", b"\0\0\0\0ftypmp41", Wildcard::ISO_BMFF_BOX_SIZE),
    Signature::with_wildcard("MP4 (mp42)", b"\0\0\0\0ftypmp42", Wildcard::ISO_BMFF_BOX_SIZE),
    Signature::with_wildcard("MP4 (avc1)", b"\0\0\0\0ftypavc1", Wildcard::ISO_BMFF_BOX_SIZE),
    Signature::with_wildcard("MP4 (dash)", b"\0\0\0\0ftypdash", Wildcard::ISO_BMFF_BOX_SIZE),
];

const MOV: &[Signature] = &[Signature::with_wildcard(
    "QuickTime",
    b"\0\0\0\0ftypqt  ",
    Wildcard::ISO_BMFF_BOX_SIZE,
)];

// === RIFF: "RIFF" [chunk size] [form type] ===

const AVI: &[Signature] =
    &[Signature::with_wildcard("AVI", b"RIFF\0\0\0\0AVI ", Wildcard::RIFF_CHUNK_SIZE)];

const WAV: &[Signature] =
    &[Signature::with_wildcard("WAV", b"RIFF\0\0\0\0WAVE", Wildcard::RIFF_CHUNK_SIZE)];

const WEBP: &[Signature] =
    &[Signature::with_wildcard("WebP", b"RIFF\0\0\0\0WEBP", Wildcard::RIFF_CHUNK_SIZE)];

// === JPEG: SOI, APPn marker, [segment length], identifier ===

const JPEG: &[Signature] = &[
    Signature::with_wildcard(
        "JPEG (JFIF)",
        &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x00, 0x4A, 0x46, 0x49, 0x46, 0x00, 0x01],
        Wildcard::JPEG_SEGMENT_LENGTH,
    ),
    Signature::with_wildcard(
        "JPEG (Exif)",
        &[0xFF, 0xD8, 0xFF, 0xE1, 0x00, 0x00, 0x45, 0x78, 0x69, 0x66, 0x00, 0x00],
        Wildcard::JPEG_SEGMENT_LENGTH,
    ),
    Signature::with_wildcard(
        "JPEG (ICC profile)",
        &[0xFF, 0xD8, 0xFF, 0xE2, 0x00, 0x00, 0x49, 0x43, 0x43, 0x5F, 0x50, 0x52],
        Wildcard::JPEG_SEGMENT_LENGTH,
    ),
    Signature::with_wildcard(
        "JPEG (SPIFF)",
        &[0xFF, 0xD8, 0xFF, 0xE8, 0x00, 0x00, 0x53, 0x50, 0x49, 0x46, 0x46, 0x00],
        Wildcard::JPEG_SEGMENT_LENGTH,
    ),
];

// === Other images ===

const PNG: &[Signature] = &[Signature::exact(
    "PNG",
    &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A],
)];

const BMP: &[Signature] = &[Signature::exact("BMP", b"BM")];

const GIF: &[Signature] =
    &[Signature::exact("GIF87a", b"GIF87a"), Signature::exact("GIF89a", b"GIF89a")];

const TIFF: &[Signature] = &[
    Signature::exact("TIFF-LE", &[0x49, 0x49, 0x2A, 0x00]),
    Signature::exact("TIFF-BE", &[0x4D, 0x4D, 0x00, 0x2A]),
];

const ICO: &[Signature] = &[Signature::exact("ICO", &[0x00, 0x00, 0x01, 0x00])];

// === Audio ===

const MP3: &[Signature] = &[Signature::exact("MP3-ID3", b"ID3")];

const FLAC: &[Signature] = &[Signature::exact("FLAC", b"fLaC")];

const OGG: &[Signature] = &[Signature::exact("Ogg", b"OggS")];

/// WMA reaches the pipe inside ASF, or as a `wmav2` stream in a WAVE
/// container (plain RIFF or RF64); each container keeps its own rule.
const WMA: &[Signature] = &[
    Signature::exact(
        "WMA (ASF header)",
        &[
            0x30, 0x26, 0xB2, 0x75, 0x8E, 0x66, 0xCF, 0x11, 0xA6, 0xD9, 0x00, 0xAA, 0x00, 0x62,
            0xCE, 0x6C,
        ],
    ),
    Signature::with_wildcard("WMA (RIFF/WAVE)", b"RIFF\0\0\0\0WAVEfmt ", Wildcard::RIFF_CHUNK_SIZE),
    Signature::with_wildcard("WMA (RF64/WAVE)", b"RF64\0\0\0\0WAVEds64", Wildcard::RIFF_CHUNK_SIZE),
];

// === Other video ===

const MATROSKA: &[Signature] = &[Signature::exact("Matroska/WebM", &[0x1A, 0x45, 0xDF, 0xA3])];

const FLV: &[Signature] = &[Signature::exact("FLV", b"FLV\x01")];

// === Documents ===

const PDF: &[Signature] = &[Signature::exact("PDF", b"%PDF-")];

/// All registered formats. `Raw` and `Svg` are deliberately absent: neither
/// has a fixed header that could delimit files in a stream.
pub static BUILTIN: &[FormatSignatures] = &[
    FormatSignatures { format: Format::ThreeGp, signatures: THREE_GP },
    FormatSignatures { format: Format::Mp4, signatures: MP4 },
    FormatSignatures { format: Format::Mov, signatures: MOV },
    FormatSignatures { format: Format::Avi, signatures: AVI },
    FormatSignatures { format: Format::Wav, signatures: WAV },
    FormatSignatures { format: Format::Webp, signatures: WEBP },
    FormatSignatures { format: Format::Jpeg, signatures: JPEG },
    FormatSignatures { format: Format::Png, signatures: PNG },
    FormatSignatures { format: Format::Bmp, signatures: BMP },
    FormatSignatures { format: Format::Gif, signatures: GIF },
    FormatSignatures { format: Format::Tiff, signatures: TIFF },
    FormatSignatures { format: Format::Ico, signatures: ICO },
    FormatSignatures { format: Format::Mp3, signatures: MP3 },
    FormatSignatures { format: Format::Flac, signatures: FLAC },
    FormatSignatures { format: Format::Ogg, signatures: OGG },
    FormatSignatures { format: Format::Matroska, signatures: MATROSKA },
    FormatSignatures { format: Format::Flv, signatures: FLV },
    FormatSignatures { format: Format::Wma, signatures: WMA },
    FormatSignatures { format: Format::Pdf, signatures: PDF },
];
