//! Content-type detection from leading bytes.
//!
//! Implements the signature table of the WHATWG MIME Sniffing standard (the same table browsers
//! and most HTTP servers use). Only the bytes are consulted; any content type declared by the
//! client is ignored.

/// Maximum number of leading bytes consulted.
pub const SNIFF_LEN: usize = 512;

/// Fallback when no signature matches.
pub const OCTET_STREAM: &str = "application/octet-stream";

enum Signature {
    /// Bytes must equal `pattern` at the start of the data.
    Exact { pattern: &'static [u8], content_type: &'static str },
    /// `data[i] & mask[i] == pattern[i]` for every byte of the pattern.
    Masked {
        mask: &'static [u8],
        pattern: &'static [u8],
        skip_whitespace: bool,
        content_type: &'static str,
    },
    /// Case-insensitive HTML tag followed by a space or `>`.
    Html(&'static [u8]),
    Mp4,
    Text,
}

const HTML: &str = "text/html; charset=utf-8";
const RIFF_MASK: &[u8] = b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF";

const SIGNATURES: &[Signature] = &[
    Signature::Html(b"<!DOCTYPE HTML"),
    Signature::Html(b"<HTML"),
    Signature::Html(b"<HEAD"),
    Signature::Html(b"<SCRIPT"),
    Signature::Html(b"<IFRAME"),
    Signature::Html(b"<H1"),
    Signature::Html(b"<DIV"),
    Signature::Html(b"<FONT"),
    Signature::Html(b"<TABLE"),
    Signature::Html(b"<A"),
    Signature::Html(b"<STYLE"),
    Signature::Html(b"<TITLE"),
    Signature::Html(b"<B"),
    Signature::Html(b"<BODY"),
    Signature::Html(b"<BR"),
    Signature::Html(b"<P"),
    Signature::Html(b"<!--"),
    Signature::Masked {
        mask: b"\xFF\xFF\xFF\xFF\xFF",
        pattern: b"<?xml",
        skip_whitespace: true,
        content_type: "text/xml; charset=utf-8",
    },
    Signature::Exact {
        pattern: b"%PDF-",
        content_type: "application/pdf",
    },
    Signature::Exact {
        pattern: b"%!PS-Adobe-",
        content_type: "application/postscript",
    },
    // Byte order marks
    Signature::Masked {
        mask: b"\xFF\xFF\x00\x00",
        pattern: b"\xFE\xFF\x00\x00",
        skip_whitespace: false,
        content_type: "text/plain; charset=utf-16be",
    },
    Signature::Masked {
        mask: b"\xFF\xFF\x00\x00",
        pattern: b"\xFF\xFE\x00\x00",
        skip_whitespace: false,
        content_type: "text/plain; charset=utf-16le",
    },
    Signature::Masked {
        mask: b"\xFF\xFF\xFF\x00",
        pattern: b"\xEF\xBB\xBF\x00",
        skip_whitespace: false,
        content_type: "text/plain; charset=utf-8",
    },
    // Images
    Signature::Exact {
        pattern: b"\x00\x00\x01\x00",
        content_type: "image/x-icon",
    },
    Signature::Exact {
        pattern: b"\x00\x00\x02\x00",
        content_type: "image/x-icon",
    },
    Signature::Exact {
        pattern: b"BM",
        content_type: "image/bmp",
    },
    Signature::Exact {
        pattern: b"GIF87a",
        content_type: "image/gif",
    },
    Signature::Exact {
        pattern: b"GIF89a",
        content_type: "image/gif",
    },
    Signature::Masked {
        mask: b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF\xFF\xFF",
        pattern: b"RIFF\x00\x00\x00\x00WEBPVP",
        skip_whitespace: false,
        content_type: "image/webp",
    },
    Signature::Exact {
        pattern: b"\x89PNG\x0D\x0A\x1A\x0A",
        content_type: "image/png",
    },
    Signature::Exact {
        pattern: b"\xFF\xD8\xFF",
        content_type: "image/jpeg",
    },
    // Audio and video
    Signature::Masked {
        mask: RIFF_MASK,
        pattern: b"FORM\x00\x00\x00\x00AIFF",
        skip_whitespace: false,
        content_type: "audio/aiff",
    },
    Signature::Masked {
        mask: b"\xFF\xFF\xFF",
        pattern: b"ID3",
        skip_whitespace: false,
        content_type: "audio/mpeg",
    },
    Signature::Masked {
        mask: b"\xFF\xFF\xFF\xFF\xFF",
        pattern: b"OggS\x00",
        skip_whitespace: false,
        content_type: "application/ogg",
    },
    Signature::Masked {
        mask: b"\xFF\xFF\xFF\xFF\xFF\xFF\xFF\xFF",
        pattern: b"MThd\x00\x00\x00\x06",
        skip_whitespace: false,
        content_type: "audio/midi",
    },
    Signature::Masked {
        mask: RIFF_MASK,
        pattern: b"RIFF\x00\x00\x00\x00AVI ",
        skip_whitespace: false,
        content_type: "video/avi",
    },
    Signature::Masked {
        mask: RIFF_MASK,
        pattern: b"RIFF\x00\x00\x00\x00WAVE",
        skip_whitespace: false,
        content_type: "audio/wave",
    },
    Signature::Mp4,
    Signature::Exact {
        pattern: b"\x1A\x45\xDF\xA3",
        content_type: "video/webm",
    },
    // Fonts
    Signature::Masked {
        mask: b"\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\xFF\xFF",
        pattern: b"\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00LP",
        skip_whitespace: false,
        content_type: "application/vnd.ms-fontobject",
    },
    Signature::Exact {
        pattern: b"\x00\x01\x00\x00",
        content_type: "font/ttf",
    },
    Signature::Exact {
        pattern: b"OTTO",
        content_type: "font/otf",
    },
    Signature::Exact {
        pattern: b"ttcf",
        content_type: "font/collection",
    },
    Signature::Exact {
        pattern: b"wOFF",
        content_type: "font/woff",
    },
    Signature::Exact {
        pattern: b"wOF2",
        content_type: "font/woff2",
    },
    // Archives
    Signature::Exact {
        pattern: b"\x1F\x8B\x08",
        content_type: "application/x-gzip",
    },
    Signature::Exact {
        pattern: b"PK\x03\x04",
        content_type: "application/zip",
    },
    Signature::Exact {
        pattern: b"Rar!\x1A\x07\x00",
        content_type: "application/x-rar-compressed",
    },
    Signature::Exact {
        pattern: b"Rar!\x1A\x07\x01\x00",
        content_type: "application/x-rar-compressed",
    },
    Signature::Exact {
        pattern: b"\x00\x61\x73\x6D",
        content_type: "application/wasm",
    },
    Signature::Text,
];

/// Detect the content type of `data` from its first [`SNIFF_LEN`] bytes.
///
/// Always returns a valid MIME type, falling back to `application/octet-stream`.
pub fn detect_content_type(data: &[u8]) -> &'static str {
    let data = &data[..data.len().min(SNIFF_LEN)];
    let first_non_ws = data.iter().position(|b| !is_whitespace(*b)).unwrap_or(data.len());

    SIGNATURES
        .iter()
        .find_map(|signature| signature.matches(data, first_non_ws))
        .unwrap_or(OCTET_STREAM)
}

/// Essence of a content type: the `type/subtype` part without parameters.
pub fn essence(content_type: &str) -> &str {
    content_type.split(';').next().unwrap_or(content_type).trim()
}

impl Signature {
    fn matches(&self, data: &[u8], first_non_ws: usize) -> Option<&'static str> {
        match self {
            Signature::Exact { pattern, content_type } => data.starts_with(pattern).then_some(*content_type),
            Signature::Masked {
                mask,
                pattern,
                skip_whitespace,
                content_type,
            } => {
                let data = if *skip_whitespace { &data[first_non_ws..] } else { data };
                if data.len() < pattern.len() {
                    return None;
                }
                data.iter()
                    .zip(mask.iter().zip(pattern.iter()))
                    .all(|(byte, (mask, pattern))| byte & mask == *pattern)
                    .then_some(*content_type)
            }
            Signature::Html(tag) => {
                let data = &data[first_non_ws..];
                if data.len() < tag.len() + 1 {
                    return None;
                }
                let tag_matches = tag.iter().zip(data).all(|(expected, actual)| {
                    if expected.is_ascii_uppercase() {
                        actual & 0xDF == *expected
                    } else {
                        actual == expected
                    }
                });
                // The tag must be terminated by a space or '>'
                (tag_matches && matches!(data[tag.len()], b' ' | b'>')).then_some(HTML)
            }
            Signature::Mp4 => is_mp4(data).then_some("video/mp4"),
            Signature::Text => {
                let data = &data[first_non_ws..];
                (!data.iter().any(|b| is_binary(*b))).then_some("text/plain; charset=utf-8")
            }
        }
    }
}

fn is_mp4(data: &[u8]) -> bool {
    if data.len() < 12 {
        return false;
    }
    let box_size = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
    if data.len() < box_size || box_size % 4 != 0 || &data[4..8] != b"ftyp" {
        return false;
    }
    // Major brand at 8, minor version at 12 (skipped), compatible brands after.
    (8..box_size)
        .step_by(4)
        .filter(|offset| *offset != 12)
        .any(|offset| &data[offset..offset + 3] == b"mp4")
}

fn is_whitespace(byte: u8) -> bool {
    matches!(byte, b'\t' | b'\n' | 0x0C | b'\r' | b' ')
}

fn is_binary(byte: u8) -> bool {
    matches!(byte, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F)
}
