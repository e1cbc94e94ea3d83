//! Magic-byte content sniffing.
//!
//! Implements the signature table of the WHATWG MIME sniffing algorithm
//! (the same family of rules used by Go's `http.DetectContentType`), limited
//! to the first 512 bytes of input. Unknown data falls back to
//! `text/plain; charset=utf-8` when it contains no binary control bytes and
//! to `application/octet-stream` otherwise.

/// Only this many leading bytes take part in sniffing.
pub const SNIFF_LEN: usize = 512;

pub const ZIP: &str = "application/zip";
pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
pub const OCTET_STREAM: &str = "application/octet-stream";

const HTML: &str = "text/html; charset=utf-8";

#[derive(Debug, Clone, Copy)]
enum Rule {
    /// Exact prefix at offset zero.
    Prefix,
    /// Exact prefix after leading whitespace.
    PrefixAfterWs,
    /// Case-insensitive tag after leading whitespace, followed by a space or `>`.
    HtmlTag,
    /// `RIFF????WEBPVP`
    Webp,
}

struct Signature {
    pattern: &'static [u8],
    content_type: &'static str,
    rule: Rule,
}

const fn sig(pattern: &'static [u8], content_type: &'static str, rule: Rule) -> Signature {
    Signature {
        pattern,
        content_type,
        rule,
    }
}

const SIGNATURES: &[Signature] = &[
    sig(b"<!DOCTYPE HTML", HTML, Rule::HtmlTag),
    sig(b"<HTML", HTML, Rule::HtmlTag),
    sig(b"<HEAD", HTML, Rule::HtmlTag),
    sig(b"<SCRIPT", HTML, Rule::HtmlTag),
    sig(b"<IFRAME", HTML, Rule::HtmlTag),
    sig(b"<H1", HTML, Rule::HtmlTag),
    sig(b"<DIV", HTML, Rule::HtmlTag),
    sig(b"<FONT", HTML, Rule::HtmlTag),
    sig(b"<TABLE", HTML, Rule::HtmlTag),
    sig(b"<A", HTML, Rule::HtmlTag),
    sig(b"<STYLE", HTML, Rule::HtmlTag),
    sig(b"<TITLE", HTML, Rule::HtmlTag),
    sig(b"<B", HTML, Rule::HtmlTag),
    sig(b"<BODY", HTML, Rule::HtmlTag),
    sig(b"<BR", HTML, Rule::HtmlTag),
    sig(b"<P", HTML, Rule::HtmlTag),
    sig(b"<!--", HTML, Rule::HtmlTag),
    sig(b"<?xml", "text/xml; charset=utf-8", Rule::PrefixAfterWs),
    sig(b"%PDF-", "application/pdf", Rule::Prefix),
    sig(b"%!PS-Adobe-", "application/postscript", Rule::Prefix),
    sig(b"\xFE\xFF", "text/plain; charset=utf-16be", Rule::Prefix),
    sig(b"\xFF\xFE", "text/plain; charset=utf-16le", Rule::Prefix),
    sig(b"\xEF\xBB\xBF", TEXT_PLAIN, Rule::Prefix),
    sig(b"\x00\x00\x01\x00", "image/x-icon", Rule::Prefix),
    sig(b"\x00\x00\x02\x00", "image/x-icon", Rule::Prefix),
    sig(b"BM", "image/bmp", Rule::Prefix),
    sig(b"GIF87a", "image/gif", Rule::Prefix),
    sig(b"GIF89a", "image/gif", Rule::Prefix),
    sig(b"", "image/webp", Rule::Webp),
    sig(b"\x89PNG\x0D\x0A\x1A\x0A", "image/png", Rule::Prefix),
    sig(b"\xFF\xD8\xFF", "image/jpeg", Rule::Prefix),
    sig(b"OggS\x00", "application/ogg", Rule::Prefix),
    sig(b"ID3", "audio/mpeg", Rule::Prefix),
    sig(b"wOFF", "font/woff", Rule::Prefix),
    sig(b"wOF2", "font/woff2", Rule::Prefix),
    sig(b"\x1F\x8B\x08", "application/x-gzip", Rule::Prefix),
    sig(b"PK\x03\x04", ZIP, Rule::Prefix),
    sig(b"Rar!\x1A\x07\x00", "application/x-rar-compressed", Rule::Prefix),
    sig(b"Rar!\x1A\x07\x01\x00", "application/x-rar-compressed", Rule::Prefix),
    sig(b"\x00asm", "application/wasm", Rule::Prefix),
];

/// Returns the MIME type sniffed from the leading bytes of `data`.
pub fn detect_content_type(data: &[u8]) -> &'static str {
    let data = &data[..data.len().min(SNIFF_LEN)];
    let first_non_ws = data
        .iter()
        .position(|b| !is_whitespace(*b))
        .unwrap_or(data.len());

    for signature in SIGNATURES {
        if signature.matches(data, first_non_ws) {
            return signature.content_type;
        }
    }

    if data.iter().any(|b| is_binary(*b)) {
        OCTET_STREAM
    } else {
        TEXT_PLAIN
    }
}

impl Signature {
    fn matches(&self, data: &[u8], first_non_ws: usize) -> bool {
        match self.rule {
            Rule::Prefix => data.starts_with(self.pattern),
            Rule::PrefixAfterWs => data[first_non_ws..].starts_with(self.pattern),
            Rule::HtmlTag => {
                let rest = &data[first_non_ws..];
                if rest.len() <= self.pattern.len() {
                    return false;
                }
                let head_matches = rest
                    .iter()
                    .zip(self.pattern)
                    .all(|(b, p)| b.to_ascii_uppercase() == *p);
                head_matches && matches!(rest[self.pattern.len()], b' ' | b'>')
            }
            Rule::Webp => data.len() >= 14 && &data[..4] == b"RIFF" && &data[8..14] == b"WEBPVP",
        }
    }
}

fn is_whitespace(b: u8) -> bool {
    matches!(b, b'\t' | b'\n' | 0x0C | b'\r' | b' ')
}

fn is_binary(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_zip_local_file_header() {
        let mut data = b"PK\x03\x04\x14\x00\x00\x00\x08\x00".to_vec();
        data.extend_from_slice(&[0u8; 600]);
        assert_eq!(detect_content_type(&data), ZIP);
    }

    #[test]
    fn detects_common_binary_formats() {
        assert_eq!(detect_content_type(b"\x1F\x8B\x08\x00rest"), "application/x-gzip");
        assert_eq!(detect_content_type(b"%PDF-1.7\n"), "application/pdf");
        assert_eq!(
            detect_content_type(b"\x89PNG\x0D\x0A\x1A\x0A\x00\x00"),
            "image/png"
        );
        assert_eq!(detect_content_type(b"RIFF\x00\x00\x00\x00WEBPVP8 "), "image/webp");
    }

    #[test]
    fn html_requires_tag_terminator_and_ignores_case() {
        assert_eq!(detect_content_type(b"  <html><body>"), HTML);
        assert_eq!(detect_content_type(b"<!doctype html>"), HTML);
        // `<a` must be followed by a space or `>`.
        assert_eq!(detect_content_type(b"<abc"), TEXT_PLAIN);
    }

    #[test]
    fn falls_back_on_text_or_binary() {
        assert_eq!(detect_content_type(b"just some words"), TEXT_PLAIN);
        assert_eq!(detect_content_type(b""), TEXT_PLAIN);
        assert_eq!(detect_content_type(b"\x01\x02\x03"), OCTET_STREAM);
    }

    #[test]
    fn ignores_bytes_past_sniff_window() {
        let mut data = vec![b'a'; SNIFF_LEN];
        data.push(0x00);
        assert_eq!(detect_content_type(&data), TEXT_PLAIN);
    }

    #[test]
    fn empty_archive_signature_is_not_a_zip() {
        assert_eq!(detect_content_type(b"PK\x05\x06\x00\x00"), OCTET_STREAM);
    }
}
