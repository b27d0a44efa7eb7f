//! Document normalization: raw backend bytes to paginated Markdown.
//!
//! The normalizer is pure: identical input bytes and chunk size always
//! produce a byte-identical chunk sequence, and it never touches the
//! network or backend state. Conversion failures surface as
//! [`Error::ParseFailure`] with the container kind attached; there is no
//! retry at this layer.

use htmd::HtmlToMarkdown;

use crate::error::{Error, Result};
use crate::types::ContainerKind;

/// Default pagination window, in Unicode characters.
pub const DEFAULT_CHUNK_SIZE: usize = 5_000;

/// Converter configuration selected per adapter.
///
/// Backends that embed decision bodies in layout tables get the
/// table-aware profile; everything else uses the plain profile, which
/// strips presentational noise more aggressively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConverterProfile {
    /// Strip scripts, styles, images and figures.
    #[default]
    Plain,
    /// Keep table and figure content flowing into the Markdown.
    TableAware,
}

/// A chunked Markdown rendition of one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedMarkdown {
    markdown: String,
    chunk_size: usize,
}

impl ChunkedMarkdown {
    /// Total number of chunks; at least 1, even for an empty document.
    pub fn total_chunks(&self) -> u32 {
        let chars = self.markdown.chars().count();
        if chars == 0 {
            return 1;
        }
        u32::try_from(chars.div_ceil(self.chunk_size)).unwrap_or(u32::MAX)
    }

    /// Character count of the full Markdown document.
    pub fn full_char_count(&self) -> u64 {
        self.markdown.chars().count() as u64
    }

    /// Whether the document spans more than one chunk.
    pub fn is_paginated(&self) -> bool {
        self.total_chunks() > 1
    }

    /// Return chunk `requested` (1-indexed), clamping out-of-range values
    /// to the nearest valid chunk. The clamped index is reported back so
    /// callers can detect the clamp.
    pub fn chunk(&self, requested: u32) -> (u32, String) {
        let total = self.total_chunks();
        let clamped = requested.clamp(1, total);
        let skip = (clamped as usize - 1) * self.chunk_size;
        let text: String = self
            .markdown
            .chars()
            .skip(skip)
            .take(self.chunk_size)
            .collect();
        (clamped, text)
    }

    /// The full Markdown text.
    pub fn full_text(&self) -> &str {
        &self.markdown
    }
}

/// HTML/PDF to paginated-Markdown converter.
pub struct Normalizer {
    profile: ConverterProfile,
    chunk_size: usize,
}

impl Normalizer {
    /// Converter with the plain profile and the default window size.
    pub fn new() -> Self {
        Self {
            profile: ConverterProfile::Plain,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Select the converter profile.
    pub fn with_profile(mut self, profile: ConverterProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Override the pagination window (tests only; callers cannot set this
    /// through the tool surface).
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        debug_assert!(chunk_size > 0);
        self.chunk_size = chunk_size;
        self
    }

    /// Normalize a raw document into chunked Markdown.
    pub fn normalize(&self, bytes: &[u8], container: ContainerKind) -> Result<ChunkedMarkdown> {
        let markdown = match container {
            ContainerKind::HtmlFragment | ContainerKind::HtmlPage => {
                let html = String::from_utf8_lossy(bytes);
                self.convert_html(&html, container)?
            },
            ContainerKind::Pdf => pdf_extract::extract_text_from_mem(bytes).map_err(|e| {
                Error::ParseFailure {
                    container,
                    message: e.to_string(),
                }
            })?,
        };

        Ok(ChunkedMarkdown {
            markdown: markdown.trim().to_string(),
            chunk_size: self.chunk_size,
        })
    }

    fn convert_html(&self, html: &str, container: ContainerKind) -> Result<String> {
        let prepared = prepare_html(html);
        let converter = self.build_converter();
        converter.convert(&prepared).map_err(|e| Error::ParseFailure {
            container,
            message: e.to_string(),
        })
    }

    fn build_converter(&self) -> HtmlToMarkdown {
        let skip: Vec<&str> = match self.profile {
            ConverterProfile::Plain => {
                vec!["script", "style", "head", "iframe", "img", "figure"]
            },
            ConverterProfile::TableAware => vec!["script", "style", "head", "iframe"],
        };
        HtmlToMarkdown::builder().skip_tags(skip).build()
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Unescape entities once and normalize the escape sequences some backends
/// leave in JSON-embedded HTML. The result stays an in-memory stream: a few
/// backends embed document ids in paths long enough to exceed filesystem
/// limits, so nothing here may hit a temp file.
fn prepare_html(html: &str) -> String {
    let unescaped = html_escape::decode_html_entities(html);
    unescaped
        .replace("\\\"", "\"")
        .replace("\\r\\n", "\n")
        .replace("\\n", "\n")
        .replace("\\t", "\t")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunked(text: &str, size: usize) -> ChunkedMarkdown {
        ChunkedMarkdown {
            markdown: text.to_string(),
            chunk_size: size,
        }
    }

    #[test]
    fn html_converts_to_markdown() {
        let n = Normalizer::new();
        let doc = n
            .normalize(
                b"<html><body><h1>Karar</h1><p>Esas no 2024/1</p></body></html>",
                ContainerKind::HtmlPage,
            )
            .unwrap();
        assert!(doc.full_text().contains("Karar"));
        assert!(doc.full_text().contains("Esas no 2024/1"));
    }

    #[test]
    fn escaped_sequences_are_normalized() {
        let n = Normalizer::new();
        let doc = n
            .normalize(
                br#"<p>birinci sat\u{131}r\nikinci</p>"#.as_ref(),
                ContainerKind::HtmlFragment,
            )
            .unwrap();
        // The literal backslash-n must have become a real newline before
        // conversion, not survive into the output.
        assert!(!doc.full_text().contains("\\n"));
    }

    #[test]
    fn entities_are_unescaped_once() {
        let n = Normalizer::new();
        let doc = n
            .normalize(b"<p>Taraflar aras&#305;nda &amp; hakk&#305;nda</p>", ContainerKind::HtmlFragment)
            .unwrap();
        assert!(doc.full_text().contains("Taraflar aras\u{131}nda"));
        assert!(doc.full_text().contains('&'));
    }

    #[test]
    fn script_content_is_dropped() {
        let n = Normalizer::new();
        let doc = n
            .normalize(
                b"<body><script>var leak = 1;</script><p>metin</p></body>",
                ContainerKind::HtmlPage,
            )
            .unwrap();
        assert!(!doc.full_text().contains("leak"));
        assert!(doc.full_text().contains("metin"));
    }

    #[test]
    fn invalid_pdf_is_parse_failure() {
        let n = Normalizer::new();
        let err = n.normalize(b"not a pdf at all", ContainerKind::Pdf).unwrap_err();
        match err {
            Error::ParseFailure { container, .. } => assert_eq!(container, ContainerKind::Pdf),
            other => unreachable!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn chunking_is_deterministic() {
        let n = Normalizer::new().with_chunk_size(10);
        let bytes = b"<p>0123456789abcdefghij0123</p>";
        let a = n.normalize(bytes, ContainerKind::HtmlFragment).unwrap();
        let b = n.normalize(bytes, ContainerKind::HtmlFragment).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.chunk(1), b.chunk(1));
        assert_eq!(a.chunk(2), b.chunk(2));
    }

    #[test]
    fn chunk_concat_equals_whole() {
        // Mixed-width characters: chunk boundaries are by character count.
        let text = "ğüşiöç".repeat(1_000);
        let c = chunked(&text, 777);
        let mut rebuilt = String::new();
        for i in 1..=c.total_chunks() {
            let (got, piece) = c.chunk(i);
            assert_eq!(got, i);
            rebuilt.push_str(&piece);
        }
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn chunk_boundaries_are_character_counted() {
        let text = "ağbğc".to_string(); // 5 chars, 7 bytes
        let c = chunked(&text, 2);
        assert_eq!(c.total_chunks(), 3);
        assert_eq!(c.chunk(1).1, "ağ");
        assert_eq!(c.chunk(2).1, "bğ");
        assert_eq!(c.chunk(3).1, "c");
    }

    #[test]
    fn out_of_range_chunk_clamps_and_reports() {
        let c = chunked(&"x".repeat(12_000), 5_000);
        assert_eq!(c.total_chunks(), 3);

        let (idx, text) = c.chunk(9_999);
        assert_eq!(idx, 3);
        assert!(!text.is_empty());

        let (idx, _) = c.chunk(0);
        assert_eq!(idx, 1);
    }

    #[test]
    fn empty_document_has_one_empty_chunk() {
        let c = chunked("", 5_000);
        assert_eq!(c.total_chunks(), 1);
        assert!(!c.is_paginated());
        let (idx, text) = c.chunk(1);
        assert_eq!(idx, 1);
        assert!(text.is_empty());
    }

    #[test]
    fn is_paginated_threshold() {
        assert!(!chunked(&"x".repeat(5_000), 5_000).is_paginated());
        assert!(chunked(&"x".repeat(5_001), 5_000).is_paginated());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            // Totality: concatenating all chunks reproduces the document
            // exactly, for arbitrary (including multi-byte) text and any
            // window size.
            #[test]
            fn chunks_concatenate_to_whole(text in ".{0,2000}", size in 1usize..600) {
                let c = chunked(&text, size);
                let mut rebuilt = String::new();
                for i in 1..=c.total_chunks() {
                    rebuilt.push_str(&c.chunk(i).1);
                }
                prop_assert_eq!(rebuilt, text);
            }

            // Every chunk except the last is exactly the window size, in
            // characters.
            #[test]
            fn interior_chunks_are_full(text in ".{1,2000}", size in 1usize..600) {
                let c = chunked(&text, size);
                for i in 1..c.total_chunks() {
                    prop_assert_eq!(c.chunk(i).1.chars().count(), size);
                }
            }

            // Clamping always lands inside [1, total_chunks].
            #[test]
            fn clamp_is_in_range(text in ".{0,500}", size in 1usize..100, requested in 0u32..1_000) {
                let c = chunked(&text, size);
                let (idx, _) = c.chunk(requested);
                prop_assert!(idx >= 1 && idx <= c.total_chunks());
            }
        }
    }
}
