//! Block scanner for PCL documents.
//!
//! Grammar: `%<kind><meta>\n<body>%end<kind>` with `kind` one of `c` or `py`.
//! The first `%end<kind>` after the header closes the block, so blocks of the
//! same kind never nest. Text outside blocks is ignored.

use super::diagnostic::{DiagnosticKind, GrammarDiagnostic};
use super::types::{Block, BlockKind, Metadata};

/// Result of scanning a document.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Blocks in document order.
    pub blocks: Vec<Block>,
    /// Markers that did not form a block.
    pub diagnostics: Vec<GrammarDiagnostic>,
}

impl Extraction {
    /// Whether the document scanned without any diagnostics.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn native_count(&self) -> usize {
        self.count(BlockKind::Native)
    }

    pub fn script_count(&self) -> usize {
        self.count(BlockKind::Script)
    }

    fn count(&self, kind: BlockKind) -> usize {
        self.blocks.iter().filter(|b| b.kind == kind).count()
    }
}

/// Scan a document into blocks.
pub fn extract(document: &str) -> Extraction {
    BlockScanner::new(document).run()
}

struct BlockScanner<'a> {
    source: &'a str,
    pos: usize,
    extraction: Extraction,
}

impl<'a> BlockScanner<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            pos: 0,
            extraction: Extraction::default(),
        }
    }

    fn run(mut self) -> Extraction {
        while let Some(rel) = self.source[self.pos..].find('%') {
            let at = self.pos + rel;
            let rest = &self.source[at + 1..];

            if let Some(kind) = opening_kind(rest) {
                self.pos = self.read_block(at, kind);
            } else if let Some(kind) = stray_end_kind(rest) {
                let marker = kind.end_marker();
                self.pos = at + marker.len();
                self.diagnose(DiagnosticKind::UnmatchedEnd, at, marker);
            } else {
                self.pos = at + 1;
            }
        }

        self.extraction
    }

    /// Read the block opened at `at`; returns where scanning resumes.
    fn read_block(&mut self, at: usize, kind: BlockKind) -> usize {
        let header_start = at + 1 + kind.tag().len();

        let Some(newline) = self.source[header_start..].find('\n') else {
            self.diagnose(DiagnosticKind::UnterminatedBlock, at, kind.open_marker());
            return self.source.len();
        };
        let header = &self.source[header_start..header_start + newline];
        let body_start = header_start + newline + 1;

        let end_marker = kind.end_marker();
        let Some(body_len) = self.source[body_start..].find(&end_marker) else {
            self.diagnose(DiagnosticKind::UnterminatedBlock, at, kind.open_marker());
            return body_start;
        };
        let body_end = body_start + body_len;
        let block_end = body_end + end_marker.len();

        let metadata = self.parse_metadata(header, header_start);
        let block = Block {
            kind,
            metadata,
            body: self.source[body_start..body_end].to_string(),
            sequence_index: self.extraction.blocks.len(),
            header: header.to_string(),
            span: at..block_end,
        };

        tracing::debug!(
            "Extracted {} block #{} ({})",
            kind,
            block.sequence_index,
            block.name()
        );
        self.extraction.blocks.push(block);

        block_end
    }

    fn parse_metadata(&mut self, header: &str, header_offset: usize) -> Metadata {
        let mut metadata = Metadata::new();

        for (rel, token) in tokens(header) {
            match token.split_once('=') {
                Some((key, value)) if is_meta_key(key) && !value.is_empty() => {
                    metadata.insert_raw(key, value);
                }
                _ => self.diagnose(
                    DiagnosticKind::MalformedMetadata,
                    header_offset + rel,
                    token,
                ),
            }
        }

        metadata
    }

    fn diagnose(&mut self, kind: DiagnosticKind, offset: usize, marker: impl Into<String>) {
        let diagnostic = GrammarDiagnostic::new(kind, offset, marker);
        tracing::debug!("Grammar diagnostic: {}", diagnostic);
        self.extraction.diagnostics.push(diagnostic);
    }
}

/// Kind opened by the text following a `%`.
///
/// The tag must be followed by whitespace or the end of input, so `%cpp` or
/// `%python` are plain text.
fn opening_kind(rest: &str) -> Option<BlockKind> {
    BlockKind::ALL.into_iter().find(|kind| {
        rest.strip_prefix(kind.tag())
            .is_some_and(|after| after.chars().next().is_none_or(char::is_whitespace))
    })
}

/// Kind of a closing marker found outside any block.
fn stray_end_kind(rest: &str) -> Option<BlockKind> {
    let after_end = rest.strip_prefix("end")?;
    BlockKind::ALL.into_iter().find(|kind| {
        after_end
            .strip_prefix(kind.tag())
            .is_some_and(|after| !after.starts_with(is_word_char))
    })
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_meta_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

/// Whitespace-separated tokens with their byte offsets.
fn tokens(text: &str) -> Vec<(usize, &str)> {
    let mut out = Vec::new();
    let mut start = None;

    for (i, c) in text.char_indices() {
        if c.is_whitespace() {
            if let Some(s) = start.take() {
                out.push((s, &text[s..i]));
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        out.push((s, &text[s..]));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = "\
Intro text is ignored.

%c name=mathlib export=rc_add,g_result
int g_result = 0;
int rc_add(int a, int b) { g_result = a + b; return 0; }
%endc

%py requires=mathlib
rc_add(2, 3)
print(g_result.value)
%endpy
";

    #[test]
    fn test_extracts_blocks_in_order() {
        let extraction = extract(DOCUMENT);
        assert!(extraction.is_clean(), "{:?}", extraction.diagnostics);
        assert_eq!(extraction.blocks.len(), 2);

        let native = &extraction.blocks[0];
        assert_eq!(native.kind, BlockKind::Native);
        assert_eq!(native.sequence_index, 0);
        assert_eq!(native.name(), "mathlib");
        assert_eq!(native.metadata.exports(), ["rc_add", "g_result"]);
        assert!(native.body.starts_with("int g_result = 0;\n"));
        assert!(native.body.ends_with("return 0; }\n"));

        let script = &extraction.blocks[1];
        assert_eq!(script.kind, BlockKind::Script);
        assert_eq!(script.sequence_index, 1);
        assert_eq!(script.metadata.requires(), vec!["mathlib"]);
        assert_eq!(script.body, "rc_add(2, 3)\nprint(g_result.value)\n");
    }

    #[test]
    fn test_fragments_are_byte_identical() {
        let extraction = extract(DOCUMENT);
        for block in &extraction.blocks {
            assert_eq!(&DOCUMENT[block.span.clone()], block.fragment());
        }
    }

    #[test]
    fn test_first_end_marker_wins() {
        let doc = "%c\nint a;\n%endc\nint b;\n%endc\n";
        let extraction = extract(doc);
        assert_eq!(extraction.blocks.len(), 1);
        assert_eq!(extraction.blocks[0].body, "int a;\n");
        // The second %endc is outside any block.
        assert_eq!(extraction.diagnostics.len(), 1);
        assert_eq!(extraction.diagnostics[0].kind, DiagnosticKind::UnmatchedEnd);
        assert_eq!(extraction.diagnostics[0].offset, doc.rfind("%endc").unwrap());
    }

    #[test]
    fn test_other_kind_marker_inside_body_is_text() {
        let doc = "%py\nprint('%c inside')\n%endpy\n";
        let extraction = extract(doc);
        assert!(extraction.is_clean());
        assert_eq!(extraction.blocks.len(), 1);
        assert_eq!(extraction.blocks[0].body, "print('%c inside')\n");
    }

    #[test]
    fn test_header_without_metadata() {
        let extraction = extract("%c\n%endc");
        assert_eq!(extraction.blocks.len(), 1);
        assert!(extraction.blocks[0].metadata.is_empty());
        assert_eq!(extraction.blocks[0].body, "");
        assert_eq!(extraction.blocks[0].name(), "module_0");
    }

    #[test]
    fn test_unterminated_block_is_reported() {
        let doc = "%py\nprint(1)\n%endpy\n%c name=broken\nint x;\n";
        let extraction = extract(doc);
        assert_eq!(extraction.blocks.len(), 1);
        assert_eq!(extraction.diagnostics.len(), 1);

        let diag = &extraction.diagnostics[0];
        assert_eq!(diag.kind, DiagnosticKind::UnterminatedBlock);
        assert_eq!(diag.marker, "%c");
        assert_eq!(diag.offset, doc.find("%c").expect("marker present"));
    }

    #[test]
    fn test_header_at_end_of_input() {
        let extraction = extract("text %py");
        assert!(extraction.blocks.is_empty());
        assert_eq!(extraction.diagnostics.len(), 1);
        assert_eq!(extraction.diagnostics[0].offset, 5);
    }

    #[test]
    fn test_scanning_resumes_after_unterminated_header() {
        let doc = "%c name=a\n%py\nprint('ok')\n%endpy\n";
        let extraction = extract(doc);
        assert_eq!(extraction.blocks.len(), 1);
        assert_eq!(extraction.blocks[0].kind, BlockKind::Script);
        assert_eq!(extraction.blocks[0].sequence_index, 0);
        assert_eq!(extraction.diagnostics.len(), 1);
    }

    #[test]
    fn test_similar_words_are_not_markers() {
        let extraction = extract("100%cpp and %python and %endpoint\n");
        assert!(extraction.blocks.is_empty());
        assert!(extraction.is_clean());
    }

    #[test]
    fn test_malformed_metadata_is_reported_and_skipped() {
        let doc = "%c name=lib verbose export=\nint x;\n%endc";
        let extraction = extract(doc);
        assert_eq!(extraction.blocks.len(), 1);
        assert_eq!(extraction.blocks[0].name(), "lib");
        assert!(extraction.blocks[0].metadata.get("export").is_none());

        let markers: Vec<_> = extraction
            .diagnostics
            .iter()
            .map(|d| (d.kind, d.offset, d.marker.as_str()))
            .collect();
        assert_eq!(
            markers,
            vec![
                (DiagnosticKind::MalformedMetadata, 12, "verbose"),
                (DiagnosticKind::MalformedMetadata, 20, "export="),
            ]
        );
    }

    #[test]
    fn test_unknown_keys_are_preserved() {
        let extraction = extract("%c name=x owner=team-a restype.add=double\n%endc");
        let meta = &extraction.blocks[0].metadata;
        assert_eq!(meta.scalar("owner"), Some("team-a"));
        assert_eq!(meta.scalar("restype.add"), Some("double"));
    }

    #[test]
    fn test_crlf_header() {
        let extraction = extract("%c name=win\r\nint x;\r\n%endc\r\n");
        assert!(extraction.is_clean());
        assert_eq!(extraction.blocks[0].name(), "win");
        assert_eq!(extraction.blocks[0].body, "int x;\r\n");
    }

    #[test]
    fn test_counts() {
        let extraction = extract(DOCUMENT);
        assert_eq!(extraction.native_count(), 1);
        assert_eq!(extraction.script_count(), 1);
    }
}
