//! Grammar diagnostics for markers that never form a block.

use std::fmt;
use std::ops::Range;

use codespan_reporting::diagnostic::{Diagnostic, Label, Severity};

/// What went wrong with a marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// An opening marker with no header newline or no closing marker.
    UnterminatedBlock,
    /// A closing marker outside any block.
    UnmatchedEnd,
    /// A header token that is not `key=value`.
    MalformedMetadata,
}

/// A grammar problem found while scanning a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarDiagnostic {
    pub kind: DiagnosticKind,
    /// Byte offset of the marker in the document.
    pub offset: usize,
    /// The offending marker or token text.
    pub marker: String,
}

impl GrammarDiagnostic {
    pub fn new(kind: DiagnosticKind, offset: usize, marker: impl Into<String>) -> Self {
        Self {
            kind,
            offset,
            marker: marker.into(),
        }
    }

    /// Byte range covered by the marker.
    pub fn span(&self) -> Range<usize> {
        self.offset..self.offset + self.marker.len()
    }

    /// One-line description.
    pub fn message(&self) -> String {
        match self.kind {
            DiagnosticKind::UnterminatedBlock => {
                format!("`{}` block is never closed; it was skipped", self.marker)
            }
            DiagnosticKind::UnmatchedEnd => {
                format!("`{}` does not close any block", self.marker)
            }
            DiagnosticKind::MalformedMetadata => {
                format!("ignoring header token `{}`; expected key=value", self.marker)
            }
        }
    }

    /// 1-indexed line and column of the marker within `source`.
    pub fn line_col(&self, source: &str) -> (usize, usize) {
        let before = &source[..self.offset.min(source.len())];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
        (line, before[line_start..].chars().count() + 1)
    }

    /// Convert to a codespan-reporting Diagnostic for display.
    pub fn to_diagnostic(&self, file_id: usize) -> Diagnostic<usize> {
        let note = match self.kind {
            DiagnosticKind::UnterminatedBlock | DiagnosticKind::UnmatchedEnd => {
                "blocks look like `%c name=demo` … `%endc` or `%py` … `%endpy`"
            }
            DiagnosticKind::MalformedMetadata => "header values may contain commas but no spaces",
        };

        Diagnostic::new(Severity::Warning)
            .with_message(self.message())
            .with_labels(vec![Label::primary(file_id, self.span())])
            .with_notes(vec![note.to_string()])
    }
}

impl fmt::Display for GrammarDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "offset {}: {}", self.offset, self.message())
    }
}
