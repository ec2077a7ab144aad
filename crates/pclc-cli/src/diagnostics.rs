//! Rendering of grammar diagnostics.

use std::path::Path;

use codespan_reporting::diagnostic::Severity;
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use pclc_core::GrammarDiagnostic;

/// Print diagnostics with source snippets to stderr.
///
/// In strict mode they are rendered as errors, since they fail the build.
pub fn emit(document: &Path, source: &str, diagnostics: &[GrammarDiagnostic], strict: bool) {
    if diagnostics.is_empty() {
        return;
    }

    let mut files = SimpleFiles::new();
    let file_id = files.add(document.display().to_string(), source.to_string());

    let writer = StandardStream::stderr(ColorChoice::Auto);
    let config = term::Config::default();

    for diagnostic in diagnostics {
        let mut rendered = diagnostic.to_diagnostic(file_id);
        if strict {
            rendered.severity = Severity::Error;
        }
        let _ = term::emit_to_write_style(&mut writer.lock(), &config, &files, &rendered);
    }
}
