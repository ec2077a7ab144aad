//! Error types for pclc-core.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for pclc-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in pclc-core.
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to parse or validate a document.
    #[error("parse error: {0}")]
    Parse(String),

    /// Strict mode rejected a document with malformed block markers.
    #[error("{count} malformed block marker(s) in {}", path.display())]
    Grammar { path: PathBuf, count: usize },

    /// Manifest serialization error.
    #[error("manifest error: {0}")]
    Manifest(#[from] serde_json::Error),

    /// Toolchain or interpreter could not be located or started.
    #[error("toolchain error: {0}")]
    Toolchain(String),

    /// Compilation of a native block failed.
    #[error("compilation failed{}: {message}", module.as_ref().map(|m| format!(" for module {}", m)).unwrap_or_default())]
    Compilation {
        module: Option<String>,
        status: Option<i32>,
        message: String,
    },

    /// An external process exceeded its time budget and was killed.
    #[error("{what} timed out after {seconds}s")]
    Timeout { what: String, seconds: u64 },

    /// The build was cancelled and in-flight processes were killed.
    #[error("build aborted")]
    Aborted,

    /// A script block requires a module no native block provides.
    #[error("script block #{block} requires unknown module '{name}'")]
    UnresolvedRequire { block: usize, name: String },

    /// Failed to load a compiled library.
    #[error("failed to load library: {0}")]
    LibraryLoad(#[from] libloading::Error),

    /// An external process exited unsuccessfully.
    #[error("{program} exited with {}", code.map(|c| format!("status {}", c)).unwrap_or_else(|| "a signal".to_string()))]
    ProcessFailed { program: String, code: Option<i32> },

    /// Packaging the build directory failed.
    #[error("packaging failed: {0}")]
    Package(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Exit status to report for this error.
    ///
    /// Failures of external processes mirror the process's own exit status.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Compilation {
                status: Some(code), ..
            }
            | Self::ProcessFailed {
                code: Some(code), ..
            } if *code != 0 => *code,
            _ => 1,
        }
    }

    /// Render the error with a recovery hint, when one applies.
    pub fn with_hint(&self) -> String {
        let hint = match self {
            Self::Grammar { .. } => {
                Some("every `%c` / `%py` header needs a newline and a matching `%endc` / `%endpy`")
            }
            Self::Toolchain(_) => Some(
                "set PCLC_CC to a C compiler, or PCLC_PYTHON to a Python interpreter",
            ),
            Self::Compilation { .. } => {
                Some("native blocks are built with -Wall -Werror; fix the reported warnings")
            }
            Self::Timeout { .. } => Some("raise the limit with --timeout, or pass --timeout 0"),
            Self::UnresolvedRequire { .. } => {
                Some("`requires` names must match the `name` of a native block")
            }
            _ => None,
        };

        match hint {
            Some(hint) => format!("{}\n  hint: {}", self, hint),
            None => self.to_string(),
        }
    }
}
