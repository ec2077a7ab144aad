//! Host Python interpreter.
//!
//! Used to run the stitched entry module and to build zipapp archives.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use crate::compile::{AbortHandle, resolve_program, run_inherited};
use crate::error::{Error, Result};

/// Environment variable overriding the Python interpreter.
pub const PYTHON_ENV: &str = "PCLC_PYTHON";

/// Interpreters tried in order when none is configured.
const DEFAULT_INTERPRETERS: [&str; 2] = ["python3", "python"];

/// Configuration for the host interpreter.
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    /// Interpreter name or path (None = search PATH)
    pub interpreter: Option<PathBuf>,
}

impl RuntimeConfig {
    /// Create config from `PCLC_PYTHON`.
    pub fn from_env() -> Self {
        Self::from_var(std::env::var_os(PYTHON_ENV))
    }

    pub fn from_var(interpreter: Option<OsString>) -> Self {
        Self {
            interpreter: interpreter.filter(|i| !i.is_empty()).map(PathBuf::from),
        }
    }

    pub fn with_interpreter(mut self, interpreter: impl Into<PathBuf>) -> Self {
        self.interpreter = Some(interpreter.into());
        self
    }
}

/// A located Python interpreter.
#[derive(Debug, Clone)]
pub struct HostRuntime {
    interpreter: PathBuf,
    abort: AbortHandle,
}

impl HostRuntime {
    /// Locate the configured interpreter, or `python3` / `python` in PATH.
    pub fn locate(config: &RuntimeConfig) -> Result<Self> {
        let interpreter = match &config.interpreter {
            Some(program) => resolve_program(program)?,
            None => DEFAULT_INTERPRETERS
                .iter()
                .find_map(|name| which::which(name).ok())
                .ok_or_else(|| {
                    Error::Toolchain("no Python interpreter (python3 or python) in PATH".to_string())
                })?,
        };

        tracing::debug!("Using Python interpreter {}", interpreter.display());
        Ok(Self {
            interpreter,
            abort: AbortHandle::new(),
        })
    }

    /// Share an existing abort handle (e.g. one wired to Ctrl-C).
    pub fn with_abort_handle(mut self, abort: AbortHandle) -> Self {
        self.abort = abort;
        self
    }

    pub fn interpreter(&self) -> &Path {
        &self.interpreter
    }

    /// Run a Python script with inherited stdio.
    ///
    /// A non-zero exit is reported as [`Error::ProcessFailed`] carrying the
    /// script's status.
    pub fn run_script(&self, script: &Path) -> Result<()> {
        let mut cmd = Command::new(&self.interpreter);
        cmd.arg(script);
        let status = self.run(cmd, "python")?;
        self.check(status)
    }

    /// Run `python -m <module> <args>` with inherited stdio.
    pub fn run_module<I, S>(&self, module: &str, args: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        let mut cmd = Command::new(&self.interpreter);
        cmd.arg("-m").arg(module).args(args);
        let status = self.run(cmd, module)?;
        self.check(status)
    }

    fn run(&self, cmd: Command, what: &str) -> Result<ExitStatus> {
        tracing::debug!("[RUN] {:?}", cmd);
        run_inherited(cmd, what, &self.abort)
    }

    fn check(&self, status: ExitStatus) -> Result<()> {
        if status.success() {
            Ok(())
        } else {
            Err(Error::ProcessFailed {
                program: self.interpreter.display().to_string(),
                code: status.code(),
            })
        }
    }
}
