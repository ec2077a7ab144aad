//! Run command implementation for pclc.
//!
//! Builds a document, then executes the entry module with the host Python.

use pclc_core::AbortHandle;

use crate::builder::{self, BuildArgs};
use crate::colors;

/// Build and run a document.
///
/// The interpreter is located before building so a missing Python fails fast.
pub fn execute(args: &BuildArgs, abort: &AbortHandle) -> anyhow::Result<()> {
    let runtime = builder::locate_runtime(abort)?;
    let report = builder::build(args, abort, Some(runtime.clone()))?;

    println!(
        "\n{}[RUN]{} {} {}",
        colors::BOLD,
        colors::RESET,
        runtime.interpreter().display(),
        report.entry.display()
    );
    println!("{}", "─".repeat(50));

    runtime.run_script(&report.entry)?;
    Ok(())
}
