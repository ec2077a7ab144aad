//! Build command implementation for pclc.
//!
//! Extracts and builds a document without running it.

use std::time::Instant;

use pclc_core::AbortHandle;

use crate::builder::{self, BuildArgs};
use crate::colors;

/// Build a document.
pub fn execute(args: &BuildArgs, abort: &AbortHandle) -> anyhow::Result<()> {
    let start = Instant::now();
    let report = builder::build(args, abort, None)?;

    println!("{}", "─".repeat(50));
    println!(
        "{}Built{} {} native module(s) in {:.2}s",
        colors::GREEN,
        colors::RESET,
        report.modules.len(),
        start.elapsed().as_secs_f64()
    );
    println!(
        "{}  Entry:{} {}",
        colors::CYAN,
        colors::RESET,
        report.entry.display()
    );
    if let Some(archive) = &report.archive {
        println!(
            "{}  Archive:{} {}",
            colors::CYAN,
            colors::RESET,
            archive.display()
        );
    }

    Ok(())
}
