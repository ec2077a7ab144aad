//! Clean command implementation for pclc.

use std::path::Path;

use pclc_core::BuildDirs;

use crate::colors;

/// Remove the generated `build/` and `dist/` directories of a document.
///
/// The document itself does not need to exist.
pub fn execute(document: &Path) -> anyhow::Result<()> {
    let dirs = BuildDirs::for_document(document);

    if dirs.clean()? {
        println!(
            "{}[CLEAN]{} removed build/ and dist/ under {}",
            colors::GREEN,
            colors::RESET,
            dirs.root.display()
        );
    } else {
        println!("{}Nothing to clean{}", colors::DIM, colors::RESET);
    }

    Ok(())
}
