//! Stitching script blocks into the entry module.
//!
//! The entry module is a fixed preamble followed, for every script block in
//! document order, by one star import per required binding module and then
//! the block's body. Parts are separated by a blank line.

use std::fs;
use std::path::{Path, PathBuf};

use crate::bindings::binding_module_name;
use crate::error::{Error, Result};
use crate::manifest::Manifest;
use crate::paths::ENTRY_MODULE;

/// First part of every entry module: makes sibling modules importable.
pub const PREAMBLE: &str =
    "import sys, pathlib; sys.path.insert(0, str(pathlib.Path(__file__).parent))";

/// How to treat `requires` entries that name no native block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RequirePolicy {
    /// Emit the import anyway and let it fail when the script runs.
    #[default]
    Deferred,
    /// Reject the build.
    Strict,
}

/// Script requirements that no native block provides, as `(block index, name)`.
pub fn unresolved_requires(manifest: &Manifest) -> Vec<(usize, String)> {
    manifest
        .script
        .iter()
        .flat_map(|entry| {
            entry
                .requires()
                .into_iter()
                .filter(|name| manifest.native(name).is_none())
                .map(move |name| (entry.index, name.to_string()))
        })
        .collect()
}

/// Render the entry module source.
///
/// Imports are emitted exactly as declared: repeated requirements produce
/// repeated imports.
pub fn render_entry(manifest: &Manifest) -> String {
    let mut parts = vec![PREAMBLE.to_string()];

    for entry in &manifest.script {
        for name in entry.requires() {
            parts.push(format!(
                "from {} import *  # auto-imported",
                binding_module_name(name)
            ));
        }
        parts.push(entry.body.clone());
    }

    parts.join("\n\n")
}

/// Write `build/__pcl_main__.py`, deferring unresolved requirements.
pub fn stitch(build_dir: &Path, manifest: &Manifest) -> Result<PathBuf> {
    stitch_with(build_dir, manifest, RequirePolicy::Deferred)
}

/// Write `build/__pcl_main__.py` under the given requirement policy.
pub fn stitch_with(build_dir: &Path, manifest: &Manifest, policy: RequirePolicy) -> Result<PathBuf> {
    let unresolved = unresolved_requires(manifest);

    if let Some((block, name)) = unresolved.first() {
        if policy == RequirePolicy::Strict {
            return Err(Error::UnresolvedRequire {
                block: *block,
                name: name.clone(),
            });
        }
    }

    for (block, name) in &unresolved {
        tracing::warn!(
            "Script block #{} requires '{}', which no native block provides; \
             the import will fail at runtime",
            block,
            name
        );
    }

    let path = build_dir.join(ENTRY_MODULE);
    fs::write(&path, render_entry(manifest))?;
    tracing::debug!("Wrote {}", path.display());

    Ok(path)
}
