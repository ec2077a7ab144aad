//! Build staging.
//!
//! Lays out the working directory, writes every native block to
//! `build/<name>.c` and records all blocks in `build/manifest.json`.
//! Nothing is compiled or interpreted here.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::extract::{Block, BlockKind, is_module_name};
use crate::manifest::{Manifest, NativeEntry, ScriptEntry};
use crate::paths::{BuildDirs, NATIVE_EXTENSION};

/// Output of [`stage`].
#[derive(Debug, Clone)]
pub struct Staged {
    pub dirs: BuildDirs,
    pub manifest: Manifest,
}

impl Staged {
    pub fn build_dir(&self) -> &Path {
        &self.dirs.build_dir
    }

    pub fn dist_dir(&self) -> &Path {
        &self.dirs.dist_dir
    }
}

/// Stage a document's blocks into its working directory.
///
/// # Errors
///
/// Returns an error if:
/// - A native block name is not a valid module name
/// - Two native blocks resolve to the same name
/// - The directories or files cannot be written
pub fn stage(document_path: &Path, blocks: &[Block]) -> Result<Staged> {
    validate_native_names(document_path, blocks)?;

    let dirs = BuildDirs::create(document_path)?;
    let mut manifest = Manifest::default();

    for block in blocks {
        match block.kind {
            BlockKind::Native => {
                let name = block.name();
                let path = PathBuf::from(format!("{}.{}", name, NATIVE_EXTENSION));
                fs::write(dirs.build_dir.join(&path), &block.body)?;
                tracing::debug!("Staged {} → {}", name, path.display());

                manifest.native.push(NativeEntry {
                    name,
                    index: block.sequence_index,
                    meta: block.metadata.clone(),
                    path,
                });
            }
            BlockKind::Script => manifest.script.push(ScriptEntry {
                index: block.sequence_index,
                meta: block.metadata.clone(),
                body: block.body.clone(),
            }),
        }
    }

    manifest.write(&dirs.manifest_path())?;
    tracing::info!(
        "Staged {} native and {} script block(s) in {}",
        manifest.native.len(),
        manifest.script.len(),
        dirs.build_dir.display()
    );

    Ok(Staged { dirs, manifest })
}

/// Native names become file and module names, so they must be identifiers and unique.
fn validate_native_names(document_path: &Path, blocks: &[Block]) -> Result<()> {
    let mut seen = HashSet::new();

    for block in blocks.iter().filter(|b| b.kind == BlockKind::Native) {
        let name = block.name();
        if !is_module_name(&name) {
            return Err(Error::Parse(format!(
                "invalid module name '{}' on native block #{} in '{}'",
                name,
                block.sequence_index,
                document_path.display()
            )));
        }
        if !seen.insert(name.clone()) {
            return Err(Error::Parse(format!(
                "duplicate native module name '{}' in '{}'",
                name,
                document_path.display()
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract;
    use tempfile::TempDir;

    const DOCUMENT: &str = "\
%c name=mathlib export=add
int add(int a, int b) { return a + b; }
%endc
%py requires=mathlib
print(add(1, 2))
%endpy
%c
int twice(int x) { return 2 * x; }
%endc
";

    #[test]
    fn test_stage_writes_sources_and_manifest() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let document = temp.path().join("demo.pcl");
        let blocks = extract(DOCUMENT).blocks;

        let staged = stage(&document, &blocks).expect("Failed to stage");

        assert_eq!(staged.build_dir(), temp.path().join("demo").join("build"));
        assert!(staged.dist_dir().is_dir());

        let mathlib = fs::read_to_string(staged.build_dir().join("mathlib.c"))
            .expect("mathlib.c staged");
        assert_eq!(mathlib, "int add(int a, int b) { return a + b; }\n");
        assert!(staged.build_dir().join("module_2.c").exists());

        assert_eq!(
            staged.manifest.native_names().collect::<Vec<_>>(),
            vec!["mathlib", "module_2"]
        );
        assert_eq!(staged.manifest.script.len(), 1);
        assert_eq!(staged.manifest.script[0].index, 1);

        let on_disk = Manifest::load(&staged.dirs.manifest_path()).expect("manifest on disk");
        assert_eq!(on_disk, staged.manifest);
    }

    #[test]
    fn test_restaging_is_idempotent() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let document = temp.path().join("demo.pcl");
        let blocks = extract(DOCUMENT).blocks;

        let first = stage(&document, &blocks).expect("first stage");
        let listing = |dir: &Path| {
            let mut names: Vec<_> = fs::read_dir(dir)
                .expect("read build dir")
                .map(|e| e.expect("dir entry").file_name())
                .collect();
            names.sort();
            names
        };
        let before = listing(first.build_dir());

        let second = stage(&document, &blocks).expect("second stage");
        assert_eq!(listing(second.build_dir()), before);
        assert_eq!(second.manifest, first.manifest);
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let doc = "%c name=lib\n%endc\n%c name=lib\n%endc\n";
        let err = stage(&temp.path().join("dup.pcl"), &extract(doc).blocks)
            .expect_err("duplicate names must fail");
        assert!(err.to_string().contains("duplicate native module name 'lib'"));
    }

    #[test]
    fn test_path_like_names_are_rejected() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let doc = "%c name=../escape\n%endc\n";
        let err = stage(&temp.path().join("bad.pcl"), &extract(doc).blocks)
            .expect_err("path-like names must fail");
        assert!(matches!(err, Error::Parse(_)));
        assert!(!temp.path().join("escape.c").exists());
    }

    #[test]
    fn test_script_names_are_not_validated() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let doc = "%py name=not-an-identifier\nprint(1)\n%endpy\n";
        let staged = stage(&temp.path().join("py.pcl"), &extract(doc).blocks)
            .expect("script names are free-form");
        assert!(staged.manifest.native.is_empty());
    }
}
