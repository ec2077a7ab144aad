//! Working directory management.
//!
//! Every document gets its own working directory next to it, named after the
//! document with its extension stripped:
//!
//! ```text
//! hello.pcl
//! hello/
//! ├── build/   # staged sources, libraries, bindings, manifest, entry module
//! └── dist/    # packaged archive (--onefile)
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// File name of the serialized manifest inside `build/`.
pub const MANIFEST_FILE: &str = "manifest.json";

/// File name of the stitched entry module inside `build/`.
pub const ENTRY_MODULE: &str = "__pcl_main__.py";

/// File name of the shared binding helpers inside `build/`.
pub const RUNTIME_MODULE: &str = "pcl_runtime.py";

/// File extension of staged native sources.
pub const NATIVE_EXTENSION: &str = "c";

/// Directory structure for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildDirs {
    /// The document path without its extension.
    pub root: PathBuf,

    /// Build directory for every generated artifact.
    pub build_dir: PathBuf,

    /// Distribution directory for packaged archives.
    pub dist_dir: PathBuf,
}

impl BuildDirs {
    /// Derive the directory layout for a document without touching the filesystem.
    pub fn for_document(document_path: &Path) -> Self {
        let root = document_path.with_extension("");
        Self {
            build_dir: root.join("build"),
            dist_dir: root.join("dist"),
            root,
        }
    }

    /// Derive the layout and create `build/` and `dist/`.
    ///
    /// Existing directories are reused.
    pub fn create(document_path: &Path) -> Result<Self> {
        let dirs = Self::for_document(document_path);
        fs::create_dir_all(&dirs.build_dir)?;
        fs::create_dir_all(&dirs.dist_dir)?;
        Ok(dirs)
    }

    /// Path of the manifest file.
    pub fn manifest_path(&self) -> PathBuf {
        self.build_dir.join(MANIFEST_FILE)
    }

    /// Path of the stitched entry module.
    pub fn entry_path(&self) -> PathBuf {
        self.build_dir.join(ENTRY_MODULE)
    }

    /// Remove `build/` and `dist/`.
    ///
    /// The root directory is removed as well when nothing else is left in it.
    /// Missing directories are not an error. Returns whether anything was removed.
    pub fn clean(&self) -> Result<bool> {
        let mut removed = false;

        for dir in [&self.build_dir, &self.dist_dir] {
            if dir.exists() {
                fs::remove_dir_all(dir)?;
                tracing::debug!("Removed {}", dir.display());
                removed = true;
            }
        }

        if removed && self.root.is_dir() && fs::read_dir(&self.root)?.next().is_none() {
            fs::remove_dir(&self.root)?;
        }

        Ok(removed)
    }
}
