//! The build manifest.
//!
//! Written once per build to `build/manifest.json` and read by the compiler
//! driver and the stitcher. Native entries point at their staged source
//! (relative to the build directory, so the directory stays relocatable);
//! script entries carry their body inline.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::extract::Metadata;

/// All blocks of one document, partitioned by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Native blocks, in document order.
    #[serde(rename = "c", default)]
    pub native: Vec<NativeEntry>,

    /// Script blocks, in document order.
    #[serde(rename = "py", default)]
    pub script: Vec<ScriptEntry>,
}

/// A staged native block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeEntry {
    /// Resolved module name.
    pub name: String,
    /// Position of the block in the document.
    pub index: usize,
    pub meta: Metadata,
    /// Staged source file, relative to the build directory.
    pub path: PathBuf,
}

impl NativeEntry {
    /// Staged source file inside `build_dir`.
    pub fn source_path(&self, build_dir: &Path) -> PathBuf {
        build_dir.join(&self.path)
    }

    /// Declared exports.
    pub fn exports(&self) -> &[String] {
        self.meta.exports()
    }

    /// Whether symbols should get hidden visibility (`hide=yes`).
    pub fn hide_symbols(&self) -> bool {
        self.meta.flag("hide")
    }

    /// Whether every function binding is error-checked (`errcheck=yes`).
    pub fn errcheck(&self) -> bool {
        self.meta.flag("errcheck")
    }
}

/// A script block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptEntry {
    /// Position of the block in the document.
    pub index: usize,
    pub meta: Metadata,
    pub body: String,
}

impl ScriptEntry {
    /// Modules this block imports bindings from.
    pub fn requires(&self) -> Vec<&str> {
        self.meta.requires()
    }
}

impl Manifest {
    /// Look up a native entry by module name.
    pub fn native(&self, name: &str) -> Option<&NativeEntry> {
        self.native.iter().find(|entry| entry.name == name)
    }

    /// Names of all native modules, in document order.
    pub fn native_names(&self) -> impl Iterator<Item = &str> {
        self.native.iter().map(|entry| entry.name.as_str())
    }

    /// Write the manifest as pretty-printed JSON.
    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Read a manifest written by [`Manifest::write`].
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> Manifest {
        let mut meta = Metadata::new();
        meta.insert_raw("name", "mathlib");
        meta.insert_raw("export", "add,g_total");
        meta.insert_raw("hide", "yes");

        let mut script_meta = Metadata::new();
        script_meta.insert_raw("requires", "mathlib");

        Manifest {
            native: vec![NativeEntry {
                name: "mathlib".to_string(),
                index: 0,
                meta,
                path: PathBuf::from("mathlib.c"),
            }],
            script: vec![ScriptEntry {
                index: 1,
                meta: script_meta,
                body: "print(add(1, 2))\n".to_string(),
            }],
        }
    }

    #[test]
    fn test_uses_original_keys() {
        let json = serde_json::to_value(sample()).expect("serialize");
        assert!(json.get("c").is_some());
        assert!(json.get("py").is_some());
        assert_eq!(json["c"][0]["meta"]["export"][1], "g_total");
        assert_eq!(json["c"][0]["path"], "mathlib.c");
        assert_eq!(json["py"][0]["body"], "print(add(1, 2))\n");
    }

    #[test]
    fn test_write_and_load() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let path = temp.path().join("manifest.json");

        let manifest = sample();
        manifest.write(&path).expect("Failed to write manifest");
        let loaded = Manifest::load(&path).expect("Failed to load manifest");

        assert_eq!(loaded, manifest);
    }

    #[test]
    fn test_entry_accessors() {
        let manifest = sample();
        let entry = manifest.native("mathlib").expect("entry exists");
        assert!(entry.hide_symbols());
        assert!(!entry.errcheck());
        assert_eq!(
            entry.source_path(Path::new("/tmp/doc/build")),
            PathBuf::from("/tmp/doc/build/mathlib.c")
        );
        assert_eq!(manifest.native_names().collect::<Vec<_>>(), vec!["mathlib"]);
        assert_eq!(manifest.script[0].requires(), vec!["mathlib"]);
        assert!(manifest.native("missing").is_none());
    }
}
