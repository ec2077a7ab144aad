//! Export verification against a compiled library.

use std::path::Path;

use libloading::Library;

use crate::error::Result;
use crate::manifest::NativeEntry;

/// Declared exports of `entry` that `library` does not define.
///
/// Binding generation trusts the `export` list; this is only used to warn
/// about typos and hidden symbols before the script fails at import time.
pub fn missing_exports(entry: &NativeEntry, library: &Path) -> Result<Vec<String>> {
    // Safety: the library was just built from the block's own source; its
    // initializers are the only code run on load.
    let lib = unsafe { Library::new(library) }?;

    let missing = entry
        .exports()
        .iter()
        .filter(|export| {
            // Safety: the symbol is only looked up, never called or read.
            unsafe { lib.get::<*const ()>(export.as_bytes()) }.is_err()
        })
        .cloned()
        .collect();

    Ok(missing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::extract::Metadata;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_unloadable_library_is_an_error() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let bogus = temp.path().join("bogus.so");
        std::fs::write(&bogus, "not a library").expect("write bogus library");

        let mut meta = Metadata::new();
        meta.insert_raw("export", "add");
        let entry = NativeEntry {
            name: "bogus".to_string(),
            index: 0,
            meta,
            path: PathBuf::from("bogus.c"),
        };

        let err = missing_exports(&entry, &bogus).expect_err("not a dynamic library");
        assert!(matches!(err, Error::LibraryLoad(_)));
    }
}
