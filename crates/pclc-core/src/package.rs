//! One-file packaging.
//!
//! The build directory is self-contained, so packaging only adds a
//! `__main__.py` stub and hands the directory to the interpreter's `zipapp`
//! module, producing `dist/<stem>_onefile.pyz`.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::paths::{BuildDirs, ENTRY_MODULE};
use crate::runtime::HostRuntime;

/// Zipapp entry point written into the build directory.
pub const MAIN_STUB: &str = "__main__.py";

/// Path of the archive produced for `dirs`.
pub fn archive_path(dirs: &BuildDirs) -> PathBuf {
    let stem = dirs
        .root
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "pcl".to_string());
    dirs.dist_dir.join(format!("{}_onefile.pyz", stem))
}

/// Write `build/__main__.py`, which imports the entry module.
pub fn write_main_stub(build_dir: &Path) -> Result<PathBuf> {
    let module = ENTRY_MODULE.trim_end_matches(".py");
    let path = build_dir.join(MAIN_STUB);
    fs::write(&path, format!("import {}\n", module))?;
    Ok(path)
}

/// Archive the build directory into `dist/<stem>_onefile.pyz`.
pub fn package_onefile(runtime: &HostRuntime, dirs: &BuildDirs) -> Result<PathBuf> {
    if !dirs.entry_path().is_file() {
        return Err(Error::Package(format!(
            "{} is missing; build the document first",
            dirs.entry_path().display()
        )));
    }

    write_main_stub(&dirs.build_dir)?;
    fs::create_dir_all(&dirs.dist_dir)?;

    let archive = archive_path(dirs);
    if archive.exists() {
        fs::remove_file(&archive)?;
    }

    runtime.run_module(
        "zipapp",
        [
            dirs.build_dir.as_os_str(),
            OsStr::new("-o"),
            archive.as_os_str(),
        ],
    )?;

    tracing::info!("[PKG] Created {}", archive.display());
    Ok(archive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_archive_path() {
        let dirs = BuildDirs::for_document(Path::new("/work/hello.pcl"));
        assert_eq!(
            archive_path(&dirs),
            PathBuf::from("/work/hello/dist/hello_onefile.pyz")
        );
    }

    #[test]
    fn test_main_stub() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let path = write_main_stub(temp.path()).expect("Failed to write stub");
        assert_eq!(
            fs::read_to_string(path).expect("read stub"),
            "import __pcl_main__\n"
        );
    }

    #[test]
    fn test_package_requires_entry_module() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let dirs = BuildDirs::create(&temp.path().join("doc.pcl")).expect("create dirs");

        // Any existing program will do; packaging must fail before running it.
        let program = std::env::current_exe().expect("test binary");
        let config = crate::runtime::RuntimeConfig::default().with_interpreter(program);
        let runtime = HostRuntime::locate(&config).expect("test binary exists");

        let err = package_onefile(&runtime, &dirs).expect_err("nothing built");
        assert!(matches!(err, Error::Package(_)));
    }
}
