//! Toolchain lookup.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

use super::types::CompilerConfig;

/// A located C compiler.
#[derive(Debug, Clone)]
pub struct Toolchain {
    compiler: PathBuf,
}

impl Toolchain {
    /// Locate the compiler named by the configuration.
    pub fn locate(config: &CompilerConfig) -> Result<Self> {
        let compiler = resolve_program(&config.compiler)?;
        tracing::debug!("Using C compiler {}", compiler.display());
        Ok(Self { compiler })
    }

    /// Path to the compiler executable.
    pub fn compiler(&self) -> &Path {
        &self.compiler
    }
}

/// Resolve a program given either as a path or as a name to look up in PATH.
///
/// Relative paths are made absolute against the current directory, since
/// compilers are spawned from inside the build directory.
pub fn resolve_program(program: &Path) -> Result<PathBuf> {
    if program.components().count() > 1 {
        return if program.is_file() {
            Ok(std::path::absolute(program)?)
        } else {
            Err(Error::Toolchain(format!(
                "{} does not exist",
                program.display()
            )))
        };
    }

    which::which(program)
        .map_err(|_| Error::Toolchain(format!("{} not found in PATH", program.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_path_is_reported() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let missing = temp.path().join("no-such-cc");

        let err = resolve_program(&missing).expect_err("missing compiler");
        assert!(matches!(err, Error::Toolchain(_)));
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_missing_name_is_reported() {
        let err = resolve_program(Path::new("pclc-definitely-not-a-compiler"))
            .expect_err("unknown program");
        assert!(err.to_string().contains("not found in PATH"));
    }

    #[test]
    fn test_explicit_path_is_kept() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let fake = temp.path().join("cc");
        std::fs::write(&fake, "").expect("Failed to write fake compiler");

        let config = CompilerConfig::default().with_compiler(&fake);
        let toolchain = Toolchain::locate(&config).expect("explicit path");
        assert_eq!(toolchain.compiler(), fake.as_path());
    }

    #[test]
    fn test_resolved_paths_are_absolute() {
        let cwd = std::env::current_dir().expect("current dir");
        let manifest = Path::new("Cargo.toml");
        assert!(cwd.join(manifest).is_file());

        let resolved = resolve_program(&Path::new(".").join(manifest)).expect("relative path");
        assert!(resolved.is_absolute());
        assert!(resolved.is_file());
    }
}
