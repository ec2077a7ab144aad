//! Native compiler driver.
//!
//! Compiles every native manifest entry to `build/<name>.<dylib-ext>` with
//! one external compiler process per block.

use std::collections::BTreeMap;
use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;

use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::manifest::{Manifest, NativeEntry};

use super::process::{AbortHandle, run_captured};
use super::toolchain::Toolchain;
use super::types::{CompiledModule, CompilerConfig, HIDDEN_VISIBILITY_FLAG, dylib_extension};

/// Compiles native blocks to dynamic libraries.
pub struct NativeCompiler {
    /// Compiler configuration
    config: CompilerConfig,

    /// Located compiler
    toolchain: Toolchain,

    /// Cancellation shared with every spawned compiler
    abort: AbortHandle,
}

impl NativeCompiler {
    /// Create a compiler driver, locating the configured compiler.
    pub fn new(config: CompilerConfig) -> Result<Self> {
        let toolchain = Toolchain::locate(&config)?;
        Ok(Self::with_toolchain(config, toolchain))
    }

    /// Create a compiler driver around an already located toolchain.
    pub fn with_toolchain(config: CompilerConfig, toolchain: Toolchain) -> Self {
        Self {
            config,
            toolchain,
            abort: AbortHandle::new(),
        }
    }

    /// Share an existing abort handle (e.g. one wired to Ctrl-C).
    pub fn with_abort_handle(mut self, abort: AbortHandle) -> Self {
        self.abort = abort;
        self
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn toolchain(&self) -> &Toolchain {
        &self.toolchain
    }

    /// File name of the library built for module `name`.
    pub fn library_file_name(name: &str) -> String {
        format!("{}.{}", name, dylib_extension())
    }

    /// Compiler arguments for one entry, relative to the build directory.
    ///
    /// `hide=yes` only adds the visibility flag; nothing else depends on it.
    pub fn compiler_args(&self, entry: &NativeEntry) -> Vec<String> {
        let mut args = self.config.base_flags();
        args.extend(self.config.extra_flags.iter().cloned());

        if entry.hide_symbols() {
            args.push(HIDDEN_VISIBILITY_FLAG.to_string());
        }

        args.push("-o".to_string());
        args.push(Self::library_file_name(&entry.name));
        args.push(entry.path.to_string_lossy().into_owned());
        args
    }

    /// Compile every native entry.
    ///
    /// The first failure aborts the whole build. In parallel mode the
    /// remaining compilers are killed and the first real failure (in
    /// document order) is reported.
    pub fn compile_all(
        &self,
        build_dir: &Path,
        manifest: &Manifest,
    ) -> Result<BTreeMap<String, CompiledModule>> {
        self.compile_all_with(build_dir, manifest, |_| {})
    }

    /// Like [`NativeCompiler::compile_all`], reporting each finished module.
    pub fn compile_all_with<F>(
        &self,
        build_dir: &Path,
        manifest: &Manifest,
        on_compiled: F,
    ) -> Result<BTreeMap<String, CompiledModule>>
    where
        F: Fn(&CompiledModule) + Sync,
    {
        let mut modules = BTreeMap::new();

        if self.config.parallel {
            let results: Vec<Result<CompiledModule>> = manifest
                .native
                .par_iter()
                .map(|entry| {
                    let result = self.compile(build_dir, entry);
                    match &result {
                        Ok(module) => on_compiled(module),
                        Err(Error::Aborted) => {}
                        Err(_) => self.abort.abort(),
                    }
                    result
                })
                .collect();

            let mut aborted = false;
            for result in results {
                match result {
                    Ok(module) => {
                        modules.insert(module.name.clone(), module);
                    }
                    Err(Error::Aborted) => aborted = true,
                    Err(err) => return Err(err),
                }
            }
            if aborted {
                return Err(Error::Aborted);
            }
        } else {
            for entry in &manifest.native {
                let module = self.compile(build_dir, entry)?;
                on_compiled(&module);
                modules.insert(module.name.clone(), module);
            }
        }

        Ok(modules)
    }

    /// Compile one native entry.
    pub fn compile(&self, build_dir: &Path, entry: &NativeEntry) -> Result<CompiledModule> {
        let library = build_dir.join(Self::library_file_name(&entry.name));
        let args = self.compiler_args(entry);
        let fingerprint = self.fingerprint(build_dir, entry, &args)?;

        if self.config.use_cache && self.is_fresh(build_dir, &entry.name, &library, fingerprint) {
            tracing::info!("[CC] {} unchanged, reusing {}", entry.name, library.display());
            return Ok(CompiledModule {
                name: entry.name.clone(),
                library,
                cached: true,
                compile_time_ms: 0,
            });
        }

        tracing::info!(
            "[CC] {} {}",
            self.toolchain.compiler().display(),
            args.join(" ")
        );

        let start = Instant::now();
        let mut cmd = Command::new(self.toolchain.compiler());
        cmd.args(&args).current_dir(build_dir);

        let what = format!("compiler for module {}", entry.name);
        let output = match run_captured(cmd, &what, self.config.timeout, &self.abort) {
            Ok(output) => output,
            Err(err) => {
                self.forget_fingerprint(build_dir, &entry.name);
                return Err(err);
            }
        };

        if !output.status.success() {
            self.forget_fingerprint(build_dir, &entry.name);
            let stderr = output.stderr.trim();
            let message = if stderr.is_empty() {
                format!(
                    "{} exited with {}",
                    self.toolchain.compiler().display(),
                    output.status
                )
            } else {
                stderr.to_string()
            };
            return Err(Error::Compilation {
                module: Some(entry.name.clone()),
                status: output.status.code(),
                message,
            });
        }

        let compiled = CompiledModule {
            name: entry.name.clone(),
            library,
            cached: false,
            compile_time_ms: start.elapsed().as_millis() as u64,
        };

        self.save_fingerprint(build_dir, &entry.name, fingerprint);
        Ok(compiled)
    }

    /// Hash of everything that determines the library's contents.
    fn fingerprint(&self, build_dir: &Path, entry: &NativeEntry, args: &[String]) -> Result<u64> {
        let source = fs::read(entry.source_path(build_dir))?;

        let mut hasher = DefaultHasher::new();
        self.toolchain.compiler().hash(&mut hasher);
        args.hash(&mut hasher);
        source.hash(&mut hasher);
        Ok(hasher.finish())
    }

    fn is_fresh(&self, build_dir: &Path, name: &str, library: &Path, fingerprint: u64) -> bool {
        if !library.exists() {
            return false;
        }

        fs::read_to_string(fingerprint_path(build_dir, name))
            .ok()
            .and_then(|stored| stored.trim().parse::<u64>().ok())
            == Some(fingerprint)
    }

    fn save_fingerprint(&self, build_dir: &Path, name: &str, fingerprint: u64) {
        // Cache save is opportunistic; failure only costs a rebuild
        if let Err(e) = fs::write(fingerprint_path(build_dir, name), fingerprint.to_string()) {
            tracing::warn!("Failed to save build fingerprint for {}: {}", name, e);
        }
    }

    fn forget_fingerprint(&self, build_dir: &Path, name: &str) {
        let path = fingerprint_path(build_dir, name);
        if path.exists() {
            if let Err(e) = fs::remove_file(&path) {
                tracing::warn!("Failed to remove {}: {}", path.display(), e);
            }
        }
    }
}

fn fingerprint_path(build_dir: &Path, name: &str) -> PathBuf {
    build_dir.join(format!("{}.hash", name))
}
