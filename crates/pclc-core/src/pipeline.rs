//! End-to-end build of a PCL document.
//!
//! Runs every stage in order: extract, stage, compile, synthesize bindings,
//! stitch, and optionally package. All staging finishes before the first
//! compiler starts, and each module's bindings are generated only after its
//! library was built.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::bindings::{missing_exports, synthesize};
use crate::compile::{CompiledModule, NativeCompiler};
use crate::error::{Error, Result};
use crate::extract::{Extraction, GrammarDiagnostic, extract};
use crate::manifest::Manifest;
use crate::package::package_onefile;
use crate::paths::BuildDirs;
use crate::runtime::HostRuntime;
use crate::stage::{Staged, stage};
use crate::stitch::{RequirePolicy, stitch_with, unresolved_requires};

/// Options that change what a build produces.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    /// Reject malformed markers and unresolved `requires` entries
    pub strict: bool,

    /// Package the build directory into `dist/<stem>_onefile.pyz`
    pub onefile: bool,

    /// Check declared exports against each compiled library
    pub verify_exports: bool,
}

impl BuildOptions {
    pub fn require_policy(&self) -> RequirePolicy {
        if self.strict {
            RequirePolicy::Strict
        } else {
            RequirePolicy::Deferred
        }
    }
}

/// Callback for build progress reporting.
///
/// Every method defaults to a no-op. `on_compiled` may be called from
/// several threads at once when compiling in parallel.
pub trait BuildCallback: Send + Sync {
    /// Called once the document has been scanned, before strict checks.
    fn on_extracted(&self, _document: &Path, _source: &str, _extraction: &Extraction) {}

    /// Called after sources and the manifest were written.
    fn on_staged(&self, _staged: &Staged) {}

    /// Called when a native module finished compiling (or was reused).
    fn on_compiled(&self, _module: &CompiledModule) {}

    /// Called when a module's binding file was written.
    fn on_bindings(&self, _module: &str, _path: &Path) {}

    /// Called when the entry module was written.
    fn on_stitched(&self, _entry: &Path) {}

    /// Called when the one-file archive was created.
    fn on_packaged(&self, _archive: &Path) {}
}

/// Everything a successful build produced.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub dirs: BuildDirs,
    pub manifest: Manifest,
    /// Malformed markers found in the document (empty in strict mode)
    pub diagnostics: Vec<GrammarDiagnostic>,
    /// Compiled libraries by module name
    pub modules: BTreeMap<String, CompiledModule>,
    /// Binding files by module name
    pub bindings: BTreeMap<String, PathBuf>,
    /// The stitched entry module
    pub entry: PathBuf,
    /// The one-file archive, when requested
    pub archive: Option<PathBuf>,
    /// `requires` entries that no native block provides, as `(block index, name)`
    pub unresolved: Vec<(usize, String)>,
    /// Declared exports missing from their library (with `verify_exports`)
    pub missing_exports: BTreeMap<String, Vec<String>>,
}

/// Builds PCL documents.
pub struct Pipeline {
    compiler: NativeCompiler,
    options: BuildOptions,
    runtime: Option<HostRuntime>,
    callback: Option<Box<dyn BuildCallback>>,
}

impl Pipeline {
    pub fn new(compiler: NativeCompiler, options: BuildOptions) -> Self {
        Self {
            compiler,
            options,
            runtime: None,
            callback: None,
        }
    }

    /// Set the interpreter used for packaging.
    pub fn with_runtime(mut self, runtime: HostRuntime) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn with_callback(mut self, callback: impl BuildCallback + 'static) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    pub fn compiler(&self) -> &NativeCompiler {
        &self.compiler
    }

    fn notify(&self, f: impl FnOnce(&dyn BuildCallback)) {
        if let Some(callback) = &self.callback {
            f(callback.as_ref());
        }
    }

    /// Build a document.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The document cannot be read, or staging fails
    /// - Strict mode is on and the document has malformed markers or
    ///   unresolved `requires` entries
    /// - Any native block fails to compile (the whole build stops)
    /// - Packaging was requested and fails
    pub fn build(&self, document_path: &Path) -> Result<BuildReport> {
        let source = fs::read_to_string(document_path)?;
        let extraction = extract(&source);

        tracing::info!(
            "Extracted {} native and {} script block(s) from {}",
            extraction.native_count(),
            extraction.script_count(),
            document_path.display()
        );
        for diagnostic in &extraction.diagnostics {
            let (line, col) = diagnostic.line_col(&source);
            tracing::warn!(
                "{}:{}:{}: {}",
                document_path.display(),
                line,
                col,
                diagnostic.message()
            );
        }
        self.notify(|cb| cb.on_extracted(document_path, &source, &extraction));

        if self.options.strict && !extraction.is_clean() {
            return Err(Error::Grammar {
                path: document_path.to_path_buf(),
                count: extraction.diagnostics.len(),
            });
        }

        let Extraction {
            blocks,
            diagnostics,
        } = extraction;

        let staged = stage(document_path, &blocks)?;
        self.notify(|cb| cb.on_staged(&staged));

        // Checked before compiling so strict builds fail fast
        let unresolved = unresolved_requires(&staged.manifest);
        if self.options.strict {
            if let Some((block, name)) = unresolved.first() {
                return Err(Error::UnresolvedRequire {
                    block: *block,
                    name: name.clone(),
                });
            }
        }

        let build_dir = staged.build_dir();
        let modules = self
            .compiler
            .compile_all_with(build_dir, &staged.manifest, |module| {
                self.notify(|cb| cb.on_compiled(module));
            })?;

        let missing = if self.options.verify_exports {
            self.verify_exports(&staged.manifest, &modules)
        } else {
            BTreeMap::new()
        };

        let mut bindings = BTreeMap::new();
        for entry in &staged.manifest.native {
            let module = modules.get(&entry.name).ok_or_else(|| Error::Compilation {
                module: Some(entry.name.clone()),
                status: None,
                message: "no library was produced".to_string(),
            })?;

            let path = synthesize(build_dir, entry, &module.library)?;
            self.notify(|cb| cb.on_bindings(&entry.name, &path));
            bindings.insert(entry.name.clone(), path);
        }

        let entry = stitch_with(build_dir, &staged.manifest, self.options.require_policy())?;
        self.notify(|cb| cb.on_stitched(&entry));

        let archive = if self.options.onefile {
            let runtime = self.runtime.as_ref().ok_or_else(|| {
                Error::Toolchain("packaging requires a Python interpreter".to_string())
            })?;
            let archive = package_onefile(runtime, &staged.dirs)?;
            self.notify(|cb| cb.on_packaged(&archive));
            Some(archive)
        } else {
            None
        };

        let Staged { dirs, manifest } = staged;
        Ok(BuildReport {
            dirs,
            manifest,
            diagnostics,
            modules,
            bindings,
            entry,
            archive,
            unresolved,
            missing_exports: missing,
        })
    }

    /// Look up every declared export in its library; problems are only logged.
    fn verify_exports(
        &self,
        manifest: &Manifest,
        modules: &BTreeMap<String, CompiledModule>,
    ) -> BTreeMap<String, Vec<String>> {
        let mut report = BTreeMap::new();

        for entry in &manifest.native {
            let Some(module) = modules.get(&entry.name) else {
                continue;
            };

            match missing_exports(entry, &module.library) {
                Ok(missing) if missing.is_empty() => {}
                Ok(missing) => {
                    tracing::warn!(
                        "Module {} does not export: {}",
                        entry.name,
                        missing.join(", ")
                    );
                    report.insert(entry.name.clone(), missing);
                }
                Err(e) => {
                    tracing::warn!("Could not verify exports of {}: {}", entry.name, e);
                }
            }
        }

        report
    }
}
