//! Shared build pipeline for the `run` and `build` commands.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Args;
use pclc_core::{
    AbortHandle, BuildCallback, BuildOptions, BuildReport, CompiledModule, CompilerConfig,
    Extraction, HostRuntime, NativeCompiler, Pipeline, RuntimeConfig, Staged,
};

use crate::colors;
use crate::diagnostics;

/// Options shared by `run` and `build`.
#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    /// Path to the document (.pcl file)
    pub file: PathBuf,

    /// Also create dist/<name>_onefile.pyz
    #[arg(long)]
    pub onefile: bool,

    /// Treat malformed markers and unresolved `requires` as errors
    #[arg(long)]
    pub strict: bool,

    /// Compile native blocks concurrently
    #[arg(long)]
    pub parallel: bool,

    /// Recompile every native block, even when unchanged
    #[arg(long)]
    pub no_cache: bool,

    /// Check declared exports against the compiled libraries
    #[arg(long)]
    pub verify_exports: bool,

    /// Per-process time limit in seconds (0 = no limit)
    #[arg(long, value_name = "SECS", default_value_t = 300)]
    pub timeout: u64,
}

impl BuildArgs {
    fn options(&self) -> BuildOptions {
        BuildOptions {
            strict: self.strict,
            onefile: self.onefile,
            verify_exports: self.verify_exports,
        }
    }

    fn compiler_config(&self) -> CompilerConfig {
        let timeout = (self.timeout > 0).then(|| Duration::from_secs(self.timeout));
        CompilerConfig::from_env()
            .with_timeout(timeout)
            .with_parallel(self.parallel)
            .with_cache(!self.no_cache)
    }
}

/// Progress callback that prints build status to the terminal.
pub struct ProgressCallback {
    strict: bool,
}

impl ProgressCallback {
    pub fn new(strict: bool) -> Self {
        Self { strict }
    }
}

impl BuildCallback for ProgressCallback {
    fn on_extracted(&self, document: &Path, source: &str, extraction: &Extraction) {
        print_step("Extracting blocks");
        print_success(Some(&format!(
            "{} native, {} script",
            extraction.native_count(),
            extraction.script_count()
        )));
        diagnostics::emit(document, source, &extraction.diagnostics, self.strict);
    }

    fn on_staged(&self, staged: &Staged) {
        print_step("Staging sources");
        print_success(Some(&staged.build_dir().display().to_string()));
        if !staged.manifest.native.is_empty() {
            println!("\n{}Compiling native blocks...{}", colors::BOLD, colors::RESET);
        }
    }

    fn on_compiled(&self, module: &CompiledModule) {
        if module.cached {
            println!(
                "  {} {} ... {}✓{} {}(cached){}",
                colors::DIM,
                module.name,
                colors::GREEN,
                colors::RESET,
                colors::DIM,
                colors::RESET
            );
        } else {
            println!(
                "  {} {} ... {}✓{} ({}ms)",
                colors::DIM,
                module.name,
                colors::GREEN,
                colors::RESET,
                module.compile_time_ms
            );
        }
    }

    fn on_bindings(&self, module: &str, path: &Path) {
        print_step(&format!("Bindings for {}", module));
        print_success(path.file_name().and_then(|name| name.to_str()));
    }

    fn on_stitched(&self, entry: &Path) {
        print_step("Stitching scripts");
        print_success(entry.file_name().and_then(|name| name.to_str()));
    }

    fn on_packaged(&self, archive: &Path) {
        print_step("Packaging");
        print_success(Some(&archive.display().to_string()));
    }
}

/// Locate the host interpreter from `PCLC_PYTHON` or PATH.
pub fn locate_runtime(abort: &AbortHandle) -> anyhow::Result<HostRuntime> {
    let runtime = HostRuntime::locate(&RuntimeConfig::from_env())?;
    Ok(runtime.with_abort_handle(abort.clone()))
}

/// Build a document, printing progress.
///
/// `runtime` is required for `--onefile`; it is located on demand otherwise.
pub fn build(
    args: &BuildArgs,
    abort: &AbortHandle,
    runtime: Option<HostRuntime>,
) -> anyhow::Result<BuildReport> {
    if !args.file.exists() {
        anyhow::bail!("Document not found: {}", args.file.display());
    }

    print_header(&args.file);

    print_step("Checking toolchain");
    let compiler = NativeCompiler::new(args.compiler_config())?.with_abort_handle(abort.clone());
    print_success(Some(&compiler.toolchain().compiler().display().to_string()));

    let mut pipeline =
        Pipeline::new(compiler, args.options()).with_callback(ProgressCallback::new(args.strict));

    let runtime = match runtime {
        Some(runtime) => Some(runtime),
        None if args.onefile => Some(locate_runtime(abort)?),
        None => None,
    };
    if let Some(runtime) = runtime {
        pipeline = pipeline.with_runtime(runtime);
    }

    let report = pipeline.build(&args.file)?;

    for (block, name) in &report.unresolved {
        println!(
            "{}  warning:{} script block #{} requires '{}', which no native block provides",
            colors::YELLOW,
            colors::RESET,
            block,
            name
        );
    }
    for (module, missing) in &report.missing_exports {
        println!(
            "{}  warning:{} {} does not export {}",
            colors::YELLOW,
            colors::RESET,
            module,
            missing.join(", ")
        );
    }

    Ok(report)
}

fn print_header(document: &Path) {
    let name = document
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();

    println!(
        "\n{}pclc{} - Building {}{}{}",
        colors::BOLD,
        colors::RESET,
        colors::CYAN,
        name,
        colors::RESET
    );
    println!("{}", "─".repeat(50));
}

/// Print a step.
pub fn print_step(name: &str) {
    print!("{}  ◆ {}{} ... ", colors::BLUE, name, colors::RESET);
    colors::flush_stdout();
}

/// Print success for a step.
pub fn print_success(extra: Option<&str>) {
    match extra {
        Some(s) => println!("{}✓{} ({})", colors::GREEN, colors::RESET, s),
        None => println!("{}✓{}", colors::GREEN, colors::RESET),
    }
}
