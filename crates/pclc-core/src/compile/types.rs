//! Common types for the compilation pipeline.

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable overriding the C compiler.
pub const COMPILER_ENV: &str = "PCLC_CC";

/// Environment variable with extra compiler flags (whitespace-separated).
pub const CFLAGS_ENV: &str = "PCLC_CFLAGS";

/// Compiler used when nothing else is configured.
pub const DEFAULT_COMPILER: &str = "gcc";

/// Flag added for blocks with `hide=yes`.
pub const HIDDEN_VISIBILITY_FLAG: &str = "-fvisibility=hidden";

/// Configuration for the native compiler driver.
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// Compiler executable (name looked up in PATH, or a path)
    pub compiler: PathBuf,

    /// Optimization level (0-3)
    pub opt_level: u8,

    /// Flags appended after the fixed flag set
    pub extra_flags: Vec<String>,

    /// Per-process time limit (None = unbounded)
    pub timeout: Option<Duration>,

    /// Compile blocks concurrently
    pub parallel: bool,

    /// Skip blocks whose source and flags are unchanged
    pub use_cache: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            compiler: PathBuf::from(DEFAULT_COMPILER),
            opt_level: 3,
            extra_flags: Vec::new(),
            timeout: Some(Duration::from_secs(300)),
            parallel: false,
            use_cache: true,
        }
    }
}

impl CompilerConfig {
    /// Create config from `PCLC_CC` and `PCLC_CFLAGS`.
    ///
    /// The environment is read once, here; the driver never looks at it again.
    pub fn from_env() -> Self {
        Self::from_vars(
            std::env::var_os(COMPILER_ENV),
            std::env::var(CFLAGS_ENV).ok(),
        )
    }

    /// Create config from explicit environment values.
    pub fn from_vars(compiler: Option<OsString>, cflags: Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(compiler) = compiler.filter(|c| !c.is_empty()) {
            config.compiler = PathBuf::from(compiler);
        }
        if let Some(cflags) = cflags {
            config.extra_flags = cflags.split_whitespace().map(str::to_string).collect();
        }
        config
    }

    pub fn with_compiler(mut self, compiler: impl Into<PathBuf>) -> Self {
        self.compiler = compiler.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    /// Fixed flags passed to every compilation.
    pub fn base_flags(&self) -> Vec<String> {
        vec![
            "-shared".to_string(),
            "-fPIC".to_string(),
            format!("-O{}", self.opt_level),
            "-Wall".to_string(),
            "-Werror".to_string(),
        ]
    }
}

/// Result of compiling one native block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledModule {
    /// Module name
    pub name: String,

    /// Path to the compiled dynamic library
    pub library: PathBuf,

    /// Whether the compiler was skipped because nothing changed
    pub cached: bool,

    /// Compilation time in milliseconds
    pub compile_time_ms: u64,
}

/// Platform-specific dynamic library extension.
pub fn dylib_extension() -> &'static str {
    #[cfg(target_os = "windows")]
    {
        "dll"
    }
    #[cfg(target_os = "macos")]
    {
        "dylib"
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        "so"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CompilerConfig::default();
        assert_eq!(config.compiler, PathBuf::from("gcc"));
        assert_eq!(config.opt_level, 3);
        assert!(!config.parallel);
        assert!(config.use_cache);
        assert_eq!(
            config.base_flags(),
            vec!["-shared", "-fPIC", "-O3", "-Wall", "-Werror"]
        );
    }

    #[test]
    fn test_from_vars() {
        let config = CompilerConfig::from_vars(
            Some(OsString::from("/opt/cc/bin/clang")),
            Some("  -g   -DDEBUG ".to_string()),
        );
        assert_eq!(config.compiler, PathBuf::from("/opt/cc/bin/clang"));
        assert_eq!(config.extra_flags, vec!["-g", "-DDEBUG"]);
    }

    #[test]
    fn test_from_vars_ignores_empty_compiler() {
        let config = CompilerConfig::from_vars(Some(OsString::new()), None);
        assert_eq!(config.compiler, PathBuf::from(DEFAULT_COMPILER));
        assert!(config.extra_flags.is_empty());
    }

    #[test]
    fn test_dylib_extension() {
        let ext = dylib_extension();
        #[cfg(target_os = "linux")]
        assert_eq!(ext, "so");
        #[cfg(target_os = "macos")]
        assert_eq!(ext, "dylib");
        #[cfg(target_os = "windows")]
        assert_eq!(ext, "dll");
    }
}
