//! Native compilation for PCL documents.
//!
//! This module provides:
//! - Compiler configuration (explicit value, optionally seeded from the environment)
//! - Toolchain lookup
//! - The per-block compiler driver (one external process per native block)
//! - Bounded, cancellable execution of external processes
//!
//! # Architecture
//!
//! ```text
//! manifest.json ──► NativeCompiler ──► cc -shared -fPIC … -o <name>.so <name>.c
//!                        │
//!                        ├── <name>.hash (skip unchanged builds)
//!                        └── AbortHandle (kills in-flight compilers)
//! ```

mod driver;
mod process;
mod toolchain;
mod types;

pub use driver::NativeCompiler;
pub use process::{AbortHandle, ProcessOutput, run_captured, run_inherited};
pub use toolchain::{Toolchain, resolve_program};
pub use types::{
    COMPILER_ENV, CFLAGS_ENV, CompiledModule, CompilerConfig, DEFAULT_COMPILER,
    HIDDEN_VISIBILITY_FLAG, dylib_extension,
};
