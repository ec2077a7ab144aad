//! Core pipeline for pclc, the PCL (Python-C linked) document compiler.
//!
//! This crate provides:
//! - Block extraction from mixed `%c` / `%py` documents
//! - Staging of native sources and the build manifest
//! - Native compilation through an external C toolchain
//! - Heuristic ctypes binding synthesis from exported symbol names
//! - Stitching of script blocks into a single entry module
//! - Host runtime helpers for running and packaging the result
//!
//! # Architecture
//!
//! ```text
//! document.pcl
//!     │
//!     ├── extract ──► blocks ──► stage ──► build/<name>.c + build/manifest.json
//!     │                                         │
//!     │                          NativeCompiler ◄┘──► build/<name>.so
//!     │                                                   │
//!     │                                   synthesize ◄────┘──► build/<name>_wrapper.py
//!     │                                                                │
//!     └──────────────────────────────────────────── stitch ◄───────────┘──► build/__pcl_main__.py
//! ```

pub mod bindings;
pub mod compile;
pub mod error;
pub mod extract;
pub mod manifest;
pub mod package;
pub mod paths;
pub mod pipeline;
pub mod runtime;
pub mod stage;
pub mod stitch;

pub use bindings::{SymbolClass, classify, synthesize};
pub use compile::{AbortHandle, CompiledModule, CompilerConfig, NativeCompiler};
pub use error::{Error, Result};
pub use extract::{Block, BlockKind, Extraction, GrammarDiagnostic, Metadata, extract};
pub use manifest::{Manifest, NativeEntry, ScriptEntry};
pub use paths::BuildDirs;
pub use pipeline::{BuildCallback, BuildOptions, BuildReport, Pipeline};
pub use runtime::{HostRuntime, RuntimeConfig};
pub use stage::{Staged, stage};
pub use stitch::{RequirePolicy, stitch};
