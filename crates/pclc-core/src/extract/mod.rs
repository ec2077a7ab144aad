//! Block extraction for PCL documents.
//!
//! This module provides:
//! - The block grammar scanner (`%c … %endc`, `%py … %endpy`)
//! - Header metadata parsing (`key=value` tokens, comma lists)
//! - Grammar diagnostics for markers that never form a block

mod diagnostic;
mod parser;
mod types;

pub use diagnostic::{DiagnosticKind, GrammarDiagnostic};
pub use parser::{Extraction, extract};
pub use types::{Block, BlockKind, MetaValue, Metadata, default_module_name, is_module_name};
