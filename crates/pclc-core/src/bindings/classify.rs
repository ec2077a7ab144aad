//! Symbol classification by name shape.

use std::fmt;

/// Name prefixes marking functions that return a status code.
pub const STATUS_PREFIXES: [&str; 3] = ["rc_", "status_", "err_"];

/// Kind of binding generated for an exported symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolClass {
    /// Function pointer type (`*_cb`).
    Callback,
    /// Global variable aliased from library storage (`g_*`).
    GlobalVar,
    /// Opaque structure (`*_struct`).
    Aggregate,
    /// Integer-backed enumeration (`*_enum`).
    Enum,
    /// Plain function; everything else.
    Function,
}

impl SymbolClass {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Callback => "callback",
            Self::GlobalVar => "global",
            Self::Aggregate => "struct",
            Self::Enum => "enum",
            Self::Function => "function",
        }
    }
}

impl fmt::Display for SymbolClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify an exported symbol by the shape of its name.
///
/// Rules are tried in order (callback, global, struct, enum); anything that
/// matches none of them is a function.
pub fn classify(name: &str) -> SymbolClass {
    if name.ends_with("_cb") {
        SymbolClass::Callback
    } else if name.starts_with("g_") {
        SymbolClass::GlobalVar
    } else if name.ends_with("_struct") {
        SymbolClass::Aggregate
    } else if name.ends_with("_enum") {
        SymbolClass::Enum
    } else {
        SymbolClass::Function
    }
}

/// Whether a symbol's name marks it as returning a status code.
pub fn is_status_function(name: &str) -> bool {
    STATUS_PREFIXES.iter().any(|prefix| name.starts_with(prefix))
}

/// A classified export of one native block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub class: SymbolClass,
    /// Module that exports the symbol.
    pub owner: String,
    /// Whether non-zero results raise `PCLCError` (functions only).
    pub errcheck: bool,
}

impl Symbol {
    /// Classify `name` as exported by `owner`.
    ///
    /// `block_errcheck` is the block's `errcheck=yes` option.
    pub fn new(name: &str, owner: &str, block_errcheck: bool) -> Self {
        let class = classify(name);
        Self {
            name: name.to_string(),
            class,
            owner: owner.to_string(),
            errcheck: class == SymbolClass::Function
                && (block_errcheck || is_status_function(name)),
        }
    }
}
