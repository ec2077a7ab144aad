//! Python `ctypes` binding generation.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::extract::is_module_name;
use crate::manifest::NativeEntry;
use crate::paths::RUNTIME_MODULE;

use super::classify::{Symbol, SymbolClass};
use super::ctype::{CType, TypeHints};

/// Helpers shared by every binding module.
///
/// Kept in one module so all bindings raise the same `PCLCError` class.
const RUNTIME_SOURCE: &str = r#""""Helpers shared by pclc-generated bindings."""
from ctypes import *


class PCLCError(Exception):
    """Raised when a checked native function returns a non-zero status."""


def check_error_code(code):
    if code != 0:
        raise PCLCError(f"Error code: {code}")


def ptr_to_bytes(ptr, length):
    return string_at(ptr, length)


def bytes_to_ptr(data):
    buf = create_string_buffer(data)
    # The caller must keep `buf` alive as long as the pointer is used
    return cast(buf, c_void_p), buf
"#;

const ERRCHECK: &str = "lambda result, func, args: check_error_code(result) or result";

/// Python keywords that cannot be assignment targets.
const PYTHON_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield",
];

/// Names the generated module itself relies on.
const RESERVED_NAMES: &[&str] = &[
    "lib",
    "Path",
    "CDLL",
    "CFUNCTYPE",
    "POINTER",
    "Structure",
    "PCLCError",
    "check_error_code",
    "ptr_to_bytes",
    "bytes_to_ptr",
    "c_int",
    "c_uint",
    "c_long",
    "c_ulong",
    "c_longlong",
    "c_short",
    "c_char",
    "c_byte",
    "c_float",
    "c_double",
    "c_bool",
    "c_size_t",
    "c_char_p",
    "c_void_p",
];

/// Why an export cannot be bound under its own name, if it cannot.
fn unbindable_reason(export: &str) -> Option<&'static str> {
    if !is_module_name(export) {
        Some("not a valid identifier")
    } else if PYTHON_KEYWORDS.contains(&export) {
        Some("Python keyword")
    } else if RESERVED_NAMES.contains(&export) {
        Some("name reserved by the binding module")
    } else {
        None
    }
}

/// Python module name of the bindings for native module `name`.
pub fn binding_module_name(name: &str) -> String {
    format!("{}_wrapper", name)
}

/// Write `pcl_runtime.py` into the build directory.
pub fn write_runtime_module(build_dir: &Path) -> Result<PathBuf> {
    let path = build_dir.join(RUNTIME_MODULE);
    fs::write(&path, RUNTIME_SOURCE)?;
    Ok(path)
}

/// Generate `<name>_wrapper.py` for a compiled native block.
///
/// The library is referenced by file name relative to the binding module, so
/// the build directory can be moved or archived.
pub fn synthesize(build_dir: &Path, entry: &NativeEntry, library: &Path) -> Result<PathBuf> {
    let library_file = library
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            Error::Parse(format!(
                "library path {} has no usable file name",
                library.display()
            ))
        })?;

    write_runtime_module(build_dir)?;

    let source = render_bindings(entry, library_file);
    let path = build_dir.join(format!("{}.py", binding_module_name(&entry.name)));
    fs::write(&path, source)?;

    tracing::debug!(
        "Generated {} ({} exports)",
        path.display(),
        entry.exports().len()
    );
    Ok(path)
}

/// Render the binding module source for one native block.
pub fn render_bindings(entry: &NativeEntry, library_file: &str) -> String {
    let mut py = String::new();

    py.push_str(&format!(
        "# Bindings for native module '{}', generated by pclc.\n",
        entry.name
    ));
    py.push_str("from ctypes import *\n");
    py.push_str("from pathlib import Path\n");
    py.push_str("from pcl_runtime import *\n");
    py.push('\n');
    py.push_str(&format!(
        "lib = CDLL(str(Path(__file__).parent / '{}'))\n",
        library_file
    ));

    for export in entry.exports() {
        py.push('\n');

        if let Some(reason) = unbindable_reason(export) {
            tracing::warn!(
                "Module {}: export '{}' cannot be bound ({}), skipping",
                entry.name,
                export,
                reason
            );
            py.push_str(&format!("# skipped '{}': {}\n", export, reason));
            continue;
        }

        let symbol = Symbol::new(export, &entry.name, entry.errcheck());
        let hints = TypeHints::for_symbol(&entry.meta, export);
        render_symbol(&mut py, &symbol, &hints);
    }

    py
}

fn render_symbol(py: &mut String, symbol: &Symbol, hints: &TypeHints) {
    let name = &symbol.name;

    match symbol.class {
        SymbolClass::Callback => {
            let restype = hints.restype.unwrap_or(CType::Int);
            let mut signature = vec![restype.ctypes()];
            match &hints.argtypes {
                Some(args) => signature.extend(args.iter().map(|ty| ty.ctypes())),
                None => signature.push(CType::Int.ctypes()),
            }
            py.push_str(&format!("# Callback type for {}\n", name));
            py.push_str(&format!("{} = CFUNCTYPE({})\n", name, signature.join(", ")));
        }
        SymbolClass::GlobalVar => {
            let ty = match hints.restype {
                Some(CType::Void) => {
                    tracing::warn!("Global {} cannot have type void, using int", name);
                    CType::Int
                }
                Some(ty) => ty,
                None => CType::Int,
            };
            py.push_str(&format!(
                "{} = {}.in_dll(lib, '{}')\n",
                name,
                ty.ctypes(),
                name
            ));
        }
        SymbolClass::Aggregate => {
            py.push_str(&format!("class {}(Structure):\n", name));
            py.push_str("    _fields_ = []\n");
            py.push_str(&format!("{}_ptr = POINTER({})\n", name, name));
        }
        SymbolClass::Enum => {
            py.push_str(&format!("class {}(c_int):\n", name));
            py.push_str("    pass\n");
        }
        SymbolClass::Function => render_function(py, symbol, hints),
    }
}

fn render_function(py: &mut String, symbol: &Symbol, hints: &TypeHints) {
    let name = &symbol.name;

    py.push_str(&format!("{} = lib.{}\n", name, name));
    match hints.restype {
        Some(ty) => py.push_str(&format!("{}.restype = {}\n", name, ty.ctypes())),
        None => py.push_str(&format!(
            "{}.restype = c_int  # default restype, override as needed\n",
            name
        )),
    }

    if let Some(args) = &hints.argtypes {
        let args: Vec<_> = args.iter().map(|ty| ty.ctypes()).collect();
        py.push_str(&format!("{}.argtypes = [{}]\n", name, args.join(", ")));
    }

    if symbol.errcheck {
        let restype = hints.restype.unwrap_or(CType::Int);
        if restype.is_integral() {
            py.push_str(&format!("{}.errcheck = {}\n", name, ERRCHECK));
        } else {
            tracing::warn!(
                "Module {}: {} returns {}, not a status code; error check skipped",
                symbol.owner,
                name,
                restype
            );
        }
    }
}
