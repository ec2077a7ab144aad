//! FFI binding synthesis.
//!
//! Each compiled native block gets a Python `ctypes` module,
//! `<name>_wrapper.py`, with one binding per exported symbol. The kind of
//! binding is guessed from the symbol's name:
//!
//! | Name shape        | Binding                                        |
//! |-------------------|------------------------------------------------|
//! | `*_cb`            | `CFUNCTYPE(c_int, c_int)`                      |
//! | `g_*`             | `c_int.in_dll(lib, name)`                      |
//! | `*_struct`        | empty `Structure` subclass plus `<name>_ptr`   |
//! | `*_enum`          | empty `c_int` subclass                         |
//! | anything else     | `lib.<name>` returning `c_int`                 |
//!
//! Functions named `rc_*`, `status_*` or `err_*` (or every function of a
//! block with `errcheck=yes`) raise `PCLCError` on a non-zero result.

mod classify;
mod ctype;
mod generator;
mod verify;

pub use classify::{STATUS_PREFIXES, Symbol, SymbolClass, classify, is_status_function};
pub use ctype::{CType, TypeHints};
pub use generator::{binding_module_name, render_bindings, synthesize, write_runtime_module};
pub use verify::missing_exports;
