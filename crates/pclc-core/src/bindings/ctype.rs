//! C type names accepted in binding hints.
//!
//! Native blocks may override the default `c_int` typing per symbol:
//!
//! ```text
//! %c name=geom export=area,g_scale restype.area=double argtypes.area=double,double restype.g_scale=float
//! ```

use std::fmt;
use std::str::FromStr;

use crate::extract::Metadata;

/// A scalar C type with a `ctypes` equivalent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CType {
    Int,
    UInt,
    Long,
    ULong,
    LongLong,
    Short,
    Char,
    Byte,
    Float,
    Double,
    Bool,
    SizeT,
    CharPtr,
    VoidPtr,
    Void,
}

impl CType {
    /// Name of the type as written in metadata.
    pub fn name(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::UInt => "uint",
            Self::Long => "long",
            Self::ULong => "ulong",
            Self::LongLong => "longlong",
            Self::Short => "short",
            Self::Char => "char",
            Self::Byte => "byte",
            Self::Float => "float",
            Self::Double => "double",
            Self::Bool => "bool",
            Self::SizeT => "size_t",
            Self::CharPtr => "char_p",
            Self::VoidPtr => "void_p",
            Self::Void => "void",
        }
    }

    /// Python expression for the type in a `ctypes` module.
    pub fn ctypes(self) -> &'static str {
        match self {
            Self::Int => "c_int",
            Self::UInt => "c_uint",
            Self::Long => "c_long",
            Self::ULong => "c_ulong",
            Self::LongLong => "c_longlong",
            Self::Short => "c_short",
            Self::Char => "c_char",
            Self::Byte => "c_byte",
            Self::Float => "c_float",
            Self::Double => "c_double",
            Self::Bool => "c_bool",
            Self::SizeT => "c_size_t",
            Self::CharPtr => "c_char_p",
            Self::VoidPtr => "c_void_p",
            Self::Void => "None",
        }
    }

    /// Whether results of this type can be treated as a status code.
    pub fn is_integral(self) -> bool {
        matches!(
            self,
            Self::Int
                | Self::UInt
                | Self::Long
                | Self::ULong
                | Self::LongLong
                | Self::Short
                | Self::Byte
                | Self::Bool
                | Self::SizeT
        )
    }
}

impl fmt::Display for CType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ty = match s {
            "int" => Self::Int,
            "uint" => Self::UInt,
            "long" => Self::Long,
            "ulong" => Self::ULong,
            "longlong" => Self::LongLong,
            "short" => Self::Short,
            "char" => Self::Char,
            "byte" => Self::Byte,
            "float" => Self::Float,
            "double" => Self::Double,
            "bool" => Self::Bool,
            "size_t" => Self::SizeT,
            "char_p" => Self::CharPtr,
            "void_p" => Self::VoidPtr,
            "void" => Self::Void,
            other => return Err(format!("unknown C type '{}'", other)),
        };
        Ok(ty)
    }
}

/// Explicit typing for one symbol.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeHints {
    /// Return type (functions, callbacks) or value type (globals).
    pub restype: Option<CType>,
    /// Parameter types; `Some(vec![])` for a function taking no arguments.
    pub argtypes: Option<Vec<CType>>,
}

impl TypeHints {
    /// Read `restype.<symbol>` and `argtypes.<symbol>` from block metadata.
    ///
    /// Unknown type names are logged and leave the default typing in place.
    pub fn for_symbol(meta: &Metadata, symbol: &str) -> Self {
        let restype = meta
            .scalar(&format!("restype.{}", symbol))
            .and_then(|value| match value.parse::<CType>() {
                Ok(ty) => Some(ty),
                Err(e) => {
                    tracing::warn!("Ignoring restype hint for {}: {}", symbol, e);
                    None
                }
            });

        let argtypes = meta
            .scalar(&format!("argtypes.{}", symbol))
            .and_then(|value| match parse_argtypes(value) {
                Ok(types) => Some(types),
                Err(e) => {
                    tracing::warn!("Ignoring argtypes hint for {}: {}", symbol, e);
                    None
                }
            });

        Self { restype, argtypes }
    }

    pub fn is_empty(&self) -> bool {
        self.restype.is_none() && self.argtypes.is_none()
    }
}

/// Parse a comma-separated parameter list. A lone `void` means no parameters.
fn parse_argtypes(value: &str) -> Result<Vec<CType>, String> {
    let types = value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::parse::<CType>)
        .collect::<Result<Vec<_>, _>>()?;

    match types.as_slice() {
        [CType::Void] => Ok(Vec::new()),
        _ if types.contains(&CType::Void) => {
            Err("void is only valid as the sole parameter type".to_string())
        }
        _ => Ok(types),
    }
}
