//! Types for extracted blocks.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Metadata keys whose values are comma-separated lists.
pub const LIST_KEYS: [&str; 3] = ["export", "requires", "import"];

/// Language of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    /// C source, built into a dynamic library.
    Native,
    /// Python source, concatenated into the entry module.
    Script,
}

impl BlockKind {
    /// All kinds, in the order the scanner tries them.
    pub const ALL: [BlockKind; 2] = [BlockKind::Native, BlockKind::Script];

    /// Marker tag used in documents (`c` or `py`).
    pub fn tag(self) -> &'static str {
        match self {
            Self::Native => "c",
            Self::Script => "py",
        }
    }

    /// Look up a kind from its marker tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    /// Opening marker, e.g. `%c`.
    pub fn open_marker(self) -> String {
        format!("%{}", self.tag())
    }

    /// Closing marker, e.g. `%endc`.
    pub fn end_marker(self) -> String {
        format!("%end{}", self.tag())
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A single metadata value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    /// Ordered list of identifiers (`export`, `requires`, `import`).
    List(Vec<String>),
    /// Any other option.
    Scalar(String),
}

impl MetaValue {
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Self::Scalar(value) => Some(value),
            Self::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(items) => Some(items),
            Self::Scalar(_) => None,
        }
    }
}

/// Block options parsed from the header line.
///
/// Keys are free-form; unknown keys are kept so later stages (and type hints)
/// can read them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<String, MetaValue>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a raw `key=value` pair, splitting list keys on commas.
    ///
    /// A repeated key replaces the earlier value.
    pub fn insert_raw(&mut self, key: &str, value: &str) {
        let value = if LIST_KEYS.contains(&key) {
            MetaValue::List(split_list(value))
        } else {
            MetaValue::Scalar(value.to_string())
        };
        self.0.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<&MetaValue> {
        self.0.get(key)
    }

    /// Scalar value for `key`, if present.
    pub fn scalar(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(MetaValue::as_scalar)
    }

    /// List value for `key`; empty when absent.
    pub fn list(&self, key: &str) -> &[String] {
        self.0.get(key).and_then(MetaValue::as_list).unwrap_or(&[])
    }

    /// Whether a yes/no option is set to `yes` (case-insensitive).
    pub fn flag(&self, key: &str) -> bool {
        self.scalar(key)
            .is_some_and(|value| value.eq_ignore_ascii_case("yes"))
    }

    /// Explicit block name.
    pub fn name(&self) -> Option<&str> {
        self.scalar("name")
    }

    /// Declared exports of a native block.
    pub fn exports(&self) -> &[String] {
        self.list("export")
    }

    /// Modules a script block depends on (`requires` first, then `import`).
    pub fn requires(&self) -> Vec<&str> {
        self.list("requires")
            .iter()
            .chain(self.list("import"))
            .map(String::as_str)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetaValue)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// One extracted block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Language of the block.
    pub kind: BlockKind,
    /// Header options.
    pub metadata: Metadata,
    /// Raw text between the header line and the closing marker.
    pub body: String,
    /// Position among all blocks of the document.
    pub sequence_index: usize,
    /// Raw header text between the kind tag and the newline.
    pub header: String,
    /// Byte range of the whole fragment, markers included.
    pub span: Range<usize>,
}

impl Block {
    /// Block name: the `name` option, or `module_<index>`.
    pub fn name(&self) -> String {
        self.metadata
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| default_module_name(self.sequence_index))
    }

    /// Rebuild the fragment exactly as it appeared in the document.
    pub fn fragment(&self) -> String {
        format!(
            "{}{}\n{}{}",
            self.kind.open_marker(),
            self.header,
            self.body,
            self.kind.end_marker()
        )
    }
}

/// Positional default name for a block.
pub fn default_module_name(index: usize) -> String {
    format!("module_{}", index)
}

/// Whether `name` can be used as a module name (a Python identifier, ASCII only).
pub fn is_module_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_keys_are_split() {
        let mut meta = Metadata::new();
        meta.insert_raw("export", "add, ,g_total,,rc_init");
        meta.insert_raw("name", "mathlib");

        assert_eq!(meta.exports(), ["add", "g_total", "rc_init"]);
        assert_eq!(meta.name(), Some("mathlib"));
        assert_eq!(meta.scalar("export"), None);
    }

    #[test]
    fn test_requires_merges_import() {
        let mut meta = Metadata::new();
        meta.insert_raw("requires", "geometry");
        meta.insert_raw("import", "mathlib,io");

        assert_eq!(meta.requires(), vec!["geometry", "mathlib", "io"]);
    }

    #[test]
    fn test_flag_is_case_insensitive() {
        let mut meta = Metadata::new();
        meta.insert_raw("hide", "YES");
        meta.insert_raw("errcheck", "no");

        assert!(meta.flag("hide"));
        assert!(!meta.flag("errcheck"));
        assert!(!meta.flag("missing"));
    }

    #[test]
    fn test_metadata_json_shape() {
        let mut meta = Metadata::new();
        meta.insert_raw("name", "mathlib");
        meta.insert_raw("export", "add,sub");

        let json = serde_json::to_string(&meta).expect("serialize");
        assert_eq!(json, r#"{"export":["add","sub"],"name":"mathlib"}"#);

        let back: Metadata = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, meta);
    }

    #[test]
    fn test_default_name() {
        let block = Block {
            kind: BlockKind::Native,
            metadata: Metadata::new(),
            body: String::new(),
            sequence_index: 3,
            header: String::new(),
            span: 0..0,
        };
        assert_eq!(block.name(), "module_3");
    }

    #[test]
    fn test_is_module_name() {
        assert!(is_module_name("mathlib"));
        assert!(is_module_name("_private2"));
        assert!(!is_module_name(""));
        assert!(!is_module_name("2fast"));
        assert!(!is_module_name("../escape"));
        assert!(!is_module_name("dotted.name"));
    }
}
