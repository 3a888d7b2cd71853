//! Column type descriptors and catalogue type parsing.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

static WIDTH_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((\d+)\)").expect("width pattern"));

/// The base kinds a generated column can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnTypeKind {
    Int,
    Float,
    Varchar,
}

impl ColumnTypeKind {
    pub const ALL: [ColumnTypeKind; 3] = [
        ColumnTypeKind::Int,
        ColumnTypeKind::Float,
        ColumnTypeKind::Varchar,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ColumnTypeKind::Int => "int",
            ColumnTypeKind::Float => "float",
            ColumnTypeKind::Varchar => "varchar",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnTypeKind::Int | ColumnTypeKind::Float)
    }
}

impl fmt::Display for ColumnTypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A parsed column type: a base kind plus the optional display width the
/// catalogue reported, e.g. `int(11)` or `varchar(100)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnType {
    pub kind: ColumnTypeKind,
    pub width: Option<u32>,
}

impl ColumnType {
    pub fn new(kind: ColumnTypeKind) -> Self {
        ColumnType { kind, width: None }
    }

    pub fn with_width(kind: ColumnTypeKind, width: u32) -> Self {
        ColumnType {
            kind,
            width: Some(width),
        }
    }

    /// Parse a catalogue type string. The trailing parenthesized width is
    /// captured and stripped; the remainder maps onto the recognized kind
    /// set by affinity (`bigint` is an int, `double precision` a float,
    /// and any other textual type a varchar).
    pub fn parse(raw: &str) -> ColumnType {
        let width = WIDTH_PATTERN
            .captures(raw)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok());
        let base = WIDTH_PATTERN.replace(raw, "").to_lowercase();
        let kind = if base.contains("int") {
            ColumnTypeKind::Int
        } else if base.contains("float") || base.contains("double") || base.contains("decimal") {
            ColumnTypeKind::Float
        } else {
            ColumnTypeKind::Varchar
        };
        ColumnType { kind, width }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.width {
            Some(w) => write!(f, "{}({})", self.kind, w),
            None => write!(f, "{}", self.kind),
        }
    }
}
