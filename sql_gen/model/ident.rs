//! Case-insensitive SQL identifiers.

use std::fmt;
use std::hash::{Hash, Hasher};

/// An identifier that compares and hashes case-insensitively but remembers
/// the spelling it was created with. Comparison goes through the folded
/// form; emission uses the original.
#[derive(Debug, Clone)]
pub struct CiStr {
    origin: String,
    folded: String,
}

impl CiStr {
    pub fn new(s: impl Into<String>) -> Self {
        let origin = s.into();
        let folded = origin.to_lowercase();
        CiStr { origin, folded }
    }

    /// The original spelling, for emission.
    pub fn as_str(&self) -> &str {
        &self.origin
    }

    /// The case-folded form, for comparison and map keys.
    pub fn folded(&self) -> &str {
        &self.folded
    }

    pub fn eq_str(&self, other: &str) -> bool {
        self.folded == other.to_lowercase()
    }

    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.folded.starts_with(&prefix.to_lowercase())
    }
}

impl PartialEq for CiStr {
    fn eq(&self, other: &Self) -> bool {
        self.folded == other.folded
    }
}

impl Eq for CiStr {}

impl Hash for CiStr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.folded.hash(state);
    }
}

impl PartialOrd for CiStr {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CiStr {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.folded.cmp(&other.folded)
    }
}

impl fmt::Display for CiStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.origin)
    }
}

impl From<&str> for CiStr {
    fn from(s: &str) -> Self {
        CiStr::new(s)
    }
}

impl From<String> for CiStr {
    fn from(s: String) -> Self {
        CiStr::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn case_insensitive_equality() {
        assert_eq!(CiStr::new("Table_A"), CiStr::new("table_a"));
        assert_ne!(CiStr::new("t1"), CiStr::new("t2"));
    }

    #[test]
    fn original_spelling_preserved() {
        let id = CiStr::new("MyTable");
        assert_eq!(id.to_string(), "MyTable");
        assert_eq!(id.folded(), "mytable");
    }

    #[test]
    fn folded_map_keys_collide() {
        let mut m = HashMap::new();
        m.insert(CiStr::new("T1"), 1);
        m.insert(CiStr::new("t1"), 2);
        assert_eq!(m.len(), 1);
        assert_eq!(m[&CiStr::new("T1")], 2);
    }

    #[test]
    fn prefix_check_ignores_case() {
        assert!(CiStr::new("ID_table_int").has_prefix("id_"));
        assert!(!CiStr::new("col_int").has_prefix("id_"));
    }
}
