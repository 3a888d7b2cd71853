//! Runtime SQL values with three-valued comparison semantics, and the
//! `QueryItem` cell representation returned by the connection driver.

use std::collections::HashMap;
use std::fmt;

use crate::model::types::{ColumnType, ColumnTypeKind};

/// A SQL literal or evaluation result.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Str(String),
}

/// Comparison operators with SQL semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CmpOp::Eq => "=",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        };
        write!(f, "{s}")
    }
}

/// Arithmetic operators used inside generated expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
        };
        write!(f, "{s}")
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// SQL truthiness: NULL is unknown, numbers are true when non-zero and
    /// strings coerce through their numeric prefix.
    pub fn truth(&self) -> Option<bool> {
        match self {
            Value::Null => None,
            Value::Int(i) => Some(*i != 0),
            Value::Float(f) => Some(*f != 0.0),
            Value::Str(s) => Some(numeric_prefix(s) != 0.0),
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Null => None,
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Str(s) => Some(numeric_prefix(s)),
        }
    }

    /// Three-valued comparison. Strings compare case-insensitively (the
    /// default collation of the target dialect); a string paired with a
    /// number is coerced to a number first.
    pub fn compare(&self, other: &Value, op: CmpOp) -> Value {
        if self.is_null() || other.is_null() {
            return Value::Null;
        }
        let ord = match (self, other) {
            (Value::Str(a), Value::Str(b)) => a.to_lowercase().cmp(&b.to_lowercase()),
            _ => {
                let (a, b) = (self.as_f64(), other.as_f64());
                match (a, b) {
                    (Some(a), Some(b)) => match a.partial_cmp(&b) {
                        Some(o) => o,
                        None => return Value::Null,
                    },
                    _ => return Value::Null,
                }
            }
        };
        let holds = match op {
            CmpOp::Eq => ord.is_eq(),
            CmpOp::Ne => ord.is_ne(),
            CmpOp::Lt => ord.is_lt(),
            CmpOp::Le => ord.is_le(),
            CmpOp::Gt => ord.is_gt(),
            CmpOp::Ge => ord.is_ge(),
        };
        Value::from_bool(holds)
    }

    /// Ternary AND: false dominates NULL.
    pub fn and(&self, other: &Value) -> Value {
        match (self.truth(), other.truth()) {
            (Some(false), _) | (_, Some(false)) => Value::Int(0),
            (Some(true), Some(true)) => Value::Int(1),
            _ => Value::Null,
        }
    }

    /// Ternary OR: true dominates NULL.
    pub fn or(&self, other: &Value) -> Value {
        match (self.truth(), other.truth()) {
            (Some(true), _) | (_, Some(true)) => Value::Int(1),
            (Some(false), Some(false)) => Value::Int(0),
            _ => Value::Null,
        }
    }

    /// Ternary NOT.
    pub fn not(&self) -> Value {
        match self.truth() {
            None => Value::Null,
            Some(b) => Value::from_bool(!b),
        }
    }

    /// NULL-propagating arithmetic; integer pairs stay integral.
    pub fn arith(&self, other: &Value, op: ArithOp) -> Value {
        if self.is_null() || other.is_null() {
            return Value::Null;
        }
        if let (Value::Int(a), Value::Int(b)) = (self, other) {
            let r = match op {
                ArithOp::Add => a.wrapping_add(*b),
                ArithOp::Sub => a.wrapping_sub(*b),
                ArithOp::Mul => a.wrapping_mul(*b),
            };
            return Value::Int(r);
        }
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => Value::Float(match op {
                ArithOp::Add => a + b,
                ArithOp::Sub => a - b,
                ArithOp::Mul => a * b,
            }),
            _ => Value::Null,
        }
    }

    pub fn from_bool(b: bool) -> Value {
        Value::Int(if b { 1 } else { 0 })
    }
}

/// The leading numeric prefix of a string, zero when there is none.
fn numeric_prefix(s: &str) -> f64 {
    let trimmed = s.trim_start();
    let mut end = 0;
    let bytes = trimmed.as_bytes();
    let mut seen_dot = false;
    for (i, b) in bytes.iter().enumerate() {
        match b {
            b'-' | b'+' if i == 0 => {}
            b'.' if !seen_dot => seen_dot = true,
            b'0'..=b'9' => {}
            _ => break,
        }
        end = i + 1;
    }
    trimmed[..end].parse().unwrap_or(0.0)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Str(s) => write!(f, "'{}'", s.replace('\'', "''")),
        }
    }
}

/// The kind tag a driver attaches to a result cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Int,
    Float,
    Str,
}

/// One cell of a result set: a null flag plus the driver's string
/// rendering and kind tag. Two items are equal when both are NULL or both
/// render identically.
#[derive(Debug, Clone)]
pub struct QueryItem {
    pub val: String,
    pub null: bool,
    pub kind: ItemKind,
}

impl QueryItem {
    pub fn null() -> Self {
        QueryItem {
            val: String::new(),
            null: true,
            kind: ItemKind::Str,
        }
    }

    pub fn new(val: impl Into<String>, kind: ItemKind) -> Self {
        QueryItem {
            val: val.into(),
            null: false,
            kind,
        }
    }

    /// Reconstruct a typed value, preferring the schema column type when
    /// one is available and falling back to the driver's kind tag.
    pub fn to_value(&self, column_type: Option<&ColumnType>) -> Value {
        if self.null {
            return Value::Null;
        }
        let kind = match column_type {
            Some(ct) => match ct.kind {
                ColumnTypeKind::Int => ItemKind::Int,
                ColumnTypeKind::Float => ItemKind::Float,
                ColumnTypeKind::Varchar => ItemKind::Str,
            },
            None => self.kind,
        };
        match kind {
            ItemKind::Int => self
                .val
                .parse::<i64>()
                .map(Value::Int)
                .unwrap_or_else(|_| Value::Str(self.val.clone())),
            ItemKind::Float => self
                .val
                .parse::<f64>()
                .map(Value::Float)
                .unwrap_or_else(|_| Value::Str(self.val.clone())),
            ItemKind::Str => Value::Str(self.val.clone()),
        }
    }
}

/// A pivot row: folded `table.column` keys mapped to sampled cells.
pub type PivotRows = HashMap<String, QueryItem>;
