//! Predicate expressions: rendering and pivot-row evaluation.

use std::fmt;

use crate::model::table::Column;
use crate::model::value::{ArithOp, CmpOp, PivotRows, Value};
use crate::GenError;

/// Logical connectives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
}

impl fmt::Display for LogicOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicOp::And => write!(f, "AND"),
            LogicOp::Or => write!(f, "OR"),
        }
    }
}

/// A generated expression tree. Every composite node renders inside
/// parentheses so emission never depends on precedence.
#[derive(Debug, Clone)]
pub enum Expr {
    Column(Column),
    Value(Value),
    Cmp {
        op: CmpOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logic {
        op: LogicOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Arith {
        op: ArithOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Not(Box<Expr>),
    IsNull {
        expr: Box<Expr>,
        negated: bool,
    },
    IsTrue(Box<Expr>),
}

impl Expr {
    pub fn cmp(op: CmpOp, left: Expr, right: Expr) -> Expr {
        Expr::Cmp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn logic(op: LogicOp, left: Expr, right: Expr) -> Expr {
        Expr::Logic {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn arith(op: ArithOp, left: Expr, right: Expr) -> Expr {
        Expr::Arith {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn not(expr: Expr) -> Expr {
        Expr::Not(Box::new(expr))
    }

    pub fn is_null(expr: Expr) -> Expr {
        Expr::IsNull {
            expr: Box::new(expr),
            negated: false,
        }
    }

    pub fn is_true(expr: Expr) -> Expr {
        Expr::IsTrue(Box::new(expr))
    }

    pub fn true_literal() -> Expr {
        Expr::Value(Value::Int(1))
    }

    /// Evaluate against a pivot row. Column references resolve through the
    /// pivot map; a missing entry is a generation bug surfaced as
    /// `PivotMiss`.
    pub fn eval(&self, pivot: &PivotRows) -> Result<Value, GenError> {
        match self {
            Expr::Column(c) => {
                let key = c.pivot_key();
                let item = pivot.get(&key).ok_or(GenError::PivotMiss(key))?;
                Ok(item.to_value(Some(&c.column_type)))
            }
            Expr::Value(v) => Ok(v.clone()),
            Expr::Cmp { op, left, right } => Ok(left.eval(pivot)?.compare(&right.eval(pivot)?, *op)),
            Expr::Logic { op, left, right } => {
                let (l, r) = (left.eval(pivot)?, right.eval(pivot)?);
                Ok(match op {
                    LogicOp::And => l.and(&r),
                    LogicOp::Or => l.or(&r),
                })
            }
            Expr::Arith { op, left, right } => {
                Ok(left.eval(pivot)?.arith(&right.eval(pivot)?, *op))
            }
            Expr::Not(e) => Ok(e.eval(pivot)?.not()),
            Expr::IsNull { expr, negated } => {
                let null = expr.eval(pivot)?.is_null();
                Ok(Value::from_bool(null != *negated))
            }
            // IS TRUE is never unknown
            Expr::IsTrue(e) => Ok(Value::from_bool(e.eval(pivot)?.truth() == Some(true))),
        }
    }

    /// Depth-first visit of every node.
    pub fn walk(&self, visit: &mut dyn FnMut(&Expr)) {
        visit(self);
        match self {
            Expr::Column(_) | Expr::Value(_) => {}
            Expr::Cmp { left, right, .. }
            | Expr::Logic { left, right, .. }
            | Expr::Arith { left, right, .. } => {
                left.walk(visit);
                right.walk(visit);
            }
            Expr::Not(e) | Expr::IsTrue(e) => e.walk(visit),
            Expr::IsNull { expr, .. } => expr.walk(visit),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Column(c) => write!(f, "{}", c.qualified()),
            Expr::Value(v) => write!(f, "{v}"),
            Expr::Cmp { op, left, right } => write!(f, "({left} {op} {right})"),
            Expr::Logic { op, left, right } => write!(f, "({left} {op} {right})"),
            Expr::Arith { op, left, right } => write!(f, "({left} {op} {right})"),
            Expr::Not(e) => write!(f, "(NOT {e})"),
            Expr::IsNull { expr, negated } => {
                if *negated {
                    write!(f, "({expr} IS NOT NULL)")
                } else {
                    write!(f, "({expr} IS NULL)")
                }
            }
            Expr::IsTrue(e) => write!(f, "({e} IS TRUE)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::{ColumnType, ColumnTypeKind};
    use crate::model::value::{ItemKind, QueryItem};

    fn col(name: &str, kind: ColumnTypeKind) -> Column {
        Column::new("t", name, ColumnType::new(kind))
    }

    fn pivot(entries: &[(&str, Option<&str>, ItemKind)]) -> PivotRows {
        entries
            .iter()
            .map(|(k, v, kind)| {
                let item = match v {
                    Some(v) => QueryItem::new(*v, *kind),
                    None => QueryItem::null(),
                };
                (format!("t.{k}"), item)
            })
            .collect()
    }

    #[test]
    fn renders_with_parentheses() {
        let e = Expr::logic(
            LogicOp::And,
            Expr::cmp(
                CmpOp::Gt,
                Expr::Column(col("col_int", ColumnTypeKind::Int)),
                Expr::Value(Value::Int(3)),
            ),
            Expr::is_null(Expr::Column(col("col_float", ColumnTypeKind::Float))),
        );
        assert_eq!(
            e.to_string(),
            "((t.col_int > 3) AND (t.col_float IS NULL))"
        );
    }

    #[test]
    fn eval_resolves_columns_through_pivot() {
        let rows = pivot(&[("col_int", Some("7"), ItemKind::Int)]);
        let e = Expr::cmp(
            CmpOp::Eq,
            Expr::Column(col("col_int", ColumnTypeKind::Int)),
            Expr::Value(Value::Int(7)),
        );
        assert_eq!(e.eval(&rows).unwrap().truth(), Some(true));
    }

    #[test]
    fn eval_null_column_is_unknown() {
        let rows = pivot(&[("col_int", None, ItemKind::Int)]);
        let e = Expr::cmp(
            CmpOp::Eq,
            Expr::Column(col("col_int", ColumnTypeKind::Int)),
            Expr::Value(Value::Int(7)),
        );
        assert!(e.eval(&rows).unwrap().is_null());
        let wrapped = Expr::is_null(e);
        assert_eq!(wrapped.eval(&rows).unwrap().truth(), Some(true));
    }

    #[test]
    fn eval_missing_pivot_entry_errors() {
        let rows = pivot(&[]);
        let e = Expr::Column(col("col_int", ColumnTypeKind::Int));
        assert!(matches!(e.eval(&rows), Err(GenError::PivotMiss(_))));
    }

    #[test]
    fn is_true_collapses_unknown() {
        let rows = pivot(&[("col_int", None, ItemKind::Int)]);
        let e = Expr::is_true(Expr::Column(col("col_int", ColumnTypeKind::Int)));
        assert_eq!(e.eval(&rows).unwrap().truth(), Some(false));
    }

    #[test]
    fn walk_visits_all_nodes() {
        let e = Expr::not(Expr::cmp(
            CmpOp::Lt,
            Expr::Value(Value::Int(1)),
            Expr::Value(Value::Int(2)),
        ));
        let mut n = 0;
        e.walk(&mut |_| n += 1);
        assert_eq!(n, 4);
    }
}
