//! The known-bug filter.
//!
//! Some mismatch shapes correspond to already-reported engine behavior or
//! to comparisons the engines are allowed to answer differently; reports
//! matching the catalogue are suppressed so the loop keeps hunting.

use sql_gen::model::expr::Expr;
use sql_gen::model::query::SelectStmt;
use sql_gen::model::value::{CmpOp, PivotRows, Value};
use sql_gen::ColumnTypeKind;

type Check = fn(&SelectStmt, &PivotRows) -> bool;

/// Equality on floating-point operands: the engine compares at a
/// different precision than the row rendering we sampled, so a pivot row
/// can legitimately drop out of the result set.
fn float_equality(stmt: &SelectStmt, _pivot: &PivotRows) -> bool {
    let mut found = false;
    stmt.where_clause.walk(&mut |node| {
        if let Expr::Cmp { op, left, right } = node {
            if matches!(op, CmpOp::Eq | CmpOp::Ne) && (is_float(left) || is_float(right)) {
                found = true;
            }
        }
    });
    found
}

fn is_float(expr: &Expr) -> bool {
    match expr {
        Expr::Column(c) => c.column_type.kind == ColumnTypeKind::Float,
        Expr::Value(Value::Float(_)) => true,
        Expr::Arith { left, right, .. } => is_float(left) || is_float(right),
        _ => false,
    }
}

const CATALOGUE: &[Check] = &[float_equality];

/// Where suppressed reports go.
pub struct Dustbin<'a> {
    stmt: &'a SelectStmt,
    pivot: &'a PivotRows,
}

impl<'a> Dustbin<'a> {
    pub fn new(stmt: &'a SelectStmt, pivot: &'a PivotRows) -> Self {
        Dustbin { stmt, pivot }
    }

    pub fn is_known_bug(&self) -> bool {
        CATALOGUE.iter().any(|check| check(self.stmt, self.pivot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sql_gen::model::query::FromClause;
    use sql_gen::{CiStr, Column, ColumnType};

    fn select_where(where_clause: Expr) -> SelectStmt {
        SelectStmt {
            hint: None,
            fields: vec![],
            from: FromClause {
                base: CiStr::new("t"),
                joins: vec![],
            },
            where_clause,
        }
    }

    fn col(kind: ColumnTypeKind) -> Expr {
        Expr::Column(Column::new("t", "c", ColumnType::new(kind)))
    }

    #[test]
    fn float_equality_is_suppressed() {
        let stmt = select_where(Expr::cmp(
            CmpOp::Eq,
            col(ColumnTypeKind::Float),
            Expr::Value(Value::Float(1.5)),
        ));
        let pivot = PivotRows::new();
        assert!(Dustbin::new(&stmt, &pivot).is_known_bug());
    }

    #[test]
    fn float_ordering_is_reported() {
        let stmt = select_where(Expr::cmp(
            CmpOp::Lt,
            col(ColumnTypeKind::Float),
            Expr::Value(Value::Float(1.5)),
        ));
        let pivot = PivotRows::new();
        assert!(!Dustbin::new(&stmt, &pivot).is_known_bug());
    }

    #[test]
    fn integer_equality_is_reported() {
        let stmt = select_where(Expr::cmp(
            CmpOp::Eq,
            col(ColumnTypeKind::Int),
            Expr::Value(Value::Int(3)),
        ));
        let pivot = PivotRows::new();
        assert!(!Dustbin::new(&stmt, &pivot).is_known_bug());
    }

    #[test]
    fn float_equality_nested_in_logic_is_found() {
        let inner = Expr::cmp(
            CmpOp::Ne,
            col(ColumnTypeKind::Float),
            Expr::Value(Value::Null),
        );
        let stmt = select_where(Expr::not(inner));
        let pivot = PivotRows::new();
        assert!(Dustbin::new(&stmt, &pivot).is_known_bug());
    }
}
