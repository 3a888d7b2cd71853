//! Non-optimizing rewrites.
//!
//! A WHERE predicate keeps a row exactly when it evaluates to TRUE, so
//! `P`, `(P) IS TRUE` and `NOT (NOT (P))` filter identically while giving
//! the optimizer much less to work with (`IS TRUE` and double negation
//! both defeat index-condition pushdown on the engines under test).

use crate::model::expr::Expr;
use crate::model::query::{QueryNode, SelectStmt};

use super::Transformer;

pub struct NoRec;

impl Transformer for NoRec {
    fn transform(&self, stmt: &SelectStmt) -> Vec<Vec<QueryNode>> {
        let p = stmt.where_clause.clone();
        let group = vec![
            stmt.clone().into(),
            stmt.with_where(Expr::is_true(p.clone())).into(),
            stmt.with_where(Expr::not(Expr::not(p))).into(),
        ];
        vec![group]
    }
}
