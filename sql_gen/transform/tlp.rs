//! Ternary logic partitioning.
//!
//! For any predicate P, every row satisfies exactly one of P, NOT P and
//! P IS NULL. Restricting a query by each partition and gluing the three
//! restrictions back together with UNION ALL must therefore reproduce the
//! original result set.

use crate::model::expr::{Expr, LogicOp};
use crate::model::query::{CompoundOp, CompoundSelect, QueryNode, SelectStmt};

use super::Transformer;

/// Where the partitioning predicate is applied. Only the WHERE clause is
/// partitioned today; the variant leaves room for HAVING/ON partitioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlpLocation {
    Where,
}

pub struct TlpTrans {
    pub expr: Expr,
    pub location: TlpLocation,
}

impl TlpTrans {
    fn partition(&self, stmt: &SelectStmt, wrap: impl FnOnce(Expr) -> Expr) -> SelectStmt {
        let base = stmt.where_clause.clone();
        stmt.with_where(Expr::logic(LogicOp::And, base, wrap(self.expr.clone())))
    }
}

impl Transformer for TlpTrans {
    fn transform(&self, stmt: &SelectStmt) -> Vec<Vec<QueryNode>> {
        match self.location {
            TlpLocation::Where => {}
        }
        let partitions = vec![
            self.partition(stmt, |p| p),
            self.partition(stmt, Expr::not),
            self.partition(stmt, Expr::is_null),
        ];
        let union = CompoundSelect {
            op: CompoundOp::UnionAll,
            selects: partitions,
        };
        vec![vec![stmt.clone().into(), QueryNode::Compound(union)]]
    }
}
