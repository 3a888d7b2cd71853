//! Metamorphic query rewrites.
//!
//! A transformer maps a SELECT onto groups of queries whose result sets
//! must agree on a correct engine. Each group is checked independently by
//! the orchestrator's oracle.

use crate::model::query::{QueryNode, SelectStmt};

mod norec;
mod tlp;

pub use norec::NoRec;
pub use tlp::{TlpLocation, TlpTrans};

/// A rewrite from one query into groups of equivalent variants.
pub trait Transformer {
    fn transform(&self, stmt: &SelectStmt) -> Vec<Vec<QueryNode>>;
}

/// Apply every transformer and concatenate their groups.
pub fn apply(transformers: &[&dyn Transformer], stmt: &SelectStmt) -> Vec<Vec<QueryNode>> {
    transformers
        .iter()
        .flat_map(|t| t.transform(stmt))
        .collect()
}
