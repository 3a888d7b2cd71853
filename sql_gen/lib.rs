//! SQL model, random statement generation and metamorphic rewrites.
//!
//! This crate provides the building blocks consumed by the `sqlprobe`
//! orchestrator: a typed SQL AST that renders to MySQL-dialect text, a
//! random generator driven by an explicit RNG and a generation context
//! (including pivot-row guided generation), and the NoREC/TLP query
//! rewrites used by the metamorphic oracles.

pub mod generation;
pub mod model;
pub mod transform;

pub use generation::{GenConfig, GenCtx, GeneratedSelect, Generator};
pub use model::ident::CiStr;
pub use model::table::{Column, Table, TableKind};
pub use model::types::{ColumnType, ColumnTypeKind};
pub use model::value::{PivotRows, QueryItem, Value};

/// Errors produced while synthesizing statements.
#[derive(Debug, thiserror::Error)]
pub enum GenError {
    #[error("no tables available for generation")]
    NoTables,
    #[error("table {0} has no usable columns")]
    NoColumns(String),
    #[error("pivot row is missing an entry for {0}")]
    PivotMiss(String),
}
