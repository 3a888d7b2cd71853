//! The connection driver seam.
//!
//! The orchestrator talks to the database under test exclusively through
//! the [`Connection`] trait, so the core stays independent of the wire
//! protocol and the tests can substitute a scripted driver.

use anyhow::Result;
use sql_gen::model::value::QueryItem;
use sql_gen::Column;

mod mysql;

pub use self::mysql::MysqlConn;

/// One row of the flat catalogue listing consumed by schema reflection.
#[derive(Debug, Clone)]
pub struct SchemaRecord {
    pub db: String,
    pub table: String,
    pub table_type: String,
    pub column: String,
    pub column_type: String,
    pub nullable: String,
}

/// A live connection to the database under test.
///
/// Implementations must tolerate concurrent `exec` calls during the
/// parallel DDL fan-out, either by multiplexing internally or by opening
/// per-call connections. `begin`/`commit` pin subsequent statements to one
/// session until the transaction ends.
pub trait Connection: Send + Sync {
    /// Flat (db, table, tableType, column, columnType, nullable) listing.
    fn fetch_schema(&self, db: &str) -> Result<Vec<SchemaRecord>>;
    fn fetch_indexes(&self, db: &str, table: &str) -> Result<Vec<String>>;
    fn fetch_tables(&self, db: &str) -> Result<Vec<String>>;
    /// Per-table (name, type, nullable) triples.
    fn fetch_columns(&self, db: &str, table: &str) -> Result<Vec<[String; 3]>>;
    fn begin(&self) -> Result<()>;
    fn commit(&self) -> Result<()>;
    /// Fire-and-forget statement execution.
    fn exec(&self, sql: &str) -> Result<()>;
    /// Rectangular result of a SELECT.
    fn select(&self, sql: &str) -> Result<Vec<Vec<QueryItem>>>;
    /// Materialize a verified SELECT as a view with the given output
    /// column list.
    fn create_view_by_select(
        &self,
        name: &str,
        sql: &str,
        row_count: usize,
        columns: &[Column],
    ) -> Result<()>;
    fn close(&self) -> Result<()>;
}
