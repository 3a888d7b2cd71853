//! Thin façade over the connection driver: statement execution, the
//! schema cache and the generator hooks used during schema refresh.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use rand::Rng;
use sql_gen::model::value::QueryItem;
use sql_gen::{GenConfig, Generator, Table};

use crate::conn::Connection;

mod schema;

/// Folded table name to table; rebuilt wholesale, never patched.
pub type SchemaCache = BTreeMap<String, Table>;

/// Typed executor errors.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("table {0} is not in the schema cache")]
    SchemaMiss(String),
}

pub struct Executor {
    conn: Arc<dyn Connection>,
    db: String,
    generator: Generator,
    cache: SchemaCache,
}

impl Executor {
    pub fn new(conn: Arc<dyn Connection>, db: impl Into<String>, gen_config: GenConfig) -> Self {
        Executor {
            conn,
            db: db.into(),
            generator: Generator::new(gen_config),
            cache: SchemaCache::new(),
        }
    }

    pub fn conn(&self) -> &Arc<dyn Connection> {
        &self.conn
    }

    pub fn db(&self) -> &str {
        &self.db
    }

    /// A snapshot of every cached table, ordered by folded name.
    pub fn get_tables(&self) -> Vec<Table> {
        self.cache.values().cloned().collect()
    }

    /// Case-insensitive lookup.
    pub fn get_table(&self, name: &str) -> Result<Table, ExecError> {
        self.cache
            .get(&name.to_lowercase())
            .cloned()
            .ok_or_else(|| ExecError::SchemaMiss(name.to_string()))
    }

    pub fn exec(&self, sql: &str) -> Result<()> {
        tracing::debug!(sql, "exec");
        self.conn.exec(sql)
    }

    pub fn select(&self, sql: &str) -> Result<Vec<Vec<QueryItem>>> {
        tracing::debug!(sql, "select");
        self.conn.select(sql)
    }

    /// CREATE TABLE for one tuple of the column-type enumeration; pure,
    /// safe to pre-generate before the parallel fan-out.
    pub fn generate_ddl_create_table(
        &self,
        index: usize,
        kinds: &[sql_gen::ColumnTypeKind],
    ) -> String {
        self.generator.ddl_create_table(index, kinds).to_string()
    }

    /// CREATE INDEX over the cached tables.
    pub fn generate_ddl_create_index<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<String> {
        let tables = self.get_tables();
        Ok(self.generator.ddl_create_index(rng, &tables)?.to_string())
    }

    /// One INSERT into the named cached table.
    pub fn generate_dml_insert_by_table<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        name: &str,
    ) -> Result<String> {
        let table = self.get_table(name)?;
        Ok(self.generator.dml_insert_by_table(rng, &table)?.to_string())
    }
}
