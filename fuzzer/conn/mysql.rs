//! MySQL-protocol driver for the database under test.

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use mysql::prelude::Queryable;
use mysql::{Opts, Pool, PooledConn, Row, Value};
use parking_lot::Mutex;
use sql_gen::model::value::{ItemKind, QueryItem};
use sql_gen::Column;

use super::{Connection, SchemaRecord};

/// Driver backed by the `mysql` crate. One pinned session carries the
/// orchestrator's statements (so explicit transactions behave), while DDL
/// issued outside a transaction grabs a pooled connection, which is what
/// lets the schema-creation fan-out run in parallel.
pub struct MysqlConn {
    pool: Pool,
    session: Mutex<PooledConn>,
    in_txn: AtomicBool,
}

impl MysqlConn {
    pub fn connect(dsn: &str) -> Result<Self> {
        let opts = Opts::from_url(dsn).with_context(|| format!("invalid DSN {dsn}"))?;
        let pool = Pool::new(opts).context("connect to database under test")?;
        let session = pool.get_conn().context("open session connection")?;
        Ok(MysqlConn {
            pool,
            session: Mutex::new(session),
            in_txn: AtomicBool::new(false),
        })
    }

    fn to_item(value: &Value) -> QueryItem {
        match value {
            Value::NULL => QueryItem::null(),
            Value::Bytes(b) => QueryItem::new(String::from_utf8_lossy(b), ItemKind::Str),
            Value::Int(i) => QueryItem::new(i.to_string(), ItemKind::Int),
            Value::UInt(u) => QueryItem::new(u.to_string(), ItemKind::Int),
            Value::Float(f) => QueryItem::new(f.to_string(), ItemKind::Float),
            Value::Double(d) => QueryItem::new(d.to_string(), ItemKind::Float),
            other => QueryItem::new(format!("{other:?}"), ItemKind::Str),
        }
    }

    fn rows_to_items(rows: Vec<Row>) -> Vec<Vec<QueryItem>> {
        rows.iter()
            .map(|row| {
                (0..row.len())
                    .map(|i| match row.as_ref(i) {
                        Some(v) => Self::to_item(v),
                        None => QueryItem::null(),
                    })
                    .collect()
            })
            .collect()
    }
}

impl Connection for MysqlConn {
    fn fetch_schema(&self, db: &str) -> Result<Vec<SchemaRecord>> {
        let sql = format!(
            "SELECT c.TABLE_SCHEMA, c.TABLE_NAME, t.TABLE_TYPE, c.COLUMN_NAME, \
             c.COLUMN_TYPE, c.IS_NULLABLE \
             FROM information_schema.COLUMNS c \
             JOIN information_schema.TABLES t \
             ON c.TABLE_SCHEMA = t.TABLE_SCHEMA AND c.TABLE_NAME = t.TABLE_NAME \
             WHERE c.TABLE_SCHEMA = '{db}' \
             ORDER BY c.TABLE_NAME, c.ORDINAL_POSITION"
        );
        let mut conn = self.pool.get_conn()?;
        let rows: Vec<(String, String, String, String, String, String)> =
            conn.query(sql).context("fetch schema")?;
        Ok(rows
            .into_iter()
            .map(
                |(db, table, table_type, column, column_type, nullable)| SchemaRecord {
                    db,
                    table,
                    table_type,
                    column,
                    column_type,
                    nullable,
                },
            )
            .collect())
    }

    fn fetch_indexes(&self, db: &str, table: &str) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT DISTINCT INDEX_NAME FROM information_schema.STATISTICS \
             WHERE TABLE_SCHEMA = '{db}' AND TABLE_NAME = '{table}'"
        );
        let mut conn = self.pool.get_conn()?;
        conn.query(sql).context("fetch indexes")
    }

    fn fetch_tables(&self, db: &str) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT TABLE_NAME FROM information_schema.TABLES \
             WHERE TABLE_SCHEMA = '{db}' ORDER BY TABLE_NAME"
        );
        let mut conn = self.pool.get_conn()?;
        conn.query(sql).context("fetch tables")
    }

    fn fetch_columns(&self, db: &str, table: &str) -> Result<Vec<[String; 3]>> {
        let sql = format!(
            "SELECT COLUMN_NAME, COLUMN_TYPE, IS_NULLABLE \
             FROM information_schema.COLUMNS \
             WHERE TABLE_SCHEMA = '{db}' AND TABLE_NAME = '{table}' \
             ORDER BY ORDINAL_POSITION"
        );
        let mut conn = self.pool.get_conn()?;
        let rows: Vec<(String, String, String)> = conn.query(sql).context("fetch columns")?;
        Ok(rows
            .into_iter()
            .map(|(name, column_type, nullable)| [name, column_type, nullable])
            .collect())
    }

    fn begin(&self) -> Result<()> {
        self.session.lock().query_drop("BEGIN").context("begin")?;
        self.in_txn.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        self.in_txn.store(false, Ordering::SeqCst);
        self.session.lock().query_drop("COMMIT").context("commit")
    }

    fn exec(&self, sql: &str) -> Result<()> {
        if self.in_txn.load(Ordering::SeqCst) {
            self.session
                .lock()
                .query_drop(sql)
                .with_context(|| format!("exec {sql}"))
        } else {
            let mut conn = self.pool.get_conn()?;
            conn.query_drop(sql).with_context(|| format!("exec {sql}"))
        }
    }

    fn select(&self, sql: &str) -> Result<Vec<Vec<QueryItem>>> {
        let rows: Vec<Row> = self
            .session
            .lock()
            .query(sql)
            .with_context(|| format!("select {sql}"))?;
        Ok(Self::rows_to_items(rows))
    }

    fn create_view_by_select(
        &self,
        name: &str,
        sql: &str,
        row_count: usize,
        columns: &[Column],
    ) -> Result<()> {
        let col_list: Vec<String> = (0..columns.len()).map(|i| format!("c{i}")).collect();
        let ddl = format!("CREATE VIEW {name} ({}) AS {sql}", col_list.join(", "));
        tracing::debug!(name, row_count, "creating view");
        self.exec(&ddl)
    }

    fn close(&self) -> Result<()> {
        // dropping the pool tears the connections down; nothing to flush
        Ok(())
    }
}
