//! End-to-end orchestrator runs against a scripted in-memory driver.

use std::sync::Arc;
use std::sync::Mutex;

use anyhow::Result;
use sql_gen::model::value::{ItemKind, QueryItem};
use sql_gen::Column;
use sqlprobe::{CancelToken, Config, Connection, Fuzzer, SchemaRecord};

/// A driver that serves a fixed catalogue and scripted result sets while
/// recording every statement it sees.
#[derive(Default)]
struct FakeConn {
    records: Vec<SchemaRecord>,
    /// Row served when a table is sampled with ORDER BY RAND().
    sample_rows: Vec<(String, Vec<QueryItem>)>,
    /// Result served for every other SELECT.
    select_response: Vec<Vec<QueryItem>>,
    log: Mutex<Vec<String>>,
}

impl FakeConn {
    fn log_of(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn count_matching(&self, needle: &str) -> usize {
        self.log_of().iter().filter(|s| s.contains(needle)).count()
    }
}

fn record(table: &str, column: &str, ty: &str, nullable: &str) -> SchemaRecord {
    SchemaRecord {
        db: "test".into(),
        table: table.into(),
        table_type: "BASE TABLE".into(),
        column: column.into(),
        column_type: ty.into(),
        nullable: nullable.into(),
    }
}

impl Connection for FakeConn {
    fn fetch_schema(&self, _db: &str) -> Result<Vec<SchemaRecord>> {
        Ok(self.records.clone())
    }

    fn fetch_indexes(&self, _db: &str, _table: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn fetch_tables(&self, _db: &str) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.records.iter().map(|r| r.table.clone()).collect();
        names.dedup();
        Ok(names)
    }

    fn fetch_columns(&self, _db: &str, table: &str) -> Result<Vec<[String; 3]>> {
        Ok(self
            .records
            .iter()
            .filter(|r| r.table == table)
            .map(|r| [r.column.clone(), r.column_type.clone(), r.nullable.clone()])
            .collect())
    }

    fn begin(&self) -> Result<()> {
        self.log.lock().unwrap().push("BEGIN".into());
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        self.log.lock().unwrap().push("COMMIT".into());
        Ok(())
    }

    fn exec(&self, sql: &str) -> Result<()> {
        self.log.lock().unwrap().push(sql.to_string());
        Ok(())
    }

    fn select(&self, sql: &str) -> Result<Vec<Vec<QueryItem>>> {
        self.log.lock().unwrap().push(sql.to_string());
        let lowered = sql.to_lowercase();
        if lowered.starts_with("select count(*) from") {
            return Ok(vec![vec![QueryItem::new("1", ItemKind::Int)]]);
        }
        if sql.contains("ORDER BY RAND()") {
            // SELECT * FROM <table> ORDER BY RAND() LIMIT 1
            let table = sql.split_whitespace().nth(3).unwrap_or_default();
            return Ok(self
                .sample_rows
                .iter()
                .find(|(t, _)| t == table)
                .map(|(_, row)| vec![row.clone()])
                .unwrap_or_default());
        }
        Ok(self.select_response.clone())
    }

    fn create_view_by_select(
        &self,
        name: &str,
        _sql: &str,
        _row_count: usize,
        _columns: &[Column],
    ) -> Result<()> {
        self.log.lock().unwrap().push(format!("CREATE VIEW {name}"));
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.log.lock().unwrap().push("CLOSE".into());
        Ok(())
    }
}

/// One table `t` with an auto-increment key and an int column, holding the
/// row (1, 7).
fn single_table_conn() -> FakeConn {
    FakeConn {
        records: vec![
            record("t", "id_t", "int(11)", "NO"),
            record("t", "col_int", "int(11)", "YES"),
        ],
        sample_rows: vec![(
            "t".into(),
            vec![
                QueryItem::new("1", ItemKind::Int),
                QueryItem::new("7", ItemKind::Int),
            ],
        )],
        select_response: vec![vec![
            QueryItem::new("1", ItemKind::Int),
            QueryItem::new("7", ItemKind::Int),
        ]],
        ..Default::default()
    }
}

fn base_config() -> Config {
    Config {
        db_name: "test".into(),
        silent: true,
        seed: Some(5),
        ..Config::default()
    }
}

#[test]
fn full_batch_seeds_views_and_rolls_over() {
    let conn = Arc::new(single_table_conn());
    let config = Config {
        view_count: 2,
        depth: 1,
        max_rounds: Some(101),
        ..base_config()
    };
    let mut fuzzer = Fuzzer::with_connection(config, conn.clone()).unwrap();
    fuzzer.start(&CancelToken::new());

    // rounds 0-99 form batch 0; round 100 triggers the second refresh
    assert_eq!(fuzzer.batch(), 1);
    assert_eq!(conn.count_matching("drop database if exists test"), 2);
    assert_eq!(conn.count_matching("create database test"), 2);

    // the seeding prefix produced exactly view_0 and view_1, twice
    assert_eq!(conn.count_matching("CREATE VIEW view_0"), 2);
    // the second batch stopped at its first round, before view_1
    assert_eq!(conn.count_matching("CREATE VIEW view_1"), 1);
    assert_eq!(conn.count_matching("CREATE VIEW view_2"), 0);

    // one CREATE TABLE per column-type tuple, per refresh
    assert_eq!(conn.count_matching("CREATE TABLE "), 14);

    // populate ran inside an explicit transaction
    assert!(conn.count_matching("BEGIN") >= 2);
    assert!(conn.count_matching("COMMIT") >= 2);
    assert!(conn.count_matching("INSERT INTO t ") >= 2);

    assert_eq!(conn.count_matching("CLOSE"), 1);
}

#[test]
fn pivot_sampling_skips_empty_tables() {
    let mut conn = single_table_conn();
    conn.sample_rows.clear();
    let conn = Arc::new(conn);
    let config = Config {
        view_count: 0,
        enable_norec: false,
        enable_tlp: false,
        max_rounds: Some(5),
        ..base_config()
    };
    let mut fuzzer = Fuzzer::with_connection(config, conn.clone()).unwrap();
    fuzzer.start(&CancelToken::new());

    // every PQS round sampled and then skipped; nothing was verified
    assert!(conn.count_matching("ORDER BY RAND()") >= 5);
    assert_eq!(conn.count_matching("CREATE VIEW"), 0);
    assert_eq!(fuzzer.batch(), 0);
}

#[test]
fn seeding_prefix_forces_pqs_even_when_only_norec_is_enabled() {
    let mut conn = single_table_conn();
    conn.sample_rows.clear();
    let conn = Arc::new(conn);
    let config = Config {
        view_count: 2,
        enable_pqs: false,
        enable_tlp: false,
        max_rounds: Some(10),
        ..base_config()
    };
    let mut fuzzer = Fuzzer::with_connection(config, conn.clone()).unwrap();
    fuzzer.start(&CancelToken::new());

    // the two prefix rounds sampled pivot rows even though PQS is off
    assert_eq!(conn.count_matching("ORDER BY RAND()"), 2);
    // the remaining rounds ran the NoREC rewrites
    assert!(conn.count_matching("IS TRUE") > 0);
    assert!(conn.count_matching("(NOT (NOT ") > 0);
    // with the sample rows gone no view could be seeded
    assert_eq!(conn.count_matching("CREATE VIEW"), 0);
}

#[test]
fn view_count_zero_runs_random_approaches_from_round_zero() {
    let conn = Arc::new(single_table_conn());
    let config = Config {
        view_count: 0,
        max_rounds: Some(30),
        ..base_config()
    };
    let mut fuzzer = Fuzzer::with_connection(config, conn.clone()).unwrap();
    fuzzer.start(&CancelToken::new());

    assert_eq!(conn.count_matching("CREATE VIEW"), 0);
    // schema is fetched for the initial refresh only, never re-fetched at
    // a seeding boundary
    assert_eq!(conn.count_matching("drop database if exists test"), 1);
}

#[test]
fn empty_database_refresh_populates_every_table() {
    let conn = Arc::new(single_table_conn());
    let config = Config {
        view_count: 0,
        max_rounds: Some(1),
        ..base_config()
    };
    let mut fuzzer = Fuzzer::with_connection(config, conn.clone()).unwrap();
    fuzzer.start(&CancelToken::new());

    // one tuple per subset of {int, float, varchar}
    assert_eq!(conn.count_matching("CREATE TABLE "), 7);
    // the single cached table got its seed insert and a row-count check
    assert!(conn.count_matching("INSERT INTO t ") >= 1);
    assert_eq!(conn.count_matching("select count(*) from t"), 1);
}

#[test]
fn cancelled_token_stops_immediately() {
    let conn = Arc::new(single_table_conn());
    let config = base_config();
    let mut fuzzer = Fuzzer::with_connection(config, conn.clone()).unwrap();
    let token = CancelToken::new();
    token.cancel();
    fuzzer.start(&token);

    assert_eq!(fuzzer.batch(), 0);
    assert_eq!(conn.count_matching("drop database"), 0);
    assert_eq!(conn.count_matching("CLOSE"), 1);
}
