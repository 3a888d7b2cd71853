//! The round orchestrator: batches of rounds over a freshly built schema,
//! each round generating statements, executing them and checking one of
//! the testing oracles.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use parking_lot::RwLock;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use sql_gen::generation::{compose_all_column_types, rand_ident};
use sql_gen::model::query::{CreateIndexStmt, IndexKey};
use sql_gen::model::value::PivotRows;
use sql_gen::transform::{self, NoRec, TlpLocation, TlpTrans, Transformer};
use sql_gen::{ColumnTypeKind, GenConfig, GenCtx, Generator, Table, TableKind};

use crate::config::Config;
use crate::conn::{Connection, MysqlConn};
use crate::executor::Executor;
use crate::knownbugs::Dustbin;
use crate::oracle::{self, Approach};
use crate::report::Reporter;

/// Rounds per batch; a new batch starts with a rebuilt schema.
pub const BATCH_SIZE: usize = 100;

/// Cooperative cancellation, polled at the top of every loop iteration.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct Fuzzer {
    conf: Config,
    executor: Executor,
    generator: Generator,
    rng: ChaCha8Rng,
    reporter: Reporter,
    /// Held exclusively while the schema is being rebuilt and shared for
    /// the duration of a round, so every statement of a round sees one
    /// schema snapshot.
    in_write: Arc<RwLock<()>>,
    batch: u64,
    round_in_batch: usize,
    rounds_done: u64,
}

impl Fuzzer {
    /// Connect to the database under test and build the orchestrator.
    pub fn new(conf: Config) -> Result<Self> {
        let conn = Arc::new(MysqlConn::connect(&conf.dsn)?);
        Self::with_connection(conf, conn)
    }

    /// Build the orchestrator over an externally supplied driver.
    pub fn with_connection(conf: Config, conn: Arc<dyn Connection>) -> Result<Self> {
        conf.validate()?;
        let seed = conf.seed.unwrap_or_else(|| rand::rng().next_u64());
        tracing::info!(seed, "rng seeded");
        let gen_config = GenConfig {
            hint: conf.enable_hint,
        };
        Ok(Fuzzer {
            executor: Executor::new(conn, conf.db_name.clone(), gen_config),
            generator: Generator::new(gen_config),
            rng: ChaCha8Rng::seed_from_u64(seed),
            reporter: Reporter::new(conf.silent),
            in_write: Arc::new(RwLock::new(())),
            batch: 0,
            round_in_batch: 0,
            rounds_done: 0,
            conf,
        })
    }

    pub fn batch(&self) -> u64 {
        self.batch
    }

    /// Run until the token fires or the configured round limit is hit.
    pub fn start(&mut self, token: &CancelToken) {
        self.run(token);
        self.tear_down();
    }

    fn run(&mut self, token: &CancelToken) {
        while !token.is_cancelled() {
            if let Some(max) = self.conf.max_rounds {
                if self.rounds_done >= max {
                    break;
                }
            }
            if self.round_in_batch == 0 {
                if let Err(e) = self.refresh_database() {
                    tracing::error!(error = ?e, "schema refresh failed, stopping");
                    return;
                }
                if self.rounds_done > 0 {
                    self.batch += 1;
                }
            }
            if let Err(e) = self.progress() {
                tracing::error!(error = ?e, "round failed, stopping");
                return;
            }
            self.round_in_batch = (self.round_in_batch + 1) % BATCH_SIZE;
            self.rounds_done += 1;
        }
    }

    fn tear_down(&mut self) {
        if let Err(e) = self.executor.conn().close() {
            tracing::warn!(error = ?e, "closing connection failed");
        }
    }

    /// One verification round under the shared schema lock.
    fn progress(&mut self) -> Result<()> {
        let lock = self.in_write.clone();
        let _shared = lock.read();

        // once the seeding prefix is over, pick up the views created in it
        if self.conf.view_count > 0 && self.round_in_batch == self.conf.view_count {
            self.executor.load_schema()?;
            self.executor.reload_schema()?;
        }

        let approach = Self::choose_approach(&mut self.rng, &self.conf, self.round_in_batch);
        match approach {
            Approach::Pqs => self.pqs_round(),
            Approach::NoRec | Approach::Tlp => self.transform_round(approach),
        }
    }

    /// Pick the approach for this round: the batch prefix is reserved for
    /// PQS so the seeded views are provably non-empty, afterwards any
    /// enabled approach may run.
    fn choose_approach<R: Rng + ?Sized>(
        rng: &mut R,
        conf: &Config,
        round_in_batch: usize,
    ) -> Approach {
        let mut approaches = Vec::new();
        if round_in_batch < conf.view_count {
            approaches.push(Approach::Pqs);
        } else {
            if conf.enable_norec {
                approaches.push(Approach::NoRec);
            }
            if conf.enable_pqs {
                approaches.push(Approach::Pqs);
            }
            if conf.enable_tlp {
                approaches.push(Approach::Tlp);
            }
        }
        approaches[rng.random_range(0..approaches.len())]
    }

    fn pqs_round(&mut self) -> Result<()> {
        let (pivot, used_tables) = self.choose_pivoted_row()?;
        if used_tables.is_empty() {
            tracing::info!("no table produced a pivot row, skipping round");
            return Ok(());
        }
        let mut ctx = GenCtx::new(used_tables, Some(pivot));
        ctx.is_pqs_mode = true;
        let generated = match self.generator.select_stmt(&mut self.rng, &ctx, self.conf.depth) {
            Ok(g) => g,
            Err(e) => {
                tracing::warn!(error = ?e, "pivot select generation failed, skipping round");
                return Ok(());
            }
        };

        let explicit = self.rng.random_bool(0.5);
        self.with_txn(explicit, |f| {
            let rows = match f.executor.select(&generated.sql) {
                Ok(rows) => rows,
                Err(e) => {
                    tracing::error!(error = ?e, sql = %generated.sql, "pivot select failed");
                    return Ok(());
                }
            };
            let correct = oracle::verify_pqs(&generated.pivot, &generated.columns, &rows);
            if !correct {
                if Dustbin::new(&generated.stmt, &generated.pivot).is_known_bug() {
                    tracing::info!(sql = %generated.sql, "mismatch matches the known-bug catalogue");
                    return Ok(());
                }
                f.reporter.report_pqs(&generated.sql, &generated.pivot);
                return Ok(());
            }
            if f.round_in_batch < f.conf.view_count {
                let name = format!("view_{}", f.round_in_batch);
                if let Err(e) = f.executor.conn().create_view_by_select(
                    &name,
                    &generated.sql,
                    rows.len(),
                    &generated.columns,
                ) {
                    tracing::error!(error = ?e, name = %name, "create view failed");
                }
            }
            tracing::info!(
                approach = %Approach::Pqs,
                batch = f.batch,
                round = f.round_in_batch,
                result = correct,
                "check finished"
            );
            Ok(())
        })
    }

    fn transform_round(&mut self, approach: Approach) -> Result<()> {
        let tables = self.rand_tables();
        let ctx = GenCtx::new(tables, None);
        let generated = match self.generator.select_stmt(&mut self.rng, &ctx, self.conf.depth) {
            Ok(g) => g,
            Err(e) => {
                tracing::warn!(error = ?e, "select generation failed, skipping round");
                return Ok(());
            }
        };

        let tlp;
        let mut transformers: Vec<&dyn Transformer> = vec![&NoRec];
        if approach == Approach::Tlp {
            tlp = TlpTrans {
                expr: self.generator.condition_clause(&mut self.rng, &ctx, 2),
                location: TlpLocation::Where,
            };
            transformers.push(&tlp);
        }
        let groups = transform::apply(&transformers, &generated.stmt);

        let explicit = self.rng.random_bool(0.5);
        self.with_txn(explicit, |f| {
            for group in &groups {
                if group.len() < 2 {
                    tracing::warn!(
                        sql = %generated.sql,
                        variants = group.len(),
                        "not enough variants were generated"
                    );
                    continue;
                }
                let mut sqls = Vec::new();
                let mut result_sets = Vec::new();
                for node in group {
                    let sql = node.to_string();
                    match f.executor.select(&sql) {
                        Ok(rows) => result_sets.push(rows),
                        Err(e) => {
                            tracing::error!(error = ?e, sql = %sql, "variant execution failed");
                            return Ok(());
                        }
                    }
                    sqls.push(sql);
                }
                let correct = oracle::check_result_set(&result_sets, true);
                if !correct {
                    f.reporter.report_group(&sqls);
                }
                tracing::info!(
                    approach = %approach,
                    batch = f.batch,
                    round = f.round_in_batch,
                    result = correct,
                    "check finished"
                );
            }
            Ok(())
        })
    }

    /// Run `action` under an explicit transaction when asked, auto-commit
    /// otherwise. Commit failures are logged but never abort the loop.
    fn with_txn(
        &mut self,
        use_explicit: bool,
        action: impl FnOnce(&mut Self) -> Result<()>,
    ) -> Result<()> {
        if use_explicit {
            if let Err(e) = self.executor.conn().begin() {
                tracing::error!(error = ?e, "begin txn failed");
                return Ok(());
            }
            tracing::debug!("begin txn");
        }
        let result = action(self);
        if use_explicit {
            match self.executor.conn().commit() {
                Ok(()) => tracing::debug!("commit txn"),
                Err(e) => tracing::error!(error = ?e, "commit txn failed"),
            }
        }
        result
    }

    /// Sample one live row per chosen table. Tables that turn out to be
    /// empty are dropped from the working set.
    fn choose_pivoted_row(&mut self) -> Result<(PivotRows, Vec<Table>)> {
        let candidates = self.rand_tables();
        let mut pivot = PivotRows::new();
        let mut really_used = Vec::new();
        for table in candidates {
            let sql = format!("SELECT * FROM {} ORDER BY RAND() LIMIT 1", table.name);
            let rows = self
                .executor
                .select(&sql)
                .with_context(|| format!("sample pivot row of {}", table.name))?;
            let Some(row) = rows.first() else {
                continue;
            };
            if row.len() != table.columns.len() {
                bail!(
                    "schema drift on {}: {} cells for {} columns",
                    table.name,
                    row.len(),
                    table.columns.len()
                );
            }
            for (column, item) in table.columns.iter().zip(row) {
                pivot.insert(column.pivot_key(), item.clone());
            }
            really_used.push(table);
        }
        Ok((pivot, really_used))
    }

    /// A random subset of the cached tables, at most four to bound join
    /// depth.
    fn rand_tables(&mut self) -> Vec<Table> {
        let mut tables = self.executor.get_tables();
        if tables.is_empty() {
            return tables;
        }
        let mut count = 1;
        if tables.len() > 1 {
            count = self.rng.random_range(0..tables.len() - 1) + 1;
            if count > 4 {
                count = self.rng.random_range(0..4) + 1;
            }
        }
        tables.shuffle(&mut self.rng);
        tables.truncate(count);
        tables
    }

    /// Drop and rebuild the whole database under the exclusive lock, then
    /// repopulate it.
    fn refresh_database(&mut self) -> Result<()> {
        let lock = self.in_write.clone();
        let _exclusive = lock.write();
        tracing::debug!("refresh database");

        let db = self.conf.db_name.clone();
        // dropping a database that does not exist yet is fine
        let _ = self.executor.exec(&format!("drop database if exists {db}"));
        self.executor.exec(&format!("create database {db}"))?;
        self.executor.exec(&format!("use {db}"))?;

        self.create_schema()?;
        self.populate_data()?;
        if self.conf.enable_expr_index {
            self.add_expr_indexes();
            self.executor.load_schema()?;
        }
        Ok(())
    }

    /// Create one table per column-type tuple, in parallel, then index a
    /// few of them. Individual DDL failures are logged and tolerated: the
    /// loop proceeds with whatever tables were created.
    fn create_schema(&mut self) -> Result<()> {
        let tuples = compose_all_column_types(-1, &ColumnTypeKind::ALL);
        // pre-generate every statement so the workers only execute
        let stmts: Vec<String> = tuples
            .iter()
            .enumerate()
            .map(|(index, kinds)| self.executor.generate_ddl_create_table(index, kinds))
            .collect();

        let conn = self.executor.conn().clone();
        std::thread::scope(|scope| {
            let handles: Vec<_> = stmts
                .iter()
                .map(|sql| {
                    let conn = conn.clone();
                    scope.spawn(move || {
                        if let Err(e) = conn.exec(sql) {
                            tracing::error!(error = ?e, sql = %sql, "create table failed");
                        }
                    })
                })
                .collect();
            for handle in handles {
                let _ = handle.join();
            }
        });

        self.executor.reload_schema()?;

        for _ in 0..self.rng.random_range(0..10) {
            match self.executor.generate_ddl_create_index(&mut self.rng) {
                Ok(sql) => {
                    if let Err(e) = self.executor.exec(&sql) {
                        tracing::error!(error = ?e, sql = %sql, "create index failed");
                    }
                }
                Err(e) => tracing::error!(error = ?e, "create index generation failed"),
            }
        }

        self.executor.load_schema()
    }

    /// Populate every table inside one explicit transaction: an INSERT, a
    /// few random UPDATE/DELETE statements, and a re-INSERT when the table
    /// ended up empty.
    fn populate_data(&mut self) -> Result<()> {
        if let Err(e) = self.executor.conn().begin() {
            tracing::error!(error = ?e, "begin populate txn failed");
            return Ok(());
        }
        for table in self.executor.get_tables() {
            self.insert_once(&table);

            for _ in 0..self.rng.random_range(0..4) {
                let tables = self.rand_tables();
                if tables.is_empty() {
                    bail!("no tables to mutate during populate");
                }
                let dml = if self.rng.random_bool(0.5) {
                    self.generator
                        .delete_stmt(&mut self.rng, &tables, &table)
                        .map(|s| s.to_string())
                } else {
                    self.generator
                        .update_stmt(&mut self.rng, &tables, &table)
                        .map(|s| s.to_string())
                };
                match dml {
                    Ok(sql) => {
                        tracing::info!(table = %table.name, sql = %sql, "update/delete");
                        // a failing mutation here means the generator or
                        // driver is broken; there is no point continuing
                        self.executor
                            .exec(&sql)
                            .with_context(|| format!("mutate {}", table.name))?;
                    }
                    Err(e) => {
                        tracing::error!(error = ?e, table = %table.name, "dml generation failed");
                    }
                }
            }

            let count_sql = format!("select count(*) from {}", table.name);
            let rows = self
                .executor
                .select(&count_sql)
                .with_context(|| format!("count rows of {}", table.name))?;
            let count: u64 = rows
                .first()
                .and_then(|r| r.first())
                .and_then(|item| item.val.parse().ok())
                .unwrap_or(0);
            tracing::debug!(table = %table.name, count, "populate row count");
            if count == 0 {
                tracing::info!(table = %table.name, "table is empty after DELETE");
                self.insert_once(&table);
            }
        }
        if let Err(e) = self.executor.conn().commit() {
            tracing::error!(error = ?e, "commit populate txn failed");
        }
        Ok(())
    }

    fn insert_once(&mut self, table: &Table) {
        match self
            .executor
            .generate_dml_insert_by_table(&mut self.rng, table.name.as_str())
        {
            Ok(sql) => {
                if let Err(e) = self.executor.exec(&sql) {
                    tracing::error!(error = ?e, sql = %sql, "insert data failed");
                }
            }
            Err(e) => tracing::error!(error = ?e, table = %table.name, "insert generation failed"),
        }
    }

    /// Add a handful of expression indexes over the freshly populated
    /// tables.
    fn add_expr_indexes(&mut self) {
        for _ in 0..self.rng.random_range(0..10) + 1 {
            let Some(stmt) = self.create_expression_index() else {
                continue;
            };
            let sql = stmt.to_string();
            if let Err(e) = self.executor.exec(&sql) {
                tracing::error!(error = ?e, sql = %sql, "create expression index failed");
                continue;
            }
            tracing::info!(sql = %sql, "added expression index");
        }
    }

    /// Build one CREATE INDEX whose key parts are parenthesized predicate
    /// expressions. Single-column varchar tables are excluded (expressions
    /// over them mix string and numeric operands in ways the engines
    /// reject), and auto-increment columns are removed from the referenced
    /// pool via a filtered copy of the table.
    fn create_expression_index(&mut self) -> Option<CreateIndexStmt> {
        let tables: Vec<Table> = self
            .executor
            .get_tables()
            .into_iter()
            .filter(|t| t.kind == TableKind::BaseTable)
            .collect();
        if tables.is_empty() {
            return None;
        }
        let table = &tables[self.rng.random_range(0..tables.len())];
        if table.name.eq_str("table_varchar") {
            return None;
        }
        let filtered = table.without_auto_increment();
        if filtered.columns.is_empty() {
            return None;
        }

        let mut keys = Vec::new();
        for _ in 0..self.rng.random_range(0..3) + 1 {
            let mut ctx = GenCtx::new(vec![filtered.clone()], None);
            ctx.is_in_expr_index = true;
            ctx.enable_left_right_join = false;
            keys.push(IndexKey::Expr(self.generator.condition_clause(
                &mut self.rng,
                &ctx,
                1,
            )));
        }
        Some(CreateIndexStmt {
            index_name: format!("idx_{}", rand_ident(&mut self.rng, 5)),
            table: table.name.clone(),
            keys,
        })
    }
}
