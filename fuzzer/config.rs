//! Fuzzer configuration.

use anyhow::{ensure, Result};

/// Everything the orchestrator needs to know, normally populated from the
/// command line.
#[derive(Debug, Clone)]
pub struct Config {
    /// Connection URL of the database under test.
    pub dsn: String,
    /// The scratch database the fuzzer owns; dropped and recreated at the
    /// start of every batch.
    pub db_name: String,
    /// Log filter directive for the subscriber.
    pub log_level: String,
    /// Maximum AST recursion depth for query generation.
    pub depth: usize,
    /// Number of PQS-only rounds at the start of each batch; also bounds
    /// the number of views seeded per batch.
    pub view_count: usize,
    /// Allow optimizer hints on generated selects.
    pub enable_hint: bool,
    /// Add expression indexes during schema refresh.
    pub enable_expr_index: bool,
    pub enable_pqs: bool,
    pub enable_norec: bool,
    pub enable_tlp: bool,
    /// Log mismatches instead of aborting.
    pub silent: bool,
    /// RNG seed; a fresh one is drawn when absent.
    pub seed: Option<u64>,
    /// Stop after this many rounds; run until cancelled when absent.
    pub max_rounds: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            dsn: "mysql://root@127.0.0.1:3306/".into(),
            db_name: "test".into(),
            log_level: "info".into(),
            depth: 2,
            view_count: 5,
            enable_hint: false,
            enable_expr_index: false,
            enable_pqs: true,
            enable_norec: true,
            enable_tlp: true,
            silent: false,
            seed: None,
            max_rounds: None,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.db_name.is_empty(), "db_name must not be empty");
        ensure!(
            self.enable_pqs || self.enable_norec || self.enable_tlp,
            "at least one testing approach must be enabled"
        );
        Ok(())
    }
}
