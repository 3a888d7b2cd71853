//! sqlprobe: an automated correctness fuzzer for SQL query engines.
//!
//! The fuzzer connects to a live database under test, synthesizes a schema
//! and random data, generates randomized SELECT queries and checks the
//! returned result sets with three independent oracles: Pivoted Query
//! Synthesis, a non-optimizing rewrite comparison (NoREC) and Ternary
//! Logic Partitioning (TLP). Oracle disagreements are reported as
//! candidate correctness bugs.

pub mod config;
pub mod conn;
pub mod executor;
pub mod knownbugs;
pub mod oracle;
pub mod report;
pub mod runner;

pub use config::Config;
pub use conn::{Connection, MysqlConn, SchemaRecord};
pub use runner::{CancelToken, Fuzzer, BATCH_SIZE};
