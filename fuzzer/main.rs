//! Command-line entry point.

use std::io::{stdin, IsTerminal};
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use sqlprobe::{CancelToken, Config, Fuzzer};

/// Correctness fuzzer for SQL query engines.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Connection URL of the database under test.
    #[arg(long, default_value = "mysql://root@127.0.0.1:3306/")]
    dsn: String,

    /// Scratch database owned by the fuzzer; dropped and recreated every
    /// batch.
    #[arg(long, default_value = "test")]
    db: String,

    /// Log filter directive (tracing syntax).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Maximum AST recursion depth for query generation.
    #[arg(long, default_value_t = 2)]
    depth: usize,

    /// PQS-only prefix rounds per batch; bounds the views seeded per
    /// batch.
    #[arg(long, default_value_t = 5)]
    view_count: usize,

    /// Log mismatches instead of aborting.
    #[arg(long)]
    silent: bool,

    /// Allow optimizer hints in generated queries.
    #[arg(long)]
    enable_hint: bool,

    /// Add expression indexes during schema refresh.
    #[arg(long)]
    enable_expr_index: bool,

    /// Disable the PQS oracle outside the seeding prefix.
    #[arg(long)]
    disable_pqs: bool,

    /// Disable the NoREC oracle.
    #[arg(long)]
    disable_norec: bool,

    /// Disable the TLP oracle.
    #[arg(long)]
    disable_tlp: bool,

    /// RNG seed; a fresh one is drawn when omitted.
    #[arg(long)]
    seed: Option<u64>,

    /// Stop after this many rounds.
    #[arg(long)]
    max_rounds: Option<u64>,

    /// Stop after this many seconds.
    #[arg(long)]
    duration: Option<u64>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut subscriber = tracing_subscriber::fmt().with_env_filter(
        tracing_subscriber::EnvFilter::try_new(&args.log_level)
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    );
    if !stdin().is_terminal() {
        subscriber = subscriber.with_ansi(false);
    }
    subscriber.init();

    let config = Config {
        dsn: args.dsn,
        db_name: args.db,
        log_level: args.log_level,
        depth: args.depth,
        view_count: args.view_count,
        enable_hint: args.enable_hint,
        enable_expr_index: args.enable_expr_index,
        enable_pqs: !args.disable_pqs,
        enable_norec: !args.disable_norec,
        enable_tlp: !args.disable_tlp,
        silent: args.silent,
        seed: args.seed,
        max_rounds: args.max_rounds,
    };
    tracing::info!(?config, "starting sqlprobe");

    let token = CancelToken::new();
    let handler_token = token.clone();
    ctrlc::set_handler(move || {
        tracing::info!("interrupt received, finishing the current round");
        handler_token.cancel();
    })?;

    if let Some(secs) = args.duration {
        let timer_token = token.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_secs(secs));
            tracing::info!(secs, "run duration elapsed, stopping");
            timer_token.cancel();
        });
    }

    let mut fuzzer = Fuzzer::new(config)?;
    fuzzer.start(&token);
    Ok(())
}
