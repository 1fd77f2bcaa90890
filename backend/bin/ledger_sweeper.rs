use party_match::{
    db::{get_db_pool, DatabaseConfig, PgDocumentStore},
    services::{Executor, SwipeLedger},
    utils::{init_logging, config::Config},
};
use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::{error, info};

/// Periodically prunes stale swipe ledgers.
#[derive(Debug, Parser)]
#[command(name = "ledger_sweeper")]
struct Args {
    /// Sweep once and exit
    #[arg(long)]
    once: bool,

    /// Override LEDGER_RETENTION_DAYS
    #[arg(long)]
    retention_days: Option<i64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();

    info!("🧹 Starting ledger sweeper...");

    // Load config and connect to database
    let config = Config::from_env()?;
    let db_config = DatabaseConfig::from_env()?;
    let pool = get_db_pool(&db_config).await?;

    let executor = Executor::with_max_attempts(
        Arc::new(PgDocumentStore::new(pool)),
        config.tx_max_attempts,
    );
    let ledger = SwipeLedger::new(executor);
    let retention = chrono::Duration::days(args.retention_days.unwrap_or(config.ledger_retention_days));

    if args.once {
        let report = ledger.sweep(retention, Utc::now()).await?;
        info!(
            "Sweep finished: {} entries scanned, {} swipes pruned, {} entries expired, {} resolutions expired, {} receipts expired",
            report.entries_scanned,
            report.swipes_pruned,
            report.entries_expired,
            report.resolutions_expired,
            report.receipts_expired
        );
        return Ok(());
    }

    run_sweeper(ledger, retention, Duration::from_secs(config.sweep_interval_secs)).await
}

async fn run_sweeper(ledger: SwipeLedger, retention: chrono::Duration, period: Duration) -> Result<()> {
    let mut interval = time::interval(period);
    let mut iter_count: usize = 0;

    loop {
        interval.tick().await;
        iter_count += 1;

        match ledger.sweep(retention, Utc::now()).await {
            Ok(report) => info!(
                "🔍 Sweep {} | scanned: {} | pruned swipes: {} | expired entries: {} | expired resolutions: {} | expired receipts: {}",
                iter_count,
                report.entries_scanned,
                report.swipes_pruned,
                report.entries_expired,
                report.resolutions_expired,
                report.receipts_expired
            ),
            Err(e) => error!("❌ Ledger sweep {} failed: {}", iter_count, e),
        }
    }
}
