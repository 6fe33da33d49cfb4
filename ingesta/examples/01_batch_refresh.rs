use std::sync::Arc;
use std::time::Duration;

use ingesta::{
    DataRefreshManager, DataType, DeadLetterFilter, ProviderRegistry, RefreshConfig, RefreshMode,
};
use ingesta_mock::{ManualClock, MemoryStore, MockProvider, SmaIndicators, fixtures};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // RUST_LOG=ingesta=debug shows per-provider decisions.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ingesta=info")),
        )
        .init();

    // 1. Short retries so the failing symbol settles quickly.
    let config = RefreshConfig {
        data_fetch_retry_attempts: 2,
        data_fetch_retry_delay: Duration::from_millis(50),
        retry_max_delay: Duration::from_millis(200),
        ..RefreshConfig::default()
    };

    // 2. Register the fixture-backed provider with the configured limits.
    let registry = ProviderRegistry::builder()
        .with_configured_provider(Arc::new(MockProvider::new()), &config)
        .build()?;

    // 3. Wire the manager. The clock sits just after the fixture data.
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(fixtures::day("2025-04-01")));
    let manager = DataRefreshManager::builder()
        .config(config)
        .registry(registry)
        .store(store.clone())
        .clock(clock.clone())
        .indicators(Arc::new(SmaIndicators::default()))
        .build()?;

    // 4. Refresh three symbols; "FAIL" always errors at the provider.
    let types = [
        DataType::PriceHistorical,
        DataType::TechnicalIndicators,
        DataType::Fundamentals,
        DataType::News,
    ];
    let batch = manager
        .refresh_batch(["AAPL", "MSFT", "FAIL"], &types, RefreshMode::OnDemand, false)
        .await;
    for symbol in &batch.symbols {
        for (data_type, r) in &symbol.results {
            println!(
                "{:<5} {:<21} {:<8} rows={:<3} {}",
                symbol.symbol,
                data_type.to_string(),
                format!("{:?}", r.status),
                r.rows_affected,
                r.message
            );
        }
    }
    println!(
        "first pass: {} ok, {} failed, {} dead-lettered",
        batch.totals.successful, batch.totals.failed, batch.dead_lettered
    );
    println!(
        "stored: {} bars, {} indicator points",
        store.table_len(DataType::PriceHistorical).await,
        store.table_len(DataType::TechnicalIndicators).await
    );

    // 5. A minute later everything that succeeded is still fresh.
    clock.advance(chrono::Duration::minutes(1));
    let again = manager
        .refresh_batch(["AAPL", "MSFT"], &types, RefreshMode::OnDemand, false)
        .await;
    println!("second pass: {} skipped as fresh", again.totals.skipped);

    // 6. Inspect the dead-letter queue.
    for entry in manager.dead_letters().list(&DeadLetterFilter::default()) {
        println!(
            "dead letter #{}: {} {} ({} stage): {}",
            entry.id, entry.symbol, entry.data_type, entry.stage, entry.failure_reason
        );
    }
    Ok(())
}
