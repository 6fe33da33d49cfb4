use std::sync::Arc;

use ingesta::{DataStore, DataType, IdempotentDataSaver, IngestError, Payload, PriceBar};
use ingesta_mock::{MemoryStore, fixtures};

use crate::helpers::AAPL;

fn rows(bars: Vec<PriceBar>) -> Vec<ingesta::StoredRow> {
    Payload::Prices(bars)
        .to_rows(DataType::PriceHistorical, "alpha")
        .unwrap()
}

#[tokio::test]
async fn duplicate_keys_collapse_to_the_last_occurrence() {
    let store = Arc::new(MemoryStore::new());
    let saver = IdempotentDataSaver::new(store.clone());
    let ts = fixtures::day("2025-01-06");
    let first = fixtures::bar(AAPL, ts, 10, 12, 9, 11);
    let revised = fixtures::bar(AAPL, ts, 10, 13, 9, 12);

    let report = saver
        .upsert(DataType::PriceHistorical, rows(vec![first, revised.clone()]))
        .await;
    assert_eq!(report.inserted, 1);
    assert_eq!(report.submitted(), 1);

    let stored = store
        .rows(DataType::PriceHistorical, AAPL, None, None)
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].decode::<PriceBar>().unwrap(), revised);
}

#[tokio::test]
async fn changed_content_is_an_update() {
    let store = Arc::new(MemoryStore::new());
    let saver = IdempotentDataSaver::new(store.clone());
    let ts = fixtures::day("2025-01-06");

    saver
        .upsert(
            DataType::PriceHistorical,
            rows(vec![fixtures::bar(AAPL, ts, 10, 12, 9, 11)]),
        )
        .await;
    let report = saver
        .upsert(
            DataType::PriceHistorical,
            rows(vec![fixtures::bar(AAPL, ts, 10, 12, 9, 10)]),
        )
        .await;
    assert_eq!(report.updated, 1);
    assert_eq!(report.rows_affected(), 1);
    assert_eq!(store.table_len(DataType::PriceHistorical).await, 1);
}

#[tokio::test]
async fn one_failing_row_does_not_block_the_rest() {
    let store = Arc::new(MemoryStore::new());
    let saver = IdempotentDataSaver::new(store.clone());
    let bars = fixtures::daily_bars(AAPL, "2025-01-06", 4);
    store
        .fail_row(DataType::PriceHistorical, AAPL, bars[1].ts)
        .await;

    let report = saver.upsert(DataType::PriceHistorical, rows(bars.clone())).await;
    assert_eq!(report.inserted, 3);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0.ts, bars[1].ts);
    assert!(matches!(report.failed[0].1, IngestError::Storage(_)));
    assert_eq!(store.table_len(DataType::PriceHistorical).await, 3);
}

#[tokio::test]
async fn rows_of_another_type_are_refused() {
    let store = Arc::new(MemoryStore::new());
    let saver = IdempotentDataSaver::new(store.clone());

    let report = saver
        .upsert(
            DataType::PriceIntraday,
            rows(fixtures::daily_bars(AAPL, "2025-01-06", 2)),
        )
        .await;
    assert_eq!(report.failed.len(), 2);
    assert!(matches!(report.failed[0].1, IngestError::InvalidArg(_)));
    assert_eq!(store.write_count().await, 0);
}
