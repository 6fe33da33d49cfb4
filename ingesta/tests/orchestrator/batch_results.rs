use ingesta::{DataStore, DataType, IngestError, Payload, RefreshMode, RefreshStatus};
use ingesta_mock::{DynamicMockProvider, fixtures};

use crate::helpers::{AAPL, MSFT, client, harness, now, prices};

#[tokio::test]
async fn every_requested_pair_gets_exactly_one_result() {
    let (raw, ctl) = DynamicMockProvider::new_with_controller("alpha");
    ctl.returns(DataType::PriceHistorical, AAPL, prices(AAPL, 5))
        .await;
    ctl.returns(DataType::News, AAPL, Payload::News(vec![])).await;
    let h = harness(vec![client(raw, 0)]);

    let types = [
        DataType::News,
        DataType::PriceHistorical,
        DataType::Fundamentals,
        DataType::News,
    ];
    let batch = h
        .manager
        .refresh_batch([AAPL, MSFT, AAPL], &types, RefreshMode::OnDemand, false)
        .await;

    let symbols: Vec<&str> = batch.symbols.iter().map(|s| s.symbol.as_str()).collect();
    assert_eq!(symbols, vec![AAPL, MSFT]);
    for s in &batch.symbols {
        assert_eq!(s.results.len(), 3, "{}", s.symbol);
    }
    assert_eq!(batch.totals.requested, 6);
    assert_eq!(
        batch.totals.successful + batch.totals.failed + batch.totals.skipped,
        6
    );
    assert_eq!(batch.totals.pending, 0);
    assert!(!batch.cancelled);
}

#[tokio::test]
async fn failures_stay_inside_their_unit() {
    let (raw, ctl) = DynamicMockProvider::new_with_controller("alpha");
    ctl.returns(DataType::PriceHistorical, AAPL, prices(AAPL, 5))
        .await;
    let h = harness(vec![client(raw, 0)]);

    let batch = h
        .manager
        .refresh_batch(
            [AAPL, MSFT],
            &[DataType::PriceHistorical, DataType::Earnings],
            RefreshMode::OnDemand,
            false,
        )
        .await;

    let ok = batch.result(AAPL, DataType::PriceHistorical).unwrap();
    assert_eq!(ok.status, RefreshStatus::Success);
    assert_eq!(ok.rows_affected, 5);
    assert_eq!(ok.provider.as_deref(), Some("alpha"));

    let missing = batch.result(MSFT, DataType::PriceHistorical).unwrap();
    assert_eq!(missing.status, RefreshStatus::Failed);
    let Some(IngestError::AllProvidersFailed(inner)) = &missing.error else {
        panic!("unexpected error: {:?}", missing.error);
    };
    assert!(matches!(
        inner.as_slice(),
        [IngestError::ProviderParse { provider, .. }] if provider == "alpha"
    ));
    assert_eq!(
        batch.result(AAPL, DataType::Earnings).unwrap().status,
        RefreshStatus::Failed
    );
    assert!(h.manager.dead_letters().is_empty());
}

#[tokio::test]
async fn fresh_data_is_skipped_unless_forced() {
    let (raw, ctl) = DynamicMockProvider::new_with_controller("alpha");
    ctl.returns(DataType::PriceHistorical, AAPL, prices(AAPL, 5))
        .await;
    let h = harness(vec![client(raw, 0)]);
    h.store
        .set_last_updated(
            AAPL,
            DataType::PriceHistorical,
            now() - chrono::Duration::minutes(1),
        )
        .await;

    let batch = h
        .manager
        .refresh_batch([AAPL], &[DataType::PriceHistorical], RefreshMode::OnDemand, false)
        .await;
    let r = batch.result(AAPL, DataType::PriceHistorical).unwrap();
    assert_eq!(r.status, RefreshStatus::Skipped);
    assert!(r.error.is_none());
    assert_eq!(ctl.total_calls().await, 0);

    let forced = h
        .manager
        .refresh_batch([AAPL], &[DataType::PriceHistorical], RefreshMode::OnDemand, true)
        .await;
    assert_eq!(
        forced.result(AAPL, DataType::PriceHistorical).unwrap().status,
        RefreshStatus::Success
    );
    assert_eq!(ctl.total_calls().await, 1);
}

#[tokio::test(start_paused = true)]
async fn empty_fetch_with_nothing_stored_fails_and_is_not_marked_fresh() {
    let (raw, ctl) = DynamicMockProvider::new_with_controller("alpha");
    ctl.returns(DataType::News, AAPL, Payload::News(vec![])).await;
    let h = harness(vec![client(raw, 0)]);

    let batch = h
        .manager
        .refresh_batch([AAPL], &[DataType::News], RefreshMode::Periodic, false)
        .await;
    let r = batch.result(AAPL, DataType::News).unwrap();
    assert_eq!(r.status, RefreshStatus::Failed);
    assert_eq!(r.rows_affected, 0);
    let Some(IngestError::RetriesExhausted { attempts }) = &r.error else {
        panic!("unexpected error: {:?}", r.error);
    };
    assert_eq!(attempts.len(), 3);
    assert!(attempts.iter().all(|e| matches!(
        e,
        IngestError::GateFailure { gate, retryable: true, .. } if gate == "ingestion"
    )));
    assert_eq!(h.store.last_updated(AAPL, DataType::News).await.unwrap(), None);
    assert_eq!(ctl.total_calls().await, 3);

    let again = h
        .manager
        .refresh_batch([AAPL], &[DataType::News], RefreshMode::Periodic, false)
        .await;
    let r = again.result(AAPL, DataType::News).unwrap();
    assert_eq!(r.status, RefreshStatus::Failed);
    assert_eq!(ctl.total_calls().await, 6);
}

#[tokio::test]
async fn empty_fetch_over_stored_rows_is_success_with_zero_rows() {
    let (raw, ctl) = DynamicMockProvider::new_with_controller("alpha");
    ctl.returns(
        DataType::News,
        AAPL,
        Payload::News(fixtures::news(AAPL, now() - chrono::Duration::hours(2), 2)),
    )
    .await;
    let h = harness(vec![client(raw, 0)]);
    h.manager
        .refresh_batch([AAPL], &[DataType::News], RefreshMode::OnDemand, true)
        .await;
    ctl.returns(DataType::News, AAPL, Payload::News(vec![])).await;
    h.clock.advance(chrono::Duration::minutes(10));

    let batch = h
        .manager
        .refresh_batch([AAPL], &[DataType::News], RefreshMode::OnDemand, true)
        .await;
    let r = batch.result(AAPL, DataType::News).unwrap();
    assert_eq!(r.status, RefreshStatus::Success);
    assert_eq!(r.rows_affected, 0);
    let marked = h.store.last_updated(AAPL, DataType::News).await.unwrap();
    assert_eq!(marked, Some(now() + chrono::Duration::minutes(10)));
    assert_eq!(h.store.table_len(DataType::News).await, 2);
}

#[tokio::test]
async fn fully_rejected_payload_is_failed_not_skipped() {
    let (raw, ctl) = DynamicMockProvider::new_with_controller("alpha");
    // Rows for another symbol fail validation.
    ctl.returns(DataType::PriceHistorical, AAPL, prices(MSFT, 4))
        .await;
    let h = harness(vec![client(raw, 0)]);

    let batch = h
        .manager
        .refresh_batch([AAPL], &[DataType::PriceHistorical], RefreshMode::OnDemand, false)
        .await;
    let r = batch.result(AAPL, DataType::PriceHistorical).unwrap();
    assert_eq!(r.status, RefreshStatus::Failed);
    assert!(matches!(r.error, Some(IngestError::Validation(_))));
    assert_eq!(h.store.table_len(DataType::PriceHistorical).await, 0);
    assert_eq!(ctl.total_calls().await, 1);
}

#[tokio::test]
async fn repeated_refresh_is_idempotent() {
    let (raw, ctl) = DynamicMockProvider::new_with_controller("alpha");
    ctl.returns(DataType::PriceHistorical, AAPL, prices(AAPL, 8))
        .await;
    let h = harness(vec![client(raw, 0)]);

    let first = h
        .manager
        .refresh_batch([AAPL], &[DataType::PriceHistorical], RefreshMode::OnDemand, true)
        .await;
    assert_eq!(
        first.result(AAPL, DataType::PriceHistorical).unwrap().rows_affected,
        8
    );
    let writes = h.store.write_count().await;

    let second = h
        .manager
        .refresh_batch([AAPL], &[DataType::PriceHistorical], RefreshMode::OnDemand, true)
        .await;
    let r = second.result(AAPL, DataType::PriceHistorical).unwrap();
    assert_eq!(r.status, RefreshStatus::Success);
    assert_eq!(r.rows_affected, 0);
    assert_eq!(h.store.table_len(DataType::PriceHistorical).await, 8);
    assert_eq!(h.store.write_count().await, writes);
}
