use std::time::Duration;

use ingesta::{CancelToken, DataType, IngestError, RefreshMode, RefreshStatus};
use ingesta_mock::{DynamicMockProvider, MockBehavior};

use crate::helpers::{AAPL, MSFT, TSLA, client, harness, harness_with, prices, test_config};

#[tokio::test]
async fn cancelled_token_leaves_every_unit_pending() {
    let (raw, ctl) = DynamicMockProvider::new_with_controller("alpha");
    ctl.returns(DataType::PriceHistorical, AAPL, prices(AAPL, 3))
        .await;
    let h = harness(vec![client(raw, 0)]);
    let token = CancelToken::new();
    token.cancel();

    let batch = h
        .manager
        .refresh_batch_with_cancel(
            [AAPL, MSFT],
            &[DataType::PriceHistorical, DataType::News],
            RefreshMode::OnDemand,
            false,
            &token,
        )
        .await;

    assert!(batch.cancelled);
    assert_eq!(batch.totals.requested, 4);
    assert_eq!(batch.totals.pending, 4);
    let r = batch.result(AAPL, DataType::News).unwrap();
    assert!(matches!(r.error, Some(IngestError::Cancelled(_))));
    assert_eq!(ctl.total_calls().await, 0);
}

#[tokio::test(start_paused = true)]
async fn cancelling_mid_batch_lets_running_units_finish() {
    let (raw, ctl) = DynamicMockProvider::new_with_controller("alpha");
    ctl.set_behavior(
        DataType::PriceHistorical,
        AAPL,
        MockBehavior::Delay(Duration::from_secs(2), prices(AAPL, 3)),
    )
    .await;
    let mut cfg = test_config();
    cfg.max_concurrent_symbols = 1;
    let h = harness_with(vec![client(raw, 0)], cfg, None);
    let token = CancelToken::new();

    let (batch, ()) = tokio::join!(
        h.manager.refresh_batch_with_cancel(
            [AAPL, MSFT],
            &[DataType::PriceHistorical, DataType::News],
            RefreshMode::OnDemand,
            false,
            &token,
        ),
        async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            token.cancel();
        }
    );

    assert!(batch.cancelled);
    assert_eq!(
        batch.result(AAPL, DataType::PriceHistorical).unwrap().status,
        RefreshStatus::Success
    );
    assert_eq!(
        batch.result(AAPL, DataType::News).unwrap().status,
        RefreshStatus::Pending
    );
    assert_eq!(batch.symbol(MSFT).unwrap().totals.pending, 2);
    assert_eq!(ctl.total_calls().await, 1);
}

#[tokio::test(start_paused = true)]
async fn batch_timeout_stops_starting_new_units() {
    let (raw, ctl) = DynamicMockProvider::new_with_controller("alpha");
    ctl.set_behavior(
        DataType::PriceHistorical,
        AAPL,
        MockBehavior::Delay(Duration::from_secs(2), prices(AAPL, 3)),
    )
    .await;
    let mut cfg = test_config();
    cfg.max_concurrent_symbols = 1;
    cfg.batch_timeout = Some(Duration::from_secs(1));
    let h = harness_with(vec![client(raw, 0)], cfg, None);

    let batch = h
        .manager
        .refresh_batch(
            [AAPL, MSFT, TSLA],
            &[DataType::PriceHistorical],
            RefreshMode::OnDemand,
            false,
        )
        .await;

    assert!(batch.cancelled);
    assert_eq!(batch.totals.successful, 1);
    assert_eq!(batch.totals.pending, 2);
    assert_eq!(batch.symbols.len(), 3);
    assert!(h.manager.dead_letters().is_empty());
}

#[tokio::test(start_paused = true)]
async fn batch_timeout_stops_retries_of_a_running_unit() {
    let (raw, ctl) = DynamicMockProvider::new_with_controller("alpha");
    ctl.fails(DataType::PriceHistorical, AAPL, IngestError::request("x", "503"))
        .await;
    let mut cfg = test_config();
    cfg.max_concurrent_symbols = 1;
    cfg.data_fetch_retry_delay = Duration::from_secs(10);
    cfg.retry_max_delay = Duration::from_secs(60);
    cfg.batch_timeout = Some(Duration::from_secs(5));
    let h = harness_with(vec![client(raw, 0)], cfg, None);

    let batch = h
        .manager
        .refresh_batch(
            [AAPL, MSFT],
            &[DataType::PriceHistorical],
            RefreshMode::OnDemand,
            false,
        )
        .await;

    let r = batch.result(AAPL, DataType::PriceHistorical).unwrap();
    assert_eq!(r.status, RefreshStatus::Failed);
    assert!(matches!(r.error, Some(IngestError::Cancelled(_))), "{:?}", r.error);
    assert_eq!(ctl.call_count(DataType::PriceHistorical, AAPL).await, 1);
    assert_eq!(
        batch.result(MSFT, DataType::PriceHistorical).unwrap().status,
        RefreshStatus::Pending
    );
    assert!(batch.cancelled);
    assert!(h.manager.dead_letters().is_empty());
}
