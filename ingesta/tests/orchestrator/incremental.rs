use ingesta::{BarInterval, DataType, FetchParams, Payload, RefreshMode};
use ingesta_mock::{DynamicMockProvider, fixtures};

use crate::helpers::{AAPL, client, harness, now, prices};

#[tokio::test]
async fn first_refresh_fetches_the_whole_lookback_window() {
    let (raw, ctl) = DynamicMockProvider::new_with_controller("alpha");
    ctl.returns(DataType::PriceHistorical, AAPL, prices(AAPL, 3))
        .await;
    let h = harness(vec![client(raw, 0)]);

    h.manager
        .refresh_batch([AAPL], &[DataType::PriceHistorical], RefreshMode::OnDemand, false)
        .await;

    let calls = ctl.calls().await;
    assert_eq!(calls.len(), 1);
    let p = &calls[0].params;
    assert_eq!(p.start, Some(now() - chrono::Duration::days(365)));
    assert_eq!(p.end, None);
    assert_eq!(p.interval, BarInterval::D1);
}

#[tokio::test]
async fn later_refreshes_resume_one_day_before_the_last() {
    let (raw, ctl) = DynamicMockProvider::new_with_controller("alpha");
    ctl.returns(DataType::PriceHistorical, AAPL, prices(AAPL, 3))
        .await;
    let h = harness(vec![client(raw, 0)]);
    let last = now() - chrono::Duration::days(3);
    h.store
        .set_last_updated(AAPL, DataType::PriceHistorical, last)
        .await;

    h.manager
        .refresh_batch([AAPL], &[DataType::PriceHistorical], RefreshMode::OnDemand, false)
        .await;

    let calls = ctl.calls().await;
    assert_eq!(calls[0].params.start, Some(last - chrono::Duration::days(1)));
}

#[tokio::test]
async fn stale_history_is_bounded_by_the_lookback() {
    let (raw, ctl) = DynamicMockProvider::new_with_controller("alpha");
    ctl.returns(DataType::PriceHistorical, AAPL, prices(AAPL, 3))
        .await;
    let h = harness(vec![client(raw, 0)]);
    h.store
        .set_last_updated(
            AAPL,
            DataType::PriceHistorical,
            now() - chrono::Duration::days(800),
        )
        .await;

    h.manager
        .refresh_batch([AAPL], &[DataType::PriceHistorical], RefreshMode::OnDemand, false)
        .await;

    assert_eq!(
        ctl.calls().await[0].params.start,
        Some(now() - chrono::Duration::days(365))
    );
}

#[tokio::test]
async fn intraday_uses_an_hour_of_overlap_and_five_minute_bars() {
    let (raw, ctl) = DynamicMockProvider::new_with_controller("alpha");
    let start = now() - chrono::Duration::hours(3);
    ctl.returns(
        DataType::PriceIntraday,
        AAPL,
        Payload::Prices(fixtures::intraday_bars(AAPL, start, 3)),
    )
    .await;
    let h = harness(vec![client(raw, 0)]);
    let last = now() - chrono::Duration::minutes(30);
    h.store
        .set_last_updated(AAPL, DataType::PriceIntraday, last)
        .await;

    h.manager
        .refresh_batch([AAPL], &[DataType::PriceIntraday], RefreshMode::Live, false)
        .await;

    let calls = ctl.calls().await;
    assert_eq!(calls.len(), 1, "live fallback period has elapsed");
    assert_eq!(calls[0].params.start, Some(last - chrono::Duration::hours(1)));
    assert_eq!(calls[0].params.interval, BarInterval::M5);
}

#[tokio::test]
async fn snapshot_types_fetch_without_a_range() {
    let (raw, ctl) = DynamicMockProvider::new_with_controller("alpha");
    ctl.returns(
        DataType::Fundamentals,
        AAPL,
        Payload::Fundamentals(vec![fixtures::fundamentals(AAPL, "2025-03-31")]),
    )
    .await;
    let h = harness(vec![client(raw, 0)]);

    h.manager
        .refresh_batch([AAPL], &[DataType::Fundamentals], RefreshMode::OnDemand, false)
        .await;

    assert_eq!(ctl.calls().await[0].params, FetchParams::default());
}
