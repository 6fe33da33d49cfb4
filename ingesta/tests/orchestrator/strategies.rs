use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use ingesta::{
    DataType, Payload, RefreshConfig, RefreshMode, RefreshRequest, RefreshStatus,
    RefreshStrategy, StalenessQuery, StrategySet,
};
use ingesta_mock::{DynamicMockProvider, fixtures};

use crate::helpers::{AAPL, MSFT, client, harness, harness_with, now, test_config};

const MODES: [RefreshMode; 4] = [
    RefreshMode::Scheduled,
    RefreshMode::OnDemand,
    RefreshMode::Periodic,
    RefreshMode::Live,
];

fn query(last: Option<DateTime<Utc>>, at: DateTime<Utc>) -> StalenessQuery<'static> {
    StalenessQuery {
        symbol: AAPL,
        data_type: DataType::PriceHistorical,
        last_updated: last,
        now: at,
        force: false,
    }
}

fn utc(y: i32, m: u32, d: u32, hh: u32, mm: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, hh, mm, 0).unwrap()
}

#[test]
fn aapl_without_prior_data_refreshes_under_every_strategy() {
    let set = StrategySet::from_config(&RefreshConfig::default()).unwrap();
    // Sunday afternoon: outside any scheduled window.
    for at in [utc(2025, 3, 2, 15, 0), now()] {
        for mode in MODES {
            assert!(
                set.for_mode(mode).should_refresh(&query(None, at)),
                "{mode} at {at}"
            );
        }
    }
}

#[test]
fn scheduled_refreshes_once_per_trading_day_inside_the_window() {
    let set = StrategySet::from_config(&RefreshConfig::default()).unwrap();
    let scheduled = set.for_mode(RefreshMode::Scheduled);
    // 18:00 New York on Tuesday 2025-03-04 is 23:00 UTC.
    let in_window = utc(2025, 3, 4, 23, 30);

    assert!(scheduled.should_refresh(&query(Some(utc(2025, 3, 3, 23, 10)), in_window)));
    assert!(!scheduled.should_refresh(&query(Some(utc(2025, 3, 4, 23, 5)), in_window)));
    assert!(!scheduled.should_refresh(&query(
        Some(utc(2025, 3, 3, 23, 10)),
        utc(2025, 3, 4, 15, 0)
    )));
    // Saturday has no window.
    assert!(!scheduled.should_refresh(&query(
        Some(utc(2025, 3, 6, 23, 10)),
        utc(2025, 3, 8, 23, 30)
    )));
}

#[test]
fn on_demand_honors_min_freshness_and_force() {
    let s = RefreshStrategy::OnDemand {
        min_freshness: Duration::from_secs(300),
    };
    let at = now();
    let recent = query(Some(at - chrono::Duration::minutes(1)), at);
    assert!(!s.should_refresh(&recent));
    assert!(s.should_refresh(&StalenessQuery {
        force: true,
        ..recent
    }));
    assert!(s.should_refresh(&query(Some(at - chrono::Duration::minutes(5)), at)));
}

#[test]
fn live_always_refreshes_when_enabled() {
    let at = now();
    let just_now = query(Some(at), at);
    let enabled = RefreshStrategy::Live {
        enabled: true,
        fallback_interval: Duration::from_secs(60),
    };
    assert!(enabled.should_refresh(&just_now));

    let disabled = RefreshStrategy::Live {
        enabled: false,
        fallback_interval: Duration::from_secs(60),
    };
    assert!(!disabled.should_refresh(&query(Some(at - chrono::Duration::seconds(30)), at)));
    assert!(disabled.should_refresh(&query(Some(at - chrono::Duration::seconds(61)), at)));
}

#[test]
fn strategies_can_be_replaced_per_mode() {
    let set = StrategySet::from_config(&RefreshConfig::default())
        .unwrap()
        .with(RefreshStrategy::OnDemand {
            min_freshness: Duration::ZERO,
        });
    let at = now();
    assert!(
        set.for_mode(RefreshMode::OnDemand)
            .should_refresh(&query(Some(at), at))
    );
    assert_eq!(set.for_mode(RefreshMode::Periodic).mode(), RefreshMode::Periodic);
}

#[test]
fn invalid_market_timezone_is_rejected() {
    let cfg = RefreshConfig {
        market_timezone: "Mars/Olympus".to_string(),
        ..RefreshConfig::default()
    };
    assert!(StrategySet::from_config(&cfg).is_err());
}

#[tokio::test]
async fn periodic_overrides_apply_per_data_type() {
    let (raw, ctl) = DynamicMockProvider::new_with_controller("alpha");
    ctl.returns(
        DataType::News,
        AAPL,
        Payload::News(fixtures::news(AAPL, now() - chrono::Duration::hours(2), 2)),
    )
    .await;
    let mut cfg = test_config();
    cfg.periodic_overrides
        .insert(DataType::News, Duration::from_secs(60));
    let h = harness_with(vec![client(raw, 0)], cfg, None);
    let five_min_ago = now() - chrono::Duration::minutes(5);
    h.store
        .set_last_updated(AAPL, DataType::News, five_min_ago)
        .await;
    h.store
        .set_last_updated(AAPL, DataType::Fundamentals, five_min_ago)
        .await;

    let batch = h
        .manager
        .refresh_batch(
            [AAPL],
            &[DataType::News, DataType::Fundamentals],
            RefreshMode::Periodic,
            false,
        )
        .await;

    assert_eq!(
        batch.result(AAPL, DataType::News).unwrap().status,
        RefreshStatus::Success
    );
    assert_eq!(
        batch.result(AAPL, DataType::Fundamentals).unwrap().status,
        RefreshStatus::Skipped
    );
}

#[tokio::test]
async fn requests_carry_their_own_mode_and_force() {
    let (raw, ctl) = DynamicMockProvider::new_with_controller("alpha");
    for symbol in [AAPL, MSFT] {
        ctl.returns(
            DataType::News,
            symbol,
            Payload::News(fixtures::news(symbol, now() - chrono::Duration::hours(1), 1)),
        )
        .await;
    }
    let h = harness(vec![client(raw, 0)]);
    for symbol in [AAPL, MSFT] {
        h.store.set_last_updated(symbol, DataType::News, now()).await;
    }

    let batch = h
        .manager
        .refresh_requests(
            vec![
                RefreshRequest::new(AAPL, [DataType::News], RefreshMode::Periodic, false),
                RefreshRequest::new(MSFT, [DataType::News], RefreshMode::OnDemand, true),
            ],
            &ingesta::CancelToken::new(),
        )
        .await;
    assert_eq!(
        batch.result(AAPL, DataType::News).unwrap().status,
        RefreshStatus::Skipped
    );
    assert_eq!(
        batch.result(MSFT, DataType::News).unwrap().status,
        RefreshStatus::Success
    );

    let single = h
        .manager
        .refresh(RefreshRequest::new(
            AAPL,
            [DataType::News],
            RefreshMode::Live,
            false,
        ))
        .await;
    assert_eq!(single.symbol, AAPL);
    assert_eq!(single.status(DataType::News), Some(RefreshStatus::Skipped));
}
