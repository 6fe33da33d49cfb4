//! Deterministic sample rows.
//!
//! Prices follow a gentle uptrend so indicator output is predictable.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc, Weekday};
use rust_decimal::Decimal;

use ingesta_core::{
    EarningsEvent, FundamentalsSnapshot, MacroObservation, NewsArticle, PeerLink, PriceBar,
};

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN))
}

/// Parse `YYYY-MM-DD` into UTC midnight. Panics on malformed input.
#[must_use]
pub fn day(s: &str) -> DateTime<Utc> {
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .unwrap_or_else(|e| panic!("fixture date '{s}': {e}"));
    midnight(date)
}

/// One bar with explicit OHLC, volume 1 000 000.
#[must_use]
pub fn bar(symbol: &str, ts: DateTime<Utc>, open: i64, high: i64, low: i64, close: i64) -> PriceBar {
    PriceBar {
        symbol: symbol.to_string(),
        ts,
        open: Decimal::from(open),
        high: Decimal::from(high),
        low: Decimal::from(low),
        close: Decimal::from(close),
        adj_close: Some(Decimal::from(close)),
        volume: Some(1_000_000),
    }
}

/// `n` consecutive weekday bars starting at `start` (skipping weekends).
///
/// Bar `i` closes at `100 + i` with a one-point range around it.
#[must_use]
pub fn daily_bars(symbol: &str, start: &str, n: usize) -> Vec<PriceBar> {
    let mut out = Vec::with_capacity(n);
    let mut ts = day(start);
    let mut close = 100i64;
    while out.len() < n {
        if !matches!(ts.weekday(), Weekday::Sat | Weekday::Sun) {
            out.push(bar(symbol, ts, close - 1, close + 1, close - 2, close));
            close += 1;
        }
        ts += Duration::days(1);
    }
    out
}

/// `n` hourly bars starting at `start`.
#[must_use]
pub fn intraday_bars(symbol: &str, start: DateTime<Utc>, n: usize) -> Vec<PriceBar> {
    (0..n)
        .map(|i| {
            let c = 50 + i64::try_from(i).unwrap_or(0);
            bar(symbol, start + Duration::hours(i64::try_from(i).unwrap_or(0)), c, c + 1, c - 1, c)
        })
        .collect()
}

/// A single trailing-twelve-months fundamentals snapshot.
#[must_use]
pub fn fundamentals(symbol: &str, as_of: &str) -> FundamentalsSnapshot {
    FundamentalsSnapshot {
        symbol: symbol.to_string(),
        as_of: day(as_of),
        period: "TTM".to_string(),
        market_cap: Some(Decimal::from(2_500_000_000_000i64)),
        pe_ratio: Some(Decimal::new(285, 1)),
        eps: Some(Decimal::new(642, 2)),
        revenue: Some(Decimal::from(390_000_000_000i64)),
        profit_margin: Some(Decimal::new(25, 2)),
        debt_to_equity: Some(Decimal::new(150, 2)),
        dividend_yield: Some(Decimal::new(5, 3)),
    }
}

/// `n` articles published one hour apart starting at `start`.
#[must_use]
pub fn news(symbol: &str, start: DateTime<Utc>, n: usize) -> Vec<NewsArticle> {
    (0..n)
        .map(|i| NewsArticle {
            symbol: symbol.to_string(),
            published_at: start + Duration::hours(i64::try_from(i).unwrap_or(0)),
            title: format!("{symbol} headline {i}"),
            url: format!("https://news.example.com/{}/{i}", symbol.to_lowercase()),
            publisher: Some("Example Wire".to_string()),
            summary: None,
            sentiment: Some(Decimal::new(1, 1)),
        })
        .collect()
}

/// One reported earnings event for `fiscal_period`.
#[must_use]
pub fn earnings(symbol: &str, report_date: &str, fiscal_period: &str) -> EarningsEvent {
    EarningsEvent {
        symbol: symbol.to_string(),
        report_date: day(report_date),
        fiscal_period: fiscal_period.to_string(),
        eps_actual: Some(Decimal::new(152, 2)),
        eps_estimate: Some(Decimal::new(148, 2)),
        revenue_actual: Some(Decimal::from(94_000_000_000i64)),
        revenue_estimate: Some(Decimal::from(92_000_000_000i64)),
    }
}

/// Peer links from `symbol` to each of `peers`.
#[must_use]
pub fn peers(symbol: &str, as_of: &str, peers: &[&str]) -> Vec<PeerLink> {
    peers
        .iter()
        .map(|p| PeerLink {
            symbol: symbol.to_string(),
            peer: (*p).to_string(),
            as_of: day(as_of),
            industry: Some("Consumer Electronics".to_string()),
        })
        .collect()
}

/// `n` monthly observations of `series_id` starting at `start`.
#[must_use]
pub fn macro_series(series_id: &str, start: &str, n: usize) -> Vec<MacroObservation> {
    let first = day(start).date_naive();
    (0..n)
        .filter_map(|i| {
            let months = u32::try_from(i).ok()?;
            let date = first.checked_add_months(chrono::Months::new(months))?;
            Some(MacroObservation {
                series_id: series_id.to_string(),
                ts: midnight(date),
                value: Decimal::new(3000 + i64::from(months), 1),
            })
        })
        .collect()
}
