//! Row validation applied between fetch and persistence.
//!
//! A rejected row never blocks the rest of the payload; it is reported as a
//! `Validation` error and dropped.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use crate::payload::{
    EarningsEvent, FundamentalsSnapshot, MacroObservation, NewsArticle, Payload, PeerLink,
    PriceBar,
};
use crate::{DataType, IngestError};

/// Clock skew tolerated for timestamps that must not be in the future.
const FUTURE_TOLERANCE: Duration = Duration::minutes(5);

/// Outcome of validating one payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    /// Rows that passed, in input order.
    pub valid: Payload,
    /// One `Validation` error per rejected row.
    pub rejected: Vec<IngestError>,
}

impl ValidationReport {
    /// Rows received before validation.
    #[must_use]
    pub fn received(&self) -> usize {
        self.valid.len() + self.rejected.len()
    }

    /// True when rows were received but none passed.
    #[must_use]
    pub fn all_rejected(&self) -> bool {
        self.valid.is_empty() && !self.rejected.is_empty()
    }
}

/// Validate every row of `payload` fetched for `symbol`.
///
/// # Errors
/// Returns `InvalidArg` when the payload shape does not fit `data_type`.
pub fn validate_payload(
    data_type: DataType,
    symbol: &str,
    payload: Payload,
    now: DateTime<Utc>,
) -> Result<ValidationReport, IngestError> {
    if !payload.fits(data_type) {
        return Err(IngestError::InvalidArg(format!(
            "payload does not fit data type {data_type}"
        )));
    }
    let mut rejected = Vec::new();
    let latest = now + FUTURE_TOLERANCE;
    let valid = match payload {
        Payload::Prices(rows) => Payload::Prices(retain(rows, &mut rejected, |r| {
            check_price(r, symbol, latest)
        })),
        Payload::Fundamentals(rows) => Payload::Fundamentals(retain(rows, &mut rejected, |r| {
            check_fundamentals(r, symbol, latest)
        })),
        Payload::News(rows) => {
            Payload::News(retain(rows, &mut rejected, |r| check_news(r, symbol, latest)))
        }
        Payload::Earnings(rows) => {
            Payload::Earnings(retain(rows, &mut rejected, |r| check_earnings(r, symbol)))
        }
        Payload::Peers(rows) => {
            Payload::Peers(retain(rows, &mut rejected, |r| check_peer(r, symbol)))
        }
        Payload::Macro(rows) => {
            Payload::Macro(retain(rows, &mut rejected, |r| check_macro(r, symbol, latest)))
        }
    };
    Ok(ValidationReport { valid, rejected })
}

fn retain<R>(
    rows: Vec<R>,
    rejected: &mut Vec<IngestError>,
    check: impl Fn(&R) -> Result<(), String>,
) -> Vec<R> {
    rows.into_iter()
        .filter(|r| match check(r) {
            Ok(()) => true,
            Err(msg) => {
                rejected.push(IngestError::Validation(msg));
                false
            }
        })
        .collect()
}

fn same_symbol(got: &str, want: &str) -> Result<(), String> {
    if got.eq_ignore_ascii_case(want) {
        Ok(())
    } else {
        Err(format!("row symbol {got} does not match requested {want}"))
    }
}

fn not_future(ts: DateTime<Utc>, latest: DateTime<Utc>, what: &str) -> Result<(), String> {
    if ts > latest {
        Err(format!("{what} timestamp {ts} is in the future"))
    } else {
        Ok(())
    }
}

fn check_price(bar: &PriceBar, symbol: &str, latest: DateTime<Utc>) -> Result<(), String> {
    same_symbol(&bar.symbol, symbol)?;
    not_future(bar.ts, latest, "bar")?;
    for (name, v) in [
        ("open", bar.open),
        ("high", bar.high),
        ("low", bar.low),
        ("close", bar.close),
    ] {
        if v <= Decimal::ZERO {
            return Err(format!("bar at {} has non-positive {name} {v}", bar.ts));
        }
    }
    if bar.low > bar.high
        || bar.high < bar.open.max(bar.close)
        || bar.low > bar.open.min(bar.close)
    {
        return Err(format!("bar at {} has inconsistent OHLC", bar.ts));
    }
    Ok(())
}

fn check_fundamentals(
    row: &FundamentalsSnapshot,
    symbol: &str,
    latest: DateTime<Utc>,
) -> Result<(), String> {
    same_symbol(&row.symbol, symbol)?;
    not_future(row.as_of, latest, "fundamentals")?;
    if row.period.trim().is_empty() {
        return Err("fundamentals snapshot has an empty period".to_string());
    }
    Ok(())
}

fn check_news(article: &NewsArticle, symbol: &str, latest: DateTime<Utc>) -> Result<(), String> {
    same_symbol(&article.symbol, symbol)?;
    not_future(article.published_at, latest, "article")?;
    if article.title.trim().is_empty() {
        return Err(format!("article {} has an empty title", article.url));
    }
    if !(article.url.starts_with("http://") || article.url.starts_with("https://")) {
        return Err(format!("article url '{}' is not absolute", article.url));
    }
    if let Some(s) = article.sentiment
        && (s < Decimal::NEGATIVE_ONE || s > Decimal::ONE)
    {
        return Err(format!("article sentiment {s} outside [-1, 1]"));
    }
    Ok(())
}

fn check_earnings(event: &EarningsEvent, symbol: &str) -> Result<(), String> {
    same_symbol(&event.symbol, symbol)?;
    if event.fiscal_period.trim().is_empty() {
        return Err(format!(
            "earnings event on {} has an empty fiscal period",
            event.report_date
        ));
    }
    Ok(())
}

fn check_peer(link: &PeerLink, symbol: &str) -> Result<(), String> {
    same_symbol(&link.symbol, symbol)?;
    if link.peer.trim().is_empty() || link.peer.eq_ignore_ascii_case(&link.symbol) {
        return Err(format!("invalid peer '{}' for {}", link.peer, link.symbol));
    }
    Ok(())
}

fn check_macro(obs: &MacroObservation, symbol: &str, latest: DateTime<Utc>) -> Result<(), String> {
    same_symbol(&obs.series_id, symbol)?;
    not_future(obs.ts, latest, "observation")
}
