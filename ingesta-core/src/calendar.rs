//! Trading-day calendar and the daily scheduled-refresh boundary.
//!
//! Local times are resolved with `Tz::from_local_datetime(..).earliest()`, so
//! a scheduled time falling into a DST gap is skipped for that day.

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc, Weekday};
use chrono_tz::Tz;

use crate::{IngestError, RefreshConfig};

/// Trading days look back at most this far when searching for a boundary.
const MAX_LOOKBACK_DAYS: u32 = 31;

/// Market calendar in the exchange's timezone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketCalendar {
    tz: Tz,
    holidays: BTreeSet<NaiveDate>,
    schedule_hour: u32,
    schedule_minute: u32,
    window: Duration,
}

impl MarketCalendar {
    /// Calendar with a daily run at `hour:minute` local time.
    ///
    /// # Errors
    /// Returns `InvalidArg` if `hour`/`minute` are out of range.
    pub fn new(tz: Tz, hour: u32, minute: u32, window_minutes: u32) -> Result<Self, IngestError> {
        if hour > 23 || minute > 59 {
            return Err(IngestError::InvalidArg(format!(
                "schedule time {hour:02}:{minute:02} out of range"
            )));
        }
        Ok(Self {
            tz,
            holidays: BTreeSet::new(),
            schedule_hour: hour,
            schedule_minute: minute,
            window: Duration::minutes(i64::from(window_minutes)),
        })
    }

    /// Calendar described by the refresh configuration.
    ///
    /// # Errors
    /// Returns `InvalidArg` for an unknown timezone or out-of-range schedule time.
    pub fn from_config(cfg: &RefreshConfig) -> Result<Self, IngestError> {
        let tz: Tz = cfg.market_timezone.parse().map_err(|_| {
            IngestError::InvalidArg(format!("unknown market timezone '{}'", cfg.market_timezone))
        })?;
        Ok(Self::new(
            tz,
            cfg.batch_schedule_hour,
            cfg.batch_schedule_minute,
            cfg.schedule_window_minutes,
        )?
        .with_holidays(cfg.market_holidays.iter().copied()))
    }

    /// Add exchange holidays.
    #[must_use]
    pub fn with_holidays(mut self, days: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.holidays.extend(days);
        self
    }

    /// Exchange timezone.
    #[must_use]
    pub const fn timezone(&self) -> Tz {
        self.tz
    }

    /// Local calendar date of `now`.
    #[must_use]
    pub fn local_date(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.tz).date_naive()
    }

    /// Weekdays that are not holidays.
    #[must_use]
    pub fn is_trading_day(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !self.holidays.contains(&date)
    }

    /// Most recent trading day strictly before `date`.
    #[must_use]
    pub fn previous_trading_day(&self, date: NaiveDate) -> Option<NaiveDate> {
        let mut d = date;
        for _ in 0..MAX_LOOKBACK_DAYS {
            d = d.pred_opt()?;
            if self.is_trading_day(d) {
                return Some(d);
            }
        }
        None
    }

    /// Scheduled run time on `date`, in UTC.
    #[must_use]
    pub fn scheduled_at(&self, date: NaiveDate) -> Option<DateTime<Utc>> {
        let local = date.and_hms_opt(self.schedule_hour, self.schedule_minute, 0)?;
        self.tz
            .from_local_datetime(&local)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Whether `now` is on a trading day inside `[scheduled, scheduled + window)`.
    #[must_use]
    pub fn in_schedule_window(&self, now: DateTime<Utc>) -> bool {
        let today = self.local_date(now);
        if !self.is_trading_day(today) {
            return false;
        }
        self.scheduled_at(today)
            .is_some_and(|start| now >= start && now < start + self.window)
    }

    /// Most recent scheduled run time at or before `now` on a trading day.
    ///
    /// Before today's run time this is the previous trading day's run.
    #[must_use]
    pub fn last_boundary(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let today = self.local_date(now);
        if self.is_trading_day(today)
            && let Some(t) = self.scheduled_at(today)
            && t <= now
        {
            return Some(t);
        }
        let mut day = today;
        for _ in 0..MAX_LOOKBACK_DAYS {
            day = self.previous_trading_day(day)?;
            if let Some(t) = self.scheduled_at(day) {
                return Some(t);
            }
        }
        None
    }
}
