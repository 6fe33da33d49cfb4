use std::collections::BTreeMap;
use std::sync::Mutex;

use rust_decimal::prelude::ToPrimitive;

use ingesta_core::{IndicatorComputer, IndicatorError, IndicatorPoint, IndicatorSet, PriceBar};

/// Simple moving averages of the close over the configured periods.
///
/// Values are `None` until a period has enough bars. Fewer bars than the
/// longest period is `InsufficientData`.
#[derive(Debug, Clone)]
pub struct SmaIndicators {
    periods: Vec<usize>,
}

impl Default for SmaIndicators {
    fn default() -> Self {
        Self::new([5, 20])
    }
}

impl SmaIndicators {
    /// Averages over each of `periods`; zero periods are ignored.
    #[must_use]
    pub fn new(periods: impl IntoIterator<Item = usize>) -> Self {
        let mut periods: Vec<usize> = periods.into_iter().filter(|p| *p > 0).collect();
        periods.sort_unstable();
        periods.dedup();
        Self { periods }
    }

    fn longest(&self) -> usize {
        self.periods.last().copied().unwrap_or(1)
    }
}

impl IndicatorComputer for SmaIndicators {
    fn name(&self) -> &'static str {
        "sma"
    }

    fn compute(&self, _symbol: &str, bars: &[PriceBar]) -> Result<IndicatorSet, IndicatorError> {
        if bars.windows(2).any(|w| w[0].ts >= w[1].ts) {
            return Err(IndicatorError::Malformed(
                "bars are not strictly ascending".to_string(),
            ));
        }
        if bars.len() < self.longest() {
            return Err(IndicatorError::InsufficientData {
                needed: self.longest(),
                available: bars.len(),
            });
        }
        let closes: Vec<f64> = bars
            .iter()
            .map(|b| b.close.to_f64().unwrap_or(f64::NAN))
            .collect();
        let points = bars
            .iter()
            .enumerate()
            .map(|(i, b)| {
                let values = self
                    .periods
                    .iter()
                    .map(|&p| {
                        let v = (i + 1 >= p)
                            .then(|| closes[i + 1 - p..=i].iter().sum::<f64>() / p as f64);
                        (format!("sma_{p}"), v)
                    })
                    .collect::<BTreeMap<_, _>>();
                IndicatorPoint { ts: b.ts, values }
            })
            .collect();
        Ok(IndicatorSet { points })
    }
}

/// Computer that returns a scripted result regardless of input, and counts calls.
pub struct ScriptedIndicators {
    result: Result<IndicatorSet, IndicatorError>,
    calls: Mutex<usize>,
}

impl ScriptedIndicators {
    /// Always return `result`.
    #[must_use]
    pub const fn new(result: Result<IndicatorSet, IndicatorError>) -> Self {
        Self {
            result,
            calls: Mutex::new(0),
        }
    }

    /// How many times `compute` ran.
    #[must_use]
    pub fn calls(&self) -> usize {
        *self.calls.lock().expect("mutex poisoned")
    }
}

impl IndicatorComputer for ScriptedIndicators {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn compute(&self, _symbol: &str, _bars: &[PriceBar]) -> Result<IndicatorSet, IndicatorError> {
        *self.calls.lock().expect("mutex poisoned") += 1;
        self.result.clone()
    }
}
