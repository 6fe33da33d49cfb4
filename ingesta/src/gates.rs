//! Workflow gates between pipeline stages.
//!
//! A gate inspects the outcome of a stage and says whether the next stage may
//! run. Failures are either retryable (the unit is attempted again under the
//! retry policy) or fatal (the unit is dead-lettered).

use ingesta_core::{
    DataType, GateConfig, GateResult, GateState, IndicatorError, IndicatorSet, IngestError,
    IngestionRequirement,
};

/// Drives one gate through `Pending -> Evaluating -> Passed | Failed`.
///
/// A run that failed retryably may be evaluated again; any other finished
/// run refuses re-evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GateRun {
    state: GateState,
}

impl GateRun {
    /// A run that has not been evaluated yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> GateState {
        self.state
    }

    /// Evaluate the gate with `check`.
    ///
    /// # Errors
    /// `InvalidArg` if the run already passed or failed fatally.
    pub fn evaluate(&mut self, check: impl FnOnce() -> GateResult) -> Result<GateResult, IngestError> {
        self.state = self.state.begin()?;
        let result = check();
        self.state = self.state.finish(&result)?;
        Ok(result)
    }
}

/// Checks that enough rows are stored after ingestion.
#[derive(Debug, Clone, Default)]
pub struct DataIngestionGate {
    config: GateConfig,
}

impl DataIngestionGate {
    /// Gate name used in results and errors.
    pub const NAME: &'static str = "ingestion";

    /// Gate with per-type requirements from `config`.
    #[must_use]
    pub fn new(config: GateConfig) -> Self {
        Self { config }
    }

    /// Requirement applied to `data_type`.
    #[must_use]
    pub fn requirement(&self, data_type: DataType) -> IngestionRequirement {
        self.config.requirement(data_type)
    }

    /// Evaluate with `rows_present` rows stored for the unit's coverage window.
    #[must_use]
    pub fn evaluate(&self, data_type: DataType, rows_present: usize) -> GateResult {
        let req = self.requirement(data_type);
        if req.mandatory && rows_present <= req.fatal_floor {
            return GateResult::fatal(
                Self::NAME,
                format!(
                    "{rows_present} rows for mandatory {data_type} (floor {})",
                    req.fatal_floor
                ),
            );
        }
        if rows_present < req.min_rows {
            return GateResult::retryable(
                Self::NAME,
                format!(
                    "{rows_present} of {} required {data_type} rows present",
                    req.min_rows
                ),
            );
        }
        GateResult::pass(Self::NAME)
    }

    /// Evaluate after a fetch that produced `rows_returned` valid rows.
    ///
    /// A fetch that returned nothing while nothing is stored fails retryably
    /// for every type, whatever its configured requirement.
    #[must_use]
    pub fn evaluate_fetch(
        &self,
        data_type: DataType,
        rows_returned: usize,
        rows_present: usize,
    ) -> GateResult {
        let result = self.evaluate(data_type, rows_present);
        if result.passed && rows_returned == 0 && rows_present == 0 {
            return GateResult::retryable(
                Self::NAME,
                format!("no {data_type} rows returned and none stored"),
            );
        }
        result
    }
}

/// Checks the output of the indicator collaborator.
#[derive(Debug, Clone, Default)]
pub struct IndicatorComputationGate {
    required: Vec<String>,
}

impl IndicatorComputationGate {
    /// Gate name used in results and errors.
    pub const NAME: &'static str = "indicators";

    /// Gate requiring `required` indicators on the latest point; empty means
    /// every indicator the computer produced.
    #[must_use]
    pub fn new(required: Vec<String>) -> Self {
        Self { required }
    }

    /// Evaluate a computation outcome.
    #[must_use]
    pub fn evaluate(&self, outcome: &Result<IndicatorSet, IndicatorError>) -> GateResult {
        let set = match outcome {
            Ok(set) => set,
            Err(e @ IndicatorError::InsufficientData { .. }) => {
                return GateResult::retryable(Self::NAME, e.to_string());
            }
            Err(e @ IndicatorError::Malformed(_)) => {
                return GateResult::fatal(Self::NAME, e.to_string());
            }
        };
        let Some(latest) = set.latest() else {
            return GateResult::retryable(Self::NAME, "no indicator points produced");
        };
        let names: Vec<&str> = if self.required.is_empty() {
            latest.values.keys().map(String::as_str).collect()
        } else {
            self.required.iter().map(String::as_str).collect()
        };
        for name in names {
            match latest.values.get(name) {
                None | Some(None) => {
                    return GateResult::retryable(
                        Self::NAME,
                        format!("{name} undefined at {}", latest.ts),
                    );
                }
                Some(Some(v)) if !v.is_finite() => {
                    return GateResult::fatal(
                        Self::NAME,
                        format!("{name} is {v} at {}", latest.ts),
                    );
                }
                Some(Some(_)) => {}
            }
        }
        GateResult::pass(Self::NAME)
    }
}

/// Checks that the indicator history is long enough for signal generation.
#[derive(Debug, Clone, Copy)]
pub struct SignalGenerationGate {
    min_lookback: usize,
}

impl SignalGenerationGate {
    /// Gate name used in results and errors.
    pub const NAME: &'static str = "signals";

    /// Gate requiring `min_lookback` complete indicator points.
    #[must_use]
    pub const fn new(min_lookback: usize) -> Self {
        Self { min_lookback }
    }

    /// Evaluate with the number of complete indicator points available.
    #[must_use]
    pub fn evaluate(&self, complete_points: usize) -> GateResult {
        if complete_points >= self.min_lookback {
            GateResult::pass(Self::NAME)
        } else {
            GateResult::retryable(
                Self::NAME,
                format!(
                    "{complete_points} complete indicator points, {} needed",
                    self.min_lookback
                ),
            )
        }
    }
}
