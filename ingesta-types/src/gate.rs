//! Workflow gate outcomes and the gate state machine.

use serde::{Deserialize, Serialize};

use crate::error::IngestError;

/// Outcome of evaluating one gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateResult {
    /// Gate name, e.g. "ingestion".
    pub gate_name: String,
    /// Whether the gate passed.
    pub passed: bool,
    /// Why the gate failed; `None` when it passed.
    pub reason: Option<String>,
    /// For failures, whether a later attempt may pass.
    pub retryable: bool,
}

impl GateResult {
    /// A passing result.
    pub fn pass(gate_name: impl Into<String>) -> Self {
        Self {
            gate_name: gate_name.into(),
            passed: true,
            reason: None,
            retryable: false,
        }
    }

    /// A failure that may pass on a later attempt.
    pub fn retryable(gate_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            gate_name: gate_name.into(),
            passed: false,
            reason: Some(reason.into()),
            retryable: true,
        }
    }

    /// A failure that will not pass without intervention.
    pub fn fatal(gate_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            gate_name: gate_name.into(),
            passed: false,
            reason: Some(reason.into()),
            retryable: false,
        }
    }

    /// Terminal state this result corresponds to.
    #[must_use]
    pub const fn state(&self) -> GateState {
        if self.passed {
            GateState::Passed
        } else {
            GateState::Failed {
                retryable: self.retryable,
            }
        }
    }

    /// Convert a failure into `IngestError::GateFailure`; `Ok(())` when passed.
    ///
    /// # Errors
    /// Returns `GateFailure` carrying the gate name, reason and retryability.
    pub fn into_result(self) -> Result<(), IngestError> {
        if self.passed {
            return Ok(());
        }
        Err(IngestError::gate(
            self.gate_name,
            self.reason.unwrap_or_default(),
            self.retryable,
        ))
    }
}

/// Lifecycle of a gate evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GateState {
    /// Not yet evaluated.
    #[default]
    Pending,
    /// Evaluation in progress.
    Evaluating,
    /// Evaluation passed.
    Passed,
    /// Evaluation failed.
    Failed {
        /// Whether a later attempt may pass.
        retryable: bool,
    },
}

impl GateState {
    /// Whether the state is `Passed` or `Failed`.
    #[must_use]
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Passed | Self::Failed { .. })
    }

    /// `Pending -> Evaluating`. A retryable failure may also be re-evaluated.
    ///
    /// # Errors
    /// Returns `InvalidArg` from any other state.
    pub fn begin(self) -> Result<Self, IngestError> {
        match self {
            Self::Pending | Self::Failed { retryable: true } => Ok(Self::Evaluating),
            other => Err(IngestError::InvalidArg(format!(
                "gate cannot start evaluating from {other:?}"
            ))),
        }
    }

    /// `Evaluating -> Passed | Failed`.
    ///
    /// # Errors
    /// Returns `InvalidArg` unless the gate is evaluating.
    pub fn finish(self, result: &GateResult) -> Result<Self, IngestError> {
        match self {
            Self::Evaluating => Ok(result.state()),
            other => Err(IngestError::InvalidArg(format!(
                "gate cannot finish from {other:?}"
            ))),
        }
    }
}
