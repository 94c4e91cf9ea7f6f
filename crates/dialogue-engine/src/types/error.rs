//! Engine-facing error taxonomy (spec §7), following the teacher runtime's
//! umbrella-of-subsystem-errors pattern (`RuntimeError` wrapping
//! `ConfigError`/`ResourceError`/...).

use thiserror::Error;

use crate::config::ConfigError;
use crate::rules::Phase;

/// Top-level engine error (spec §7, kinds 1-5; kind 6 "Uninterpretable
/// input" is not an error — it surfaces as an inbound move, see
/// [`crate::types::moves::MoveKind::Uninterpretable`]).
#[derive(Debug, Error)]
pub enum EngineError {
    /// Fatal; the engine rolls back the turn and emits a diagnostic.
    #[error("invariant violated ({invariant}): {detail}")]
    InvariantViolation { invariant: String, detail: String },

    /// Fatal; a phase fixpoint exceeded its configured step budget.
    #[error("rule non-termination suspected in {phase:?} phase after {steps} steps")]
    RuleNonterminationSuspected { phase: Phase, steps: u32 },

    /// Fatal for the turn; the engine degrades to a fallback response.
    #[error("domain contract error in {operation}: {reason}")]
    DomainContractError { operation: String, reason: String },

    /// Soft; converted to an ICM move by the caller rather than bubbling
    /// as a hard turn failure, per spec §7's propagation policy.
    #[error(transparent)]
    AdapterFailure(#[from] AdapterError),

    /// Configuration-dependent fatality; see [`crate::config::DependencyCyclePolicy`].
    #[error("dependency cycle detected at {question}: {cycle:?}")]
    DependencyCycleDetected { question: String, cycle: Vec<String> },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Failures from the three external adapter boundaries (spec §6).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AdapterError {
    #[error("NLU adapter failed: {0}")]
    Nlu(String),

    #[error("NLG adapter failed: {0}")]
    Nlg(String),

    #[error("device adapter failed: {0}")]
    Device(String),

    #[error("{adapter} adapter timed out")]
    Timeout { adapter: &'static str },
}

/// Whether an [`EngineError`] should abort the turn with a rollback, or can
/// be absorbed into a co-operative ICM move and let the dialogue continue
/// (spec §7's propagation policy).
impl EngineError {
    pub fn is_fatal_to_turn(&self) -> bool {
        !matches!(self, EngineError::AdapterFailure(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_failures_are_not_fatal() {
        let err = EngineError::AdapterFailure(AdapterError::Timeout { adapter: "nlu" });
        assert!(!err.is_fatal_to_turn());
    }

    #[test]
    fn invariant_violations_are_fatal() {
        let err = EngineError::InvariantViolation {
            invariant: "qud-stack".to_string(),
            detail: "popped from middle".to_string(),
        };
        assert!(err.is_fatal_to_turn());
    }
}
