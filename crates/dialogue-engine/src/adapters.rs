//! External collaborator contracts (spec §6): NLU, NLG, and Device
//! adapters. The engine only ever sees these traits; concrete
//! implementations (real NLU/NLG models, device drivers) are host-provided
//! and out of scope for this crate (spec §1 "Out of scope"). [`crate::testing`]
//! carries in-memory test doubles grounded in the teacher's
//! `ConfidenceMonitorTrait` stub-API pattern (`routing/confidence.rs`): a
//! narrow public trait, with the real implementation left to the caller.

use crate::domain::TemplateKey;
use crate::types::{Action, AdapterError, InformationState, Move, Proposition};

/// Interpret phase collaborator (spec §6 "NLU adapter"): turns a raw
/// utterance into dialogue moves. A real implementation performs NLU; this
/// crate only depends on the contract.
pub trait NluAdapter: Send + Sync {
    /// `utterance -> [Move]` with per-move confidence. Implementations
    /// that cannot interpret the utterance at all should return
    /// `Ok(vec![Move{kind: Uninterpretable{..}, ..}])` rather than `Err`,
    /// reserving `Err` for adapter-level failure (timeout, backend error).
    fn interpret(
        &self,
        utterance: &str,
        context: &InformationState,
    ) -> Result<Vec<Move>, AdapterError>;
}

/// Generate phase collaborator (spec §6 "NLG adapter"): renders a single
/// dialogue move to an utterance. Must be pure given its inputs.
pub trait NlgAdapter: Send + Sync {
    fn generate(
        &self,
        mv: &Move,
        state: &InformationState,
        template: Option<&TemplateKey>,
    ) -> Result<String, AdapterError>;
}

/// Outcome of running an [`Action`] through the [`DeviceAdapter`] (spec §6
/// "execute(Action) -> {Success(postconditions) | Failure(reason)}").
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    Success(Vec<Proposition>),
    Failure(String),
}

/// IBiS4 action-execution collaborator (spec §6 "Device adapter").
pub trait DeviceAdapter: Send + Sync {
    fn check_preconditions(&self, action: &Action, commitments: &[Proposition]) -> bool;
    fn execute(&self, action: &Action) -> Result<ExecutionOutcome, AdapterError>;
}
