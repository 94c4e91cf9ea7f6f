//! A turn-synchronous issue-based dialogue manager implementing the
//! IBiS1-IBiS4 lineage of Larsson's Information State update approach:
//! plan-driven questions under discussion, grounding via ICM, belief
//! revision through accommodation and reaccommodation, and negotiated
//! action execution.
//!
//! A session is one [`types::InformationState`] carried turn to turn
//! through an [`Engine`], configured by an [`EngineConfig`] and driven by a
//! process-local [`domain::DomainModel`]. The engine itself never depends
//! on NLU, NLG, or device I/O directly — those live behind the
//! [`adapters`] traits, so a host can swap a scripted test double for a
//! production backend without touching engine internals.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod engine;
pub mod rules;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use adapters::{DeviceAdapter, ExecutionOutcome, NlgAdapter, NluAdapter};
pub use config::{ConfigError, DependencyCyclePolicy, EngineConfig, GroundingConfig, GroundingStrategy};
pub use domain::{DependencyGraph, DomainModel, TemplateKey};
pub use engine::{classify_grounding, Engine, TurnOutput};
pub use rules::{default_rule_set, Phase, Rule, RuleContext, RuleSet, RuleSetBuilder};
pub use types::{
    Action, ActionId, ActionStatus, AdapterError, Answer, AnswerContent, Constraint, ControlIS,
    DialogueState, EngineError, GroundingStatus, IcmKind, Initiative, InformationState, Move,
    MoveKind, PlanStep, PlanStepKind, PrivateIS, Proposition, Question, QuestionId, QuestionShape,
    SharedIS, Speaker, StepStatus, Term, Timestamp,
};
