//! Closed, serializable entity types for the Information State (spec §3).

pub mod action;
pub mod answer;
pub mod error;
pub mod ids;
pub mod information_state;
pub mod moves;
pub mod plan;
pub mod question;
pub mod term;

pub use action::{Action, ActionStatus};
pub use answer::{Answer, AnswerContent};
pub use error::{AdapterError, EngineError};
pub use ids::{ActionId, QuestionId, Timestamp};
pub use information_state::{
    ControlIS, DialogueState, Initiative, InformationState, PrivateIS, SharedIS,
};
pub use moves::{GroundingStatus, IcmKind, Move, MoveKind, Speaker};
pub use plan::{PlanStep, PlanStepKind, StepStatus};
pub use question::{Constraint, Question, QuestionShape};
pub use term::{Proposition, Term};
