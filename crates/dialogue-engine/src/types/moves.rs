//! Dialogue moves and their grounding status (spec §3 "Move", §4.5).

use serde::{Deserialize, Serialize};

use super::action::{Action, ActionId};
use super::answer::Answer;
use super::ids::{QuestionId, Timestamp};
use super::question::Question;
use super::term::Proposition;

/// The speaking party of a [`Move`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Speaker {
    User,
    System,
}

/// `grounding_status ∈ {Ungrounded, Pending, Grounded}` whose transitions
/// are monotone toward `Grounded` unless reraised (Invariant 6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroundingStatus {
    Ungrounded,
    Pending,
    Grounded,
}

impl GroundingStatus {
    fn rank(self) -> u8 {
        match self {
            GroundingStatus::Ungrounded => 0,
            GroundingStatus::Pending => 1,
            GroundingStatus::Grounded => 2,
        }
    }

    /// True if `self -> next` does not move backward, i.e. respects
    /// Invariant 6 outside of an explicit reraise.
    pub fn is_monotone_to(self, next: GroundingStatus) -> bool {
        next.rank() >= self.rank()
    }
}

/// ICM (Interactive Communication Management) subtype (spec §3, §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IcmKind {
    PerceptionPositive,
    PerceptionNegative,
    UnderstandingPositive,
    UnderstandingNegative,
    UnderstandingIntention,
    Acceptance,
}

/// `kind ∈ {ask, answer, assert, request, greet, quit, icm:*, reraise}`
/// (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MoveKind {
    Ask(Question),
    Answer(Answer),
    Assert(Proposition),
    Request { task: String },
    Greet,
    Quit,
    Icm { kind: IcmKind, target: Option<QuestionId> },
    Reraise { question: QuestionId },
    /// Inbound request to execute a concrete, already-parameterized action
    /// (IBiS4 spec §4.6 IntegrateRequest), distinct from `Request{task}`
    /// which asks the engine to *form a plan* for a named task (spec §4.2
    /// FormTaskPlan).
    PerformRequest(Action),
    /// Synthetic move fed back into the next Integrate cycle once the host
    /// has run the Device adapter for a dispatched action (spec §4.6
    /// "ExecuteAction postcond", §5 "suspension points").
    ActionSucceeded { action: ActionId },
    ActionFailed { action: ActionId, reason: String },
    /// Produced by the NLU adapter when it cannot interpret the utterance
    /// at all (spec §6 "Failure: returns a distinguished `uninterpretable`
    /// move").
    Uninterpretable { raw: String },
}

/// `{kind, content, speaker, timestamp, confidence, grounding_status}`
/// (spec §3). `content` is folded into `kind` here since every variant
/// already carries its payload; this keeps the type closed and avoids a
/// redundant untyped field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Move {
    pub kind: MoveKind,
    pub speaker: Speaker,
    pub timestamp: Timestamp,
    pub confidence: f32,
    pub grounding_status: GroundingStatus,
}

impl Move {
    pub fn new(kind: MoveKind, speaker: Speaker, confidence: f32) -> Self {
        Self {
            kind,
            speaker,
            timestamp: Timestamp::next(),
            confidence,
            grounding_status: GroundingStatus::Ungrounded,
        }
    }

    /// System-originated moves are authored by the engine itself, so they
    /// start out `Grounded` rather than running the grounding classifier.
    pub fn system(kind: MoveKind) -> Self {
        Self::new(kind, Speaker::System, 1.0).with_status(GroundingStatus::Grounded)
    }

    pub fn with_status(mut self, status: GroundingStatus) -> Self {
        self.grounding_status = status;
        self
    }

    pub fn as_answer(&self) -> Option<&Answer> {
        match &self.kind {
            MoveKind::Answer(a) => Some(a),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grounding_status_rejects_backward_transitions_by_default_check() {
        assert!(GroundingStatus::Pending.is_monotone_to(GroundingStatus::Grounded));
        assert!(!GroundingStatus::Grounded.is_monotone_to(GroundingStatus::Pending));
        assert!(GroundingStatus::Ungrounded.is_monotone_to(GroundingStatus::Ungrounded));
    }

    #[test]
    fn system_move_defaults_to_full_confidence() {
        let m = Move::system(MoveKind::Greet);
        assert_eq!(m.confidence, 1.0);
        assert_eq!(m.speaker, Speaker::System);
    }
}
