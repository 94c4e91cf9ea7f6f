//! The Information State and its three substates (spec §3).
//!
//! The IS is mutated only by replacing it wholesale with the value a rule
//! effect returns (copy-on-write/deep-clone semantics, spec §3
//! "Lifecycle"); nothing here offers in-place aliasing between
//! `private.issues` and `shared.qud`.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use super::action::Action;
use super::error::EngineError;
use super::ids::{QuestionId, Timestamp};
use super::moves::{GroundingStatus, IcmKind, Move, Speaker};
use super::plan::PlanStep;
use super::question::Question;
use super::term::{Proposition, Term};

/// How large a window `shared.last_moves` retains (spec §3: "bounded
/// window").
const LAST_MOVES_WINDOW: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Initiative {
    User,
    System,
    Mixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogueState {
    Active,
    Ended,
}

/// Agent-local state (spec §3 "PrivateIS").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrivateIS {
    /// Ordered sequence of steps; completed/abandoned steps are kept as
    /// history rather than removed. [`PrivateIS::plan_head`] is the first
    /// step still `Active`/`Accommodated`, not literally `plan[0]`.
    pub plan: Vec<PlanStep>,
    pub agenda: VecDeque<Move>,
    pub beliefs: HashMap<String, Term>,
    pub issues: Vec<Question>,
    pub actions: VecDeque<Action>,
    pub iun: Vec<Proposition>,
    pub last_utterance: Option<Move>,
}

impl Default for PrivateIS {
    fn default() -> Self {
        Self {
            plan: Vec::new(),
            agenda: VecDeque::new(),
            beliefs: HashMap::new(),
            issues: Vec::new(),
            actions: VecDeque::new(),
            iun: Vec::new(),
            last_utterance: None,
        }
    }
}

impl PrivateIS {
    /// The first not-yet-terminal step, i.e. the next step the plan
    /// actually requires work on. Completed/abandoned steps stay in `plan`
    /// as history rather than being spliced out, so this skips over them
    /// instead of always returning index 0.
    pub fn plan_head(&self) -> Option<&PlanStep> {
        self.plan.iter().find(|s| !s.is_terminal())
    }

    pub fn plan_head_mut(&mut self) -> Option<&mut PlanStep> {
        self.plan.iter_mut().find(|s| !s.is_terminal())
    }

    pub fn has_issue(&self, id: QuestionId) -> bool {
        self.issues.iter().any(|q| q.id == id)
    }

    pub fn remove_issue(&mut self, id: QuestionId) -> Option<Question> {
        let idx = self.issues.iter().position(|q| q.id == id)?;
        Some(self.issues.remove(idx))
    }
}

/// Mutually believed state (spec §3 "SharedIS").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedIS {
    /// Last-in-first-out: the last element is the top of the stack.
    pub qud: Vec<Question>,
    pub commitments: Vec<Proposition>,
    pub moves: Vec<Move>,
    pub next_moves: VecDeque<Move>,
    pub last_moves: VecDeque<Move>,
}

impl Default for SharedIS {
    fn default() -> Self {
        Self {
            qud: Vec::new(),
            commitments: Vec::new(),
            moves: Vec::new(),
            next_moves: VecDeque::new(),
            last_moves: VecDeque::new(),
        }
    }
}

impl SharedIS {
    pub fn qud_top(&self) -> Option<&Question> {
        self.qud.last()
    }

    pub fn qud_push(&mut self, q: Question) {
        self.qud.push(q);
    }

    /// Pop only from the top, per Invariant 1.
    pub fn qud_pop(&mut self) -> Option<Question> {
        self.qud.pop()
    }

    pub fn latest_move(&self) -> Option<&Move> {
        self.moves.last()
    }

    pub fn find_move(&self, timestamp: super::ids::Timestamp) -> Option<&Move> {
        self.moves.iter().rev().find(|m| m.timestamp == timestamp)
    }

    pub fn has_commitment(&self, p: &Proposition) -> bool {
        self.commitments.contains(p)
    }

    pub fn add_commitment(&mut self, p: Proposition) {
        if !self.commitments.contains(&p) {
            self.commitments.push(p);
        }
    }

    pub fn remove_commitment(&mut self, p: &Proposition) -> bool {
        if let Some(idx) = self.commitments.iter().position(|c| c == p) {
            self.commitments.remove(idx);
            true
        } else {
            false
        }
    }

    /// Append a move to the permanent history and the bounded recency
    /// window, enforcing Invariant 6's monotonicity unless this is an
    /// explicit reraise (the caller is expected to have built `m` with the
    /// right initial status; this only catches in-place status overwrites).
    pub fn record_move(&mut self, m: Move) {
        self.last_moves.push_back(m.clone());
        while self.last_moves.len() > LAST_MOVES_WINDOW {
            self.last_moves.pop_front();
        }
        self.moves.push(m);
    }

    /// Update the grounding status of a previously recorded move by
    /// timestamp, rejecting a backward transition (Invariant 6) unless
    /// `allow_reraise` is set.
    pub fn transition_move_status(
        &mut self,
        timestamp: super::ids::Timestamp,
        next: GroundingStatus,
        allow_reraise: bool,
    ) -> Result<(), EngineError> {
        let m = self
            .moves
            .iter_mut()
            .rev()
            .find(|m| m.timestamp == timestamp)
            .ok_or_else(|| EngineError::InvariantViolation {
                invariant: "grounding-monotonicity".to_string(),
                detail: format!("no recorded move at {timestamp}"),
            })?;
        if !allow_reraise && !m.grounding_status.is_monotone_to(next) {
            return Err(EngineError::InvariantViolation {
                invariant: "grounding-monotonicity".to_string(),
                detail: format!(
                    "move at {timestamp} would regress from {:?} to {:?}",
                    m.grounding_status, next
                ),
            });
        }
        m.grounding_status = next;
        Ok(())
    }
}

/// Turn-taking metadata (spec §3 "ControlIS"), plus the small set of
/// inter-rule staging flags the Integrate-phase cascade (Rules 4.6-4.8)
/// needs to hand information to the rule that runs next in the same
/// fixpoint. These are bookkeeping, not dialogue content, so they don't
/// participate in the QUD/issues/commitments invariants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlIS {
    pub speaker: Speaker,
    pub next_speaker: Speaker,
    pub initiative: Initiative,
    pub dialogue_state: DialogueState,
    /// Set by IntegrateAnswer's non-resolving path; consumed by Rule 4.3
    /// (IssueClarification) in the Select phase.
    pub pending_clarification: Option<QuestionId>,
    /// Set by Rule 4.6 (QuestionReaccommodation); consumed by Rule 4.7
    /// (RetractIncompatibleCommitment) on the next Integrate cycle.
    pub staged_retraction: Option<Proposition>,
    /// Set by Rule 4.7 once it retracts a commitment; consumed by Rule
    /// 4.8 (DependentQuestionReaccommodation) to drive the cascade, then
    /// cleared.
    pub just_retracted: Option<Proposition>,
    /// `(move timestamp, question)` awaiting `icm:acc` confirmation under
    /// the cautious/pessimistic grounding strategies (spec §4.5 scenario
    /// S5): the answer move is held `Pending` and its commitment withheld
    /// until the partner accepts. Cleared once accepted or reraised.
    pub pending_confirmation: Option<(Timestamp, QuestionId)>,
    /// Per-move reraise attempt counters (spec §9: "Reraise retry count
    /// semantics... fixed as per-move"), keyed by the original move's
    /// timestamp.
    pub reraise_counts: HashMap<Timestamp, u8>,
    /// Set by the engine driver's move-classification step (spec §4.1
    /// `integrate`, part (a)) when a strategy requires an ICM in response
    /// to the just-recorded move; consumed by the Select-phase
    /// `GenerateGroundingIcm` rule (spec §4.5). The third element, when
    /// present, is the question the ICM should be framed against (e.g. an
    /// `und*int` confirmation naming the question it re-asks).
    pub pending_grounding_icm: Option<(Timestamp, IcmKind, Option<QuestionId>)>,
}

impl Default for ControlIS {
    fn default() -> Self {
        Self {
            speaker: Speaker::User,
            next_speaker: Speaker::System,
            initiative: Initiative::Mixed,
            dialogue_state: DialogueState::Active,
            pending_clarification: None,
            staged_retraction: None,
            just_retracted: None,
            pending_confirmation: None,
            reraise_counts: HashMap::new(),
            pending_grounding_icm: None,
        }
    }
}

/// The complete Information State (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InformationState {
    pub agent_id: String,
    pub private: PrivateIS,
    pub shared: SharedIS,
    pub control: ControlIS,
}

impl InformationState {
    /// `initialize`: fresh `agent_id`, empty substates (spec §3
    /// "Lifecycle").
    pub fn new(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            private: PrivateIS::default(),
            shared: SharedIS::default(),
            control: ControlIS::default(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.control.dialogue_state == DialogueState::Active
    }

    /// Find a question by identity in `shared.qud` or `private.issues`,
    /// the only two places a not-yet-resolved question can live (Invariant
    /// 2). Used by the grounding-confirmation and reraise rules (spec
    /// §4.5) to recover the question a pending answer targets.
    pub fn find_question(&self, id: QuestionId) -> Option<&Question> {
        self.shared
            .qud
            .iter()
            .find(|q| q.id == id)
            .or_else(|| self.private.issues.iter().find(|q| q.id == id))
    }

    /// Structural invariant checks that don't require a [`DomainModel`]
    /// (Invariant 2's narrow form: no question identity is simultaneously
    /// in `issues` and `qud`). Invariant 5 (no incompatible commitments)
    /// needs `domain.incompatible` and is checked by the engine driver
    /// after each rule effect instead.
    ///
    /// [`DomainModel`]: crate::domain::DomainModel
    pub fn check_structural_invariants(&self) -> Result<(), EngineError> {
        for issue in &self.private.issues {
            if self.shared.qud.iter().any(|q| q.id == issue.id) {
                return Err(EngineError::InvariantViolation {
                    invariant: "issues-qud-disjoint".to_string(),
                    detail: format!("question {} present in both issues and qud", issue.id),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::moves::MoveKind;
    use crate::types::question::Question;

    #[test]
    fn fresh_state_is_active_and_empty() {
        let is = InformationState::new("agent-1");
        assert!(is.is_active());
        assert!(is.shared.qud.is_empty());
        assert!(is.private.issues.is_empty());
    }

    #[test]
    fn qud_pop_returns_most_recently_pushed() {
        let mut shared = SharedIS::default();
        let q1 = Question::wh("x", "parties");
        let q2 = Question::wh("y", "effective_date");
        let q2_id = q2.id;
        shared.qud_push(q1);
        shared.qud_push(q2);
        assert_eq!(shared.qud_pop().map(|q| q.id), Some(q2_id));
    }

    #[test]
    fn structural_invariant_rejects_question_in_both_lists() {
        let mut is = InformationState::new("agent-1");
        let q = Question::wh("x", "parties");
        is.private.issues.push(q.clone());
        is.shared.qud.push(q);
        assert!(is.check_structural_invariants().is_err());
    }

    #[test]
    fn transition_move_status_rejects_regression() {
        let mut shared = SharedIS::default();
        let m = Move::new(MoveKind::Greet, Speaker::User, 0.95)
            .with_status(GroundingStatus::Grounded);
        let ts = m.timestamp;
        shared.record_move(m);
        let result = shared.transition_move_status(ts, GroundingStatus::Pending, false);
        assert!(result.is_err());
    }

    #[test]
    fn transition_move_status_allows_reraise_regression() {
        let mut shared = SharedIS::default();
        let m = Move::new(MoveKind::Greet, Speaker::User, 0.95)
            .with_status(GroundingStatus::Pending);
        let ts = m.timestamp;
        shared.record_move(m);
        let result = shared.transition_move_status(ts, GroundingStatus::Ungrounded, true);
        assert!(result.is_ok());
    }

    #[test]
    fn commitments_add_is_idempotent() {
        let mut shared = SharedIS::default();
        let p = Proposition::atom("greeted");
        shared.add_commitment(p.clone());
        shared.add_commitment(p);
        assert_eq!(shared.commitments.len(), 1);
    }
}
