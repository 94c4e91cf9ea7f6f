//! Plan algebra (spec §3 "PlanStep", §2 "Plan algebra").

use serde::{Deserialize, Serialize};

use super::action::Action;
use super::question::Question;
use super::term::Proposition;

/// `status: Active|Completed|Abandoned` (spec §3), plus `Accommodated` for
/// the intermediate state Rule 4.1 leaves a `Findout` step in once its
/// question has been queued but not yet answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStatus {
    Active,
    Accommodated,
    Completed,
    Abandoned,
}

/// `Findout(Q)`, `Raise(Q)`, `Respond(Q)`, `Perform(A)`, `Consult(DB)`
/// (spec §2 "Plan algebra").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlanStepKind {
    Findout(Question),
    Raise(Question),
    Respond(Question),
    Perform(Action),
    Consult { database: String, query: Proposition },
}

/// `{type, content, status, subplans}` (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    pub kind: PlanStepKind,
    pub status: StepStatus,
    pub subplans: Vec<PlanStep>,
}

impl PlanStep {
    pub fn new(kind: PlanStepKind) -> Self {
        Self {
            kind,
            status: StepStatus::Active,
            subplans: Vec::new(),
        }
    }

    pub fn findout(question: Question) -> Self {
        Self::new(PlanStepKind::Findout(question))
    }

    pub fn perform(action: Action) -> Self {
        Self::new(PlanStepKind::Perform(action))
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, StepStatus::Completed | StepStatus::Abandoned)
    }

    /// Flatten a (possibly nested) plan tree into the flat, ordered list
    /// `private.plan` expects (spec §3: "stack semantics: head is next
    /// pending step"). A domain's `build_plan` may express a sequence of
    /// steps as nested `subplans`; `FormTaskPlan` (spec §4.2) calls this to
    /// linearize that tree into siblings before assigning it to the plan.
    /// Traversal is depth-first, preorder, so `subplans` read as "what
    /// comes after me" rather than "what I decompose into".
    pub fn flatten(self) -> Vec<PlanStep> {
        let mut out = vec![PlanStep {
            kind: self.kind,
            status: self.status,
            subplans: Vec::new(),
        }];
        for sub in self.subplans {
            out.extend(sub.flatten());
        }
        out
    }
}
