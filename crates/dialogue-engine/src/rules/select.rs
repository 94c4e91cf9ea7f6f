//! Selection rules (spec §4.4): IBiS3's `IssueClarification`,
//! `DependentIssueAccommodation`, and `LocalQuestionAccommodation`, plus
//! IBiS1's `SelectFromPlan` and the agenda-gated `Fallback`.

use crate::types::{EngineError, InformationState, Move, MoveKind, PlanStepKind, Question};

use super::{Phase, Rule, RuleContext};

pub fn rules() -> Vec<Rule> {
    vec![
        Rule::new(
            "IssueClarification",
            Phase::Select,
            25,
            clarification_applies,
            clarification_effect,
        ),
        Rule::new(
            "DependentIssueAccommodation",
            Phase::Select,
            22,
            dependent_issue_applies,
            dependent_issue_effect,
        ),
        Rule::new(
            "LocalQuestionAccommodation",
            Phase::Select,
            20,
            local_question_applies,
            local_question_effect,
        ),
        Rule::new(
            "SelectFromPlan",
            Phase::Select,
            15,
            select_from_plan_applies,
            select_from_plan_effect,
        ),
        Rule::new("Fallback", Phase::Select, 1, fallback_applies, fallback_effect),
    ]
}

fn has_unmet_prerequisite(ctx: &RuleContext, q: &Question) -> Option<Question> {
    for candidate in &ctx.state.private.issues {
        if candidate.id == q.id {
            continue;
        }
        if ctx.domain.depends(q, candidate) && !is_committed(ctx, candidate) {
            return Some(candidate.clone());
        }
    }
    None
}

fn is_committed(ctx: &RuleContext, q: &Question) -> bool {
    ctx.state.shared.commitments.iter().any(|p| {
        ctx.domain
            .get_question_from_commitment(p)
            .map(|q2| q2.predicate() == q.predicate())
            .unwrap_or(false)
    })
}

// --- Rule 4.3 — IssueClarification (priority 25) ---

fn clarification_applies(ctx: &RuleContext) -> bool {
    ctx.state.shared.qud_top().is_some() && ctx.state.control.pending_clarification.is_some()
}

fn clarification_effect(ctx: &RuleContext) -> Result<InformationState, EngineError> {
    let mut next = ctx.state.clone();
    let target_id = next.control.pending_clarification.take().ok_or_else(|| {
        EngineError::InvariantViolation {
            invariant: "clarification-precondition".to_string(),
            detail: "IssueClarification fired with no pending clarification".to_string(),
        }
    })?;
    let target = next
        .shared
        .qud
        .iter()
        .find(|q| q.id == target_id)
        .cloned()
        .ok_or_else(|| EngineError::InvariantViolation {
            invariant: "clarification-target".to_string(),
            detail: format!("pending clarification refers to unknown question {target_id}"),
        })?;
    let clarifying = ctx.domain.clarification_for(&target);
    next.shared.qud_push(clarifying.clone());
    next.private
        .agenda
        .push_back(Move::system(MoveKind::Ask(clarifying)));
    Ok(next)
}

// --- Rule 4.4 — DependentIssueAccommodation (priority 22) ---

fn dependent_issue_applies(ctx: &RuleContext) -> bool {
    match ctx.state.private.issues.first() {
        Some(q) => has_unmet_prerequisite(ctx, q).is_some(),
        None => false,
    }
}

fn dependent_issue_effect(ctx: &RuleContext) -> Result<InformationState, EngineError> {
    let mut next = ctx.state.clone();
    let head = next
        .private
        .issues
        .first()
        .cloned()
        .ok_or_else(|| EngineError::InvariantViolation {
            invariant: "dependent-issue-precondition".to_string(),
            detail: "DependentIssueAccommodation fired with empty issues".to_string(),
        })?;
    let prereq = has_unmet_prerequisite(ctx, &head).ok_or_else(|| EngineError::InvariantViolation {
        invariant: "dependent-issue-precondition".to_string(),
        detail: "DependentIssueAccommodation fired with no unmet prerequisite".to_string(),
    })?;
    let prereq_id = prereq.id;
    if let Some(pos) = next.private.issues.iter().position(|q| q.id == prereq_id) {
        let prereq = next.private.issues.remove(pos);
        next.private.issues.insert(0, prereq);
    }
    Ok(next)
}

// --- Rule 4.2 — LocalQuestionAccommodation (priority 20) ---

fn local_question_applies(ctx: &RuleContext) -> bool {
    ctx.state.shared.qud.is_empty()
        && match ctx.state.private.issues.first() {
            Some(q) => has_unmet_prerequisite(ctx, q).is_none(),
            None => false,
        }
}

fn local_question_effect(ctx: &RuleContext) -> Result<InformationState, EngineError> {
    let mut next = ctx.state.clone();
    let q = next.private.issues.remove(0);
    next.shared.qud_push(q.clone());
    next.private.agenda.push_back(Move::system(MoveKind::Ask(q)));
    Ok(next)
}

// --- SelectFromPlan (priority 15) ---

fn select_from_plan_applies(ctx: &RuleContext) -> bool {
    if !ctx.state.private.agenda.is_empty() {
        return false;
    }
    match ctx.state.private.plan_head() {
        Some(step) => match &step.kind {
            PlanStepKind::Perform(action) => action.preconditions_met(&ctx.state.shared.commitments)
                && !ctx
                    .state
                    .private
                    .actions
                    .iter()
                    .any(|queued| queued.id == action.id),
            _ => false,
        },
        None => false,
    }
}

fn select_from_plan_effect(ctx: &RuleContext) -> Result<InformationState, EngineError> {
    let mut next = ctx.state.clone();
    if let Some(PlanStepKind::Perform(action)) = next.private.plan_head().map(|s| s.kind.clone()) {
        next.private.actions.push_back(action);
    }
    Ok(next)
}

// --- Fallback (priority 1) ---

fn plan_complete(ctx: &RuleContext) -> bool {
    ctx.state.private.plan.iter().all(|s| s.is_terminal())
        && ctx.state.private.actions.is_empty()
        && ctx.state.private.issues.is_empty()
        && ctx.state.shared.qud.is_empty()
}

fn fallback_applies(ctx: &RuleContext) -> bool {
    // Agenda-empty alone isn't enough: `SelectFromPlan` can queue an action
    // into `private.actions` without touching the agenda, and that action
    // still needs a dispatch round (`Engine::select`'s outer loop) before
    // anything is actually done. Without this, Fallback would claim the
    // same fixpoint pass that just queued the action.
    //
    // `is_active()` guards the completed-plan branch: once Fallback has
    // already ended the dialogue, the agenda/actions stay empty forever,
    // so without this check the rule would match its own no-op effect on
    // every following cycle.
    ctx.state.is_active() && ctx.state.private.agenda.is_empty() && ctx.state.private.actions.is_empty()
}

fn fallback_effect(ctx: &RuleContext) -> Result<InformationState, EngineError> {
    let mut next = ctx.state.clone();
    if plan_complete(ctx) {
        next.control.dialogue_state = crate::types::DialogueState::Ended;
    } else {
        let prompt = Question::wh("_", "next_goal");
        next.private.agenda.push_back(Move::system(MoveKind::Ask(prompt)));
    }
    Ok(next)
}
