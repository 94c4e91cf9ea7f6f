//! IBiS3 accommodation and reaccommodation rules (spec §4.3): Rule 4.1
//! (IssueAccommodation), Rule 4.6 (QuestionReaccommodation), Rule 4.7
//! (RetractIncompatibleCommitment), and Rule 4.8
//! (DependentQuestionReaccommodation), plus the staging cleanup that lets
//! 4.6-4.8 hand off to one another across single-rule-per-cycle turns.

use crate::types::{
    Answer, AnswerContent, EngineError, InformationState, MoveKind, PlanStepKind, Proposition,
    Question, StepStatus,
};

use super::{Phase, Rule, RuleContext};

pub fn rules() -> Vec<Rule> {
    vec![
        Rule::new(
            "QuestionReaccommodation",
            Phase::Integrate,
            15,
            reaccommodation_applies,
            reaccommodation_effect,
        ),
        Rule::new(
            "RetractIncompatibleCommitment",
            Phase::Integrate,
            14,
            retract_applies,
            retract_effect,
        ),
        Rule::new(
            "DependentQuestionReaccommodation",
            Phase::Integrate,
            13,
            dependent_reaccommodation_applies,
            dependent_reaccommodation_effect,
        ),
        Rule::new(
            "IssueAccommodation",
            Phase::Integrate,
            11,
            issue_accommodation_applies,
            issue_accommodation_effect,
        ),
        Rule::new(
            "ClearRetractionStaging",
            Phase::Integrate,
            2,
            clear_staging_applies,
            clear_staging_effect,
        ),
    ]
}

/// Is `q` already addressed, i.e. present in `issues`, `qud`, or
/// represented by a committed proposition (spec Rule 4.1 precondition)?
fn already_addressed(ctx: &RuleContext, q: &Question) -> bool {
    ctx.state.private.has_issue(q.id)
        || ctx.state.shared.qud.iter().any(|existing| existing.id == q.id)
        || ctx.state.shared.commitments.iter().any(|p| {
            ctx.domain
                .get_question_from_commitment(p)
                .map(|q2| q2.predicate() == q.predicate())
                .unwrap_or(false)
        })
}

fn push_issue_if_absent(state: &mut InformationState, q: Question) {
    if !state.private.has_issue(q.id) {
        state.private.issues.push(q);
    }
}

/// The proposition a self-describing answer names directly, independent of
/// any currently pending question — e.g. a correction like "actually April
/// 4" for a predicate already committed and long since off `qud`/`issues`.
/// Spec Rule 4.6 reads "inbound `answer(A)` produces proposition `p`"; for
/// an ordinary elliptical value-answer that only makes sense relative to
/// `top(qud)`/some open issue, which neither applies here by assumption.
fn inbound_answer_proposition(ctx: &RuleContext) -> Option<Proposition> {
    match ctx.inbound.map(|m| &m.kind) {
        Some(MoveKind::Answer(Answer {
            content: AnswerContent::Proposition { predicate, args },
            ..
        })) => Some(Proposition::new(predicate.clone(), args.clone())),
        _ => None,
    }
}

/// Find a commitment `p'` incompatible with either the inbound answer's own
/// proposition (Rule 4.6's ordinary case: a correction to an
/// already-resolved, no-longer-open question) or, failing that, with
/// another existing commitment (covers a conflict introduced by two moves
/// in the same turn before either was individually checked). Returns
/// `(p'.clone(), question_of(p'))`.
fn find_incompatible_pair(ctx: &RuleContext) -> Option<(Proposition, Question)> {
    let commitments = &ctx.state.shared.commitments;
    if let Some(p) = inbound_answer_proposition(ctx) {
        for p2 in commitments {
            if ctx.domain.incompatible(&p, p2) {
                if let Some(q) = ctx.domain.get_question_from_commitment(p2) {
                    return Some((p2.clone(), q));
                }
            }
        }
    }
    for (i, p) in commitments.iter().enumerate() {
        for p2 in commitments.iter().skip(i + 1) {
            if ctx.domain.incompatible(p, p2) {
                if let Some(q) = ctx.domain.get_question_from_commitment(p2) {
                    return Some((p2.clone(), q));
                }
                if let Some(q) = ctx.domain.get_question_from_commitment(p) {
                    return Some((p.clone(), q));
                }
            }
        }
    }
    None
}

// --- Rule 4.6 — QuestionReaccommodation (priority 15) ---

fn reaccommodation_applies(ctx: &RuleContext) -> bool {
    ctx.state.control.staged_retraction.is_none() && find_incompatible_pair(ctx).is_some()
}

fn reaccommodation_effect(ctx: &RuleContext) -> Result<InformationState, EngineError> {
    let mut next = ctx.state.clone();
    let (stale, question) = find_incompatible_pair(ctx).ok_or_else(|| EngineError::InvariantViolation {
        invariant: "reaccommodation-precondition".to_string(),
        detail: "QuestionReaccommodation fired with no incompatible pair".to_string(),
    })?;
    next.control.staged_retraction = Some(stale);
    push_issue_if_absent(&mut next, question);
    Ok(next)
}

// --- Rule 4.7 — RetractIncompatibleCommitment (priority 14) ---

fn retract_applies(ctx: &RuleContext) -> bool {
    ctx.state.control.staged_retraction.is_some()
}

fn retract_effect(ctx: &RuleContext) -> Result<InformationState, EngineError> {
    let mut next = ctx.state.clone();
    let stale = next.control.staged_retraction.take().ok_or_else(|| {
        EngineError::InvariantViolation {
            invariant: "retract-precondition".to_string(),
            detail: "RetractIncompatibleCommitment fired with no staged retraction".to_string(),
        }
    })?;
    next.shared.remove_commitment(&stale);
    next.control.just_retracted = Some(stale);
    Ok(next)
}

// --- Rule 4.8 — DependentQuestionReaccommodation (priority 13) ---

/// The dependent commitment to retract next, if `just_retracted`'s question
/// has anything depending on it among the current commitments.
fn find_dependent(ctx: &RuleContext) -> Option<Proposition> {
    let retracted = ctx.state.control.just_retracted.as_ref()?;
    let base_question = ctx.domain.get_question_from_commitment(retracted)?;
    for p in &ctx.state.shared.commitments {
        if let Some(q) = ctx.domain.get_question_from_commitment(p) {
            if ctx.domain.depends(&q, &base_question) {
                return Some(p.clone());
            }
        }
    }
    None
}

fn dependent_reaccommodation_applies(ctx: &RuleContext) -> bool {
    ctx.state.control.just_retracted.is_some() && find_dependent(ctx).is_some()
}

fn dependent_reaccommodation_effect(ctx: &RuleContext) -> Result<InformationState, EngineError> {
    let mut next = ctx.state.clone();
    let dependent = find_dependent(ctx).ok_or_else(|| EngineError::InvariantViolation {
        invariant: "dependent-reaccommodation-precondition".to_string(),
        detail: "DependentQuestionReaccommodation fired with no dependent commitment".to_string(),
    })?;
    next.shared.remove_commitment(&dependent);
    if let Some(q) = ctx.domain.get_question_from_commitment(&dependent) {
        push_issue_if_absent(&mut next, q);
    }
    // Hand off to the next cascade step: does anything depend on *this*
    // freshly retracted commitment? Bounded by the DAG invariant on
    // `depends` (spec §4.7), so this terminates.
    next.control.just_retracted = Some(dependent);
    Ok(next)
}

// --- Staging cleanup: terminate the 4.6-4.8 cascade once nothing else depends ---

fn clear_staging_applies(ctx: &RuleContext) -> bool {
    ctx.state.control.just_retracted.is_some()
}

fn clear_staging_effect(ctx: &RuleContext) -> Result<InformationState, EngineError> {
    let mut next = ctx.state.clone();
    next.control.just_retracted = None;
    Ok(next)
}

// --- Rule 4.1 — IssueAccommodation (priority 11) ---
//
// Spec §4.1 states the precondition in terms of `head(private.plan)`, but
// scenarios S1/S2 (spec §8) show every upcoming `Findout` in a plan queued
// into `issues` as soon as the plan is formed, not one at a time as earlier
// steps complete ("issues ordered [parties, effective_date, governing_law]"
// after a single `request` turn, before any is answered). The plan head
// still governs *completion* order (`CompletePlanStep`, `SelectFromPlan`
// both key off `plan_head()` alone, so Invariant 3 — "plan head advances
// only after ... Completed" — is untouched); this rule instead scans every
// `Active` `Findout` step in plan order and accommodates the first one not
// yet addressed, so the whole chain of independent Findouts fills
// `issues` up front while `LocalQuestionAccommodation` still raises them to
// QUD one at a time.

fn next_accommodatable_findout(ctx: &RuleContext) -> Option<(usize, Question)> {
    ctx.state.private.plan.iter().enumerate().find_map(|(i, step)| match &step.kind {
        PlanStepKind::Findout(q) if step.status == StepStatus::Active && !already_addressed(ctx, q) => {
            Some((i, q.clone()))
        }
        _ => None,
    })
}

fn issue_accommodation_applies(ctx: &RuleContext) -> bool {
    next_accommodatable_findout(ctx).is_some()
}

fn issue_accommodation_effect(ctx: &RuleContext) -> Result<InformationState, EngineError> {
    let mut next = ctx.state.clone();
    let (idx, q) = next_accommodatable_findout(ctx).ok_or_else(|| EngineError::InvariantViolation {
        invariant: "issue-accommodation-precondition".to_string(),
        detail: "IssueAccommodation fired with no accommodatable Findout step".to_string(),
    })?;
    next.private.plan[idx].status = StepStatus::Accommodated;
    push_issue_if_absent_raw(&mut next.private.issues, q);
    Ok(next)
}

fn push_issue_if_absent_raw(issues: &mut Vec<Question>, q: Question) {
    if !issues.iter().any(|existing| existing.id == q.id) {
        issues.push(q);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::testing::MockDomain;
    use crate::types::{PlanStep, Term};

    fn base_state_with_plan(step: crate::types::PlanStep) -> InformationState {
        let mut state = InformationState::new("a1");
        state.private.plan = vec![step];
        state
    }

    #[test]
    fn issue_accommodation_queues_findout_head() {
        let question = Question::wh("x", "parties");
        let state = base_state_with_plan(PlanStep::findout(question.clone()));
        let domain = MockDomain::default();
        let config = EngineConfig::default();
        let ctx = RuleContext::new(&state, &domain, &config, None);
        assert!(issue_accommodation_applies(&ctx));
        let next = issue_accommodation_effect(&ctx).unwrap();
        assert_eq!(next.private.issues.len(), 1);
        assert_eq!(next.private.plan[0].status, StepStatus::Accommodated);
    }

    #[test]
    fn issue_accommodation_skips_already_committed_question() {
        let question = Question::wh("x", "parties");
        let mut state = base_state_with_plan(PlanStep::findout(question.clone()));
        state
            .shared
            .add_commitment(Proposition::new("parties", vec![Term::text("Acme")]));
        let domain = MockDomain::default();
        let config = EngineConfig::default();
        let ctx = RuleContext::new(&state, &domain, &config, None);
        assert!(!issue_accommodation_applies(&ctx));
    }

    #[test]
    fn reaccommodation_cascade_retracts_and_requeues() {
        let domain = MockDomain::travel_with_dependency();
        let config = EngineConfig::default();
        let mut state = InformationState::new("a1");
        state
            .shared
            .add_commitment(Proposition::new("depart_day", vec![Term::text("April 5")]));
        state
            .shared
            .add_commitment(Proposition::new("price_quote", vec![Term::text("Q1")]));
        // Introduce a conflicting depart_day commitment, as if answered again.
        state
            .shared
            .add_commitment(Proposition::new("depart_day", vec![Term::text("April 4")]));

        let ctx = RuleContext::new(&state, &domain, &config, None);
        assert!(reaccommodation_applies(&ctx));
        let after_stage = reaccommodation_effect(&ctx).unwrap();
        assert!(after_stage.control.staged_retraction.is_some());

        let ctx2 = RuleContext::new(&after_stage, &domain, &config, None);
        let after_retract = retract_effect(&ctx2).unwrap();
        assert!(!after_retract
            .shared
            .commitments
            .contains(&Proposition::new("depart_day", vec![Term::text("April 5")])));
        assert!(after_retract.control.just_retracted.is_some());

        let ctx3 = RuleContext::new(&after_retract, &domain, &config, None);
        assert!(dependent_reaccommodation_applies(&ctx3));
        let after_cascade = dependent_reaccommodation_effect(&ctx3).unwrap();
        assert!(!after_cascade
            .shared
            .commitments
            .contains(&Proposition::new("price_quote", vec![Term::text("Q1")])));
        assert!(after_cascade
            .private
            .issues
            .iter()
            .any(|q| q.predicate() == "price_quote"));
    }
}
