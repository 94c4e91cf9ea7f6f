//! IBiS1 core integration rules (spec §4.2).

use crate::types::{
    DialogueState, EngineError, GroundingStatus, InformationState, MoveKind, PlanStepKind,
    Proposition, StepStatus,
};

use super::{Phase, Rule, RuleContext};

fn last_inbound<'a>(ctx: &'a RuleContext) -> Option<&'a MoveKind> {
    ctx.inbound.map(|m| &m.kind)
}

/// Answer content is only integrated once its move has reached `Grounded`
/// (spec §4.5 scenario S5: "commitments not yet updated" while `Pending`).
/// Ask/Assert/Greet are not gated this way; only answers are explicitly
/// held back by the spec's grounding scenario.
fn inbound_grounded(ctx: &RuleContext) -> bool {
    ctx.inbound
        .map(|m| m.grounding_status == GroundingStatus::Grounded)
        .unwrap_or(false)
}

pub fn rules() -> Vec<Rule> {
    vec![
        Rule::new("IntegrateGreet", Phase::Integrate, 20, greet_applies, greet_effect),
        Rule::new("IntegrateQuit", Phase::Integrate, 25, quit_applies, quit_effect),
        Rule::new("IntegrateAsk", Phase::Integrate, 18, ask_applies, ask_effect),
        Rule::new("IntegrateAssert", Phase::Integrate, 18, assert_applies, assert_effect),
        Rule::new(
            "IntegrateAnswerQud",
            Phase::Integrate,
            17,
            answer_qud_applies,
            answer_qud_effect,
        ),
        Rule::new(
            "IntegrateAnswerVolunteer",
            Phase::Integrate,
            17,
            answer_volunteer_applies,
            answer_volunteer_effect,
        ),
        Rule::new(
            "IntegrateAnswerNonResolving",
            Phase::Integrate,
            16,
            answer_non_resolving_applies,
            answer_non_resolving_effect,
        ),
        Rule::new(
            "FormTaskPlan",
            Phase::Integrate,
            12,
            form_task_plan_applies,
            form_task_plan_effect,
        ),
        Rule::new(
            "CompletePlanStep",
            Phase::Integrate,
            13,
            complete_plan_step_applies,
            complete_plan_step_effect,
        ),
    ]
}

// --- IntegrateGreet (priority 20) ---

fn greet_applies(ctx: &RuleContext) -> bool {
    matches!(last_inbound(ctx), Some(MoveKind::Greet))
        && ctx.state.is_active()
        && !ctx.state.shared.has_commitment(&Proposition::atom("greeted"))
}

fn greet_effect(ctx: &RuleContext) -> Result<InformationState, EngineError> {
    let mut next = ctx.state.clone();
    next.private
        .beliefs
        .insert("greeted".to_string(), crate::types::Term::Bool(true));
    next.shared.add_commitment(Proposition::atom("greeted"));
    Ok(next)
}

// --- IntegrateQuit (priority 25) ---

fn quit_applies(ctx: &RuleContext) -> bool {
    matches!(last_inbound(ctx), Some(MoveKind::Quit)) && ctx.state.is_active()
}

fn quit_effect(ctx: &RuleContext) -> Result<InformationState, EngineError> {
    let mut next = ctx.state.clone();
    next.control.dialogue_state = DialogueState::Ended;
    Ok(next)
}

// --- IntegrateAsk (priority 18) ---

fn ask_applies(ctx: &RuleContext) -> bool {
    match last_inbound(ctx) {
        Some(MoveKind::Ask(q)) => ctx.state.shared.qud_top().map(|top| top.id) != Some(q.id),
        _ => false,
    }
}

fn ask_effect(ctx: &RuleContext) -> Result<InformationState, EngineError> {
    let mut next = ctx.state.clone();
    if let Some(MoveKind::Ask(q)) = last_inbound(ctx) {
        next.shared.qud_push(q.clone());
    }
    Ok(next)
}

// --- IntegrateAssert (priority 18) ---

fn assert_applies(ctx: &RuleContext) -> bool {
    match last_inbound(ctx) {
        Some(MoveKind::Assert(p)) => {
            !ctx.state.shared.has_commitment(p)
                && !ctx
                    .state
                    .shared
                    .commitments
                    .iter()
                    .any(|existing| ctx.domain.incompatible(p, existing))
        }
        _ => false,
    }
}

fn assert_effect(ctx: &RuleContext) -> Result<InformationState, EngineError> {
    let mut next = ctx.state.clone();
    if let Some(MoveKind::Assert(p)) = last_inbound(ctx) {
        next.shared.add_commitment(p.clone());
    }
    Ok(next)
}

// --- IntegrateAnswer, QUD path (priority 17) ---

fn answer_qud_applies(ctx: &RuleContext) -> bool {
    if !inbound_grounded(ctx) {
        return false;
    }
    match last_inbound(ctx) {
        Some(MoveKind::Answer(a)) => ctx
            .state
            .shared
            .qud_top()
            .map(|q| ctx.domain.resolves(a, q))
            .unwrap_or(false),
        _ => false,
    }
}

fn answer_qud_effect(ctx: &RuleContext) -> Result<InformationState, EngineError> {
    let mut next = ctx.state.clone();
    if let Some(MoveKind::Answer(a)) = last_inbound(ctx) {
        let mut q = next.shared.qud_pop().ok_or_else(|| EngineError::InvariantViolation {
            invariant: "qud-stack".to_string(),
            detail: "AnswerQud fired with empty qud".to_string(),
        })?;
        // A clarification question answers for the question it refines
        // (spec §4.3: "both pop in order, commitment added"), not for its
        // own synthetic predicate — pop the refined question too and
        // commit against that instead.
        if q.is_clarification {
            if let Some(refined_id) = q.refines {
                if next.shared.qud_top().map(|top| top.id) == Some(refined_id) {
                    q = next.shared.qud_pop().ok_or_else(|| EngineError::InvariantViolation {
                        invariant: "qud-stack".to_string(),
                        detail: "AnswerQud expected refined question beneath its clarification".to_string(),
                    })?;
                }
            }
        }
        let p = ctx.domain.combines(&q, a);
        next.shared.add_commitment(p);
    }
    Ok(next)
}

// --- IntegrateAnswer, non-resolving path (priority 16) ---

fn answer_non_resolving_applies(ctx: &RuleContext) -> bool {
    if !inbound_grounded(ctx) {
        return false;
    }
    if ctx.state.control.pending_clarification.is_some() {
        return false;
    }
    match last_inbound(ctx) {
        Some(MoveKind::Answer(a)) => match ctx.state.shared.qud_top() {
            Some(q) => !ctx.domain.resolves(a, q) && ctx.domain.relevant(a, q),
            None => false,
        },
        _ => false,
    }
}

fn answer_non_resolving_effect(ctx: &RuleContext) -> Result<InformationState, EngineError> {
    let mut next = ctx.state.clone();
    if let Some(q) = next.shared.qud_top() {
        next.control.pending_clarification = Some(q.id);
    }
    Ok(next)
}

// --- FormTaskPlan (priority 12) ---

fn form_task_plan_applies(ctx: &RuleContext) -> bool {
    match last_inbound(ctx) {
        Some(MoveKind::Request { task }) => {
            ctx.domain.has_plan(task) && ctx.state.private.plan.is_empty()
        }
        _ => false,
    }
}

fn form_task_plan_effect(ctx: &RuleContext) -> Result<InformationState, EngineError> {
    let mut next = ctx.state.clone();
    if let Some(MoveKind::Request { task }) = last_inbound(ctx) {
        let plan = ctx.domain.build_plan(task, ctx.state);
        if plan.status == StepStatus::Abandoned && plan.subplans.is_empty() {
            return Err(EngineError::DomainContractError {
                operation: "build_plan".to_string(),
                reason: format!("domain reports has_plan(\"{task}\") but returned no usable plan"),
            });
        }
        next.private.plan = plan.flatten();
    }
    Ok(next)
}

// --- CompletePlanStep (priority 13) ---
//
// `IssueAccommodation`/`IntegrateAnswerQud`/`IntegrateAnswerVolunteer` queue
// a `Findout` step's question and later record its commitment, but none of
// them touch `private.plan` itself. This closes that loop: once a
// commitment exists for the plan head's question, the step is done, and
// `plan_head` (which skips terminal steps) advances to whatever comes next.

fn complete_plan_step_applies(ctx: &RuleContext) -> bool {
    match ctx.state.private.plan_head() {
        Some(step) => match &step.kind {
            PlanStepKind::Findout(q) => ctx
                .state
                .shared
                .commitments
                .iter()
                .any(|p| p.predicate == q.predicate()),
            _ => false,
        },
        None => false,
    }
}

fn complete_plan_step_effect(ctx: &RuleContext) -> Result<InformationState, EngineError> {
    let mut next = ctx.state.clone();
    let finished_issue = match next.private.plan_head() {
        Some(step) => match &step.kind {
            PlanStepKind::Findout(q) => Some(q.id),
            _ => None,
        },
        None => None,
    };
    if let Some(step) = next.private.plan_head_mut() {
        step.status = StepStatus::Completed;
    }
    if let Some(id) = finished_issue {
        next.private.remove_issue(id);
    }
    Ok(next)
}

// --- Volunteer-answer handling, integrated into IntegrateAnswer (priority 17) ---

fn answer_volunteer_applies(ctx: &RuleContext) -> bool {
    if !inbound_grounded(ctx) {
        return false;
    }
    match last_inbound(ctx) {
        Some(MoveKind::Answer(a)) => {
            let resolves_top = ctx
                .state
                .shared
                .qud_top()
                .map(|q| ctx.domain.resolves(a, q))
                .unwrap_or(false);
            !resolves_top
                && ctx
                    .state
                    .private
                    .issues
                    .iter()
                    .any(|q| ctx.domain.resolves(a, q))
        }
        _ => false,
    }
}

fn answer_volunteer_effect(ctx: &RuleContext) -> Result<InformationState, EngineError> {
    let mut next = ctx.state.clone();
    if let Some(MoveKind::Answer(a)) = last_inbound(ctx) {
        if let Some(pos) = next.private.issues.iter().position(|q| ctx.domain.resolves(a, q)) {
            let q = next.private.issues.remove(pos);
            let p = ctx.domain.combines(&q, a);
            next.shared.add_commitment(p);
        }
    }
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::testing::MockDomain;
    use crate::types::{Move, Question, Speaker};

    fn ctx_with<'a>(
        state: &'a InformationState,
        domain: &'a MockDomain,
        config: &'a EngineConfig,
        inbound: &'a Move,
    ) -> RuleContext<'a> {
        RuleContext::new(state, domain, config, Some(inbound))
    }

    #[test]
    fn greet_marks_belief_and_commitment() {
        let state = InformationState::new("a1");
        let domain = MockDomain::default();
        let config = EngineConfig::default();
        let inbound = Move::new(MoveKind::Greet, Speaker::User, 1.0);
        let ctx = ctx_with(&state, &domain, &config, &inbound);
        assert!(greet_applies(&ctx));
        let next = greet_effect(&ctx).unwrap();
        assert!(next.shared.has_commitment(&Proposition::atom("greeted")));
    }

    #[test]
    fn quit_does_not_reapply_once_the_dialogue_has_already_ended() {
        let domain = MockDomain::default();
        let config = EngineConfig::default();
        let mut state = InformationState::new("a1");
        state.control.dialogue_state = DialogueState::Ended;
        let inbound = Move::new(MoveKind::Quit, Speaker::User, 1.0);
        let ctx = ctx_with(&state, &domain, &config, &inbound);
        assert!(!quit_applies(&ctx));
    }

    #[test]
    fn ask_pushes_onto_qud() {
        let state = InformationState::new("a1");
        let domain = MockDomain::default();
        let config = EngineConfig::default();
        let question = Question::wh("x", "parties");
        let qid = question.id;
        let inbound = Move::new(MoveKind::Ask(question), Speaker::User, 1.0);
        let ctx = ctx_with(&state, &domain, &config, &inbound);
        let next = ask_effect(&ctx).unwrap();
        assert_eq!(next.shared.qud_top().map(|q| q.id), Some(qid));
    }

    #[test]
    fn ask_does_not_reapply_once_its_question_is_already_qud_top() {
        let domain = MockDomain::default();
        let config = EngineConfig::default();
        let question = Question::wh("x", "parties");
        let mut state = InformationState::new("a1");
        state.shared.qud_push(question.clone());
        let inbound = Move::new(MoveKind::Ask(question), Speaker::User, 1.0);
        let ctx = ctx_with(&state, &domain, &config, &inbound);
        assert!(!ask_applies(&ctx));
    }

    #[test]
    fn greet_does_not_reapply_once_already_greeted() {
        let domain = MockDomain::default();
        let config = EngineConfig::default();
        let mut state = InformationState::new("a1");
        state.shared.add_commitment(Proposition::atom("greeted"));
        let inbound = Move::new(MoveKind::Greet, Speaker::User, 1.0);
        let ctx = ctx_with(&state, &domain, &config, &inbound);
        assert!(!greet_applies(&ctx));
    }

    #[test]
    fn assert_does_not_reapply_once_the_proposition_is_already_committed() {
        let domain = MockDomain::default();
        let config = EngineConfig::default();
        let mut state = InformationState::new("a1");
        let p = Proposition::atom("greeted");
        state.shared.add_commitment(p.clone());
        let inbound = Move::new(MoveKind::Assert(p), Speaker::User, 1.0);
        let ctx = ctx_with(&state, &domain, &config, &inbound);
        assert!(!assert_applies(&ctx));
    }

    #[test]
    fn answer_non_resolving_does_not_reapply_once_a_clarification_is_pending() {
        use crate::types::{Answer, Constraint, Term};

        let domain = MockDomain::nda();
        let config = EngineConfig::default();
        let mut state = InformationState::new("a1");
        let parties = Question::wh_constrained(
            "x",
            "parties",
            vec![Constraint { sort: "party_name".to_string() }],
        );
        let qid = parties.id;
        state.shared.qud_push(parties);
        state.control.pending_clarification = Some(qid);

        let answer = Answer::value(Term::text("blue"), 0.95);
        let inbound = Move::new(MoveKind::Answer(answer), Speaker::User, 0.95)
            .with_status(GroundingStatus::Grounded);
        let ctx = ctx_with(&state, &domain, &config, &inbound);
        assert!(!answer_non_resolving_applies(&ctx));
    }

    #[test]
    fn volunteer_answer_resolves_issue_without_touching_qud() {
        use crate::testing::MockDomain;
        use crate::types::{Answer, Term};

        let domain = MockDomain::default();
        let config = EngineConfig::default();
        let qud_question = Question::wh("x", "dest_city");
        let issue_question = Question::wh("x", "class");
        let mut state = InformationState::new("a1");
        state.shared.qud_push(qud_question.clone());
        state.private.issues.push(issue_question);

        let answer = Answer::value(Term::text("economy"), 0.95);
        let inbound = Move::new(MoveKind::Answer(answer), Speaker::User, 0.95)
            .with_status(GroundingStatus::Grounded);
        let ctx = ctx_with(&state, &domain, &config, &inbound);
        assert!(answer_volunteer_applies(&ctx));
        let next = answer_volunteer_effect(&ctx).unwrap();
        assert!(next.private.issues.is_empty());
        assert_eq!(next.shared.qud_top().map(|q| q.id), Some(qud_question.id));
        assert!(next
            .shared
            .commitments
            .iter()
            .any(|p| p.predicate == "class"));
    }

    #[test]
    fn quit_ends_dialogue() {
        let state = InformationState::new("a1");
        let domain = MockDomain::default();
        let config = EngineConfig::default();
        let inbound = Move::new(MoveKind::Quit, Speaker::User, 1.0);
        let ctx = ctx_with(&state, &domain, &config, &inbound);
        let next = quit_effect(&ctx).unwrap();
        assert_eq!(next.control.dialogue_state, DialogueState::Ended);
    }
}
