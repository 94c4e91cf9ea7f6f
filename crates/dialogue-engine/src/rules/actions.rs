//! IBiS4 action and negotiation rules (spec §4.6).
//!
//! `ExecuteAction` itself is not a pure rule here: calling the device
//! adapter is an I/O boundary (spec §5 "suspension points... at
//! boundaries with external adapters"), and a `Rule`'s effect is a pure
//! `fn(&RuleContext) -> InformationState` with no adapter handle in scope.
//! The engine driver (`crate::engine`) performs the dispatch itself,
//! between Select-phase fixpoint iterations, and feeds the outcome back as
//! an `ActionSucceeded`/`ActionFailed` move for the rules below to
//! integrate — exactly the "synthetic move fed back into the next
//! Integrate cycle" the spec's `MoveKind` doc comment describes. What
//! lives here as ordinary rules is everything either side of that
//! boundary: admitting/rejecting a request, integrating the outcome, and
//! the negotiation sketch (spec §9: "IBiS4 rules 5.4 and 5.5 are sketched
//! minimally... the spec records only the contract needed").

use crate::types::{
    Action, EngineError, InformationState, Move, MoveKind, PlanStepKind, Proposition, Question,
    StepStatus, Term,
};

use super::{Phase, Rule, RuleContext};

pub fn rules() -> Vec<Rule> {
    vec![
        Rule::new(
            "IntegrateRequest",
            Phase::Integrate,
            10,
            integrate_request_applies,
            integrate_request_effect,
        ),
        Rule::new(
            "RejectRequest",
            Phase::Integrate,
            9,
            reject_request_applies,
            reject_request_effect,
        ),
        Rule::new(
            "ActionSucceededIntegration",
            Phase::Integrate,
            19,
            action_succeeded_applies,
            action_succeeded_effect,
        ),
        Rule::new(
            "ActionFailedIntegration",
            Phase::Integrate,
            19,
            action_failed_applies,
            action_failed_effect,
        ),
        Rule::new(
            "IntroduceAlternative",
            Phase::Integrate,
            11,
            introduce_alternative_applies,
            introduce_alternative_effect,
        ),
        Rule::new(
            "AcceptAlternative",
            Phase::Integrate,
            17,
            accept_alternative_applies,
            accept_alternative_effect,
        ),
        Rule::new(
            "SelectNegotiationQuestion",
            Phase::Select,
            18,
            select_negotiation_applies,
            select_negotiation_effect,
        ),
    ]
}

// --- IntegrateRequest (priority 10) ---

fn integrate_request_applies(ctx: &RuleContext) -> bool {
    match ctx.inbound.map(|m| &m.kind) {
        Some(MoveKind::PerformRequest(action)) => {
            action.preconditions_met(&ctx.state.shared.commitments)
                && !ctx.state.private.actions.iter().any(|a| a.id == action.id)
        }
        _ => false,
    }
}

fn integrate_request_effect(ctx: &RuleContext) -> Result<InformationState, EngineError> {
    let mut next = ctx.state.clone();
    if let Some(MoveKind::PerformRequest(action)) = ctx.inbound.map(|m| &m.kind) {
        next.private.actions.push_back(action.clone());
    }
    Ok(next)
}

// --- RejectRequest (priority 9) ---

fn reject_request_applies(ctx: &RuleContext) -> bool {
    match ctx.inbound.map(|m| &m.kind) {
        Some(MoveKind::PerformRequest(action)) => {
            !action.preconditions_met(&ctx.state.shared.commitments)
        }
        _ => false,
    }
}

fn reject_request_effect(ctx: &RuleContext) -> Result<InformationState, EngineError> {
    let mut next = ctx.state.clone();
    if let Some(MoveKind::PerformRequest(action)) = ctx.inbound.map(|m| &m.kind) {
        let reason = Proposition::new(
            "not_feasible",
            vec![Term::symbol(action.name.clone()), Term::text("missing preconditions")],
        );
        next.private.agenda.push_back(Move::system(MoveKind::Assert(reason)));
    }
    Ok(next)
}

// --- ActionSucceeded / ActionFailed integration (priority 19) ---

fn find_perform_step<'a>(state: &'a InformationState, action_id: crate::types::ActionId) -> Option<usize> {
    state.private.plan.iter().position(|step| {
        matches!(&step.kind, PlanStepKind::Perform(a) if a.id == action_id)
    })
}

fn action_succeeded_applies(ctx: &RuleContext) -> bool {
    matches!(ctx.inbound.map(|m| &m.kind), Some(MoveKind::ActionSucceeded { .. }))
}

fn action_succeeded_effect(ctx: &RuleContext) -> Result<InformationState, EngineError> {
    let mut next = ctx.state.clone();
    if let Some(MoveKind::ActionSucceeded { action }) = ctx.inbound.map(|m| &m.kind) {
        if let Some(pos) = next.private.actions.iter().position(|a| a.id == *action) {
            let completed = next.private.actions.remove(pos).ok_or_else(|| {
                EngineError::InvariantViolation {
                    invariant: "action-queue".to_string(),
                    detail: "action vanished from queue between lookup and removal".to_string(),
                }
            })?;
            for postcondition in &completed.postconditions {
                next.shared.add_commitment(postcondition.clone());
            }
            if let Some(idx) = find_perform_step(&next, completed.id) {
                next.private.plan[idx].status = StepStatus::Completed;
            }
        }
    }
    Ok(next)
}

fn action_failed_applies(ctx: &RuleContext) -> bool {
    matches!(ctx.inbound.map(|m| &m.kind), Some(MoveKind::ActionFailed { .. }))
}

fn action_failed_effect(ctx: &RuleContext) -> Result<InformationState, EngineError> {
    let mut next = ctx.state.clone();
    if let Some(MoveKind::ActionFailed { action, reason }) = ctx.inbound.map(|m| &m.kind) {
        if let Some(pos) = next.private.actions.iter().position(|a| a.id == *action) {
            let failed = next.private.actions.remove(pos).ok_or_else(|| {
                EngineError::InvariantViolation {
                    invariant: "action-queue".to_string(),
                    detail: "action vanished from queue between lookup and removal".to_string(),
                }
            })?;
            // Optimistic commitments are never added before success in this
            // engine (see crate::engine's ExecuteAction dispatch), so there
            // is nothing tentative to roll back here beyond the queue entry.
            if let Some(idx) = find_perform_step(&next, failed.id) {
                next.private.plan[idx].status = StepStatus::Abandoned;
            }
        }
        let assertion = Proposition::new(
            "failure",
            vec![Term::symbol(format!("action:{}", action)), Term::text(reason.clone())],
        );
        next.private.agenda.push_back(Move::system(MoveKind::Assert(assertion)));
    }
    Ok(next)
}

// --- Negotiation sketch (spec §4.6 IntroduceAlternative) ---

/// Reuses `DomainModel::sorts` to enumerate a `Consult` step's candidate
/// instances: the contract already exists for enumerated validation (spec
/// §4.7), and a domain with more than one value for the query predicate is
/// exactly "multiple satisfying instances for a constraint".
fn consult_alternatives(ctx: &RuleContext, query: &Proposition) -> Vec<Proposition> {
    ctx.domain
        .sorts(&query.predicate)
        .into_iter()
        .map(|value| Proposition::new(query.predicate.clone(), vec![value]))
        .collect()
}

fn introduce_alternative_applies(ctx: &RuleContext) -> bool {
    match ctx.state.private.plan_head() {
        Some(step) => match &step.kind {
            PlanStepKind::Consult { query, .. } => {
                step.status == StepStatus::Active
                    && ctx.state.private.iun.is_empty()
                    && consult_alternatives(ctx, query).len() > 1
            }
            _ => false,
        },
        None => false,
    }
}

fn introduce_alternative_effect(ctx: &RuleContext) -> Result<InformationState, EngineError> {
    let mut next = ctx.state.clone();
    let query = match next.private.plan_head() {
        Some(step) => match &step.kind {
            PlanStepKind::Consult { query, .. } => query.clone(),
            _ => {
                return Err(EngineError::InvariantViolation {
                    invariant: "introduce-alternative-precondition".to_string(),
                    detail: "plan head is not a Consult step".to_string(),
                })
            }
        },
        None => {
            return Err(EngineError::InvariantViolation {
                invariant: "introduce-alternative-precondition".to_string(),
                detail: "plan is empty".to_string(),
            })
        }
    };
    let alternatives = consult_alternatives(ctx, &query);
    next.private.iun = alternatives;
    if let Some(head) = next.private.plan_head_mut() {
        head.status = StepStatus::Accommodated;
    }
    Ok(next)
}

// --- SelectNegotiationQuestion (Select phase, priority 18) ---
//
// Orders alternatives by `domain.dominates` so the preferred one reads
// first, the tie-break the spec asks for when "the user requests a
// recommendation" (spec §4.6) — expressed here as a presentation-order
// hint rather than a dedicated recommend move, since the move algebra
// (spec §3) has no `recommend` kind of its own.

fn rank_alternatives(ctx: &RuleContext, alternatives: &[Proposition]) -> Vec<Proposition> {
    let mut ranked = alternatives.to_vec();
    ranked.sort_by(|a, b| {
        if ctx.domain.dominates(a, b) {
            std::cmp::Ordering::Less
        } else if ctx.domain.dominates(b, a) {
            std::cmp::Ordering::Greater
        } else {
            std::cmp::Ordering::Equal
        }
    });
    ranked
}

fn select_negotiation_applies(ctx: &RuleContext) -> bool {
    !ctx.state.private.iun.is_empty()
        && !ctx
            .state
            .shared
            .qud
            .iter()
            .any(|q| matches!(&q.shape, crate::types::QuestionShape::Alt { .. }))
}

fn select_negotiation_effect(ctx: &RuleContext) -> Result<InformationState, EngineError> {
    let mut next = ctx.state.clone();
    let alternatives = rank_alternatives(ctx, &next.private.iun);
    let question = Question::alt(alternatives);
    next.shared.qud_push(question.clone());
    next.private.agenda.push_back(Move::system(MoveKind::Ask(question)));
    Ok(next)
}

// --- AcceptAlternative (priority 17) ---

fn accept_alternative_applies(ctx: &RuleContext) -> bool {
    if ctx.state.private.iun.is_empty() {
        return false;
    }
    let Some(top) = ctx.state.shared.qud_top() else {
        return false;
    };
    if !matches!(&top.shape, crate::types::QuestionShape::Alt { .. }) {
        return false;
    }
    match ctx.inbound.map(|m| &m.kind) {
        Some(MoveKind::Answer(a)) => ctx.domain.resolves(a, top),
        _ => false,
    }
}

fn accept_alternative_effect(ctx: &RuleContext) -> Result<InformationState, EngineError> {
    let mut next = ctx.state.clone();
    let MoveKind::Answer(answer) = ctx.inbound.map(|m| &m.kind).ok_or_else(|| {
        EngineError::InvariantViolation {
            invariant: "accept-alternative-precondition".to_string(),
            detail: "AcceptAlternative fired with no inbound answer".to_string(),
        }
    })? else {
        return Err(EngineError::InvariantViolation {
            invariant: "accept-alternative-precondition".to_string(),
            detail: "AcceptAlternative fired with non-answer inbound".to_string(),
        });
    };
    let chosen = next
        .private
        .iun
        .iter()
        .find(|p| answer.as_value().map(|v| p.args.first() == Some(v)).unwrap_or(false))
        .cloned();
    next.private.iun.clear();
    next.shared.qud_pop();
    if let Some(p) = chosen {
        next.shared.add_commitment(p);
    }
    if let Some(head) = next.private.plan_head_mut() {
        if matches!(head.kind, PlanStepKind::Consult { .. }) {
            head.status = StepStatus::Completed;
        }
    }
    Ok(next)
}

/// Helper re-exported for the engine driver's dispatch boundary: builds
/// the queued action a `SelectFromPlan`/`IntegrateRequest` firing leaves at
/// the head of `private.actions`, ready for `crate::engine` to hand to the
/// [`crate::adapters::DeviceAdapter`].
pub fn next_dispatchable(state: &InformationState) -> Option<&Action> {
    state.private.actions.front()
}
