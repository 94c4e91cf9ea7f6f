//! IBiS2 grounding rules (spec §4.5): ICM acceptance integration, the
//! reraise pair, and the Select-phase rule that turns a classification
//! decision (made by the engine driver's `integrate` step (a), spec §4.1)
//! into an outbound ICM move.
//!
//! The taxonomy-wide "twenty-seven ICM rules" the spec mentions collapse
//! here into a small, composable set: classification of *which* ICM kind
//! applies to an inbound move happens once, in
//! [`crate::engine::classify_grounding`], driven by [`IcmKind`]; these
//! rules only react to the outcome (hold back a commitment, reraise, ask
//! for acceptance) rather than re-deriving it per variant, since the
//! variants only differ in the template the NLG adapter picks.

use crate::types::{EngineError, GroundingStatus, IcmKind, InformationState, Move, MoveKind};

use super::{Phase, Rule, RuleContext};

pub fn rules() -> Vec<Rule> {
    vec![
        Rule::new(
            "IntegrateIcmAcceptance",
            Phase::Integrate,
            19,
            icm_acceptance_applies,
            icm_acceptance_effect,
        ),
        Rule::new(
            "ReraiseThresholdReached",
            Phase::Integrate,
            24,
            reraise_applies,
            reraise_effect,
        ),
        Rule::new(
            "AccumulateReraiseAttempt",
            Phase::Integrate,
            3,
            accumulate_applies,
            accumulate_effect,
        ),
        Rule::new(
            "GenerateGroundingIcm",
            Phase::Select,
            23,
            generate_icm_applies,
            generate_icm_effect,
        ),
    ]
}

// --- IntegrateIcmAcceptance (priority 19) ---
//
// Spec §4.5 scenario S5: "Upon user icm:acc, status -> Grounded,
// commitment applied." The held answer's content was never lost — it sits
// in `shared.moves` at the timestamp `pending_confirmation` recorded —
// so accepting it means replaying the same `resolves`/`combines` step
// `IntegrateAnswerQud` would have taken had the move arrived already
// grounded.

fn icm_acceptance_applies(ctx: &RuleContext) -> bool {
    let Some((_, qid)) = ctx.state.control.pending_confirmation else {
        return false;
    };
    match ctx.inbound.map(|m| &m.kind) {
        Some(MoveKind::Icm { kind: IcmKind::Acceptance, target }) => {
            target.is_none() || *target == Some(qid)
        }
        _ => false,
    }
}

fn icm_acceptance_effect(ctx: &RuleContext) -> Result<InformationState, EngineError> {
    let mut next = ctx.state.clone();
    let (ts, qid) = next
        .control
        .pending_confirmation
        .take()
        .ok_or_else(|| EngineError::InvariantViolation {
            invariant: "icm-acceptance-precondition".to_string(),
            detail: "IntegrateIcmAcceptance fired with no pending confirmation".to_string(),
        })?;
    next.control.reraise_counts.remove(&ts);
    next.shared.transition_move_status(ts, GroundingStatus::Grounded, false)?;

    let held = next
        .shared
        .find_move(ts)
        .cloned()
        .ok_or_else(|| EngineError::InvariantViolation {
            invariant: "icm-acceptance-target".to_string(),
            detail: format!("no recorded move at {ts}"),
        })?;
    let MoveKind::Answer(answer) = held.kind else {
        return Err(EngineError::InvariantViolation {
            invariant: "icm-acceptance-target".to_string(),
            detail: format!("move held at {ts} is not an answer"),
        });
    };
    let question = next
        .find_question(qid)
        .cloned()
        .ok_or_else(|| EngineError::InvariantViolation {
            invariant: "icm-acceptance-target".to_string(),
            detail: format!("no question {qid} in qud or issues"),
        })?;
    if ctx.domain.resolves(&answer, &question) {
        let proposition = ctx.domain.combines(&question, &answer);
        if next.shared.qud_top().map(|q| q.id) == Some(qid) {
            next.shared.qud_pop();
        } else {
            next.private.remove_issue(qid);
        }
        next.shared.add_commitment(proposition);
    }
    Ok(next)
}

// --- Reraise pair (spec §4.5 "A reraise rule (priority 24)") ---

fn reraise_applies(ctx: &RuleContext) -> bool {
    let Some((ts, _)) = ctx.state.control.pending_confirmation else {
        return false;
    };
    let count = ctx.state.control.reraise_counts.get(&ts).copied().unwrap_or(0);
    count >= ctx.config.max_reraise_attempts
}

fn reraise_effect(ctx: &RuleContext) -> Result<InformationState, EngineError> {
    let mut next = ctx.state.clone();
    let (ts, qid) = next
        .control
        .pending_confirmation
        .take()
        .ok_or_else(|| EngineError::InvariantViolation {
            invariant: "reraise-precondition".to_string(),
            detail: "ReraiseThresholdReached fired with no pending confirmation".to_string(),
        })?;
    next.control.reraise_counts.remove(&ts);
    // Reraise is the one sanctioned regression against Invariant 6.
    next.shared.transition_move_status(ts, GroundingStatus::Ungrounded, true)?;
    tracing::warn!(question = %qid, "reraise threshold reached, reinserting question");
    next.private.agenda.push_back(Move::system(MoveKind::Reraise { question: qid }));
    Ok(next)
}

fn accumulate_applies(ctx: &RuleContext) -> bool {
    let Some((ts, _)) = ctx.state.control.pending_confirmation else {
        return false;
    };
    let Some(inbound) = ctx.inbound else {
        return false;
    };
    if inbound.timestamp == ts {
        return false;
    }
    if matches!(inbound.kind, MoveKind::Icm { kind: IcmKind::Acceptance, .. }) {
        return false;
    }
    let count = ctx.state.control.reraise_counts.get(&ts).copied().unwrap_or(0);
    count < ctx.config.max_reraise_attempts
}

fn accumulate_effect(ctx: &RuleContext) -> Result<InformationState, EngineError> {
    let mut next = ctx.state.clone();
    let (ts, _) = next.control.pending_confirmation.ok_or_else(|| EngineError::InvariantViolation {
        invariant: "reraise-accumulate-precondition".to_string(),
        detail: "AccumulateReraiseAttempt fired with no pending confirmation".to_string(),
    })?;
    let count = next.control.reraise_counts.entry(ts).or_insert(0);
    *count += 1;
    Ok(next)
}

// --- GenerateGroundingIcm (Select phase, priority 23) ---

fn generate_icm_applies(ctx: &RuleContext) -> bool {
    ctx.state.control.pending_grounding_icm.is_some()
}

fn generate_icm_effect(ctx: &RuleContext) -> Result<InformationState, EngineError> {
    let mut next = ctx.state.clone();
    let (_, kind, target) = next
        .control
        .pending_grounding_icm
        .take()
        .ok_or_else(|| EngineError::InvariantViolation {
            invariant: "grounding-icm-precondition".to_string(),
            detail: "GenerateGroundingIcm fired with nothing pending".to_string(),
        })?;
    next.private.agenda.push_back(Move::system(MoveKind::Icm { kind, target }));
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::testing::MockDomain;
    use crate::types::{Answer, Question, Speaker, Term};

    #[test]
    fn icm_acceptance_commits_held_answer() {
        let domain = MockDomain::default();
        let config = EngineConfig::default();
        let mut state = InformationState::new("a1");
        let question = Question::wh("x", "dest_city");
        let qid = question.id;
        state.shared.qud_push(question);

        let held = Move::new(
            MoveKind::Answer(Answer::value(Term::text("Paris"), 0.7)),
            Speaker::User,
            0.7,
        )
        .with_status(GroundingStatus::Pending);
        let held_ts = held.timestamp;
        state.shared.record_move(held);
        state.control.pending_confirmation = Some((held_ts, qid));

        let inbound = Move::new(
            MoveKind::Icm { kind: IcmKind::Acceptance, target: None },
            Speaker::User,
            1.0,
        );
        let ctx = RuleContext::new(&state, &domain, &config, Some(&inbound));
        assert!(icm_acceptance_applies(&ctx));
        let next = icm_acceptance_effect(&ctx).unwrap();
        assert!(next.control.pending_confirmation.is_none());
        assert!(next.shared.qud.is_empty());
        assert!(next.shared.commitments.iter().any(|p| p.predicate == "dest_city"));
    }

    #[test]
    fn reraise_fires_once_threshold_reached() {
        let domain = MockDomain::default();
        let config = EngineConfig::default();
        let mut state = InformationState::new("a1");
        let question = Question::wh("x", "dest_city");
        let qid = question.id;
        state.shared.qud_push(question);
        let held = Move::new(
            MoveKind::Answer(Answer::value(Term::text("Paris"), 0.7)),
            Speaker::User,
            0.7,
        )
        .with_status(GroundingStatus::Pending);
        let held_ts = held.timestamp;
        state.shared.record_move(held);
        state.control.pending_confirmation = Some((held_ts, qid));
        state.control.reraise_counts.insert(held_ts, config.max_reraise_attempts);

        let inbound = Move::new(MoveKind::Greet, Speaker::User, 1.0);
        let ctx = RuleContext::new(&state, &domain, &config, Some(&inbound));
        assert!(!accumulate_applies(&ctx));
        assert!(reraise_applies(&ctx));
        let next = reraise_effect(&ctx).unwrap();
        assert!(next.control.pending_confirmation.is_none());
        assert_eq!(next.private.agenda.len(), 1);
    }
}
