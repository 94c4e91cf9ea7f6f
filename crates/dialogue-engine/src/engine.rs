//! The engine driver (spec §4.1 "Engine driver"): the pure
//! `interpret`/`integrate`/`select`/`generate` transformations, assembled
//! into the turn-synchronous control loop spec §5 describes ("one
//! dialogue session processes one utterance at a time").
//!
//! `Engine` bundles the three things every turn needs that don't change
//! turn-to-turn — the [`RuleSet`], the [`DomainModel`], and the
//! [`EngineConfig`] — the way the teacher's long-lived services hold their
//! config and routing tables alongside a borrowed adapter set, rather than
//! threading five parameters through every call.

use std::sync::Arc;

use crate::adapters::{DeviceAdapter, ExecutionOutcome, NlgAdapter, NluAdapter};
use crate::config::{EngineConfig, GroundingStrategy};
use crate::domain::DomainModel;
use crate::rules::{default_rule_set, Phase, RuleContext, RuleSet};
use crate::types::{
    ActionStatus, AdapterError, EngineError, GroundingStatus, IcmKind, InformationState, Move,
    MoveKind, Speaker,
};

/// What a completed turn produced, beyond the updated [`InformationState`].
#[derive(Debug, Clone, Default)]
pub struct TurnOutput {
    /// Rendered system utterances, in emission order.
    pub utterances: Vec<String>,
}

/// Bundles the rule set, domain model, and configuration a session needs
/// for every turn. Adapters are passed per-turn rather than stored, since
/// a host may swap in a different NLU/NLG/Device implementation between
/// turns (e.g. a scripted adapter during tests, a live one in production)
/// without needing a new `Engine`.
pub struct Engine {
    rules: RuleSet,
    domain: Arc<dyn DomainModel>,
    config: EngineConfig,
}

impl Engine {
    pub fn new(domain: Arc<dyn DomainModel>, config: EngineConfig) -> Self {
        Self { rules: default_rule_set(), domain, config }
    }

    pub fn with_rule_set(domain: Arc<dyn DomainModel>, config: EngineConfig, rules: RuleSet) -> Self {
        Self { rules, domain, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// `interpret(utterance, state) -> (state, [Move])` (spec §4.1). The
    /// NLU adapter is consulted; a hard adapter failure becomes a soft,
    /// single `icm:per*neg` move rather than aborting the turn (spec §7
    /// kind 4: "AdapterFailure: soft; converted to an ICM move").
    pub fn interpret(
        &self,
        nlu: &dyn NluAdapter,
        utterance: &str,
        state: &InformationState,
    ) -> Vec<Move> {
        match nlu.interpret(utterance, state) {
            Ok(moves) => moves,
            Err(err) => {
                tracing::warn!(error = %err, "NLU adapter failed, degrading to perception-negative ICM");
                vec![Move::new(
                    MoveKind::Icm { kind: IcmKind::PerceptionNegative, target: None },
                    Speaker::User,
                    0.0,
                )]
            }
        }
    }

    /// `integrate(moves, state) -> state` (spec §4.1): for each inbound
    /// move, classify and record its grounding status, then iterate the
    /// Integrate-phase fixpoint to completion before moving to the next
    /// inbound move.
    pub fn integrate(
        &self,
        moves: Vec<Move>,
        mut state: InformationState,
    ) -> Result<InformationState, EngineError> {
        for mut mv in moves {
            let (status, icm) = classify_grounding(&mv, &self.config, self.domain.as_ref());
            mv.grounding_status = status;
            state.shared.record_move(mv.clone());

            if status != GroundingStatus::Grounded && matches!(mv.kind, MoveKind::Answer(_)) {
                if let Some(qid) = target_question(&state, &mv) {
                    state.control.pending_confirmation = Some((mv.timestamp, qid));
                }
            }
            if let Some(kind) = icm {
                let qid = target_question(&state, &mv);
                state.control.pending_grounding_icm = Some((mv.timestamp, kind, qid));
            }

            state = self.run_phase_fixpoint(Phase::Integrate, &state, Some(&mv))?;
            state.check_structural_invariants()?;
            self.check_no_incompatible_commitments(&state)?;
        }
        Ok(state)
    }

    /// `select(state) -> (state, [Move])` (spec §4.1): iterate the
    /// Select-phase fixpoint, dispatching the one impure step —
    /// `ExecuteAction` — at the boundary between iterations rather than as
    /// a `Rule` (see `crate::rules::actions` module docs).
    pub fn select(
        &self,
        device: Option<&dyn DeviceAdapter>,
        mut state: InformationState,
    ) -> Result<InformationState, EngineError> {
        let mut steps = 0u32;
        loop {
            let before = state.private.agenda.len();
            state = self.run_phase_fixpoint(Phase::Select, &state, None)?;

            if let Some(device) = device {
                if let Some(outcome_move) = self.dispatch_action(device, &state)? {
                    state = self.integrate(vec![outcome_move], state)?;
                    continue;
                }
            }

            steps += 1;
            if steps > self.config.max_phase_fixpoint_steps {
                return Err(EngineError::RuleNonterminationSuspected {
                    phase: Phase::Select,
                    steps,
                });
            }
            if state.private.agenda.len() == before {
                break;
            }
        }
        Ok(state)
    }

    /// `generate(moves, state) -> (state, [Utterance])` (spec §4.1):
    /// drains `private.agenda`, rendering each queued move via the NLG
    /// adapter and recording it into `shared` as the system's own
    /// last-moves window.
    pub fn generate(
        &self,
        nlg: &dyn NlgAdapter,
        mut state: InformationState,
    ) -> Result<(InformationState, Vec<String>), EngineError> {
        let mut utterances = Vec::new();
        while let Some(mv) = state.private.agenda.pop_front() {
            let template = question_template_for(&mv, self.domain.as_ref());
            let utterance = match nlg.generate(&mv, &state, template.as_ref()) {
                Ok(text) => text,
                Err(err) => {
                    tracing::warn!(error = %err, "NLG adapter failed, falling back to debug rendering");
                    format!("{:?}", mv.kind)
                }
            };
            utterances.push(utterance);
            state.shared.record_move(mv.clone());
            state.private.last_utterance = Some(mv);
        }
        Ok((state, utterances))
    }

    /// Runs one full turn: `interpret -> integrate -> select -> generate`.
    /// On any [`EngineError`] the pre-turn snapshot comes back alongside
    /// the error so the caller's dialogue session is never left without a
    /// state to retry or resume from (spec §7 "the engine rolls back the
    /// turn") — the caller, not the engine, decides whether to retry the
    /// same utterance, discard it, or surface the failure to the user.
    pub fn process_turn(
        &self,
        nlu: &dyn NluAdapter,
        nlg: &dyn NlgAdapter,
        device: Option<&dyn DeviceAdapter>,
        utterance: &str,
        state: InformationState,
    ) -> Result<(InformationState, TurnOutput), (EngineError, InformationState)> {
        let snapshot = state.clone();
        tracing::info!(turn_utterance = utterance, "turn started");

        let result = (move || {
            let moves = self.interpret(nlu, utterance, &state);
            let state = self.integrate(moves, state)?;
            let state = self.select(device, state)?;
            let (mut state, utterances) = self.generate(nlg, state)?;
            state.control.speaker = Speaker::System;
            state.control.next_speaker = Speaker::User;
            Ok(TurnOutput { utterances }).map(|out| (state, out))
        })();

        match result {
            Ok((state, out)) => {
                if !state.is_active() {
                    tracing::info!("dialogue ended");
                }
                Ok((state, out))
            }
            Err(err) if err.is_fatal_to_turn() => {
                tracing::error!(error = %err, "turn aborted, rolling back");
                Err((err, snapshot))
            }
            Err(err) => {
                tracing::warn!(error = %err, "soft failure mid-turn, rolling back defensively");
                Err((err, snapshot))
            }
        }
    }

    /// Scan-and-apply a single phase to its fixpoint (spec §4.1: "Phase
    /// application does not loop; higher-level orchestration may
    /// re-invoke the phase until no rule fires").
    fn run_phase_fixpoint(
        &self,
        phase: Phase,
        state: &InformationState,
        inbound: Option<&Move>,
    ) -> Result<InformationState, EngineError> {
        let mut current = state.clone();
        let mut steps = 0u32;
        loop {
            let ctx = RuleContext::new(&current, self.domain.as_ref(), &self.config, inbound);
            match self.rules.apply_phase(phase, &ctx)? {
                Some((next, name)) => {
                    tracing::debug!(rule = name, phase = ?phase, "applied");
                    // A rule firing with no observable effect on the state is
                    // not progress; treat it the same as no rule firing at
                    // all rather than spending the step budget on it. Rules
                    // are still expected to guard their own preconditions
                    // (spec §4.1) — this is a backstop, not a substitute.
                    if next == current {
                        break;
                    }
                    current = next;
                    steps += 1;
                    if steps > self.config.max_phase_fixpoint_steps {
                        return Err(EngineError::RuleNonterminationSuspected { phase, steps });
                    }
                }
                None => break,
            }
        }
        Ok(current)
    }

    fn check_no_incompatible_commitments(&self, state: &InformationState) -> Result<(), EngineError> {
        let commitments = &state.shared.commitments;
        for (i, p) in commitments.iter().enumerate() {
            for p2 in commitments.iter().skip(i + 1) {
                if self.domain.incompatible(p, p2) {
                    return Err(EngineError::InvariantViolation {
                        invariant: "no-incompatible-commitments".to_string(),
                        detail: format!("{p} incompatible with {p2}"),
                    });
                }
            }
        }
        Ok(())
    }

    /// The impure half of `ExecuteAction` (spec §4.6): if the Select
    /// fixpoint left an action at the head of `private.actions` marked
    /// `Executing` (set by the `DispatchAction`-shaped state the
    /// `SelectFromPlan` rule produces), run it through the device adapter
    /// and translate the outcome into a synthetic move for the next
    /// Integrate cycle.
    fn dispatch_action(
        &self,
        device: &dyn DeviceAdapter,
        state: &InformationState,
    ) -> Result<Option<Move>, EngineError> {
        let Some(action) = state.private.actions.front() else {
            return Ok(None);
        };
        if action.status == ActionStatus::Executing {
            return Ok(None);
        }
        if !device.check_preconditions(action, &state.shared.commitments) {
            return Ok(Some(Move::system(MoveKind::ActionFailed {
                action: action.id,
                reason: "device precondition check failed".to_string(),
            })));
        }
        match device.execute(action) {
            Ok(ExecutionOutcome::Success(_postconditions)) => {
                Ok(Some(Move::system(MoveKind::ActionSucceeded { action: action.id })))
            }
            Ok(ExecutionOutcome::Failure(reason)) => {
                Ok(Some(Move::system(MoveKind::ActionFailed { action: action.id, reason })))
            }
            Err(AdapterError::Device(reason)) => {
                Ok(Some(Move::system(MoveKind::ActionFailed { action: action.id, reason })))
            }
            Err(AdapterError::Timeout { adapter }) => {
                Ok(Some(Move::system(MoveKind::ActionFailed {
                    action: action.id,
                    reason: format!("{adapter} adapter timed out"),
                })))
            }
            Err(other) => Err(EngineError::AdapterFailure(other)),
        }
    }
}

/// Find the question a just-recorded move targets: its explicit
/// `question_ref` if the NLU adapter set one, else the current QUD top
/// (spec §4.5 scenario S5 holds back the top-of-QUD answer).
fn target_question(
    state: &InformationState,
    mv: &Move,
) -> Option<crate::types::QuestionId> {
    if let MoveKind::Answer(a) = &mv.kind {
        if let Some(qid) = a.question_ref {
            return Some(qid);
        }
    }
    state.shared.qud_top().map(|q| q.id)
}

/// Classify an inbound move's initial grounding status and, if the
/// strategy calls for it, the ICM to schedule in response (spec §4.5's
/// strategy table), with the critical-entity override folded in (spec
/// §4.5 "Spelling confirmation").
pub fn classify_grounding(
    mv: &Move,
    config: &EngineConfig,
    domain: &dyn DomainModel,
) -> (GroundingStatus, Option<IcmKind>) {
    // Spec §7 kind 6: uninterpretable input is not an error, it surfaces as
    // an inbound `icm:per*neg` directly, bypassing the strategy thresholds
    // entirely (there is no confidence worth weighing — the NLU adapter
    // could not form a move at all).
    if matches!(mv.kind, MoveKind::Uninterpretable { .. }) {
        return (GroundingStatus::Ungrounded, Some(IcmKind::PerceptionNegative));
    }
    if is_critical_and_uncertain(mv, config, domain) {
        return (GroundingStatus::Pending, Some(IcmKind::UnderstandingIntention));
    }

    let g = &config.grounding;
    match g.strategy {
        GroundingStrategy::Optimistic => (GroundingStatus::Grounded, None),
        GroundingStrategy::Cautious => {
            if mv.confidence >= g.grounded_threshold {
                (GroundingStatus::Grounded, None)
            } else if mv.confidence >= g.pending_threshold {
                (GroundingStatus::Pending, Some(IcmKind::UnderstandingIntention))
            } else {
                (GroundingStatus::Ungrounded, Some(IcmKind::UnderstandingNegative))
            }
        }
        GroundingStrategy::Pessimistic => {
            if mv.confidence >= g.grounded_threshold {
                (GroundingStatus::Pending, Some(IcmKind::UnderstandingPositive))
            } else {
                (GroundingStatus::Ungrounded, Some(IcmKind::PerceptionNegative))
            }
        }
    }
}

fn is_critical_and_uncertain(mv: &Move, config: &EngineConfig, _domain: &dyn DomainModel) -> bool {
    let predicate = match &mv.kind {
        MoveKind::Answer(crate::types::Answer {
            content: crate::types::AnswerContent::Proposition { predicate, .. },
            ..
        }) => Some(predicate.as_str()),
        _ => None,
    };
    match predicate {
        Some(p) => {
            config.critical_entity_predicates.contains(p) && mv.confidence < config.grounding.grounded_threshold
        }
        None => false,
    }
}

/// NLG template lookup for an outbound `Ask`; other move kinds render
/// without a template (spec §4.7 `question_template`, only defined for
/// questions).
fn question_template_for(mv: &Move, domain: &dyn DomainModel) -> Option<crate::domain::TemplateKey> {
    match &mv.kind {
        MoveKind::Ask(q) => Some(domain.question_template(q)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockDomain, ScriptedDevice, ScriptedNlu, TemplateNlg};
    use crate::types::{Answer, MoveKind, Speaker, Term};

    fn engine_with(domain: MockDomain) -> Engine {
        Engine::new(Arc::new(domain), EngineConfig::default())
    }

    #[test]
    fn classify_grounding_optimistic_always_grounds() {
        let mut config = EngineConfig::default();
        config.grounding.strategy = GroundingStrategy::Optimistic;
        let domain = MockDomain::default();
        let mv = Move::new(MoveKind::Greet, Speaker::User, 0.1);
        let (status, icm) = classify_grounding(&mv, &config, &domain);
        assert_eq!(status, GroundingStatus::Grounded);
        assert!(icm.is_none());
    }

    #[test]
    fn classify_grounding_uninterpretable_always_becomes_perception_negative() {
        let mut config = EngineConfig::default();
        config.grounding.strategy = GroundingStrategy::Optimistic;
        let domain = MockDomain::default();
        let mv = Move::new(MoveKind::Uninterpretable { raw: "asdf".to_string() }, Speaker::User, 1.0);
        let (status, icm) = classify_grounding(&mv, &config, &domain);
        assert_eq!(status, GroundingStatus::Ungrounded);
        assert_eq!(icm, Some(IcmKind::PerceptionNegative));
    }

    #[test]
    fn classify_grounding_cautious_low_confidence_is_ungrounded() {
        let config = EngineConfig::default();
        let domain = MockDomain::default();
        let mv = Move::new(MoveKind::Greet, Speaker::User, 0.2);
        let (status, icm) = classify_grounding(&mv, &config, &domain);
        assert_eq!(status, GroundingStatus::Ungrounded);
        assert_eq!(icm, Some(IcmKind::UnderstandingNegative));
    }

    #[test]
    fn full_turn_forms_plan_and_asks_first_question() {
        let engine = engine_with(MockDomain::nda());
        let nlu = ScriptedNlu::new(vec![vec![Move::new(
            MoveKind::Request { task: "nda".to_string() },
            Speaker::User,
            1.0,
        )]]);
        let nlg = TemplateNlg;
        let state = InformationState::new("a1");
        let (state, out) = engine
            .process_turn(&nlu, &nlg, None, "draft an nda", state)
            .unwrap();
        assert_eq!(state.shared.qud.len(), 1);
        assert_eq!(state.shared.qud_top().map(|q| q.predicate()), Some("parties"));
        assert_eq!(out.utterances, vec!["ask(parties)".to_string()]);
    }

    #[test]
    fn execute_action_success_advances_plan() {
        let engine = engine_with(MockDomain::travel());
        let mut state = InformationState::new("a1");
        let action = crate::types::Action::new("book", vec![])
            .with_postconditions(vec![crate::types::Proposition::atom("booked")]);
        state.private.plan = vec![crate::types::PlanStep::perform(action.clone())];
        state.private.actions.push_back(action);

        let device = ScriptedDevice::default();
        let state = engine.select(Some(&device), state).unwrap();
        assert!(state.shared.has_commitment(&crate::types::Proposition::atom("booked")));
        assert_eq!(state.private.plan[0].status, crate::types::StepStatus::Completed);
    }

    #[test]
    fn grounded_answer_commits_directly() {
        let mut config = EngineConfig::default();
        config.grounding.strategy = GroundingStrategy::Optimistic;
        let engine = Engine::with_rule_set(
            Arc::new(MockDomain::travel()),
            config,
            crate::rules::default_rule_set(),
        );
        let mut state = InformationState::new("a1");
        state.shared.qud_push(crate::types::Question::wh("x", "dest_city"));
        let answer = Answer::value(Term::text("Paris"), 0.99);
        let inbound = Move::new(MoveKind::Answer(answer), Speaker::User, 0.99);
        let next = engine.integrate(vec![inbound], state.clone()).unwrap();
        assert!(next.shared.commitments.iter().any(|p| p.predicate == "dest_city"));
    }
}
