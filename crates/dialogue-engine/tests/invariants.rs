//! Invariant and boundary-behavior checks (spec §8), driven through the
//! public engine API the way a host application would exercise it, rather
//! than poking at rule internals directly.
#![cfg(feature = "testing")]

use std::sync::Arc;

use dialogue_engine::testing::{MockDomain, ScriptedNlu, TemplateNlg};
use dialogue_engine::{
    Answer, AnswerContent, Engine, EngineConfig, InformationState, Move, MoveKind, Proposition,
    Question, Speaker, Term,
};

fn answer_value(text: &str, confidence: f32) -> Move {
    Move::new(MoveKind::Answer(Answer::value(Term::text(text), confidence)), Speaker::User, confidence)
}

fn request(task: &str) -> Move {
    Move::new(MoveKind::Request { task: task.to_string() }, Speaker::User, 1.0)
}

// --- QUD is a stack: pop always returns the most recently pushed element ---

#[test]
fn qud_pop_order_survives_a_full_turn_of_accommodation() {
    let engine = Engine::new(Arc::new(MockDomain::nda()), EngineConfig::default());
    let nlu = ScriptedNlu::new(vec![vec![request("nda")]]);
    let nlg = TemplateNlg;
    let state = InformationState::new("a1");

    let (state, _) = engine.process_turn(&nlu, &nlg, None, "draft an nda", state).unwrap();
    // Exactly one question is raised per turn (Rule LocalQuestionAccommodation
    // fires once per fixpoint pass, and nothing else pushes in the same
    // pass), so the stack never grows past depth 1 here, but the pop
    // contract ("last pushed, first popped") still must hold.
    assert_eq!(state.shared.qud.len(), 1);
    let top_before = state.shared.qud.last().cloned();
    let mut shared = state.shared;
    assert_eq!(shared.qud_pop(), top_before);
}

// --- Invariant 5: no two commitments are ever mutually incompatible ---

#[test]
fn engine_rejects_a_turn_that_would_introduce_incompatible_commitments() {
    let engine = Engine::new(Arc::new(MockDomain::travel()), EngineConfig::default());
    let nlg = TemplateNlg;

    // IntegrateAssert's own precondition already refuses to commit an
    // incompatible proposition, so drive that boundary directly: assert a
    // proposition that conflicts with an existing commitment and confirm
    // the commitment set is simply left unchanged rather than growing to
    // violate Invariant 5.
    let mut state = InformationState::new("a1");
    state.shared.add_commitment(Proposition::new("dest_city", vec![Term::text("Paris")]));

    let nlu = ScriptedNlu::new(vec![vec![Move::new(
        MoveKind::Assert(Proposition::new("dest_city", vec![Term::text("London")])),
        Speaker::User,
        1.0,
    )]]);
    let (state, _) = engine.process_turn(&nlu, &nlg, None, "actually London", state).unwrap();
    assert_eq!(
        state.shared.commitments.iter().filter(|p| p.predicate == "dest_city").count(),
        1,
        "an incompatible assertion must not be admitted alongside the existing commitment"
    );
    assert!(state.shared.commitments.contains(&Proposition::new("dest_city", vec![Term::text("Paris")])));
}

// --- Invariant 2 (narrow form): a question never sits in both issues and qud ---

#[test]
fn structural_invariant_holds_after_a_full_plan_accommodation_turn() {
    let engine = Engine::new(Arc::new(MockDomain::nda()), EngineConfig::default());
    let nlu = ScriptedNlu::new(vec![vec![request("nda")]]);
    let nlg = TemplateNlg;
    let state = InformationState::new("a1");
    let (state, _) = engine.process_turn(&nlu, &nlg, None, "draft an nda", state).unwrap();
    assert!(state.check_structural_invariants().is_ok());
    for issue in &state.private.issues {
        assert!(!state.shared.qud.iter().any(|q| q.id == issue.id));
    }
}

// --- Round-trip serialization ---

#[test]
fn information_state_serialization_round_trips() {
    let engine = Engine::new(Arc::new(MockDomain::travel_with_dependency()), EngineConfig::default());
    let nlu = ScriptedNlu::new(vec![
        vec![request("travel_booking")],
        vec![answer_value("Paris", 0.95)],
    ]);
    let nlg = TemplateNlg;
    let state = InformationState::new("a1");
    let (state, _) = engine.process_turn(&nlu, &nlg, None, "book a trip", state).unwrap();
    let (state, _) = engine.process_turn(&nlu, &nlg, None, "Paris", state).unwrap();

    let json = serde_json::to_string(&state).expect("serialize");
    let restored: InformationState = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(state, restored);
}

// --- Volunteer-answer idempotence ---

#[test]
fn integrating_the_same_answer_move_twice_is_a_no_op_the_second_time() {
    let engine = Engine::new(Arc::new(MockDomain::default()), EngineConfig::default());
    let mut state = InformationState::new("a1");
    state.shared.qud_push(Question::wh("x", "dest_city"));

    let answer = Move::new(
        MoveKind::Answer(Answer::value(Term::text("Paris"), 0.99)),
        Speaker::User,
        0.99,
    );
    let once = engine.integrate(vec![answer.clone()], state.clone()).unwrap();
    let twice = engine.integrate(vec![answer], once.clone()).unwrap();

    assert_eq!(once.shared.commitments, twice.shared.commitments);
    assert_eq!(once.private.issues, twice.private.issues);
    assert_eq!(once.shared.qud.len(), twice.shared.qud.len());
}

// --- Reaccommodation cascade terminates and is bounded by the dependency chain ---

#[test]
fn reaccommodation_cascade_terminates_without_exceeding_the_fixpoint_budget() {
    let engine = Engine::new(Arc::new(MockDomain::travel_with_dependency()), EngineConfig::default());
    let nlu = ScriptedNlu::new(vec![vec![Move::new(
        MoveKind::Answer(Answer {
            content: AnswerContent::Proposition {
                predicate: "depart_day".to_string(),
                args: vec![Term::text("April 4")],
            },
            certainty: 0.95,
            question_ref: None,
        }),
        Speaker::User,
        0.95,
    )]]);
    let nlg = TemplateNlg;
    let mut state = InformationState::new("a1");
    state.shared.add_commitment(Proposition::new("depart_day", vec![Term::text("April 5")]));
    state.shared.add_commitment(Proposition::new("price_quote", vec![Term::text("Q1")]));

    let (state, _) = engine.process_turn(&nlu, &nlg, None, "actually April 4", state).unwrap();
    assert!(!state.shared.commitments.iter().any(|p| p.predicate == "price_quote"));
    assert!(state.private.issues.iter().any(|q| q.predicate() == "price_quote"));
}

// --- Boundary: empty issues + empty qud + non-empty agenda -> only Fallback may fire ---

#[test]
fn fallback_is_the_only_rule_that_can_fire_with_nothing_else_pending() {
    let engine = Engine::new(Arc::new(MockDomain::default()), EngineConfig::default());
    let state = InformationState::new("a1");
    assert!(state.private.issues.is_empty());
    assert!(state.shared.qud.is_empty());
    let state = engine.select(None, state).unwrap();
    // Fallback prompts for a next goal since the (empty) plan counts as
    // complete but there is nothing else to end on in this fixture.
    assert_eq!(state.private.agenda.len(), 1);
}

// --- Boundary: Perform with unmet precondition must not fire SelectFromPlan ---

#[test]
fn select_from_plan_withholds_an_action_whose_precondition_is_unmet() {
    let engine = Engine::new(Arc::new(MockDomain::travel()), EngineConfig::default());
    let mut state = InformationState::new("a1");
    let action = dialogue_engine::Action::new("book", vec![])
        .with_preconditions(vec![Proposition::atom("dest_city")]);
    state.private.plan = vec![dialogue_engine::PlanStep::perform(action)];

    let state = engine.select(None, state).unwrap();
    assert!(state.private.actions.is_empty(), "action must stay unqueued until its precondition is met");
}

// --- Boundary: a non-resolving but relevant answer preserves QUD top, one clarification ---

#[test]
fn non_resolving_relevant_answer_preserves_qud_top_and_pushes_one_clarification() {
    let engine = Engine::new(Arc::new(MockDomain::nda()), EngineConfig::default());
    let nlu = ScriptedNlu::new(vec![vec![answer_value("blue", 0.95)]]);
    let nlg = TemplateNlg;
    let mut state = InformationState::new("a1");
    let parties = Question::wh_constrained(
        "x",
        "parties",
        vec![dialogue_engine::Constraint { sort: "party_name".to_string() }],
    );
    let parties_id = parties.id;
    state.shared.qud_push(parties);

    let (state, _) = engine.process_turn(&nlu, &nlg, None, "blue", state).unwrap();
    assert_eq!(state.shared.qud.len(), 2, "exactly one clarification question should be pushed");
    assert_eq!(state.shared.qud.first().map(|q| q.id), Some(parties_id), "original question stays at the bottom");
    assert!(state.shared.qud.last().map(|q| q.is_clarification).unwrap_or(false));
}
