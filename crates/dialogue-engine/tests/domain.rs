//! Exercises the demo `MockDomain`'s [`DomainModel`] implementation
//! directly, as SPEC_FULL.md's test-tooling section calls for, separate
//! from the engine-level walkthroughs in `scenarios.rs`.
#![cfg(feature = "testing")]

use dialogue_engine::testing::MockDomain;
use dialogue_engine::{
    Answer, AnswerContent, Constraint, DomainModel, InformationState, PlanStepKind, Proposition,
    Question, Term,
};

#[test]
fn resolves_accepts_elliptical_values_and_rejects_mismatched_propositions() {
    let domain = MockDomain::nda();
    let parties = Question::wh_constrained(
        "x",
        "parties",
        vec![Constraint { sort: "party_name".to_string() }],
    );

    let ellipsis = Answer::value(Term::text("Acme Corp"), 0.9);
    assert!(domain.resolves(&ellipsis, &parties));

    let wrong_predicate = Answer {
        content: AnswerContent::Proposition {
            predicate: "effective_date".to_string(),
            args: vec![Term::text("January 1, 2025")],
        },
        certainty: 0.9,
        question_ref: None,
    };
    assert!(!domain.resolves(&wrong_predicate, &parties));

    let matching_proposition = Answer {
        content: AnswerContent::Proposition {
            predicate: "parties".to_string(),
            args: vec![Term::text("Acme Corp")],
        },
        certainty: 0.9,
        question_ref: None,
    };
    assert!(domain.resolves(&matching_proposition, &parties));
}

#[test]
fn resolves_on_an_unconstrained_wh_accepts_any_non_empty_value() {
    let domain = MockDomain::nda();
    let effective_date = Question::wh("x", "effective_date");
    let answer = Answer::value(Term::text("January 1, 2025"), 0.9);
    assert!(domain.resolves(&answer, &effective_date));
}

#[test]
fn combines_projects_the_question_predicate_onto_the_answer_values() {
    let domain = MockDomain::nda();
    let parties = Question::wh("x", "parties");
    let answer = Answer::value(Term::text("Acme Corp"), 0.9);
    let proposition = domain.combines(&parties, &answer);
    assert_eq!(proposition, Proposition::new("parties", vec![Term::text("Acme Corp")]));
}

#[test]
fn relevant_requires_a_non_empty_value_and_a_matching_predicate_when_named() {
    let domain = MockDomain::nda();
    let parties = Question::wh("x", "parties");
    assert!(domain.relevant(&Answer::value(Term::text("blue"), 0.9), &parties));

    let empty_list = Answer::value(Term::List(vec![]), 0.9);
    assert!(!domain.relevant(&empty_list, &parties));

    let other_predicate = Answer {
        content: AnswerContent::Proposition {
            predicate: "governing_law".to_string(),
            args: vec![Term::text("Delaware")],
        },
        certainty: 0.9,
        question_ref: None,
    };
    assert!(!domain.relevant(&other_predicate, &parties));
}

#[test]
fn depends_reflects_the_registered_dependency_graph() {
    let plain = MockDomain::travel();
    let depart_day = Question::wh("x", "depart_day");
    let price_quote = Question::wh("x", "price_quote");
    assert!(!plain.depends(&price_quote, &depart_day));

    let with_dep = MockDomain::travel_with_dependency();
    assert!(with_dep.depends(&price_quote, &depart_day));
    assert!(!with_dep.depends(&depart_day, &price_quote));
}

#[test]
fn incompatible_flags_same_predicate_different_arguments_only() {
    let domain = MockDomain::default();
    let paris = Proposition::new("dest_city", vec![Term::text("Paris")]);
    let london = Proposition::new("dest_city", vec![Term::text("London")]);
    let paris_again = Proposition::new("dest_city", vec![Term::text("Paris")]);
    let depart_day = Proposition::new("depart_day", vec![Term::text("April 5")]);

    assert!(domain.incompatible(&paris, &london));
    assert!(!domain.incompatible(&paris, &paris_again));
    assert!(!domain.incompatible(&paris, &depart_day));
}

#[test]
fn get_question_from_commitment_round_trips_the_predicate() {
    let domain = MockDomain::default();
    let commitment = Proposition::new("dest_city", vec![Term::text("Paris")]);
    let question = domain.get_question_from_commitment(&commitment).expect("mock always resolves");
    assert_eq!(question.predicate(), "dest_city");
}

#[test]
fn has_plan_and_build_plan_agree_on_known_and_unknown_tasks() {
    let domain = MockDomain::travel();
    assert!(domain.has_plan("travel_booking"));
    assert!(!domain.has_plan("draft_a_will"));

    let state = InformationState::new("a1");
    let known = domain.build_plan("travel_booking", &state);
    assert!(matches!(known.kind, PlanStepKind::Findout(_)));

    let unknown = domain.build_plan("draft_a_will", &state);
    match unknown.kind {
        PlanStepKind::Consult { database, .. } => assert_eq!(database, "draft_a_will"),
        other => panic!("expected an abandoned Consult stub for an unknown task, got {other:?}"),
    }
    assert!(unknown.is_terminal());
}

#[test]
fn sorts_returns_the_registered_values_and_an_empty_vec_for_unknown_sorts() {
    let domain = MockDomain::nda();
    assert_eq!(domain.sorts("party_name").len(), 3);
    assert!(domain.sorts("nonexistent_sort").is_empty());
}

#[test]
fn question_template_is_keyed_by_predicate() {
    let domain = MockDomain::nda();
    let parties = Question::wh("x", "parties");
    assert_eq!(domain.question_template(&parties), "template:parties");
}

#[test]
fn clarification_for_produces_a_refining_question_over_the_original() {
    let domain = MockDomain::nda();
    let parties = Question::wh("x", "parties");
    let clarifying = domain.clarification_for(&parties);
    assert!(clarifying.is_clarification);
    assert_eq!(clarifying.refines, Some(parties.id));
    assert_eq!(clarifying.predicate(), "valid_parties");
}

#[test]
fn dominates_and_is_critical_predicate_default_to_false_when_unimplemented() {
    let domain = MockDomain::default();
    let a = Proposition::new("class", vec![Term::text("economy")]);
    let b = Proposition::new("class", vec![Term::text("business")]);
    assert!(!domain.dominates(&a, &b));
    assert!(!domain.is_critical_predicate("depart_day"));
}
