//! In-memory mock [`DomainModel`] and adapter test doubles, grounded in the
//! teacher runtime's `NoOpConfidenceMonitor`/stub-adapter pattern
//! (`routing/confidence.rs`). Exposed under `cfg(test)` for unit/integration
//! tests and under the `testing` feature for the demo CLI.

use std::collections::HashMap;

use crate::adapters::{DeviceAdapter, ExecutionOutcome, NlgAdapter, NluAdapter};
use crate::domain::{DependencyGraph, DomainModel, TemplateKey};
use crate::types::{
    Action, AdapterError, Answer, AnswerContent, Constraint, InformationState, Move, MoveKind,
    PlanStep, PlanStepKind, Proposition, Question, QuestionShape, Speaker, StepStatus, Term,
};

type PlanBuilder = Box<dyn Fn() -> PlanStep + Send + Sync>;

/// A small, fully in-memory domain used by the engine's own test suite and
/// by the demo CLI's NDA/travel-booking walkthroughs (spec §8 scenarios
/// S1-S6). Not part of `dialogue-engine`'s public contract beyond the
/// trait it implements.
pub struct MockDomain {
    pub dependencies: DependencyGraph,
    pub sorts: HashMap<String, Vec<Term>>,
    pub plans: HashMap<String, PlanBuilder>,
}

impl Default for MockDomain {
    fn default() -> Self {
        Self {
            dependencies: DependencyGraph::new(),
            sorts: HashMap::new(),
            plans: HashMap::new(),
        }
    }
}

impl MockDomain {
    /// The NDA contract-drafting domain from scenario S1: three sequential
    /// `Findout` steps with no dependencies between them.
    pub fn nda() -> Self {
        let mut domain = Self::default();
        domain.sorts.insert(
            "party_name".to_string(),
            vec![
                Term::text("Acme Corp"),
                Term::text("Smith Inc"),
                Term::text("Contoso"),
            ],
        );
        domain.plans.insert(
            "nda".to_string(),
            Box::new(|| {
                let parties = Question::wh_constrained(
                    "x",
                    "parties",
                    vec![Constraint {
                        sort: "party_name".to_string(),
                    }],
                );
                let effective_date = Question::wh("x", "effective_date");
                let governing_law = Question::wh("x", "governing_law");
                PlanStep {
                    kind: PlanStepKind::Findout(parties),
                    status: StepStatus::Active,
                    subplans: vec![PlanStep {
                        kind: PlanStepKind::Findout(effective_date),
                        status: StepStatus::Active,
                        subplans: vec![PlanStep::findout(governing_law)],
                    }],
                }
            }),
        );
        domain
    }

    /// The travel-booking domain from scenarios S2/S3/S6: `dest_city`,
    /// `depart_day`, `class`, then a `Perform(book)` action step.
    pub fn travel() -> Self {
        let mut domain = Self::default();
        domain.plans.insert(
            "travel_booking".to_string(),
            Box::new(|| {
                let dest_city = Question::wh("x", "dest_city");
                let depart_day = Question::wh("x", "depart_day");
                let class = Question::wh("x", "class");
                // Predicate-only preconditions (`Action::preconditions_met`):
                // a plan built before any answer exists can only name which
                // predicates must be committed, never their eventual values,
                // so these match the bare `dest_city`/`depart_day`/`class`
                // propositions `combines` produces when each is answered.
                let book = Action::new("book", vec![]).with_preconditions(vec![
                    Proposition::atom("dest_city"),
                    Proposition::atom("depart_day"),
                    Proposition::atom("class"),
                ]);
                PlanStep {
                    kind: PlanStepKind::Findout(dest_city),
                    status: StepStatus::Active,
                    subplans: vec![PlanStep {
                        kind: PlanStepKind::Findout(depart_day),
                        status: StepStatus::Active,
                        subplans: vec![PlanStep {
                            kind: PlanStepKind::Findout(class),
                            status: StepStatus::Active,
                            subplans: vec![PlanStep::perform(book)],
                        }],
                    }],
                }
            }),
        );
        domain
    }

    /// [`Self::travel`] plus `depends(price_quote, depart_day)`, for
    /// scenario S3's reaccommodation cascade.
    pub fn travel_with_dependency() -> Self {
        let mut domain = Self::travel();
        domain
            .dependencies
            .register("price_quote", "depart_day", crate::config::DependencyCyclePolicy::Error)
            .expect("fixture dependency registration cannot cycle");
        domain
    }

    fn answer_values(answer: &Answer) -> Vec<Term> {
        match &answer.content {
            AnswerContent::Value(Term::List(items)) => items.clone(),
            AnswerContent::Value(t) => vec![t.clone()],
            AnswerContent::Proposition { args, .. } => args.clone(),
        }
    }
}

impl DomainModel for MockDomain {
    fn resolves(&self, answer: &Answer, question: &Question) -> bool {
        match &question.shape {
            QuestionShape::Wh { predicate, constraints, .. } => {
                // A self-describing proposition answer ("the depart day is
                // April 4") only resolves the question it names; a bare
                // elliptical value ("April 4") resolves whichever open
                // question it's matched against positionally, same as S2's
                // volunteer answers.
                if let AnswerContent::Proposition { predicate: p, .. } = &answer.content {
                    if p != predicate {
                        return false;
                    }
                }
                let values = Self::answer_values(answer);
                if values.is_empty() {
                    return false;
                }
                constraints.iter().all(|c| {
                    let sort = self.sorts(&c.sort);
                    sort.is_empty() || values.iter().all(|v| sort.contains(v))
                })
            }
            QuestionShape::YN { proposition } => matches!(
                &answer.content,
                AnswerContent::Proposition { predicate, .. } if predicate == &proposition.predicate
            ),
            QuestionShape::Alt { alternatives } => match &answer.content {
                AnswerContent::Proposition { predicate, args } => alternatives
                    .iter()
                    .any(|alt| &alt.predicate == predicate && &alt.args == args),
                AnswerContent::Value(v) => alternatives
                    .iter()
                    .any(|alt| alt.args.first() == Some(v)),
            },
        }
    }

    fn combines(&self, question: &Question, answer: &Answer) -> Proposition {
        Proposition::new(question.predicate().to_string(), Self::answer_values(answer))
    }

    fn relevant(&self, answer: &Answer, question: &Question) -> bool {
        match &question.shape {
            QuestionShape::Wh { predicate, .. } => {
                if let AnswerContent::Proposition { predicate: p, .. } = &answer.content {
                    if p != predicate {
                        return false;
                    }
                }
                !Self::answer_values(answer).is_empty()
            }
            QuestionShape::YN { .. } | QuestionShape::Alt { .. } => {
                matches!(answer.content, AnswerContent::Proposition { .. })
            }
        }
    }

    fn depends(&self, q_a: &Question, q_b: &Question) -> bool {
        self.dependencies.depends(q_a.predicate(), q_b.predicate())
    }

    fn incompatible(&self, p: &Proposition, p2: &Proposition) -> bool {
        p.predicate == p2.predicate && p.args != p2.args
    }

    fn get_question_from_commitment(&self, p: &Proposition) -> Option<Question> {
        Some(Question::wh("x", p.predicate.clone()))
    }

    fn has_plan(&self, task: &str) -> bool {
        self.plans.contains_key(task)
    }

    fn build_plan(&self, task: &str, _context: &InformationState) -> PlanStep {
        match self.plans.get(task) {
            Some(builder) => builder(),
            None => PlanStep {
                kind: PlanStepKind::Consult {
                    database: task.to_string(),
                    query: Proposition::atom("unknown_task"),
                },
                status: StepStatus::Abandoned,
                subplans: Vec::new(),
            },
        }
    }

    fn sorts(&self, name: &str) -> Vec<Term> {
        self.sorts.get(name).cloned().unwrap_or_default()
    }

    fn question_template(&self, question: &Question) -> TemplateKey {
        format!("template:{}", question.predicate())
    }

    fn clarification_for(&self, question: &Question) -> Question {
        Question::clarifying("x", format!("valid_{}", question.predicate()), question.id)
    }
}

/// A scripted NLU adapter: returns a fixed sequence of moves per call,
/// advancing one step per `interpret` invocation. Mirrors the teacher's
/// stub-adapter style in `routing/confidence.rs`.
#[derive(Default)]
pub struct ScriptedNlu {
    script: std::sync::Mutex<Vec<Vec<Move>>>,
}

impl ScriptedNlu {
    pub fn new(script: Vec<Vec<Move>>) -> Self {
        Self {
            script: std::sync::Mutex::new(script),
        }
    }
}

impl NluAdapter for ScriptedNlu {
    fn interpret(&self, _utterance: &str, _context: &InformationState) -> Result<Vec<Move>, AdapterError> {
        let mut script = self.script.lock().expect("scripted NLU mutex poisoned");
        if script.is_empty() {
            return Ok(vec![Move::new(
                MoveKind::Uninterpretable {
                    raw: _utterance.to_string(),
                },
                Speaker::User,
                0.0,
            )]);
        }
        Ok(script.remove(0))
    }
}

/// An NLG adapter that renders a move to a deterministic debug string,
/// sufficient for scenario assertions and the demo CLI's terminal output.
#[derive(Default)]
pub struct TemplateNlg;

impl NlgAdapter for TemplateNlg {
    fn generate(
        &self,
        mv: &Move,
        _state: &InformationState,
        template: Option<&TemplateKey>,
    ) -> Result<String, AdapterError> {
        Ok(match (&mv.kind, template) {
            (MoveKind::Ask(q), _) => format!("ask({})", q.predicate()),
            (MoveKind::Assert(p), _) => format!("assert({p})"),
            (MoveKind::Icm { kind, .. }, _) => format!("icm:{kind:?}"),
            (MoveKind::Greet, _) => "greet".to_string(),
            (MoveKind::Quit, _) => "quit".to_string(),
            _ => format!("{:?}", mv.kind),
        })
    }
}

/// A device adapter whose outcomes are scripted per action name, for
/// exercising both [`Self`]'s success and failure paths (scenario S6).
#[derive(Default)]
pub struct ScriptedDevice {
    outcomes: HashMap<String, ExecutionOutcome>,
}

impl ScriptedDevice {
    pub fn new(outcomes: HashMap<String, ExecutionOutcome>) -> Self {
        Self { outcomes }
    }
}

impl DeviceAdapter for ScriptedDevice {
    fn check_preconditions(&self, action: &Action, commitments: &[Proposition]) -> bool {
        action.preconditions_met(commitments)
    }

    fn execute(&self, action: &Action) -> Result<ExecutionOutcome, AdapterError> {
        Ok(self
            .outcomes
            .get(&action.name)
            .cloned()
            .unwrap_or_else(|| ExecutionOutcome::Success(action.postconditions.clone())))
    }
}
