//! The Domain Model contract (spec §4.7).
//!
//! A [`DomainModel`] is the single point where domain-specific meaning
//! lives — predicates, sorts, plan builders, and the semantic relations
//! the rule framework consumes. The engine never hardcodes a domain
//! identifier; everything domain-shaped flows through this trait.

mod dependency_graph;

pub use dependency_graph::DependencyGraph;

use crate::config::DependencyCyclePolicy;
use crate::types::{Answer, InformationState, PlanStep, Proposition, Question, Term};

/// Opaque key the NLG adapter uses to pick a rendering template for a
/// question (spec §4.7 `question_template`).
pub type TemplateKey = String;

/// The contract the rule framework consumes (spec §4.7). Implementations
/// are process-local registries; they may be backed by static tables, a
/// config file, or a database — the engine only ever sees this trait.
pub trait DomainModel: Send + Sync {
    /// Does `answer`'s content match `question`'s shape and sort?
    fn resolves(&self, answer: &Answer, question: &Question) -> bool;

    /// Combine a resolving answer with its question into a committable
    /// proposition. Only called after `resolves` has returned `true`.
    fn combines(&self, question: &Question, answer: &Answer) -> Proposition;

    /// Is `answer` topically relevant to `question` even though it does
    /// not resolve it (spec §4.2 IntegrateAnswer non-resolving path)?
    fn relevant(&self, answer: &Answer, question: &Question) -> bool;

    /// `depends(Q_a, Q_b)`: does `Q_a` presuppose `Q_b`'s answer? Must
    /// induce a DAG; see [`DependencyGraph`] for a reusable cycle-checked
    /// implementation helper.
    fn depends(&self, q_a: &Question, q_b: &Question) -> bool;

    /// Can `p` and `p2` simultaneously hold as commitments?
    fn incompatible(&self, p: &Proposition, p2: &Proposition) -> bool;

    /// The question whose answer produced commitment `p`, if any — used
    /// to drive reaccommodation (Rule 4.6/4.8).
    fn get_question_from_commitment(&self, p: &Proposition) -> Option<Question>;

    /// Does a named task have a registered plan builder?
    fn has_plan(&self, task: &str) -> bool;

    /// Build the plan for `task` given the current dialogue context. A
    /// domain whose `has_plan` returned `true` must not return an empty
    /// plan here — doing so is a `DomainContractError` the engine detects
    /// at the call site.
    fn build_plan(&self, task: &str, context: &InformationState) -> PlanStep;

    /// Enumerate the legal values of a named sort, for answer validation.
    fn sorts(&self, name: &str) -> Vec<Term>;

    /// Rendering template key for a question, consumed by the NLG
    /// adapter.
    fn question_template(&self, question: &Question) -> TemplateKey;

    /// Build the clarification question for an unresolved `question`
    /// (Rule 4.3). Domains without a bespoke clarification may fall back
    /// to a generic "what is a valid X" question.
    fn clarification_for(&self, question: &Question) -> Question;

    /// Preference ordering between two alternatives under negotiation,
    /// used to break ties when the user asks for a recommendation
    /// (spec §4.6 IntroduceAlternative). Default: no preference.
    fn dominates(&self, _a: &Proposition, _b: &Proposition) -> bool {
        false
    }

    /// Whether a predicate is flagged as safety/fidelity-critical, so a
    /// low-confidence recognition of it triggers spelling confirmation
    /// (spec §4.5). Default: consult [`crate::config::EngineConfig`]'s
    /// `critical_entity_predicates` via the caller instead of here.
    fn is_critical_predicate(&self, _predicate: &str) -> bool {
        false
    }
}

/// Re-exported so implementers can pick the engine's configured policy
/// without importing `crate::config` directly.
pub type CyclePolicy = DependencyCyclePolicy;
