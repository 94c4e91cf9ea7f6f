//! The rule framework (spec §4.1): `Rule = (name, phase, priority,
//! precondition, effect)`, ordered into a [`RuleSet`] and dispatched one
//! first-applicable rule per cycle.

pub mod accommodation;
pub mod actions;
pub mod grounding;
pub mod integrate;
pub mod select;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::domain::DomainModel;
use crate::types::{EngineError, InformationState, Move};

/// The four phases a turn passes through (spec §2 "Data flow per turn").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Interpret,
    Integrate,
    Select,
    Generate,
}

/// Everything a precondition or effect may read. `inbound` is the move
/// currently being integrated (Integrate phase) or `None` in phases that
/// don't process a specific inbound move.
pub struct RuleContext<'a> {
    pub state: &'a InformationState,
    pub domain: &'a dyn DomainModel,
    pub config: &'a EngineConfig,
    pub inbound: Option<&'a Move>,
}

impl<'a> RuleContext<'a> {
    pub fn new(
        state: &'a InformationState,
        domain: &'a dyn DomainModel,
        config: &'a EngineConfig,
        inbound: Option<&'a Move>,
    ) -> Self {
        Self {
            state,
            domain,
            config,
            inbound,
        }
    }
}

type Precondition = Box<dyn Fn(&RuleContext) -> bool + Send + Sync>;
type Effect = Box<dyn Fn(&RuleContext) -> Result<InformationState, EngineError> + Send + Sync>;

/// A single named, prioritized update rule.
pub struct Rule {
    pub name: &'static str,
    pub phase: Phase,
    pub priority: i32,
    precondition: Precondition,
    effect: Effect,
}

impl Rule {
    pub fn new(
        name: &'static str,
        phase: Phase,
        priority: i32,
        precondition: impl Fn(&RuleContext) -> bool + Send + Sync + 'static,
        effect: impl Fn(&RuleContext) -> Result<InformationState, EngineError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            phase,
            priority,
            precondition: Box::new(precondition),
            effect: Box::new(effect),
        }
    }

    pub fn applies(&self, ctx: &RuleContext) -> bool {
        (self.precondition)(ctx)
    }

    pub fn fire(&self, ctx: &RuleContext) -> Result<InformationState, EngineError> {
        (self.effect)(ctx)
    }
}

/// Rules partitioned by phase, each partition sorted by descending
/// priority with ties broken by declaration order (spec §4.1).
pub struct RuleSet {
    interpret: Vec<Rule>,
    integrate: Vec<Rule>,
    select: Vec<Rule>,
    generate: Vec<Rule>,
}

impl RuleSet {
    pub fn builder() -> RuleSetBuilder {
        RuleSetBuilder::default()
    }

    pub fn rules_for(&self, phase: Phase) -> &[Rule] {
        match phase {
            Phase::Interpret => &self.interpret,
            Phase::Integrate => &self.integrate,
            Phase::Select => &self.select,
            Phase::Generate => &self.generate,
        }
    }

    /// **Phase application contract** (spec §4.1 `apply_phase`): scan
    /// rules of `phase` in priority order and apply the single
    /// first-applicable one. Returns `Ok(None)` if no rule fired.
    pub fn apply_phase(
        &self,
        phase: Phase,
        ctx: &RuleContext,
    ) -> Result<Option<(InformationState, &'static str)>, EngineError> {
        for rule in self.rules_for(phase) {
            if rule.applies(ctx) {
                tracing::debug!(rule = rule.name, phase = ?phase, "rule fired");
                let next = rule.fire(ctx)?;
                return Ok(Some((next, rule.name)));
            }
        }
        Ok(None)
    }
}

#[derive(Default)]
pub struct RuleSetBuilder {
    interpret: Vec<Rule>,
    integrate: Vec<Rule>,
    select: Vec<Rule>,
    generate: Vec<Rule>,
}

impl RuleSetBuilder {
    pub fn add(mut self, rule: Rule) -> Self {
        match rule.phase {
            Phase::Interpret => self.interpret.push(rule),
            Phase::Integrate => self.integrate.push(rule),
            Phase::Select => self.select.push(rule),
            Phase::Generate => self.generate.push(rule),
        }
        self
    }

    pub fn extend(mut self, rules: Vec<Rule>) -> Self {
        for rule in rules {
            self = self.add(rule);
        }
        self
    }

    pub fn build(mut self) -> RuleSet {
        // Stable sort preserves declaration order among equal priorities,
        // satisfying "ties on priority resolve by declaration order".
        self.interpret.sort_by_key(|r| std::cmp::Reverse(r.priority));
        self.integrate.sort_by_key(|r| std::cmp::Reverse(r.priority));
        self.select.sort_by_key(|r| std::cmp::Reverse(r.priority));
        self.generate.sort_by_key(|r| std::cmp::Reverse(r.priority));
        RuleSet {
            interpret: self.interpret,
            integrate: self.integrate,
            select: self.select,
            generate: self.generate,
        }
    }
}

/// Assemble the full rule set implementing spec §4.2-§4.6: IBiS1
/// integration, IBiS3 accommodation, IBiS3+IBiS1 selection, IBiS2
/// grounding, and IBiS4 actions/negotiation.
pub fn default_rule_set() -> RuleSet {
    RuleSet::builder()
        .extend(integrate::rules())
        .extend(accommodation::rules())
        .extend(select::rules())
        .extend(grounding::rules())
        .extend(actions::rules())
        .build()
}
