//! IBiS4 action representation (spec §3 "Action").

use serde::{Deserialize, Serialize};

use super::ids::ActionId;
use super::term::{Proposition, Term};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionStatus {
    Pending,
    Executing,
    Succeeded,
    Failed,
}

/// `{name, params, preconditions, postconditions, status}` (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub id: ActionId,
    pub name: String,
    pub params: Vec<Term>,
    pub preconditions: Vec<Proposition>,
    pub postconditions: Vec<Proposition>,
    pub status: ActionStatus,
}

impl Action {
    pub fn new(name: impl Into<String>, params: Vec<Term>) -> Self {
        Self {
            id: ActionId::fresh(),
            name: name.into(),
            params,
            preconditions: Vec::new(),
            postconditions: Vec::new(),
            status: ActionStatus::Pending,
        }
    }

    pub fn with_preconditions(mut self, preconditions: Vec<Proposition>) -> Self {
        self.preconditions = preconditions;
        self
    }

    pub fn with_postconditions(mut self, postconditions: Vec<Proposition>) -> Self {
        self.postconditions = postconditions;
        self
    }

    /// `preconditions(A) ⊆ commitments` (spec §4.6 IntegrateRequest). A
    /// precondition matches by predicate name alone, not full value
    /// equality: a plan built before any answer is known can only name
    /// "dest_city must be known", never the eventual committed value, the
    /// same predicate-only membership test `DomainModel::get_question_from_commitment`
    /// callers already use elsewhere (e.g. `select::has_unmet_prerequisite`).
    pub fn preconditions_met(&self, commitments: &[Proposition]) -> bool {
        self.preconditions
            .iter()
            .all(|p| commitments.iter().any(|c| c.predicate == p.predicate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preconditions_met_requires_full_coverage() {
        let action = Action::new("book_hotel", vec![]).with_preconditions(vec![
            Proposition::atom("dest_city_known"),
            Proposition::atom("depart_day_known"),
        ]);
        let partial = vec![Proposition::atom("dest_city_known")];
        assert!(!action.preconditions_met(&partial));

        let full = vec![
            Proposition::atom("dest_city_known"),
            Proposition::atom("depart_day_known"),
        ];
        assert!(action.preconditions_met(&full));
    }
}
