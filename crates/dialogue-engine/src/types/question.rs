//! Question shapes (spec §3 "Question").

use serde::{Deserialize, Serialize};

use super::ids::QuestionId;
use super::term::{Proposition, Term};

/// A constraint on the value bound to a `Wh` question's variable, e.g.
/// restricting `?depart_day` to `sorts("weekday")`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub sort: String,
}

/// `Wh{variable, predicate, constraints}` / `YN{proposition}` /
/// `Alt{alternatives}` (spec §3), plus the clarification-refinement fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub shape: QuestionShape,
    pub is_clarification: bool,
    pub refines: Option<QuestionId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QuestionShape {
    Wh {
        variable: String,
        predicate: String,
        constraints: Vec<Constraint>,
    },
    YN {
        proposition: Proposition,
    },
    Alt {
        alternatives: Vec<Proposition>,
    },
}

impl Question {
    pub fn wh(variable: impl Into<String>, predicate: impl Into<String>) -> Self {
        Self {
            id: QuestionId::fresh(),
            shape: QuestionShape::Wh {
                variable: variable.into(),
                predicate: predicate.into(),
                constraints: Vec::new(),
            },
            is_clarification: false,
            refines: None,
        }
    }

    pub fn wh_constrained(
        variable: impl Into<String>,
        predicate: impl Into<String>,
        constraints: Vec<Constraint>,
    ) -> Self {
        Self {
            id: QuestionId::fresh(),
            shape: QuestionShape::Wh {
                variable: variable.into(),
                predicate: predicate.into(),
                constraints,
            },
            is_clarification: false,
            refines: None,
        }
    }

    pub fn yn(proposition: Proposition) -> Self {
        Self {
            id: QuestionId::fresh(),
            shape: QuestionShape::YN { proposition },
            is_clarification: false,
            refines: None,
        }
    }

    pub fn alt(alternatives: Vec<Proposition>) -> Self {
        Self {
            id: QuestionId::fresh(),
            shape: QuestionShape::Alt { alternatives },
            is_clarification: false,
            refines: None,
        }
    }

    /// Build a clarification question refining `self`, per Rule 4.3.
    pub fn clarifying(variable: impl Into<String>, predicate: impl Into<String>, refines: QuestionId) -> Self {
        Self {
            id: QuestionId::fresh(),
            shape: QuestionShape::Wh {
                variable: variable.into(),
                predicate: predicate.into(),
                constraints: Vec::new(),
            },
            is_clarification: true,
            refines: Some(refines),
        }
    }

    /// The predicate this question is asking about, used to look up
    /// `depends`/`incompatible` relations and commitment projections.
    pub fn predicate(&self) -> &str {
        match &self.shape {
            QuestionShape::Wh { predicate, .. } => predicate,
            QuestionShape::YN { proposition } => &proposition.predicate,
            QuestionShape::Alt { alternatives } => {
                alternatives.first().map(|p| p.predicate.as_str()).unwrap_or("")
            }
        }
    }
}
