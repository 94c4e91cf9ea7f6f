//! Answer content (spec §3 "Answer").

use serde::{Deserialize, Serialize};

use super::ids::QuestionId;
use super::term::Term;

/// `{content, certainty, question_ref?}` (spec §3). `content` may be a bare
/// value (elliptical answer, e.g. "Paris") or a fully formed proposition
/// (e.g. "the governing law is Delaware").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub content: AnswerContent,
    pub certainty: f32,
    pub question_ref: Option<QuestionId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AnswerContent {
    Value(Term),
    Proposition {
        predicate: String,
        args: Vec<Term>,
    },
}

impl Answer {
    pub fn value(term: Term, certainty: f32) -> Self {
        Self {
            content: AnswerContent::Value(term),
            certainty,
            question_ref: None,
        }
    }

    pub fn targeting(mut self, question: QuestionId) -> Self {
        self.question_ref = Some(question);
        self
    }

    pub fn as_value(&self) -> Option<&Term> {
        match &self.content {
            AnswerContent::Value(t) => Some(t),
            AnswerContent::Proposition { .. } => None,
        }
    }
}
