//! Domain-typed values and propositions (spec §3 "Proposition").

use std::fmt;

use serde::{Deserialize, Serialize};

/// A domain-typed value. Kept deliberately small and closed (sum type,
/// not a duck-typed bag) so rule preconditions can pattern-match on shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum Term {
    Symbol(String),
    Text(String),
    Number(f64),
    Bool(bool),
    /// An ordered list of terms, used for multi-valued answers like
    /// "Acme Corp, Smith Inc" which names two parties in one turn.
    List(Vec<Term>),
}

impl Term {
    pub fn symbol(s: impl Into<String>) -> Self {
        Term::Symbol(s.into())
    }

    pub fn text(s: impl Into<String>) -> Self {
        Term::Text(s.into())
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Term::Symbol(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Term::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Symbol(s) => write!(f, "{s}"),
            Term::Text(s) => write!(f, "\"{s}\""),
            Term::Number(n) => write!(f, "{n}"),
            Term::Bool(b) => write!(f, "{b}"),
            Term::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

/// `{predicate, args}` (spec §3). A committed or asserted fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposition {
    pub predicate: String,
    pub args: Vec<Term>,
}

impl Proposition {
    pub fn new(predicate: impl Into<String>, args: Vec<Term>) -> Self {
        Self {
            predicate: predicate.into(),
            args,
        }
    }

    /// The zero-argument form used for boolean facts like `greeted`.
    pub fn atom(predicate: impl Into<String>) -> Self {
        Self::new(predicate, Vec::new())
    }
}

impl fmt::Display for Proposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.predicate)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{arg}")?;
        }
        write!(f, ")")
    }
}
