//! A minimal line-oriented NLU adapter for the demo REPL.
//!
//! Real natural-language understanding is out of scope for
//! `dialogue-engine` (spec.md §1 "Out of scope"); this module is the
//! root binary's own stand-in collaborator (spec.md §6 "NLU adapter"),
//! parsing a small fixed command grammar rather than free text so the
//! demo can be driven from a terminal without an external model.
//!
//! Grammar (one line per turn):
//! - `hello` / `hi`                  -> greet
//! - `quit` / `exit` / `bye`         -> quit
//! - `draft <task>` / `book <task>`  -> request(task)
//! - `ok` / `yes` / `ack`            -> icm:acc
//! - anything else                   -> answer(value), comma-separated
//!   values become a list answer; an optional leading `@<confidence>`
//!   token overrides the default confidence (e.g. `@0.6 paris`).

use dialogue_engine::{Answer, AdapterError, InformationState, Move, MoveKind, Speaker, Term};

pub struct LineNlu;

impl dialogue_engine::NluAdapter for LineNlu {
    fn interpret(
        &self,
        utterance: &str,
        _context: &InformationState,
    ) -> Result<Vec<Move>, AdapterError> {
        let line = utterance.trim();
        if line.is_empty() {
            return Ok(vec![Move::new(
                MoveKind::Uninterpretable { raw: utterance.to_string() },
                Speaker::User,
                0.0,
            )]);
        }

        let lower = line.to_lowercase();
        let kind = match lower.as_str() {
            "hello" | "hi" => MoveKind::Greet,
            "quit" | "exit" | "bye" => MoveKind::Quit,
            "ok" | "yes" | "ack" => MoveKind::Icm { kind: dialogue_engine::IcmKind::Acceptance, target: None },
            _ => {
                if let Some(task) = lower.strip_prefix("draft ").or_else(|| lower.strip_prefix("book ")) {
                    MoveKind::Request { task: task.trim().to_string() }
                } else {
                    return Ok(vec![parse_answer(line)]);
                }
            }
        };
        Ok(vec![Move::new(kind, Speaker::User, 1.0)])
    }
}

fn parse_answer(line: &str) -> Move {
    let (confidence, rest) = match line.split_once(' ') {
        Some((head, tail)) if head.starts_with('@') => {
            let parsed = head.trim_start_matches('@').parse::<f32>().unwrap_or(0.9);
            (parsed, tail)
        }
        _ => (0.9, line),
    };

    let values: Vec<Term> = rest.split(',').map(|v| Term::text(v.trim())).collect();
    let value = if values.len() == 1 {
        values.into_iter().next().unwrap()
    } else {
        Term::List(values)
    };
    Move::new(MoveKind::Answer(Answer::value(value, confidence)), Speaker::User, confidence)
}
