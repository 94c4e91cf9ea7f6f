//! A minimal NLG adapter rendering outbound moves as English sentences
//! for the demo REPL (spec.md §6 "NLG adapter"). Real generation is out
//! of scope for `dialogue-engine`; this is the root binary's own
//! stand-in collaborator, keyed off the question predicate/template the
//! same way a template-driven generator would be.

use dialogue_engine::{AdapterError, IcmKind, InformationState, Move, MoveKind};

pub struct DemoNlg;

impl dialogue_engine::NlgAdapter for DemoNlg {
    fn generate(
        &self,
        mv: &Move,
        _state: &InformationState,
        _template: Option<&dialogue_engine::TemplateKey>,
    ) -> Result<String, AdapterError> {
        Ok(match &mv.kind {
            MoveKind::Ask(q) => format!("Could you tell me the {}?", q.predicate()),
            MoveKind::Assert(p) => format!("Noted: {p}."),
            MoveKind::Icm { kind, .. } => icm_text(*kind),
            MoveKind::Reraise { .. } => "Sorry, I still didn't catch that — let's try again.".to_string(),
            MoveKind::Greet => "Hello! How can I help?".to_string(),
            MoveKind::Quit => "Goodbye.".to_string(),
            other => format!("{other:?}"),
        })
    }
}

fn icm_text(kind: IcmKind) -> String {
    match kind {
        IcmKind::PerceptionPositive => "Mm-hm.".to_string(),
        IcmKind::PerceptionNegative => "Sorry, I didn't catch that.".to_string(),
        IcmKind::UnderstandingPositive => "Got it.".to_string(),
        IcmKind::UnderstandingNegative => "I'm not sure I understood that correctly.".to_string(),
        IcmKind::UnderstandingIntention => "Just to confirm, is that right?".to_string(),
        IcmKind::Acceptance => "Understood.".to_string(),
    }
}
