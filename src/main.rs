//! Demo harness for `dialogue-engine` (SPEC_FULL.md §A): a terminal REPL
//! that drives the engine end-to-end against the NDA / travel-booking
//! demo domains used in the spec's own seed scenarios, with a scripted
//! NLU/NLG/Device adapter set standing in for the out-of-scope external
//! collaborators (spec.md §1, §6).

mod nlg;
mod nlu;

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use clap::{Arg, ArgAction, Command};
use dialogue_engine::testing::{MockDomain, ScriptedDevice};
use dialogue_engine::{Engine, EngineConfig, GroundingStrategy, InformationState};

use nlg::DemoNlg;
use nlu::LineNlu;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let matches = Command::new("dialogue-cli")
        .version(VERSION)
        .about("Interactive demo for the issue-based dialogue manager")
        .arg(
            Arg::new("domain")
                .long("domain")
                .value_name("DOMAIN")
                .help("Demo domain to load: nda, travel, or travel-dep")
                .default_value("nda"),
        )
        .arg(
            Arg::new("strategy")
                .long("strategy")
                .value_name("STRATEGY")
                .help("Grounding strategy: optimistic, cautious, or pessimistic")
                .default_value("cautious"),
        )
        .arg(
            Arg::new("dump-state")
                .long("dump-state")
                .action(ArgAction::SetTrue)
                .help("Print the final Information State as JSON on exit"),
        )
        .get_matches();

    let domain_name = matches.get_one::<String>("domain").unwrap().as_str();
    let domain: Arc<dyn dialogue_engine::DomainModel> = match domain_name {
        "nda" => Arc::new(MockDomain::nda()),
        "travel" => Arc::new(MockDomain::travel()),
        "travel-dep" => Arc::new(MockDomain::travel_with_dependency()),
        other => {
            eprintln!("unknown domain '{other}', expected nda, travel, or travel-dep");
            std::process::exit(2);
        }
    };

    let mut config = match EngineConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err}");
            std::process::exit(2);
        }
    };
    if let Some(strategy_name) = matches.get_one::<String>("strategy") {
        match GroundingStrategy::from_str_loose(strategy_name) {
            Some(strategy) => config.grounding.strategy = strategy,
            None => {
                eprintln!("unknown grounding strategy '{strategy_name}'");
                std::process::exit(2);
            }
        }
    }
    if let Err(err) = config.validate() {
        eprintln!("configuration error: {err}");
        std::process::exit(2);
    }

    let engine = Engine::new(domain, config);
    let nlu = LineNlu;
    let nlg = DemoNlg;
    let device = ScriptedDevice::default();

    println!("dialogue-cli v{VERSION} — domain: {domain_name}");
    println!("Type a line per turn (hello / draft <task> / book <task> / quit). Ctrl-D to stop.");

    let mut state = InformationState::new("repl");
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("you> ");
        io::stdout().flush().ok();
        let Some(Ok(line)) = lines.next() else {
            break;
        };

        match engine.process_turn(&nlu, &nlg, Some(&device), &line, state) {
            Ok((next_state, output)) => {
                for utterance in &output.utterances {
                    println!("system> {utterance}");
                }
                state = next_state;
                if !state.is_active() {
                    break;
                }
            }
            Err((err, rolled_back)) => {
                eprintln!("turn aborted: {err}");
                state = rolled_back;
            }
        }
    }

    if matches.get_flag("dump-state") {
        match serde_json::to_string_pretty(&state) {
            Ok(json) => println!("{json}"),
            Err(err) => eprintln!("failed to serialize final state: {err}"),
        }
    }
}
