//! Xi CLI - command-line front end for the synthesis engine

mod render;
mod source;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use xi_core::{EngineConfig, RequesterProfile, SynthesisOutcome, XiEngine};

use crate::source::SimulatedCouncil;

#[derive(Parser)]
#[command(name = "xi")]
#[command(about = "Xi Engine - veto-gated synthesis of advisory opinions")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Run one query through the simulated council
    Run {
        /// The question to synthesize advice for
        #[arg(short, long)]
        query: String,
        /// Requester identity
        #[arg(short, long, default_value = "USER")]
        requester: String,
        /// Requester's weekday of birth (Mon, Tue, ...)
        #[arg(short, long)]
        birth_day: Option<String>,
        /// Configuration file path (JSON)
        #[arg(short, long)]
        config: Option<String>,
        /// Emit the outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check configuration validity
    Check {
        /// Configuration file path (JSON)
        #[arg(short, long, default_value = "config/xi.json")]
        config: String,
    },
    /// Print the reference configuration as JSON
    Config,
    /// Run the two reference household scenarios
    Demo,
}

fn load_config(path: Option<&str>) -> anyhow::Result<EngineConfig> {
    match path {
        Some(path) => {
            let config =
                EngineConfig::load(path).with_context(|| format!("loading {}", path))?;
            info!("Loaded configuration from {}", path);
            Ok(config)
        }
        None => Ok(EngineConfig::default()),
    }
}

fn print_outcome(outcome: &SynthesisOutcome, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
    } else {
        print!("{}", render::outcome(outcome)?);
    }
    Ok(())
}

fn demo(engine: &XiEngine) -> anyhow::Result<()> {
    let scenarios = [
        (
            "ZERO-COST FAMILY CONFLICT",
            "My daughter is refusing to do chores and is arguing with my mother. \
             What is the zero-cost solution?",
            RequesterProfile::new("Parent (House Leader)").with_birth_day("Wed"),
        ),
        (
            "PREDICTIVE RISK CHECK",
            "I have a big test today and feel very stressed. Should I even try to study?",
            RequesterProfile::new("Child (Youngest Star)").with_birth_day("Fri"),
        ),
    ];

    for (title, query, profile) in scenarios {
        println!("\n## {} ({}) ##", title, profile.id);
        let outcome = engine.run_synthesis(query, &profile)?;
        print_outcome(&outcome, false)?;
    }

    println!("\nInteractions recorded: {}", engine.interactions().len());
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Some(Commands::Run {
            query,
            requester,
            birth_day,
            config,
            json,
        }) => {
            let config = load_config(config.as_deref())?;
            let engine = XiEngine::new(config, Box::new(SimulatedCouncil::new()))?;
            let mut profile = RequesterProfile::new(requester);
            profile.birth_day = birth_day;
            let outcome = engine.run_synthesis(&query, &profile)?;
            print_outcome(&outcome, json)?;
        }
        Some(Commands::Check { config }) => {
            let parsed = load_config(Some(config.as_str()))?;
            println!(
                "Config OK: {} authorities, safety floor {}",
                parsed.weights.ids().count(),
                parsed.safety_floor
            );
        }
        Some(Commands::Config) => {
            println!("{}", serde_json::to_string_pretty(&EngineConfig::default())?);
        }
        Some(Commands::Demo) => {
            let engine = XiEngine::new(EngineConfig::default(), Box::new(SimulatedCouncil::new()))?;
            demo(&engine)?;
        }
        None => {
            println!("Xi Engine v0.1.0 - Use --help for commands");
        }
    }

    Ok(())
}
