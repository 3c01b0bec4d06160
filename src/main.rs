use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use sweep_core::logger;
use sweep_core::orchestrator::{Orchestrator, RunOutcome, DEFAULT_MAX_INVOCATIONS};
use sweep_core::pipeline::Pipeline;
use sweep_core::platform::stub::StubScreen;
use sweep_core::sleep::ThreadSleeper;
use sweep_core::NodeStore;

/// Run a traversal pipeline against a scripted stub screen.
#[derive(Debug, Parser)]
#[command(name = "sweep", version)]
struct Cli {
    /// Pipeline JSON: node name -> { action, next, ... }
    #[arg(long)]
    pipeline: PathBuf,

    /// Scene JSON describing what the stub screen shows
    #[arg(long)]
    scene: PathBuf,

    /// Node to start from
    #[arg(long, default_value = "Start")]
    entry: String,

    /// Directory for sweep.log
    #[arg(long, default_value = "logs")]
    logs: PathBuf,

    /// Upper bound on node executions
    #[arg(long, default_value_t = DEFAULT_MAX_INVOCATIONS)]
    max_invocations: usize,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    logger::init(&cli.logs)?;
    tracing::debug!("sweep starting with args: {:?}", cli);

    let pipeline = Pipeline::load(&cli.pipeline)?;
    let screen = StubScreen::load(&cli.scene)?;
    tracing::info!(nodes = pipeline.len(), "pipeline loaded");

    let mut orch = Orchestrator::new(pipeline, &screen, &screen, &ThreadSleeper)
        .with_max_invocations(cli.max_invocations);
    orch.register_builtin(NodeStore::global());

    let summary = orch.run(&cli.entry)?;
    println!(
        "{:?} after {} invocation(s), {} tap(s)",
        summary.outcome,
        summary.invocations,
        screen.taps().len()
    );

    Ok(match summary.outcome {
        RunOutcome::Completed => ExitCode::SUCCESS,
        RunOutcome::Failed { .. } | RunOutcome::BudgetExhausted => ExitCode::FAILURE,
    })
}
