use tracing::{info, info_span};

use super::{Context, RoundState, Traversal};
use crate::config::TraversalConfig;
use crate::error::{Result, SweepError};
use crate::sleep::pause;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Scanning,
    Visiting,
    RoundEnd,
    Terminated,
}

/// Why a blocking traversal ended. Both are successful outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    StopCondition,
    RoundCap,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraversalReport {
    /// Rounds started, empty ones included.
    pub rounds: u32,
    /// Targets tapped across all rounds.
    pub visited: usize,
    pub termination: Termination,
}

/// Run rounds until the stop condition holds or `max_rounds` is reached.
///
/// Any tap or step-invocation failure aborts the whole traversal.
pub fn run(ctx: &Context<'_>, config: &TraversalConfig) -> Result<TraversalReport> {
    config.require_target_actions()?;
    let trav = Traversal::new(ctx, config);

    let mut phase = Phase::Scanning;
    let mut round: u32 = 0;
    let mut visited = 0;
    let mut state = RoundState::default();
    let mut termination = Termination::RoundCap;

    while phase != Phase::Terminated {
        phase = match phase {
            Phase::Scanning => {
                if config.max_rounds.is_some_and(|max| round >= max) {
                    info!(round, "round cap reached");
                    Phase::Terminated
                } else {
                    round += 1;
                    let _span = info_span!("round", n = round).entered();
                    let targets = trav.scan();
                    if targets.is_empty() {
                        info!("no targets, retrying after round boundary");
                        finish_round(ctx, &trav)?;
                        Phase::Scanning
                    } else {
                        info!(count = targets.len(), "targets found");
                        state = RoundState::new(targets);
                        Phase::Visiting
                    }
                }
            }
            Phase::Visiting => match trav.visit_next(&mut state)? {
                Some(visit) => {
                    info!(
                        round,
                        n = visit.index + 1,
                        of = state.matches().len(),
                        at = %visit.target.center(),
                        score = visit.target.score(),
                        "tapped"
                    );
                    visited += 1;
                    pause(ctx.sleeper, config.post_click_delay);
                    for step in &visit.follow_up {
                        invoke(ctx, step)?;
                    }
                    Phase::Visiting
                }
                None => Phase::RoundEnd,
            },
            Phase::RoundEnd => {
                if trav.is_done() {
                    info!(round, "stop condition met");
                    termination = Termination::StopCondition;
                    Phase::Terminated
                } else {
                    finish_round(ctx, &trav)?;
                    Phase::Scanning
                }
            }
            Phase::Terminated => Phase::Terminated,
        };
    }

    info!(rounds = round, visited, ?termination, "traversal finished");
    Ok(TraversalReport { rounds: round, visited, termination })
}

fn finish_round(ctx: &Context<'_>, trav: &Traversal<'_, '_>) -> Result<()> {
    for step in trav.round_boundary() {
        info!(step = %step, "running round boundary step");
        invoke(ctx, &step)?;
    }
    pause(ctx.sleeper, trav.config().round_delay);
    Ok(())
}

fn invoke(ctx: &Context<'_>, step: &str) -> Result<()> {
    ctx.tasker.run_task(step).map_err(|source| SweepError::Invoke {
        step: step.to_string(),
        source,
    })
}
