use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use tracing::{info, info_span};

use super::{Context, RoundState, Traversal};
use crate::config::TraversalConfig;
use crate::error::{Result, SweepError};

/// What the host should run once the current invocation returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Nothing further; the traversal is over.
    Finish,
    /// Run these steps in order. The last one is the traversal step itself.
    Continue(Vec<String>),
}

impl Directive {
    pub fn next_steps(&self) -> &[String] {
        match self {
            Directive::Finish => &[],
            Directive::Continue(steps) => steps,
        }
    }

    pub fn is_finish(&self) -> bool {
        matches!(self, Directive::Finish)
    }
}

/// Per-step round state that survives between invocations.
///
/// Each step identity must be invoked sequentially. Traversals configured
/// under the same identity share one record.
#[derive(Debug, Default)]
pub struct NodeStore {
    states: Mutex<HashMap<String, RoundState>>,
}

impl NodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide store.
    pub fn global() -> &'static NodeStore {
        static STORE: OnceLock<NodeStore> = OnceLock::new();
        STORE.get_or_init(NodeStore::new)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, RoundState>> {
        self.states.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, step: &str) -> Option<RoundState> {
        self.lock().get(step).cloned()
    }

    pub fn put(&self, step: &str, state: RoundState) {
        self.lock().insert(step.to_string(), state);
    }

    pub fn clear(&self, step: &str) {
        self.lock().remove(step);
    }

    pub fn contains(&self, step: &str) -> bool {
        self.lock().contains_key(step)
    }
}

/// Perform exactly one transition for `step_id`.
///
/// - no record, or an exhausted one without a round-boundary step: start a
///   round (stop check, then scan) and tap its first target
/// - exhausted record with a round-boundary step: drop the record and hand
///   off to that step; the next call starts a fresh round
/// - otherwise: tap the target under the cursor
///
/// A failed tap leaves the record as it was before the call.
pub fn step(
    ctx: &Context<'_>,
    store: &NodeStore,
    step_id: &str,
    config: &TraversalConfig,
) -> Result<Directive> {
    let _span = info_span!("step", id = step_id).entered();
    let trav = Traversal::new(ctx, config);

    let mut state = match store.get(step_id) {
        Some(state) if !state.is_exhausted() => state,
        Some(_) if config.after_round_action.is_some() => {
            store.clear(step_id);
            let mut next = trav.round_boundary();
            next.push(step_id.to_string());
            info!("round exhausted, running round boundary step");
            return apply(ctx, step_id, Directive::Continue(next));
        }
        _ => match begin_round(&trav, store, step_id) {
            Some(state) => state,
            None => {
                store.clear(step_id);
                return apply(ctx, step_id, Directive::Finish);
            }
        },
    };

    let Some(visit) = trav.visit_next(&mut state)? else {
        store.clear(step_id);
        return apply(ctx, step_id, Directive::Finish);
    };
    info!(
        n = visit.index + 1,
        of = state.matches().len(),
        at = %visit.target.center(),
        score = visit.target.score(),
        "tapped"
    );
    store.put(step_id, state);

    let mut next = visit.follow_up;
    next.push(step_id.to_string());
    apply(ctx, step_id, Directive::Continue(next))
}

/// Stop check then scan. `None` ends the traversal.
fn begin_round(trav: &Traversal<'_, '_>, store: &NodeStore, step_id: &str) -> Option<RoundState> {
    if trav.is_done() {
        info!("stop condition met");
        return None;
    }
    let targets = trav.scan();
    if targets.is_empty() {
        info!("no targets, finishing");
        return None;
    }
    info!(count = targets.len(), "round started");
    let state = RoundState::new(targets);
    store.put(step_id, state.clone());
    Some(state)
}

fn apply(ctx: &Context<'_>, step_id: &str, directive: Directive) -> Result<Directive> {
    ctx.tasker
        .set_next(step_id, directive.next_steps())
        .map_err(|source| SweepError::Rewrite {
            step: step_id.to_string(),
            source,
        })?;
    Ok(directive)
}
