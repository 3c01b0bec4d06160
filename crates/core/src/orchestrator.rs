use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};

use anyhow::anyhow;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::config::TraversalConfig;
use crate::error::{Result, SweepError};
use crate::pipeline::{ActionKind, Pipeline};
use crate::platform::{Recognizer, Screen, Tasker};
use crate::sleep::Sleeper;
use crate::traversal::{blocking, cooperative, Context, NodeStore};

/// Default bound on node executions per run.
pub const DEFAULT_MAX_INVOCATIONS: usize = 10_000;

/// Host-side implementation of a `Custom` node.
pub trait CustomAction {
    fn run(&self, ctx: &Context<'_>, node: &str, param: &Value) -> Result<()>;
}

/// Registered as `Sweep`: runs a whole blocking traversal inside one node.
pub struct Sweep;

impl CustomAction for Sweep {
    fn run(&self, ctx: &Context<'_>, node: &str, param: &Value) -> Result<()> {
        let config = TraversalConfig::from_params(param)?;
        let report = blocking::run(ctx, &config)?;
        info!(node, rounds = report.rounds, visited = report.visited, "sweep done");
        Ok(())
    }
}

/// Registered as `SweepStep`: one cooperative transition per invocation.
pub struct SweepStep<'s> {
    store: &'s NodeStore,
}

impl<'s> SweepStep<'s> {
    pub fn new(store: &'s NodeStore) -> Self {
        Self { store }
    }
}

impl CustomAction for SweepStep<'_> {
    fn run(&self, ctx: &Context<'_>, node: &str, param: &Value) -> Result<()> {
        let config = TraversalConfig::from_params(param)?;
        let directive = cooperative::step(ctx, self.store, node, &config)?;
        if directive.is_finish() {
            info!(node, "sweep step finished");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Failed { node: String, message: String },
    /// The invocation budget ran out before the queue drained.
    BudgetExhausted,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    /// Nodes executed during this run, nested ones included.
    pub invocations: usize,
    /// Node names in execution order.
    pub trail: Vec<String>,
}

/// In-process workflow engine. A node's next list (its `set_next` override,
/// else the static list) runs before anything already queued.
pub struct Orchestrator<'a> {
    pipeline: Pipeline,
    actions: HashMap<String, Box<dyn CustomAction + 'a>>,
    overrides: RefCell<HashMap<String, Vec<String>>>,
    screen: &'a dyn Screen,
    recognizer: &'a dyn Recognizer,
    sleeper: &'a dyn Sleeper,
    max_invocations: usize,
    invocations: Cell<usize>,
    trail: RefCell<Vec<String>>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        pipeline: Pipeline,
        screen: &'a dyn Screen,
        recognizer: &'a dyn Recognizer,
        sleeper: &'a dyn Sleeper,
    ) -> Self {
        Self {
            pipeline,
            actions: HashMap::new(),
            overrides: RefCell::new(HashMap::new()),
            screen,
            recognizer,
            sleeper,
            max_invocations: DEFAULT_MAX_INVOCATIONS,
            invocations: Cell::new(0),
            trail: RefCell::new(Vec::new()),
        }
    }

    /// Bound node executions per run, nested ones included. Nothing else
    /// stops a cooperative traversal that keeps finding targets.
    pub fn with_max_invocations(mut self, max: usize) -> Self {
        self.max_invocations = max;
        self
    }

    pub fn register(&mut self, name: &str, action: impl CustomAction + 'a) {
        self.actions.insert(name.to_string(), Box::new(action));
    }

    /// Register `Sweep` and `SweepStep`, the latter keeping state in `store`.
    pub fn register_builtin(&mut self, store: &'a NodeStore) {
        self.register("Sweep", Sweep);
        self.register("SweepStep", SweepStep::new(store));
    }

    /// Current `set_next` override for `node`, if any.
    pub fn next_override(&self, node: &str) -> Option<Vec<String>> {
        self.overrides.borrow().get(node).cloned()
    }

    /// Run from `entry` until the queue drains, a node fails, or the budget is spent.
    pub fn run(&self, entry: &str) -> Result<RunSummary> {
        if !self.pipeline.contains(entry) {
            return Err(SweepError::UnknownNode { name: entry.to_string() });
        }
        self.invocations.set(0);
        self.trail.borrow_mut().clear();

        info!(entry, "pipeline run started");
        let outcome = self.drive(entry);
        info!(entry, ?outcome, "pipeline run finished");

        Ok(RunSummary {
            outcome,
            invocations: self.invocations.get(),
            trail: self.trail.take(),
        })
    }

    fn drive(&self, entry: &str) -> RunOutcome {
        let mut queue = VecDeque::from([entry.to_string()]);
        while let Some(name) = queue.pop_front() {
            if self.invocations.get() >= self.max_invocations {
                warn!(max = self.max_invocations, node = %name, "invocation budget exhausted");
                return RunOutcome::BudgetExhausted;
            }
            self.invocations.set(self.invocations.get() + 1);
            self.trail.borrow_mut().push(name.clone());

            if let Err(e) = self.execute(&name) {
                if e.is_action_failure() {
                    error!(node = %name, error = %e, "node action failed on the device");
                } else {
                    error!(node = %name, error = %e, "node failed");
                }
                return RunOutcome::Failed { node: name, message: e.to_string() };
            }
            for step in self.next_of(&name).into_iter().rev() {
                queue.push_front(step);
            }
        }
        RunOutcome::Completed
    }

    fn next_of(&self, name: &str) -> Vec<String> {
        if let Some(next) = self.overrides.borrow().get(name) {
            return next.clone();
        }
        self.pipeline.get(name).map(|n| n.next.clone()).unwrap_or_default()
    }

    fn execute(&self, name: &str) -> Result<()> {
        let node = self
            .pipeline
            .get(name)
            .ok_or_else(|| SweepError::UnknownNode { name: name.to_string() })?;

        match node.action {
            ActionKind::DoNothing => Ok(()),
            ActionKind::Click => {
                let at = node
                    .target
                    .ok_or_else(|| SweepError::config(format!("node '{}' has no click target", name)))?;
                self.screen.tap(at).map_err(|source| SweepError::Tap { at, source })
            }
            ActionKind::Custom => {
                let key = node.custom_action.as_deref().unwrap_or_default();
                let action = self
                    .actions
                    .get(key)
                    .ok_or_else(|| SweepError::config(format!("no custom action registered as '{}'", key)))?;
                let param = node.param()?;
                let ctx = Context {
                    screen: self.screen,
                    recognizer: self.recognizer,
                    tasker: self,
                    sleeper: self.sleeper,
                };
                action.run(&ctx, name, &param)
            }
        }
    }
}

impl Tasker for Orchestrator<'_> {
    fn run_task(&self, step: &str) -> anyhow::Result<()> {
        if !self.pipeline.contains(step) {
            return Err(anyhow!("unknown step '{}'", step));
        }
        let outcome = self.drive(step);
        if outcome != RunOutcome::Completed {
            warn!(step, ?outcome, "nested step did not complete");
        }
        Ok(())
    }

    fn set_next(&self, step: &str, next: &[String]) -> anyhow::Result<()> {
        if !self.pipeline.contains(step) {
            return Err(anyhow!("unknown step '{}'", step));
        }
        if let Some(missing) = next.iter().find(|n| !self.pipeline.contains(n)) {
            return Err(anyhow!("next step '{}' is not in the pipeline", missing));
        }
        self.overrides.borrow_mut().insert(step.to_string(), next.to_vec());
        Ok(())
    }
}
