pub mod blocking;
pub mod cooperative;

use tracing::warn;

use crate::config::TraversalConfig;
use crate::error::{Result, SweepError};
use crate::platform::{Recognizer, Screen, Tasker};
use crate::recognition;
use crate::sleep::Sleeper;
use crate::stop;
use crate::types::{Frame, Target};

pub use cooperative::{Directive, NodeStore};

/// Collaborators for one invocation.
#[derive(Clone, Copy)]
pub struct Context<'a> {
    pub screen: &'a dyn Screen,
    pub recognizer: &'a dyn Recognizer,
    pub tasker: &'a dyn Tasker,
    pub sleeper: &'a dyn Sleeper,
}

/// One round's target snapshot and how far through it we are.
///
/// `cursor == matches.len()` means the round is exhausted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoundState {
    matches: Vec<Target>,
    cursor: usize,
}

impl RoundState {
    pub fn new(matches: Vec<Target>) -> Self {
        Self { matches, cursor: 0 }
    }

    pub fn matches(&self) -> &[Target] {
        &self.matches
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.matches.len()
    }
}

/// A target that was just tapped, and what should run after it.
#[derive(Debug, Clone, PartialEq)]
pub struct Visit {
    pub target: Target,
    /// Position within the round, starting at 0.
    pub index: usize,
    pub follow_up: Vec<String>,
}

/// Scan, visit, round-boundary and stop primitives shared by both drivers.
pub struct Traversal<'c, 'a> {
    ctx: &'c Context<'a>,
    config: &'c TraversalConfig,
}

impl<'c, 'a> Traversal<'c, 'a> {
    pub fn new(ctx: &'c Context<'a>, config: &'c TraversalConfig) -> Self {
        Self { ctx, config }
    }

    pub fn config(&self) -> &TraversalConfig {
        self.config
    }

    fn capture(&self) -> Option<Frame> {
        match self.ctx.screen.capture() {
            Ok(frame) => Some(frame),
            Err(e) => {
                warn!(error = %e, "capture failed");
                None
            }
        }
    }

    /// Fresh frame, all current targets best first. Capture failure is an empty scan.
    pub fn scan(&self) -> Vec<Target> {
        match self.capture() {
            Some(frame) => recognition::find_all(self.ctx.recognizer, &frame, &self.config.query),
            None => Vec::new(),
        }
    }

    /// Fresh frame checked against the stop condition. Fails open.
    pub fn is_done(&self) -> bool {
        if self.config.stop.is_none() {
            return false;
        }
        match self.capture() {
            Some(frame) => stop::is_satisfied(self.ctx.recognizer, &frame, self.config.stop.as_ref()),
            None => false,
        }
    }

    /// Tap the target under the cursor and advance.
    ///
    /// On tap failure the cursor stays put so a retry hits the same target.
    pub fn visit_next(&self, state: &mut RoundState) -> Result<Option<Visit>> {
        let Some(target) = state.matches.get(state.cursor) else {
            return Ok(None);
        };
        let at = target.center();
        self.ctx
            .screen
            .tap(at)
            .map_err(|source| SweepError::Tap { at, source })?;

        let visit = Visit {
            target: target.clone(),
            index: state.cursor,
            follow_up: self.config.per_target_actions.clone(),
        };
        state.cursor += 1;
        Ok(Some(visit))
    }

    /// Steps to run when a round ends.
    pub fn round_boundary(&self) -> Vec<String> {
        self.config.after_round_action.iter().cloned().collect()
    }
}
