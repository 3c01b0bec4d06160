#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::time::Duration;

use anyhow::anyhow;
use sweep_core::platform::{Recognizer, Screen, Tasker};
use sweep_core::recognition::{Pattern, RecognitionQuery};
use sweep_core::sleep::Sleeper;
use sweep_core::stop::StopCondition;
use sweep_core::types::{Frame, Point, Rect, Target};
use sweep_core::{Context, TraversalConfig};

pub const ITEM: &str = "item.png";
pub const END: &str = "end.png";

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Capture,
    Tap(Point),
    Run(String),
    SetNext(String, Vec<String>),
    Sleep(Duration),
}

/// Screen, recognizer, host and sleeper in one, answering from a script.
#[derive(Default)]
pub struct Script {
    /// One entry per item recognition call; `fallback` once drained.
    scans: RefCell<VecDeque<Vec<Target>>>,
    fallback: RefCell<Vec<Target>>,
    /// Stop evaluations (1-based) from which the stop condition hits.
    stop_from: Cell<Option<usize>>,
    stop_calls: Cell<usize>,
    item_calls: Cell<usize>,
    failing_taps: Cell<usize>,
    failing_runs: Cell<usize>,
    failing_rewrites: Cell<usize>,
    failing_scans: Cell<usize>,
    events: RefCell<Vec<Event>>,
    frames: Cell<u64>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scan(self, targets: Vec<Target>) -> Self {
        self.scans.borrow_mut().push_back(targets);
        self
    }

    pub fn always(self, targets: Vec<Target>) -> Self {
        *self.fallback.borrow_mut() = targets;
        self
    }

    pub fn stop_from(self, evaluation: usize) -> Self {
        self.stop_from.set(Some(evaluation));
        self
    }

    pub fn fail_next_taps(&self, n: usize) {
        self.failing_taps.set(n);
    }

    pub fn fail_next_runs(&self, n: usize) {
        self.failing_runs.set(n);
    }

    pub fn fail_next_rewrites(&self, n: usize) {
        self.failing_rewrites.set(n);
    }

    pub fn fail_next_scans(&self, n: usize) {
        self.failing_scans.set(n);
    }

    pub fn ctx(&self) -> Context<'_> {
        Context {
            screen: self,
            recognizer: self,
            tasker: self,
            sleeper: self,
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub fn taps(&self) -> Vec<Point> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Event::Tap(p) => Some(*p),
                _ => None,
            })
            .collect()
    }

    pub fn runs(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Event::Run(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn last_next(&self) -> Option<(String, Vec<String>)> {
        self.events.borrow().iter().rev().find_map(|e| match e {
            Event::SetNext(step, next) => Some((step.clone(), next.clone())),
            _ => None,
        })
    }

    pub fn item_calls(&self) -> usize {
        self.item_calls.get()
    }

    pub fn stop_calls(&self) -> usize {
        self.stop_calls.get()
    }

    fn take(counter: &Cell<usize>) -> bool {
        let n = counter.get();
        if n > 0 {
            counter.set(n - 1);
            true
        } else {
            false
        }
    }
}

impl Screen for Script {
    fn capture(&self) -> anyhow::Result<Frame> {
        self.events.borrow_mut().push(Event::Capture);
        self.frames.set(self.frames.get() + 1);
        Ok(Frame::blank(self.frames.get(), 1920, 1080))
    }

    fn tap(&self, at: Point) -> anyhow::Result<()> {
        if Self::take(&self.failing_taps) {
            return Err(anyhow!("device disconnected"));
        }
        self.events.borrow_mut().push(Event::Tap(at));
        Ok(())
    }
}

impl Recognizer for Script {
    fn recognize(&self, _frame: &Frame, query: &RecognitionQuery) -> anyhow::Result<Vec<Target>> {
        match &query.pattern {
            Pattern::Template(name) if name == END => {
                self.stop_calls.set(self.stop_calls.get() + 1);
                let hit = self.stop_from.get().is_some_and(|n| self.stop_calls.get() >= n);
                Ok(if hit { vec![Target::new(Rect::new(0, 0, 10, 10), 1.0)] } else { Vec::new() })
            }
            _ => {
                self.item_calls.set(self.item_calls.get() + 1);
                if Self::take(&self.failing_scans) {
                    return Err(anyhow!("backend crashed"));
                }
                let next = self.scans.borrow_mut().pop_front();
                Ok(next.unwrap_or_else(|| self.fallback.borrow().clone()))
            }
        }
    }
}

impl Tasker for Script {
    fn run_task(&self, step: &str) -> anyhow::Result<()> {
        if Self::take(&self.failing_runs) {
            return Err(anyhow!("host rejected '{}'", step));
        }
        self.events.borrow_mut().push(Event::Run(step.to_string()));
        Ok(())
    }

    fn set_next(&self, step: &str, next: &[String]) -> anyhow::Result<()> {
        if Self::take(&self.failing_rewrites) {
            return Err(anyhow!("host is shutting down"));
        }
        self.events
            .borrow_mut()
            .push(Event::SetNext(step.to_string(), next.to_vec()));
        Ok(())
    }
}

impl Sleeper for Script {
    fn sleep(&self, d: Duration) {
        self.events.borrow_mut().push(Event::Sleep(d));
    }
}

/// Target `i` sits at x = 100 * i with the given score.
pub fn target(i: i32, score: f64) -> Target {
    Target::new(Rect::new(100 * i, 100, 10, 10), score)
}

pub fn center_of(i: i32) -> Point {
    Point::new(100 * i + 5, 105)
}

pub fn end_screen() -> StopCondition {
    StopCondition::new(Pattern::Template(END.into()), 0.8, None).unwrap()
}

/// Item query, stop on the end screen, one per-target step, no delays.
pub fn config() -> TraversalConfig {
    TraversalConfig::new(RecognitionQuery::template(ITEM, 0.8))
        .with_stop(end_screen())
        .with_actions(["TaskA"])
        .with_delays(Duration::ZERO, Duration::ZERO)
}
