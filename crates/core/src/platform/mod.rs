pub mod stub;

use crate::recognition::RecognitionQuery;
use crate::types::*;

/// Frame capture and input injection on the controlled surface.
pub trait Screen {
    fn capture(&self) -> anyhow::Result<Frame>;
    fn tap(&self, at: Point) -> anyhow::Result<()>;
}

/// Template / text recognition backend. Returns raw candidates; the
/// adapter in [`crate::recognition`] filters and orders them.
pub trait Recognizer {
    fn recognize(&self, frame: &Frame, query: &RecognitionQuery) -> anyhow::Result<Vec<Target>>;
}

/// The host workflow engine.
pub trait Tasker {
    /// Run a named step to completion. Errors only when the step cannot be
    /// started; the step's own outcome is not reported.
    fn run_task(&self, step: &str) -> anyhow::Result<()>;

    /// Replace what runs after `step` returns. An empty list ends the chain.
    fn set_next(&self, step: &str, next: &[String]) -> anyhow::Result<()>;
}
