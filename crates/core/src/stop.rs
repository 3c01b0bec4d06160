use tracing::{debug, warn};

use crate::platform::Recognizer;
use crate::recognition::{self, Pattern, RecognitionQuery};
use crate::types::{Frame, Rect};

/// Same shape as a recognition query, collapsed to hit / no hit.
#[derive(Debug, Clone, PartialEq)]
pub struct StopCondition {
    query: RecognitionQuery,
}

impl StopCondition {
    /// `None` when the pattern is empty: an unset stop condition never fires.
    pub fn new(pattern: Pattern, threshold: f64, region: Option<Rect>) -> Option<Self> {
        if pattern.is_empty() {
            return None;
        }
        Some(Self {
            query: RecognitionQuery { pattern, threshold, region },
        })
    }

    pub fn query(&self) -> &RecognitionQuery {
        &self.query
    }
}

/// Whether `stop` hits on `frame`. Missing condition and backend errors are `false`.
pub fn is_satisfied(recognizer: &dyn Recognizer, frame: &Frame, stop: Option<&StopCondition>) -> bool {
    let Some(stop) = stop else {
        return false;
    };
    let hit = match recognition::try_find_all(recognizer, frame, &stop.query) {
        Ok(hits) => !hits.is_empty(),
        Err(e) => {
            warn!(frame = frame.seq, error = %e, "stop evaluation failed, continuing");
            return false;
        }
    };
    debug!(frame = frame.seq, hit, "stop condition evaluated");
    hit
}
