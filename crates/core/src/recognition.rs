use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, SweepError};
use crate::platform::Recognizer;
use crate::types::{Frame, Rect, Target};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Template,
    #[serde(alias = "OCR")]
    Ocr,
}

/// What to look for. Template and text matching are mutually exclusive.
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    /// Image reference, resolved by the recognition backend.
    Template(String),
    /// Expected strings; any match counts. Backends treat them as regexes.
    Ocr(Vec<String>),
}

impl Pattern {
    pub fn method(&self) -> Method {
        match self {
            Pattern::Template(_) => Method::Template,
            Pattern::Ocr(_) => Method::Ocr,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Pattern::Template(path) => path.is_empty(),
            Pattern::Ocr(texts) => texts.iter().all(String::is_empty),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionQuery {
    pub pattern: Pattern,
    /// Inclusive minimum score.
    pub threshold: f64,
    /// `None` means the full frame.
    pub region: Option<Rect>,
}

impl RecognitionQuery {
    pub fn template(path: impl Into<String>, threshold: f64) -> Self {
        Self {
            pattern: Pattern::Template(path.into()),
            threshold,
            region: None,
        }
    }

    pub fn ocr<I, S>(texts: I, threshold: f64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            pattern: Pattern::Ocr(texts.into_iter().map(Into::into).collect()),
            threshold,
            region: None,
        }
    }

    pub fn with_region(mut self, region: Rect) -> Self {
        self.region = Some(region);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.pattern.is_empty() {
            return Err(SweepError::config(match self.pattern.method() {
                Method::Template => "template method requires a non-empty pattern",
                Method::Ocr => "ocr method requires at least one expected text",
            }));
        }
        if !self.threshold.is_finite() || !(0.0..=1.0).contains(&self.threshold) {
            return Err(SweepError::config(format!(
                "threshold must be within [0, 1], got {}",
                self.threshold
            )));
        }
        Ok(())
    }
}

/// All targets at or above the threshold inside the query region, best first.
///
/// Backend errors are logged and yield an empty list. Equal scores keep
/// the backend's order.
pub fn find_all(recognizer: &dyn Recognizer, frame: &Frame, query: &RecognitionQuery) -> Vec<Target> {
    try_find_all(recognizer, frame, query).unwrap_or_else(|e| {
        warn!(frame = frame.seq, error = %e, "recognition failed, treating as no matches");
        Vec::new()
    })
}

/// [`find_all`] that hands backend errors back to the caller.
pub fn try_find_all(
    recognizer: &dyn Recognizer,
    frame: &Frame,
    query: &RecognitionQuery,
) -> anyhow::Result<Vec<Target>> {
    let candidates = recognizer.recognize(frame, query)?;

    let region = query.region.or_else(|| frame.bounds());
    let mut hits: Vec<Target> = candidates
        .into_iter()
        .filter(|t| t.score() >= query.threshold)
        .filter(|t| region.map_or(true, |r| r.contains(t.center())))
        .collect();
    hits.sort_by(|a, b| b.score().total_cmp(&a.score()));

    for t in &hits {
        debug!(
            method = ?query.pattern.method(),
            bbox = ?t.bbox(),
            score = t.score(),
            center = %t.center(),
            "candidate accepted"
        );
    }
    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Recognizer;
    use anyhow::anyhow;

    struct Fixed(Vec<Target>);

    impl Recognizer for Fixed {
        fn recognize(&self, _frame: &Frame, _query: &RecognitionQuery) -> anyhow::Result<Vec<Target>> {
            Ok(self.0.clone())
        }
    }

    struct Broken;

    impl Recognizer for Broken {
        fn recognize(&self, _frame: &Frame, _query: &RecognitionQuery) -> anyhow::Result<Vec<Target>> {
            Err(anyhow!("model not loaded"))
        }
    }

    fn scored(x: i32, score: f64) -> Target {
        Target::new(Rect::new(x, 0, 10, 10), score)
    }

    #[test]
    fn sorts_by_descending_score() {
        let backend = Fixed(vec![scored(0, 0.9), scored(20, 0.95), scored(40, 0.81)]);
        let hits = find_all(&backend, &Frame::default(), &RecognitionQuery::template("a.png", 0.8));
        let scores: Vec<f64> = hits.iter().map(Target::score).collect();
        assert_eq!(scores, vec![0.95, 0.9, 0.81]);
    }

    #[test]
    fn threshold_is_inclusive() {
        let backend = Fixed(vec![scored(0, 0.8), scored(20, 0.8 - 1e-9)]);
        let hits = find_all(&backend, &Frame::default(), &RecognitionQuery::template("a.png", 0.8));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].bbox().x, 0);
    }

    #[test]
    fn equal_scores_keep_backend_order() {
        let backend = Fixed(vec![scored(0, 0.9), scored(20, 0.9), scored(40, 0.9)]);
        let hits = find_all(&backend, &Frame::default(), &RecognitionQuery::template("a.png", 0.5));
        let xs: Vec<i32> = hits.iter().map(|t| t.bbox().x).collect();
        assert_eq!(xs, vec![0, 20, 40]);
    }

    #[test]
    fn drops_candidates_outside_region() {
        let backend = Fixed(vec![scored(0, 0.9), scored(100, 0.9)]);
        let query = RecognitionQuery::template("a.png", 0.5).with_region(Rect::new(50, 0, 100, 50));
        let hits = find_all(&backend, &Frame::default(), &query);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].bbox().x, 100);
    }

    #[test]
    fn full_frame_bounds_apply_without_region() {
        let backend = Fixed(vec![scored(0, 0.9), scored(2000, 0.9)]);
        let hits = find_all(&backend, &Frame::blank(1, 1920, 1080), &RecognitionQuery::template("a.png", 0.5));
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn backend_error_is_empty() {
        let hits = find_all(&Broken, &Frame::default(), &RecognitionQuery::ocr(["ok"], 0.5));
        assert!(hits.is_empty());
        assert!(try_find_all(&Broken, &Frame::default(), &RecognitionQuery::ocr(["ok"], 0.5)).is_err());
    }

    #[test]
    fn candidate_near_coordinate_limit_is_filtered_not_panicking() {
        let backend = Fixed(vec![Target::new(Rect::new(2147483100, 0, 10, 10), 0.9)]);
        let query = RecognitionQuery::template("item.png", 0.8).with_region(Rect::new(2147483000, 0, 600, 10));
        let hits = find_all(&backend, &Frame::default(), &query);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn validate_rejects_empty_patterns() {
        assert!(RecognitionQuery::template("", 0.8).validate().is_err());
        assert!(RecognitionQuery::ocr(Vec::<String>::new(), 0.8).validate().is_err());
        assert!(RecognitionQuery::ocr([""], 0.8).validate().is_err());
        assert!(RecognitionQuery::ocr(["done"], 0.8).validate().is_ok());
    }

    #[test]
    fn validate_rejects_out_of_range_threshold() {
        assert!(RecognitionQuery::template("a.png", 1.5).validate().is_err());
        assert!(RecognitionQuery::template("a.png", f64::NAN).validate().is_err());
        assert!(RecognitionQuery::template("a.png", 0.0).validate().is_ok());
        assert!(RecognitionQuery::template("a.png", 1.0).validate().is_ok());
    }
}
