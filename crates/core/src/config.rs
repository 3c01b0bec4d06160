use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Result, SweepError};
use crate::recognition::{Method, Pattern, RecognitionQuery};
use crate::sleep;
use crate::stop::StopCondition;
use crate::types::Rect;

pub const DEFAULT_THRESHOLD: f64 = 0.8;
pub const DEFAULT_STOP_THRESHOLD: f64 = 0.8;
pub const DEFAULT_ROUND_DELAY_SECS: f64 = 0.5;
pub const DEFAULT_CLICK_DELAY_SECS: f64 = 0.3;
pub const DEFAULT_MAX_ROUNDS: i64 = 50;

/// Traversal parameters, parsed from the host's per-invocation JSON object.
#[derive(Debug, Clone, PartialEq)]
pub struct TraversalConfig {
    pub query: RecognitionQuery,
    pub stop: Option<StopCondition>,
    /// Steps run, in order, after each visited target.
    pub per_target_actions: Vec<String>,
    /// Step run at every round boundary.
    pub after_round_action: Option<String>,
    pub round_delay: Duration,
    pub post_click_delay: Duration,
    /// `None` is unbounded.
    pub max_rounds: Option<u32>,
}

impl TraversalConfig {
    /// Defaults for everything except the query.
    pub fn new(query: RecognitionQuery) -> Self {
        Self {
            query,
            stop: None,
            per_target_actions: Vec::new(),
            after_round_action: None,
            round_delay: sleep::secs(DEFAULT_ROUND_DELAY_SECS),
            post_click_delay: sleep::secs(DEFAULT_CLICK_DELAY_SECS),
            max_rounds: Some(DEFAULT_MAX_ROUNDS as u32),
        }
    }

    pub fn with_stop(mut self, stop: StopCondition) -> Self {
        self.stop = Some(stop);
        self
    }

    pub fn with_actions<I, S>(mut self, steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.per_target_actions = steps.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_after_round(mut self, step: impl Into<String>) -> Self {
        self.after_round_action = Some(step.into());
        self
    }

    pub fn with_delays(mut self, round_delay: Duration, post_click_delay: Duration) -> Self {
        self.round_delay = round_delay;
        self.post_click_delay = post_click_delay;
        self
    }

    pub fn with_max_rounds(mut self, max_rounds: Option<u32>) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| SweepError::config(format!("param is not valid JSON: {e}")))?;
        Self::from_params(&value)
    }

    /// Parse and validate a parameter object. `null` reads as `{}`.
    pub fn from_params(params: &Value) -> Result<Self> {
        let raw = match params {
            Value::Null => RawParams::default(),
            Value::Object(_) => {
                RawParams::deserialize(params).map_err(|e| SweepError::config(e.to_string()))?
            }
            other => {
                return Err(SweepError::config(format!(
                    "param must be a JSON object, got {other}"
                )))
            }
        };
        raw.build()
    }

    /// The blocking strategy needs something to run per target.
    pub fn require_target_actions(&self) -> Result<()> {
        if self.per_target_actions.is_empty() {
            return Err(SweepError::config("at least one per-target step name is required"));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        let items = match self {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        };
        items.into_iter().filter(|s| !s.is_empty()).collect()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawParams {
    method: Option<Method>,
    #[serde(alias = "template")]
    pattern: Option<String>,
    #[serde(alias = "expected")]
    ocr_text: Option<OneOrMany>,
    threshold: Option<f64>,
    roi: Option<Rect>,

    stop_method: Option<Method>,
    #[serde(alias = "stop_template")]
    stop_pattern: Option<String>,
    #[serde(alias = "stop_ocr_text")]
    stop_text: Option<OneOrMany>,
    stop_roi: Option<Rect>,
    stop_threshold: Option<f64>,
    stop_condition: Option<RawStop>,

    #[serde(alias = "action_sequence")]
    task_each: Option<OneOrMany>,
    #[serde(alias = "after_all")]
    task_after_round: Option<String>,

    round_delay: Option<f64>,
    click_delay: Option<f64>,
    max_rounds: Option<serde_json::Number>,
}

#[derive(Debug, Deserialize)]
struct RawStop {
    #[serde(rename = "type", default)]
    kind: Option<Method>,
    #[serde(default)]
    target: Option<OneOrMany>,
    #[serde(default)]
    roi: Option<Rect>,
    #[serde(default)]
    threshold: Option<f64>,
}

/// Picks the method, inferring OCR when only text was supplied.
fn pattern_for(method: Option<Method>, template: Option<String>, texts: Option<OneOrMany>) -> Pattern {
    let method = method.unwrap_or(if template.is_none() && texts.is_some() {
        Method::Ocr
    } else {
        Method::Template
    });
    match method {
        Method::Template => Pattern::Template(template.unwrap_or_default()),
        Method::Ocr => Pattern::Ocr(texts.map(OneOrMany::into_vec).unwrap_or_default()),
    }
}

/// A zero-area roi means full frame. Negative sizes and edges past `i32::MAX` are rejected.
fn region(roi: Option<Rect>, key: &str) -> Result<Option<Rect>> {
    let Some(r) = roi else {
        return Ok(None);
    };
    if r.w < 0 || r.h < 0 {
        return Err(SweepError::config(format!("{key} has a negative size: {:?}", <[i32; 4]>::from(r))));
    }
    if r.x.checked_add(r.w).is_none() || r.y.checked_add(r.h).is_none() {
        return Err(SweepError::config(format!("{key} extends past the coordinate range: {:?}", <[i32; 4]>::from(r))));
    }
    Ok(Some(r).filter(|r| !r.is_empty()))
}

/// Whole numbers, including integral floats such as `3.0`. Negative is unbounded.
fn max_rounds(value: Option<serde_json::Number>) -> Result<Option<u32>> {
    let n = match value {
        None => DEFAULT_MAX_ROUNDS,
        Some(num) => match num.as_i64() {
            Some(n) => n,
            None => match num.as_f64() {
                Some(f) if f.fract() == 0.0 => f as i64,
                _ => return Err(SweepError::config(format!("max_rounds must be a whole number, got {num}"))),
            },
        },
    };
    Ok(if n < 0 { None } else { Some(u32::try_from(n).unwrap_or(u32::MAX)) })
}

fn delay(value: Option<f64>, default: f64, key: &str) -> Result<Duration> {
    let secs = value.unwrap_or(default);
    if !secs.is_finite() || secs < 0.0 {
        return Err(SweepError::config(format!("{key} must be a non-negative number of seconds, got {secs}")));
    }
    Ok(sleep::secs(secs))
}

impl RawParams {
    fn has_flat_stop(&self) -> bool {
        self.stop_method.is_some()
            || self.stop_pattern.is_some()
            || self.stop_text.is_some()
            || self.stop_roi.is_some()
            || self.stop_threshold.is_some()
    }

    fn build(self) -> Result<TraversalConfig> {
        if self.has_flat_stop() && self.stop_condition.is_some() {
            return Err(SweepError::config(
                "stop_condition cannot be combined with stop_* keys",
            ));
        }

        let query = RecognitionQuery {
            pattern: pattern_for(self.method, self.pattern, self.ocr_text),
            threshold: self.threshold.unwrap_or(DEFAULT_THRESHOLD),
            region: region(self.roi, "roi")?,
        };
        query.validate()?;

        let stop = match self.stop_condition {
            Some(nested) => {
                let kind = nested.kind.unwrap_or(Method::Ocr);
                let targets = nested.target.map(OneOrMany::into_vec).unwrap_or_default();
                let pattern = match kind {
                    Method::Ocr => Pattern::Ocr(targets),
                    Method::Template if targets.len() > 1 => {
                        return Err(SweepError::config(
                            "template stop_condition takes a single target",
                        ))
                    }
                    Method::Template => Pattern::Template(targets.into_iter().next().unwrap_or_default()),
                };
                StopCondition::new(
                    pattern,
                    nested.threshold.unwrap_or(DEFAULT_STOP_THRESHOLD),
                    region(nested.roi, "stop_condition.roi")?,
                )
            }
            None => StopCondition::new(
                pattern_for(self.stop_method, self.stop_pattern, self.stop_text),
                self.stop_threshold.unwrap_or(DEFAULT_STOP_THRESHOLD),
                region(self.stop_roi, "stop_roi")?,
            ),
        };
        if let Some(stop) = &stop {
            stop.query().validate()?;
        }

        let max_rounds = max_rounds(self.max_rounds)?;

        Ok(TraversalConfig {
            query,
            stop,
            per_target_actions: self.task_each.map(OneOrMany::into_vec).unwrap_or_default(),
            after_round_action: self.task_after_round.filter(|s| !s.is_empty()),
            round_delay: delay(self.round_delay, DEFAULT_ROUND_DELAY_SECS, "round_delay")?,
            post_click_delay: delay(self.click_delay, DEFAULT_CLICK_DELAY_SECS, "click_delay")?,
            max_rounds,
        })
    }
}
