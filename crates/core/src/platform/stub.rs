use std::cell::RefCell;
use std::path::Path;

use anyhow::{anyhow, Context as _};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Recognizer, Screen};
use crate::recognition::{Method, Pattern, RecognitionQuery};
use crate::types::*;

/// One recognizable thing on the stub screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneItem {
    #[serde(default = "default_kind")]
    pub kind: Method,
    /// Template name, or the text an OCR pass would read.
    pub label: String,
    #[serde(rename = "box")]
    pub bbox: Rect,
    pub score: f64,
    /// Hidden until this many taps have landed.
    #[serde(default)]
    pub after_taps: usize,
}

fn default_kind() -> Method {
    Method::Template
}

impl SceneItem {
    pub fn template(label: &str, bbox: Rect, score: f64) -> Self {
        Self { kind: Method::Template, label: label.into(), bbox, score, after_taps: 0 }
    }

    pub fn text(label: &str, bbox: Rect, score: f64) -> Self {
        Self { kind: Method::Ocr, label: label.into(), bbox, score, after_taps: 0 }
    }

    pub fn after_taps(mut self, n: usize) -> Self {
        self.after_taps = n;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    /// Tapping inside an item's box removes it.
    #[serde(default)]
    pub consume_on_tap: bool,
    #[serde(default)]
    pub items: Vec<SceneItem>,
}

fn default_width() -> u32 {
    1920
}

fn default_height() -> u32 {
    1080
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            consume_on_tap: false,
            items: Vec::new(),
        }
    }
}

struct StubState {
    scene: Scene,
    frames: u64,
    taps: Vec<Point>,
    failing_taps: usize,
    failing_recognitions: usize,
}

/// Scene-driven screen and recognizer with no real device behind it.
pub struct StubScreen {
    state: RefCell<StubState>,
}

impl StubScreen {
    pub fn new(scene: Scene) -> Self {
        Self {
            state: RefCell::new(StubState {
                scene,
                frames: 0,
                taps: Vec::new(),
                failing_taps: 0,
                failing_recognitions: 0,
            }),
        }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading scene {}", path.display()))?;
        let scene: Scene = serde_json::from_str(&text)
            .with_context(|| format!("parsing scene {}", path.display()))?;
        Ok(Self::new(scene))
    }

    /// Make the next `n` taps fail as if the device went away.
    pub fn fail_next_taps(&self, n: usize) {
        self.state.borrow_mut().failing_taps = n;
    }

    /// Make the next `n` recognition calls error out.
    pub fn fail_next_recognitions(&self, n: usize) {
        self.state.borrow_mut().failing_recognitions = n;
    }

    pub fn taps(&self) -> Vec<Point> {
        self.state.borrow().taps.clone()
    }

    pub fn frames(&self) -> u64 {
        self.state.borrow().frames
    }

    /// Items still on screen, visible or not.
    pub fn remaining(&self) -> usize {
        self.state.borrow().scene.items.len()
    }
}

fn matches(item: &SceneItem, pattern: &Pattern) -> anyhow::Result<bool> {
    match pattern {
        Pattern::Template(name) => Ok(item.kind == Method::Template && item.label == *name),
        Pattern::Ocr(expected) => {
            if item.kind != Method::Ocr {
                return Ok(false);
            }
            for text in expected {
                let re = Regex::new(text).with_context(|| format!("bad ocr pattern '{}'", text))?;
                if re.is_match(&item.label) {
                    return Ok(true);
                }
            }
            Ok(false)
        }
    }
}

impl Screen for StubScreen {
    fn capture(&self) -> anyhow::Result<Frame> {
        let mut st = self.state.borrow_mut();
        st.frames += 1;
        debug!(target: "stub", "capture() -> frame {}", st.frames);
        Ok(Frame::blank(st.frames, st.scene.width, st.scene.height))
    }

    fn tap(&self, at: Point) -> anyhow::Result<()> {
        let mut st = self.state.borrow_mut();
        if st.failing_taps > 0 {
            st.failing_taps -= 1;
            return Err(anyhow!("device disconnected"));
        }
        debug!(target: "stub", "tap{}", at);
        let shown = st.taps.len();
        st.taps.push(at);
        if !st.scene.consume_on_tap {
            return Ok(());
        }
        let hit = st
            .scene
            .items
            .iter()
            .position(|i| i.after_taps <= shown && i.bbox.contains(at));
        if let Some(idx) = hit {
            let gone = st.scene.items.remove(idx);
            debug!(target: "stub", "consumed '{}'", gone.label);
        }
        Ok(())
    }
}

impl Recognizer for StubScreen {
    fn recognize(&self, frame: &Frame, query: &RecognitionQuery) -> anyhow::Result<Vec<Target>> {
        let mut st = self.state.borrow_mut();
        if st.failing_recognitions > 0 {
            st.failing_recognitions -= 1;
            return Err(anyhow!("recognition backend unavailable"));
        }
        let taps = st.taps.len();
        let mut found = Vec::new();
        for item in st.scene.items.iter().filter(|i| i.after_taps <= taps) {
            if !matches(item, &query.pattern)? {
                continue;
            }
            if query.region.is_some_and(|r| !r.contains(item.bbox.center())) {
                continue;
            }
            found.push(Target::labeled(item.bbox, item.score, item.label.clone()));
        }
        debug!(target: "stub", "recognize(frame {}, {:?}) -> {} candidate(s)", frame.seq, query.pattern, found.len());
        Ok(found)
    }
}
