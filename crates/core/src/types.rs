use std::fmt;

use serde::{Deserialize, Serialize};

/// Frame-relative rectangle, `[x, y, w, h]` on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[i32; 4]", into = "[i32; 4]")]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    pub fn is_empty(&self) -> bool {
        self.w <= 0 || self.h <= 0
    }

    /// Center point, floor-divided on odd dimensions.
    pub fn center(&self) -> Point {
        Point {
            x: self.x.saturating_add(self.w.div_euclid(2)),
            y: self.y.saturating_add(self.h.div_euclid(2)),
        }
    }

    /// Half-open containment: the right and bottom edges are outside.
    pub fn contains(&self, p: Point) -> bool {
        let (px, py) = (i64::from(p.x), i64::from(p.y));
        let (x, y) = (i64::from(self.x), i64::from(self.y));
        px >= x && py >= y && px < x + i64::from(self.w) && py < y + i64::from(self.h)
    }
}

impl From<[i32; 4]> for Rect {
    fn from([x, y, w, h]: [i32; 4]) -> Self {
        Self { x, y, w, h }
    }
}

impl From<Rect> for [i32; 4] {
    fn from(r: Rect) -> Self {
        [r.x, r.y, r.w, r.h]
    }
}

/// A point in frame coordinates, `[x, y]` on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[i32; 2]", into = "[i32; 2]")]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<[i32; 2]> for Point {
    fn from([x, y]: [i32; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Point> for [i32; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A scored candidate region produced by recognition. Read-only once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    #[serde(rename = "box")]
    bbox: Rect,
    score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
}

impl Target {
    pub fn new(bbox: Rect, score: f64) -> Self {
        Self { bbox, score, label: None }
    }

    pub fn labeled(bbox: Rect, score: f64, label: impl Into<String>) -> Self {
        Self { bbox, score, label: Some(label.into()) }
    }

    pub fn bbox(&self) -> Rect {
        self.bbox
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// The point that gets tapped.
    pub fn center(&self) -> Point {
        self.bbox.center()
    }
}

/// Raw screenshot pixel data (BGRA)
#[derive(Debug, Clone, Default)]
pub struct Frame {
    /// Monotonic capture number assigned by the screen.
    pub seq: u64,
    pub width: u32,
    pub height: u32,
    pub bytes_per_row: u32,
    pub data: Vec<u8>,
}

impl Frame {
    /// A zero-filled frame of the given size.
    pub fn blank(seq: u64, width: u32, height: u32) -> Self {
        let bytes_per_row = width * 4;
        Self {
            seq,
            width,
            height,
            bytes_per_row,
            data: vec![0; (bytes_per_row * height) as usize],
        }
    }

    /// Full-frame rectangle, `None` when the size is unknown.
    pub fn bounds(&self) -> Option<Rect> {
        let rect = Rect::new(0, 0, self.width as i32, self.height as i32);
        (!rect.is_empty()).then_some(rect)
    }
}
