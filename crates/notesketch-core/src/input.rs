//! Pointer input delivered by the host UI.

use kurbo::Point;
use serde::{Deserialize, Serialize};

/// A pointer sample in surface-local CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputPoint {
    pub x: f64,
    pub y: f64,
    /// Event timestamp in milliseconds (any monotonic origin).
    pub time_ms: f64,
}

impl InputPoint {
    pub fn new(x: f64, y: f64, time_ms: f64) -> Self {
        Self { x, y, time_ms }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Pointer event type for unified mouse/touch handling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PointerEvent {
    Down(InputPoint),
    Move(InputPoint),
    Up,
    /// Pointer left the surface; ends the stroke like `Up`.
    Leave,
}
