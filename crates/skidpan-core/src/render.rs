use serde::{Deserialize, Serialize};

/// A point in world coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Position plus heading (radians).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Point,
    pub heading: f32,
}

/// Everything a renderer needs for one presented frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub pose: Pose,
    pub flickering: bool,
    /// Sprite opacity in `[0, 1]`.
    pub opacity: f32,
}

/// Draws frames. Must not feed anything back into the simulation.
pub trait Renderer {
    fn render(&mut self, frame: &Frame);
}
