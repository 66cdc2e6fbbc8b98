use std::time::Instant;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerEventKind {
    Down(PointerButton),
    Move,
    Up,
    Leave,
    /// Positive `delta_y` scrolls down (zooms out).
    Wheel { delta_y: f64 },
    TouchStart { touches: usize },
    TouchMove { touches: usize },
    TouchEnd,
}

/// A pointer, touch, or wheel event in container coordinates.
///
/// `over_container` tells whether the event targets the interactive container itself. Moves and
/// releases are tracked document-wide, presses and wheel ticks only count over the container.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerEvent {
    pub kind: PointerEventKind,
    pub position: Point,
    pub over_container: bool,
    pub at: Instant,
}

impl PointerEvent {
    pub fn new(kind: PointerEventKind, position: Point, at: Instant) -> Self {
        Self {
            kind,
            position,
            over_container: true,
            at,
        }
    }

    pub fn outside_container(mut self) -> Self {
        self.over_container = false;
        self
    }
}
