use std::time::Instant;

use crate::input::Point;
use crate::input::PointerButton;
use crate::input::PointerEvent;
use crate::input::PointerEventKind;
use crate::zoom::ContainerId;

/// Rows and columns occupied by a diagram container, in terminal cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellArea {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl CellArea {
    fn contains(&self, column: u16, row: u16) -> bool {
        column >= self.x
            && row >= self.y
            && column < self.x.saturating_add(self.width)
            && row < self.y.saturating_add(self.height)
    }
}

/// Converts a terminal mouse event into a container-relative pointer event.
///
/// Terminal scroll ticks map to one wheel step each. Non-mouse events yield `None`.
pub fn pointer_event_from_crossterm(
    ev: crossterm::event::Event,
    area: CellArea,
    at: Instant,
) -> Option<PointerEvent> {
    let crossterm::event::Event::Mouse(m) = ev else {
        return None;
    };
    pointer_event_from_crossterm_mouse(m, area, at)
}

pub fn pointer_event_from_crossterm_mouse(
    m: crossterm::event::MouseEvent,
    area: CellArea,
    at: Instant,
) -> Option<PointerEvent> {
    let kind = match m.kind {
        crossterm::event::MouseEventKind::Down(b) => {
            PointerEventKind::Down(pointer_button_from_crossterm(b))
        }
        crossterm::event::MouseEventKind::Drag(_) | crossterm::event::MouseEventKind::Moved => {
            PointerEventKind::Move
        }
        crossterm::event::MouseEventKind::Up(_) => PointerEventKind::Up,
        crossterm::event::MouseEventKind::ScrollUp => PointerEventKind::Wheel { delta_y: -1.0 },
        crossterm::event::MouseEventKind::ScrollDown => PointerEventKind::Wheel { delta_y: 1.0 },
        _ => return None,
    };

    let position = Point::new(
        f64::from(m.column) - f64::from(area.x),
        f64::from(m.row) - f64::from(area.y),
    );
    let mut event = PointerEvent::new(kind, position, at);
    if !area.contains(m.column, m.row) {
        event = event.outside_container();
    }
    Some(event)
}

/// Stable container id for a cell area, for hosts that key diagrams by layout position.
pub fn container_id_for_area(area: CellArea) -> ContainerId {
    ContainerId(
        (u64::from(area.x) << 48)
            | (u64::from(area.y) << 32)
            | (u64::from(area.width) << 16)
            | u64::from(area.height),
    )
}

fn pointer_button_from_crossterm(b: crossterm::event::MouseButton) -> PointerButton {
    match b {
        crossterm::event::MouseButton::Left => PointerButton::Primary,
        crossterm::event::MouseButton::Right => PointerButton::Secondary,
        crossterm::event::MouseButton::Middle => PointerButton::Middle,
    }
}
