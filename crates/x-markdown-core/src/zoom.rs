use std::fmt;
use std::time::Duration;
use std::time::Instant;

use crate::input::Point;
use crate::input::PointerButton;
use crate::input::PointerEvent;
use crate::input::PointerEventKind;
use crate::throttle::Throttle;

pub const MIN_SCALE: f64 = 0.1;
pub const MAX_SCALE: f64 = 10.0;
pub const WHEEL_STEP: f64 = 0.05;
pub const BUTTON_STEP: f64 = 0.2;
pub const WHEEL_THROTTLE: Duration = Duration::from_millis(20);

/// Opaque handle to the element that owns the interaction listeners.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContainerId(pub u64);

#[derive(Clone, Debug, PartialEq)]
pub struct ZoomOptions {
    pub min_scale: f64,
    pub max_scale: f64,
    /// Scale change per wheel tick.
    pub wheel_step: f64,
    /// Scale change per `zoom_in` / `zoom_out`.
    pub button_step: f64,
    pub wheel_throttle: Duration,
}

impl Default for ZoomOptions {
    fn default() -> Self {
        Self {
            min_scale: MIN_SCALE,
            max_scale: MAX_SCALE,
            wheel_step: WHEEL_STEP,
            button_step: BUTTON_STEP,
            wheel_throttle: WHEEL_THROTTLE,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoomPanState {
    pub scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    pub dragging: bool,
}

impl Default for ZoomPanState {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
            dragging: false,
        }
    }
}

/// `translate(x, y) scale(s)` around the surface centre.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub translate_x: f64,
    pub translate_y: f64,
    pub scale: f64,
}

impl Transform {
    pub const ORIGIN: &'static str = "center center";

    pub const fn identity() -> Self {
        Self {
            translate_x: 0.0,
            translate_y: 0.0,
            scale: 1.0,
        }
    }

    /// Where a content point, given relative to the untransformed surface centre, lands on
    /// screen when the centre sits at `center`.
    pub fn project(&self, center: Point, content: Point) -> Point {
        Point::new(
            center.x + self.translate_x + self.scale * content.x,
            center.y + self.translate_y + self.scale * content.y,
        )
    }

    /// Inverse of [`Transform::project`].
    pub fn unproject(&self, center: Point, screen: Point) -> Point {
        Point::new(
            (screen.x - center.x - self.translate_x) / self.scale,
            (screen.y - center.y - self.translate_y) / self.scale,
        )
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "translate({}px, {}px) scale({})",
            self.translate_x, self.translate_y, self.scale
        )
    }
}

/// The on-screen element transforms are applied to.
pub trait VisualSurface {
    fn apply_transform(&mut self, transform: &Transform);
}

/// The host environment's fullscreen capability.
pub trait FullscreenHost {
    fn is_supported(&self) -> bool {
        true
    }

    fn is_fullscreen(&self) -> bool;

    fn request_fullscreen(&mut self, container: ContainerId);

    fn exit_fullscreen(&mut self);
}

/// Pan/zoom interaction state for one rendered diagram.
///
/// Feed pointer events through [`ZoomPan::handle_event`] and call [`ZoomPan::tick`] from your
/// event loop so throttled wheel input gets its trailing update. Events are ignored until
/// [`ZoomPan::initialize`] attaches the instance to a container.
pub struct ZoomPan {
    options: ZoomOptions,
    state: ZoomPanState,
    drag_start: Point,
    container: Option<ContainerId>,
    surface: Option<Box<dyn VisualSurface + Send>>,
    layout_center: Point,
    wheel: Throttle<(Point, f64)>,
}

impl Default for ZoomPan {
    fn default() -> Self {
        Self::with_options(ZoomOptions::default())
    }
}

impl fmt::Debug for ZoomPan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZoomPan")
            .field("state", &self.state)
            .field("container", &self.container)
            .field("has_surface", &self.surface.is_some())
            .field("layout_center", &self.layout_center)
            .finish()
    }
}

impl ZoomPan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ZoomOptions) -> Self {
        Self {
            wheel: Throttle::new(options.wheel_throttle),
            options,
            state: ZoomPanState::default(),
            drag_start: Point::default(),
            container: None,
            surface: None,
            layout_center: Point::default(),
        }
    }

    pub fn options(&self) -> &ZoomOptions {
        &self.options
    }

    pub fn state(&self) -> ZoomPanState {
        self.state
    }

    pub fn scale(&self) -> f64 {
        self.state.scale
    }

    pub fn is_dragging(&self) -> bool {
        self.state.dragging
    }

    pub fn is_attached(&self) -> bool {
        self.container.is_some()
    }

    pub fn container(&self) -> Option<ContainerId> {
        self.container
    }

    pub fn transform(&self) -> Transform {
        Transform {
            translate_x: self.state.offset_x,
            translate_y: self.state.offset_y,
            scale: self.state.scale,
        }
    }

    /// The surface's untransformed centre, in container coordinates.
    pub fn set_layout_center(&mut self, center: Point) {
        self.layout_center = center;
    }

    pub fn layout_center(&self) -> Point {
        self.layout_center
    }

    /// Resets state and attaches to `container`. Re-initializing replaces the previous
    /// attachment.
    pub fn initialize(&mut self, container: ContainerId) {
        self.reset_state();
        self.wheel.reset();
        self.container = Some(container);
        tracing::debug!(?container, "pan/zoom attached");
        self.apply();
    }

    /// Detaches and resets. Safe to call at any time, any number of times.
    pub fn destroy(&mut self) {
        if let Some(container) = self.container.take() {
            tracing::debug!(?container, "pan/zoom detached");
        }
        self.wheel.reset();
        self.reset_state();
    }

    /// Swaps in a new visual surface (for example a fresh render result).
    ///
    /// Detaches first, so a transform computed for the old content never reaches the new one.
    /// Call [`ZoomPan::initialize`] again to resume interaction.
    pub fn replace_surface(&mut self, surface: Option<Box<dyn VisualSurface + Send>>) {
        self.destroy();
        self.surface = surface;
    }

    pub fn has_surface(&self) -> bool {
        self.surface.is_some()
    }

    /// Returns `true` when the event was consumed.
    pub fn handle_event(&mut self, event: &PointerEvent) -> bool {
        if self.container.is_none() {
            return false;
        }

        match event.kind {
            PointerEventKind::Down(PointerButton::Primary) if event.over_container => {
                self.start_drag(event.position);
                true
            }
            PointerEventKind::Down(_) => false,
            PointerEventKind::TouchStart { touches: 1 } if event.over_container => {
                self.start_drag(event.position);
                true
            }
            PointerEventKind::TouchStart { .. } => false,
            PointerEventKind::Move | PointerEventKind::TouchMove { touches: 1 } => {
                self.drag_to(event.position)
            }
            PointerEventKind::TouchMove { .. } => false,
            PointerEventKind::Up | PointerEventKind::Leave | PointerEventKind::TouchEnd => {
                let was_dragging = self.state.dragging;
                self.state.dragging = false;
                was_dragging
            }
            PointerEventKind::Wheel { delta_y } if event.over_container => {
                let offered = self.wheel.offer((event.position, delta_y), event.at);
                if let Some((position, delta_y)) = offered {
                    self.zoom_at(position, delta_y);
                }
                true
            }
            PointerEventKind::Wheel { .. } => false,
        }
    }

    /// Applies a throttled trailing wheel event once it is due. Returns `true` if state changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.container.is_none() {
            return false;
        }
        match self.wheel.flush(now) {
            Some((position, delta_y)) => self.zoom_at(position, delta_y),
            None => false,
        }
    }

    /// When [`ZoomPan::tick`] next has work to do, if ever.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.wheel.deadline()
    }

    /// Zooms one wheel step around `pointer`, keeping the content under it in place.
    ///
    /// Returns `false` when the scale is already at the bound in that direction.
    pub fn zoom_at(&mut self, pointer: Point, delta_y: f64) -> bool {
        if delta_y == 0.0 {
            return false;
        }
        let step = if delta_y > 0.0 {
            -self.options.wheel_step
        } else {
            self.options.wheel_step
        };
        let next = self.clamp_scale(self.state.scale + step);
        if next == self.state.scale {
            return false;
        }

        let center = self.layout_center;
        let anchor = self.transform().unproject(center, pointer);
        self.state.scale = next;
        self.state.offset_x = pointer.x - center.x - anchor.x * next;
        self.state.offset_y = pointer.y - center.y - anchor.y * next;
        self.apply();
        true
    }

    pub fn zoom_in(&mut self) {
        self.state.scale = self.clamp_scale(self.state.scale + self.options.button_step);
        self.apply();
    }

    pub fn zoom_out(&mut self) {
        self.state.scale = self.clamp_scale(self.state.scale - self.options.button_step);
        self.apply();
    }

    pub fn reset(&mut self) {
        self.reset_state();
        self.apply();
    }

    /// Toggles fullscreen presentation of the attached container.
    pub fn fullscreen(&self, host: &mut dyn FullscreenHost) {
        let Some(container) = self.container else {
            return;
        };
        if !host.is_supported() {
            return;
        }
        if host.is_fullscreen() {
            host.exit_fullscreen();
        } else {
            host.request_fullscreen(container);
        }
    }

    fn start_drag(&mut self, position: Point) {
        self.state.dragging = true;
        self.drag_start = Point::new(
            position.x - self.state.offset_x,
            position.y - self.state.offset_y,
        );
    }

    fn drag_to(&mut self, position: Point) -> bool {
        if !self.state.dragging {
            return false;
        }
        self.state.offset_x = position.x - self.drag_start.x;
        self.state.offset_y = position.y - self.drag_start.y;
        self.apply();
        true
    }

    fn clamp_scale(&self, scale: f64) -> f64 {
        scale.clamp(self.options.min_scale, self.options.max_scale)
    }

    fn reset_state(&mut self) {
        self.state = ZoomPanState::default();
    }

    fn apply(&mut self) {
        let transform = self.transform();
        if let Some(surface) = self.surface.as_mut() {
            surface.apply_transform(&transform);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<Transform>>>);

    impl Recorder {
        fn last(&self) -> Option<Transform> {
            self.0.lock().expect("lock").last().copied()
        }

        fn count(&self) -> usize {
            self.0.lock().expect("lock").len()
        }
    }

    impl VisualSurface for Recorder {
        fn apply_transform(&mut self, transform: &Transform) {
            self.0.lock().expect("lock").push(*transform);
        }
    }

    #[derive(Default)]
    struct Host {
        supported: bool,
        fullscreen: Option<ContainerId>,
    }

    impl FullscreenHost for Host {
        fn is_supported(&self) -> bool {
            self.supported
        }

        fn is_fullscreen(&self) -> bool {
            self.fullscreen.is_some()
        }

        fn request_fullscreen(&mut self, container: ContainerId) {
            self.fullscreen = Some(container);
        }

        fn exit_fullscreen(&mut self) {
            self.fullscreen = None;
        }
    }

    fn attached() -> (ZoomPan, Recorder) {
        let rec = Recorder::default();
        let mut z = ZoomPan::new();
        z.replace_surface(Some(Box::new(rec.clone())));
        z.initialize(ContainerId(1));
        (z, rec)
    }

    fn ev(kind: PointerEventKind, x: f64, y: f64, at: Instant) -> PointerEvent {
        PointerEvent::new(kind, Point::new(x, y), at)
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn zoom_in_never_exceeds_max() {
        let (mut z, _) = attached();
        for _ in 0..200 {
            z.zoom_in();
            assert!(z.scale() <= MAX_SCALE);
        }
        assert_eq!(z.scale(), MAX_SCALE);
    }

    #[test]
    fn zoom_out_never_goes_below_min() {
        let (mut z, _) = attached();
        for _ in 0..200 {
            z.zoom_out();
            assert!(z.scale() >= MIN_SCALE);
        }
        assert_eq!(z.scale(), MIN_SCALE);
    }

    #[test]
    fn reset_is_idempotent() {
        let (mut z, rec) = attached();
        z.zoom_in();
        z.zoom_at(Point::new(3.0, 4.0), -1.0);
        z.reset();
        let once = z.state();
        z.reset();
        assert_eq!(z.state(), once);
        assert_eq!(once, ZoomPanState::default());
        assert_eq!(rec.last(), Some(Transform::identity()));
    }

    #[test]
    fn drag_moves_by_pointer_delta() {
        let (mut z, rec) = attached();
        let t0 = Instant::now();

        assert!(z.handle_event(&ev(
            PointerEventKind::Down(PointerButton::Primary),
            10.0,
            10.0,
            t0
        )));
        assert!(z.is_dragging());
        assert!(z.handle_event(&ev(PointerEventKind::Move, 25.0, 5.0, t0).outside_container()));
        assert_eq!(z.state().offset_x, 15.0);
        assert_eq!(z.state().offset_y, -5.0);
        assert_eq!(rec.last().map(|t| t.translate_x), Some(15.0));

        assert!(z.handle_event(&ev(PointerEventKind::Up, 25.0, 5.0, t0)));
        assert!(!z.is_dragging());
        assert!(!z.handle_event(&ev(PointerEventKind::Move, 99.0, 99.0, t0)));
        assert_eq!(z.state().offset_x, 15.0);

        // A second drag continues from the current offset.
        z.handle_event(&ev(PointerEventKind::Down(PointerButton::Primary), 0.0, 0.0, t0));
        z.handle_event(&ev(PointerEventKind::Move, 1.0, 1.0, t0));
        assert_eq!(z.state().offset_x, 16.0);
        assert_eq!(z.state().offset_y, -4.0);
    }

    #[test]
    fn only_primary_button_starts_drag() {
        let (mut z, _) = attached();
        let t0 = Instant::now();
        assert!(!z.handle_event(&ev(
            PointerEventKind::Down(PointerButton::Secondary),
            0.0,
            0.0,
            t0
        )));
        assert!(!z.is_dragging());
        assert!(!z.handle_event(
            &ev(PointerEventKind::Down(PointerButton::Primary), 0.0, 0.0, t0).outside_container()
        ));
        assert!(!z.is_dragging());
    }

    #[test]
    fn touch_drags_with_single_finger_only() {
        let (mut z, _) = attached();
        let t0 = Instant::now();
        assert!(!z.handle_event(&ev(PointerEventKind::TouchStart { touches: 2 }, 0.0, 0.0, t0)));
        assert!(z.handle_event(&ev(PointerEventKind::TouchStart { touches: 1 }, 0.0, 0.0, t0)));
        assert!(z.handle_event(&ev(PointerEventKind::TouchMove { touches: 1 }, 4.0, 2.0, t0)));
        assert_eq!((z.state().offset_x, z.state().offset_y), (4.0, 2.0));
        assert!(z.handle_event(&ev(PointerEventKind::TouchEnd, 4.0, 2.0, t0)));
        assert!(!z.is_dragging());
    }

    #[test]
    fn wheel_zoom_keeps_pointer_point_stationary() {
        let (mut z, _) = attached();
        let center = Point::new(120.0, 80.0);
        z.set_layout_center(center);
        z.state.scale = 1.3;
        z.state.offset_x = 7.0;
        z.state.offset_y = -11.0;

        let pointer = Point::new(30.0, 150.0);
        let content = z.transform().unproject(center, pointer);

        assert!(z.zoom_at(pointer, -1.0));
        assert!(close(z.scale(), 1.35));
        let after = z.transform().project(center, content);
        assert!(close(after.x, pointer.x));
        assert!(close(after.y, pointer.y));

        assert!(z.zoom_at(pointer, 1.0));
        let after = z.transform().project(center, content);
        assert!(close(after.x, pointer.x));
        assert!(close(after.y, pointer.y));
    }

    #[test]
    fn wheel_at_bound_is_a_no_op() {
        let (mut z, rec) = attached();
        z.state.scale = MAX_SCALE;
        let before = rec.count();
        assert!(!z.zoom_at(Point::new(1.0, 1.0), -1.0));
        assert_eq!(rec.count(), before);
    }

    #[test]
    fn wheel_is_throttled_with_trailing_update() {
        let (mut z, _) = attached();
        let t0 = Instant::now();
        let ms = Duration::from_millis;

        z.handle_event(&ev(PointerEventKind::Wheel { delta_y: -1.0 }, 0.0, 0.0, t0));
        assert!(close(z.scale(), 1.05));
        z.handle_event(&ev(PointerEventKind::Wheel { delta_y: -1.0 }, 0.0, 0.0, t0 + ms(5)));
        z.handle_event(&ev(PointerEventKind::Wheel { delta_y: -1.0 }, 0.0, 0.0, t0 + ms(10)));
        assert!(close(z.scale(), 1.05));

        assert_eq!(z.next_deadline(), Some(t0 + WHEEL_THROTTLE));
        assert!(!z.tick(t0 + ms(15)));
        assert!(z.tick(t0 + ms(20)));
        assert!(close(z.scale(), 1.1));
        assert!(!z.tick(t0 + ms(100)));
    }

    #[test]
    fn events_are_ignored_until_initialized() {
        let mut z = ZoomPan::new();
        let t0 = Instant::now();
        assert!(!z.handle_event(&ev(
            PointerEventKind::Down(PointerButton::Primary),
            0.0,
            0.0,
            t0
        )));
        assert!(!z.handle_event(&ev(PointerEventKind::Wheel { delta_y: -1.0 }, 0.0, 0.0, t0)));
        assert_eq!(z.state(), ZoomPanState::default());
    }

    #[test]
    fn destroy_is_safe_without_initialize_and_repeatable() {
        let mut z = ZoomPan::new();
        z.destroy();
        z.destroy();
        assert!(!z.is_attached());

        let (mut z, _) = attached();
        z.zoom_in();
        z.destroy();
        z.destroy();
        assert!(!z.is_attached());
        assert_eq!(z.state(), ZoomPanState::default());
    }

    #[test]
    fn replacing_surface_detaches_and_resets() {
        let (mut z, old) = attached();
        z.zoom_in();
        let old_count = old.count();

        let new = Recorder::default();
        z.replace_surface(Some(Box::new(new.clone())));
        assert!(!z.is_attached());
        assert_eq!(z.state(), ZoomPanState::default());
        assert_eq!(new.count(), 0);

        z.initialize(ContainerId(2));
        assert_eq!(new.last(), Some(Transform::identity()));
        assert_eq!(old.count(), old_count);
    }

    #[test]
    fn fullscreen_toggles_when_supported() {
        let (z, _) = attached();
        let mut host = Host {
            supported: true,
            ..Default::default()
        };
        z.fullscreen(&mut host);
        assert_eq!(host.fullscreen, Some(ContainerId(1)));
        z.fullscreen(&mut host);
        assert_eq!(host.fullscreen, None);

        let mut unsupported = Host::default();
        z.fullscreen(&mut unsupported);
        assert_eq!(unsupported.fullscreen, None);
    }

    #[test]
    fn fullscreen_is_a_no_op_before_initialize() {
        let z = ZoomPan::new();
        let mut host = Host {
            supported: true,
            fullscreen: None,
        };
        z.fullscreen(&mut host);
        assert_eq!(host.fullscreen, None);
    }

    #[test]
    fn leaving_the_container_ends_a_drag() {
        let (mut z, _) = attached();
        let t0 = Instant::now();
        z.handle_event(&ev(PointerEventKind::Down(PointerButton::Primary), 0.0, 0.0, t0));
        assert!(z.is_dragging());

        assert!(z.handle_event(&ev(PointerEventKind::Leave, 5.0, 5.0, t0).outside_container()));
        assert!(!z.is_dragging());
        assert!(!z.handle_event(&ev(PointerEventKind::Move, 40.0, 40.0, t0)));
        assert_eq!(z.state().offset_x, 0.0);
        assert_eq!(z.state().offset_y, 0.0);
        // No drag in progress, so nothing to consume.
        assert!(!z.handle_event(&ev(PointerEventKind::Leave, 5.0, 5.0, t0)));
    }

    #[test]
    fn transform_renders_as_css() {
        let t = Transform {
            translate_x: 12.5,
            translate_y: -3.0,
            scale: 1.2,
        };
        assert_eq!(t.to_string(), "translate(12.5px, -3px) scale(1.2)");
        assert_eq!(Transform::ORIGIN, "center center");
    }
}
