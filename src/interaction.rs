//! Pointer-driven move and resize of floating clients.
//!
//! The controller is a small state machine (idle, moving or resizing) that
//! turns pointer samples into geometry feedback. It never talks to the
//! display server itself; the reactor applies whatever [`Feedback`] and
//! [`Outcome`] it returns.

use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::common::config::InteractionSettings;
use crate::model::ClientKind;
use crate::sys::event::{MouseButton, WindowId};
use crate::sys::geometry::{Point, Rect};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DragMode {
    Move,
    Resize,
}

impl DragMode {
    pub fn for_button(button: MouseButton) -> Option<DragMode> {
        match button {
            MouseButton::Primary => Some(DragMode::Move),
            MouseButton::Secondary => Some(DragMode::Resize),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    pub window: WindowId,
    pub mode: DragMode,
    origin: Point,
    start: Rect,
    current: Rect,
    outline: Option<Rect>,
    last_redraw: Option<Instant>,
}

impl Session {
    fn target(&self, pointer: Point) -> Rect {
        let (dx, dy) = (pointer.x - self.origin.x, pointer.y - self.origin.y);
        match self.mode {
            DragMode::Move => self.start.translate(dx, dy),
            DragMode::Resize => Rect::new(
                self.start.x,
                self.start.y,
                self.start.width + dx,
                self.start.height + dy,
            )
            .clamp_size(),
        }
    }
}

/// What the reactor should show for one motion sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Feedback {
    /// Nothing to redraw yet.
    None,
    Move(Rect),
    Resize(Rect),
    /// Erase the previous preview outline (if any) and draw a new one.
    Outline { erase: Option<Rect>, draw: Rect },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Committed {
        window: WindowId,
        mode: DragMode,
        frame: Rect,
        erase: Option<Rect>,
    },
    /// The window went away mid-session; nothing is applied.
    Aborted { window: WindowId, erase: Option<Rect> },
}

#[derive(Debug)]
pub struct InteractionController {
    session: Option<Session>,
    resize_interval: Duration,
    rubber_band: bool,
}

impl InteractionController {
    pub fn new(settings: &InteractionSettings) -> Self {
        InteractionController {
            session: None,
            resize_interval: settings.resize_interval(),
            rubber_band: settings.rubber_band,
        }
    }

    pub fn is_active(&self) -> bool { self.session.is_some() }

    pub fn target(&self) -> Option<WindowId> { self.session.as_ref().map(|s| s.window) }

    /// Starts a session on `window`. Only floating clients can be dragged,
    /// and only one session runs at a time.
    pub fn begin(
        &mut self,
        window: WindowId,
        kind: ClientKind,
        frame: Rect,
        button: MouseButton,
        pointer: Point,
    ) -> bool {
        if self.session.is_some() || kind != ClientKind::Floating {
            return false;
        }
        let Some(mode) = DragMode::for_button(button) else {
            return false;
        };
        debug!(?window, ?mode, ?frame, "Starting interactive session");
        self.session = Some(Session {
            window,
            mode,
            origin: pointer,
            start: frame,
            current: frame,
            outline: None,
            last_redraw: None,
        });
        true
    }

    /// Feeds the latest pointer position. Resize redraws closer together than
    /// the configured interval are skipped; the geometry is still tracked.
    pub fn motion(&mut self, pointer: Point, now: Instant) -> Feedback {
        let (rubber_band, interval) = (self.rubber_band, self.resize_interval);
        let Some(session) = self.session.as_mut() else {
            return Feedback::None;
        };
        let target = session.target(pointer);
        if target == session.current && session.last_redraw.is_some() {
            return Feedback::None;
        }
        session.current = target;

        match session.mode {
            DragMode::Move => Feedback::Move(target),
            DragMode::Resize => {
                if let Some(last) = session.last_redraw {
                    if now.saturating_duration_since(last) < interval {
                        trace!(?target, "Throttling resize redraw");
                        return Feedback::None;
                    }
                }
                session.last_redraw = Some(now);
                if rubber_band {
                    Feedback::Outline { erase: session.outline.replace(target), draw: target }
                } else {
                    Feedback::Resize(target)
                }
            }
        }
    }

    /// Ends the session, committing the last tracked geometry.
    pub fn release(&mut self) -> Option<Outcome> {
        let session = self.session.take()?;
        debug!(window = ?session.window, frame = ?session.current, "Committing interactive session");
        Some(Outcome::Committed {
            window: session.window,
            mode: session.mode,
            frame: session.current,
            erase: session.outline,
        })
    }

    /// Drops the session without committing if it targets `window`.
    pub fn abort_for(&mut self, window: WindowId) -> Option<Outcome> {
        if self.target() != Some(window) {
            return None;
        }
        let session = self.session.take()?;
        debug!(?window, "Aborting interactive session");
        Some(Outcome::Aborted { window, erase: session.outline })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const W: WindowId = WindowId(7);
    const FRAME: Rect = Rect::new(100, 100, 400, 300);

    fn controller(rubber_band: bool) -> InteractionController {
        InteractionController::new(&InteractionSettings {
            rubber_band,
            ..Default::default()
        })
    }

    #[test]
    fn only_floating_clients_start_sessions() {
        let mut c = controller(false);
        let p = Point::new(0, 0);
        assert!(!c.begin(W, ClientKind::Normal, FRAME, MouseButton::Primary, p));
        assert!(!c.begin(W, ClientKind::Floating, FRAME, MouseButton::Middle, p));
        assert!(c.begin(W, ClientKind::Floating, FRAME, MouseButton::Primary, p));
        assert!(!c.begin(WindowId(8), ClientKind::Floating, FRAME, MouseButton::Primary, p));
    }

    #[test]
    fn move_applies_cumulative_delta() {
        let mut c = controller(false);
        let now = Instant::now();
        c.begin(W, ClientKind::Floating, FRAME, MouseButton::Primary, Point::new(10, 10));
        assert_eq!(c.motion(Point::new(15, 20), now), Feedback::Move(Rect::new(105, 110, 400, 300)));
        assert_eq!(c.motion(Point::new(0, 0), now), Feedback::Move(Rect::new(90, 90, 400, 300)));
        assert_eq!(
            c.release(),
            Some(Outcome::Committed {
                window: W,
                mode: DragMode::Move,
                frame: Rect::new(90, 90, 400, 300),
                erase: None,
            })
        );
        assert!(!c.is_active());
    }

    #[test]
    fn resize_is_throttled_and_never_collapses() {
        let mut c = controller(false);
        let t0 = Instant::now();
        c.begin(W, ClientKind::Floating, FRAME, MouseButton::Secondary, Point::new(0, 0));
        assert_eq!(
            c.motion(Point::new(50, 50), t0),
            Feedback::Resize(Rect::new(100, 100, 450, 350))
        );
        assert_eq!(c.motion(Point::new(60, 60), t0 + Duration::from_millis(5)), Feedback::None);
        assert_eq!(
            c.motion(Point::new(-1000, -1000), t0 + Duration::from_millis(20)),
            Feedback::Resize(Rect::new(100, 100, 1, 1))
        );
    }

    #[test]
    fn throttled_geometry_is_still_committed() {
        let mut c = controller(false);
        let t0 = Instant::now();
        c.begin(W, ClientKind::Floating, FRAME, MouseButton::Secondary, Point::new(0, 0));
        c.motion(Point::new(10, 10), t0);
        c.motion(Point::new(30, 40), t0 + Duration::from_millis(1));
        let Some(Outcome::Committed { frame, .. }) = c.release() else {
            panic!("expected a committed session");
        };
        assert_eq!(frame, Rect::new(100, 100, 430, 340));
    }

    #[test]
    fn rubber_band_erases_previous_outline() {
        let mut c = controller(true);
        let t0 = Instant::now();
        c.begin(W, ClientKind::Floating, FRAME, MouseButton::Secondary, Point::new(0, 0));
        let first = Rect::new(100, 100, 410, 310);
        assert_eq!(c.motion(Point::new(10, 10), t0), Feedback::Outline { erase: None, draw: first });
        let second = Rect::new(100, 100, 420, 320);
        assert_eq!(
            c.motion(Point::new(20, 20), t0 + Duration::from_millis(20)),
            Feedback::Outline { erase: Some(first), draw: second }
        );
        assert_eq!(
            c.release(),
            Some(Outcome::Committed {
                window: W,
                mode: DragMode::Resize,
                frame: second,
                erase: Some(second),
            })
        );
    }

    #[test]
    fn abort_discards_session_for_target_only() {
        let mut c = controller(true);
        c.begin(W, ClientKind::Floating, FRAME, MouseButton::Secondary, Point::new(0, 0));
        c.motion(Point::new(10, 10), Instant::now());
        assert_eq!(c.abort_for(WindowId(99)), None);
        assert!(c.is_active());
        assert_eq!(
            c.abort_for(W),
            Some(Outcome::Aborted { window: W, erase: Some(Rect::new(100, 100, 410, 310)) })
        );
        assert!(!c.is_active());
        assert_eq!(c.release(), None);
    }
}
