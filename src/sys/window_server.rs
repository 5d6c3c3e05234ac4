//! The contract between the placement engine and the display server.
//!
//! Everything the reactor needs to know about a window, and every request it
//! issues, goes through [`WindowServer`]. Requests are fire-and-forget: the
//! target may have vanished between event delivery and the request, so most
//! errors are expected and only worth a log line.

use thiserror::Error;
use tracing::{debug, warn};

use super::event::{Event, KeyBinding, Modifiers};
use super::geometry::{Point, Rect, Size, Strut};
pub use super::event::WindowId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("window {0:?} does not exist")]
    BadWindow(WindowId),
    #[error("request does not match the window's state")]
    BadMatch,
    #[error("drawable does not exist")]
    BadDrawable,
    #[error("access denied by the display server")]
    BadAccess,
    #[error("display server rejected request (error code {0})")]
    Rejected(u8),
    #[error("connection to the display server failed: {0}")]
    Connection(String),
}

impl ProtocolError {
    /// Whether the error is the expected consequence of racing a client that
    /// is going away. Only a broken connection is fatal.
    pub fn is_benign(&self) -> bool { !matches!(self, ProtocolError::Connection(_)) }

    fn is_race(&self) -> bool {
        matches!(
            self,
            ProtocolError::BadWindow(_)
                | ProtocolError::BadMatch
                | ProtocolError::BadDrawable
                | ProtocolError::BadAccess
        )
    }
}

pub trait ProtocolResultExt<T> {
    /// Logs and swallows benign errors, keeping fatal ones.
    fn ignore_benign(self, request: &str) -> Result<Option<T>, ProtocolError>;
}

impl<T> ProtocolResultExt<T> for Result<T, ProtocolError> {
    fn ignore_benign(self, request: &str) -> Result<Option<T>, ProtocolError> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_race() => {
                debug!(request, error = %e, "ignoring protocol error");
                Ok(None)
            }
            Err(e) if e.is_benign() => {
                warn!(request, error = %e, "ignoring protocol error");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WindowType {
    #[default]
    Normal,
    Dialog,
    Utility,
    Tooltip,
    Notification,
    Dock,
}

impl WindowType {
    pub fn prefers_floating(self) -> bool {
        matches!(
            self,
            WindowType::Dialog
                | WindowType::Utility
                | WindowType::Tooltip
                | WindowType::Notification
        )
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SizeHints {
    pub preferred: Option<Size>,
    pub base: Option<Size>,
    pub min: Option<Size>,
}

/// Everything the registry needs to classify and place a new window.
#[derive(Clone, Debug, PartialEq)]
pub struct WindowInfo {
    pub window: WindowId,
    pub frame: Rect,
    pub override_redirect: bool,
    pub size_hints: SizeHints,
    pub window_type: WindowType,
    pub class: Option<String>,
}

impl WindowInfo {
    pub fn new(window: WindowId, frame: Rect) -> Self {
        WindowInfo {
            window,
            frame,
            override_redirect: false,
            size_hints: SizeHints::default(),
            window_type: WindowType::Normal,
            class: None,
        }
    }
}

/// Where a restacked window ends up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StackPosition {
    Top,
    Below(WindowId),
}

/// Root and window properties advertised to pagers and taskbars.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Property {
    Supported,
    Identity(&'static str),
    NumberOfDesktops(u32),
    CurrentDesktop(u32),
    ActiveWindow(Option<WindowId>),
    ClientList(Vec<WindowId>),
    WindowDesktop(WindowId, u32),
}

pub trait WindowServer {
    /// Blocks until the next event arrives.
    fn next_event(&mut self) -> Result<Event, ProtocolError>;

    /// Returns an already queued event without blocking.
    fn poll_event(&mut self) -> Result<Option<Event>, ProtocolError>;

    fn screen(&self) -> Rect;

    fn window_info(&mut self, window: WindowId) -> Result<WindowInfo, ProtocolError>;

    /// Edge reservations of every window that currently advertises one.
    fn struts(&mut self) -> Result<Vec<Strut>, ProtocolError>;

    fn supports_delete(&mut self, window: WindowId) -> Result<bool, ProtocolError>;

    /// Subscribes to the structure and crossing events of a managed window.
    fn watch(&mut self, window: WindowId) -> Result<(), ProtocolError>;

    fn configure(&mut self, window: WindowId, frame: Rect) -> Result<(), ProtocolError>;

    fn move_to(&mut self, window: WindowId, origin: Point) -> Result<(), ProtocolError>;

    fn restack(&mut self, window: WindowId, position: StackPosition) -> Result<(), ProtocolError>;

    fn map(&mut self, window: WindowId) -> Result<(), ProtocolError>;

    fn unmap(&mut self, window: WindowId) -> Result<(), ProtocolError>;

    /// `None` returns focus to the root window.
    fn set_focus(&mut self, window: Option<WindowId>) -> Result<(), ProtocolError>;

    /// Asks the client to close itself through the cooperative protocol.
    fn request_close(&mut self, window: WindowId) -> Result<(), ProtocolError>;

    fn kill(&mut self, window: WindowId) -> Result<(), ProtocolError>;

    fn grab_keys(&mut self, bindings: &[KeyBinding]) -> Result<(), ProtocolError>;

    fn grab_buttons(&mut self, modifier: Modifiers) -> Result<(), ProtocolError>;

    fn grab_pointer(&mut self) -> Result<(), ProtocolError>;

    fn ungrab_pointer(&mut self) -> Result<(), ProtocolError>;

    /// Draws an inverted outline; drawing the same rectangle again erases it.
    fn draw_outline(&mut self, frame: Rect) -> Result<(), ProtocolError>;

    fn publish(&mut self, property: Property) -> Result<(), ProtocolError>;

    fn flush(&mut self) -> Result<(), ProtocolError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn race_errors_are_swallowed_but_connection_loss_is_not() {
        let gone: Result<(), _> = Err(ProtocolError::BadWindow(WindowId(7)));
        assert_eq!(gone.ignore_benign("configure"), Ok(None));

        let rejected: Result<(), _> = Err(ProtocolError::Rejected(42));
        assert_eq!(rejected.ignore_benign("configure"), Ok(None));

        let lost: Result<(), _> = Err(ProtocolError::Connection("broken pipe".into()));
        assert!(lost.ignore_benign("configure").is_err());

        assert_eq!(Ok::<_, ProtocolError>(3).ignore_benign("query"), Ok(Some(3)));
    }
}
