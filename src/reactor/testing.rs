//! A scripted in-memory display server that records every request.

use crate::common::collections::{HashMap, HashSet, VecDeque};
use crate::common::config::Config;
use crate::reactor::Reactor;
use crate::sys::event::{Event, KeyBinding, Modifiers, MouseButton, WindowId};
use crate::sys::geometry::{Point, Rect};
pub use crate::sys::geometry::Strut;
use crate::sys::keysym::Keysym;
pub use crate::sys::window_server::WindowInfo;
use crate::sys::window_server::{ProtocolError, Property, StackPosition, WindowServer};

#[derive(Clone, Debug, PartialEq)]
pub enum Request {
    Configure(WindowId, Rect),
    MoveTo(WindowId, Point),
    Restack(WindowId, StackPosition),
    Map(WindowId),
    Unmap(WindowId),
    Focus(Option<WindowId>),
    Close(WindowId),
    Kill(WindowId),
    GrabKeys(usize),
    GrabButtons(Modifiers),
    GrabPointer,
    UngrabPointer,
    Outline(Rect),
    Publish(Property),
    Watch(WindowId),
}

pub struct FakeServer {
    screen: Rect,
    events: VecDeque<Event>,
    windows: HashMap<WindowId, WindowInfo>,
    pub struts: Vec<Strut>,
    pub delete_protocol: HashSet<WindowId>,
    requests: Vec<Request>,
    pub disconnected: bool,
}

impl FakeServer {
    pub fn new() -> Self {
        FakeServer {
            screen: Rect::new(0, 0, 1000, 600),
            events: VecDeque::new(),
            windows: HashMap::default(),
            struts: Vec::new(),
            delete_protocol: HashSet::default(),
            requests: Vec::new(),
            disconnected: false,
        }
    }

    pub fn add_window(&mut self, info: WindowInfo) { self.windows.insert(info.window, info); }

    pub fn queue(&mut self, events: impl IntoIterator<Item = Event>) { self.events.extend(events); }

    pub fn take_requests(&mut self) -> Vec<Request> { std::mem::take(&mut self.requests) }

    fn check(&self) -> Result<(), ProtocolError> {
        if self.disconnected {
            return Err(ProtocolError::Connection("display closed".into()));
        }
        Ok(())
    }

    fn record(&mut self, request: Request) -> Result<(), ProtocolError> {
        self.check()?;
        self.requests.push(request);
        Ok(())
    }

    fn known(&self, window: WindowId) -> Result<(), ProtocolError> {
        self.check()?;
        if self.windows.contains_key(&window) {
            Ok(())
        } else {
            Err(ProtocolError::BadWindow(window))
        }
    }
}

impl WindowServer for FakeServer {
    fn next_event(&mut self) -> Result<Event, ProtocolError> {
        self.check()?;
        self.events
            .pop_front()
            .ok_or_else(|| ProtocolError::Connection("no more scripted events".into()))
    }

    fn poll_event(&mut self) -> Result<Option<Event>, ProtocolError> {
        self.check()?;
        Ok(self.events.pop_front())
    }

    fn screen(&self) -> Rect { self.screen }

    fn window_info(&mut self, window: WindowId) -> Result<WindowInfo, ProtocolError> {
        self.known(window)?;
        self.windows.get(&window).cloned().ok_or(ProtocolError::BadWindow(window))
    }

    fn struts(&mut self) -> Result<Vec<Strut>, ProtocolError> {
        self.check()?;
        Ok(self.struts.clone())
    }

    fn supports_delete(&mut self, window: WindowId) -> Result<bool, ProtocolError> {
        self.known(window)?;
        Ok(self.delete_protocol.contains(&window))
    }

    fn watch(&mut self, window: WindowId) -> Result<(), ProtocolError> {
        self.record(Request::Watch(window))
    }

    fn configure(&mut self, window: WindowId, frame: Rect) -> Result<(), ProtocolError> {
        self.record(Request::Configure(window, frame))
    }

    fn move_to(&mut self, window: WindowId, origin: Point) -> Result<(), ProtocolError> {
        self.record(Request::MoveTo(window, origin))
    }

    fn restack(&mut self, window: WindowId, position: StackPosition) -> Result<(), ProtocolError> {
        self.record(Request::Restack(window, position))
    }

    fn map(&mut self, window: WindowId) -> Result<(), ProtocolError> {
        self.record(Request::Map(window))
    }

    fn unmap(&mut self, window: WindowId) -> Result<(), ProtocolError> {
        self.record(Request::Unmap(window))
    }

    fn set_focus(&mut self, window: Option<WindowId>) -> Result<(), ProtocolError> {
        self.record(Request::Focus(window))
    }

    fn request_close(&mut self, window: WindowId) -> Result<(), ProtocolError> {
        self.record(Request::Close(window))
    }

    fn kill(&mut self, window: WindowId) -> Result<(), ProtocolError> {
        self.record(Request::Kill(window))
    }

    fn grab_keys(&mut self, bindings: &[KeyBinding]) -> Result<(), ProtocolError> {
        self.record(Request::GrabKeys(bindings.len()))
    }

    fn grab_buttons(&mut self, modifier: Modifiers) -> Result<(), ProtocolError> {
        self.record(Request::GrabButtons(modifier))
    }

    fn grab_pointer(&mut self) -> Result<(), ProtocolError> { self.record(Request::GrabPointer) }

    fn ungrab_pointer(&mut self) -> Result<(), ProtocolError> { self.record(Request::UngrabPointer) }

    fn draw_outline(&mut self, frame: Rect) -> Result<(), ProtocolError> {
        self.record(Request::Outline(frame))
    }

    fn publish(&mut self, property: Property) -> Result<(), ProtocolError> {
        self.record(Request::Publish(property))
    }

    fn flush(&mut self) -> Result<(), ProtocolError> { self.check() }
}

/// The bundled configuration with animation and throttling delays removed.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.settings.scroll.step_delay_ms = 0;
    config.settings.interaction.resize_interval_ms = 0;
    config
}

pub fn reactor() -> Reactor<FakeServer> { Reactor::new(test_config(), FakeServer::new()) }

pub fn key(name: &str) -> Keysym { name.parse().unwrap() }

pub fn motion(window: WindowId, x: i32, y: i32) -> Event {
    Event::Motion {
        window,
        root: Point::new(x, y),
        state: Modifiers::MOD4,
    }
}

pub fn press(window: WindowId, button: MouseButton, x: i32, y: i32) -> Event {
    Event::ButtonPress {
        window,
        button,
        root: Point::new(x, y),
        state: Modifiers::MOD4,
    }
}

pub fn release(window: WindowId, x: i32, y: i32) -> Event {
    Event::ButtonRelease {
        window,
        button: MouseButton::Primary,
        root: Point::new(x, y),
        state: Modifiers::MOD4,
    }
}
