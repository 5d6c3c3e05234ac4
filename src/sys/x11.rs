//! [`WindowServer`] on top of the X11 core protocol and EWMH hints.

use anyhow::{Context, bail};
use tracing::{debug, info, trace, warn};
use x11rb::connection::Connection;
use x11rb::errors::{ConnectionError, ReplyError, ReplyOrIdError};
use x11rb::protocol::ErrorKind;
use x11rb::protocol::Event as XEvent;
use x11rb::protocol::xproto::{
    AtomEnum, ButtonIndex, ChangeWindowAttributesAux, ClientMessageEvent, ConfigureWindowAux,
    ConnectionExt as _, CreateGCAux, CreateWindowAux, EventMask, GX, Gcontext, GrabMode,
    InputFocus, ModMask, PropMode, Rectangle, StackMode, SubwindowMode, Window, WindowClass,
};
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;
use x11rb::x11_utils::X11Error;

use super::event::{ClientRequest, Event, KeyBinding, Modifiers, MouseButton, WindowId};
use super::geometry::{Point, Rect, Size, Strut};
use super::keysym::Keysym;
use super::window_server::{
    ProtocolError, Property, SizeHints, StackPosition, WindowInfo, WindowServer, WindowType,
};

// ICCCM WM_SIZE_HINTS flags and field offsets.
const P_SIZE: u32 = 1 << 3;
const P_MIN_SIZE: u32 = 1 << 4;
const P_BASE_SIZE: u32 = 1 << 8;
const SIZE_HINTS_LEN: u32 = 18;

x11rb::atom_manager! {
    pub Atoms: AtomsCookie {
        WM_PROTOCOLS,
        WM_DELETE_WINDOW,
        WM_TRANSIENT_FOR,
        UTF8_STRING,
        _NET_SUPPORTED,
        _NET_SUPPORTING_WM_CHECK,
        _NET_WM_NAME,
        _NET_CLIENT_LIST,
        _NET_ACTIVE_WINDOW,
        _NET_CURRENT_DESKTOP,
        _NET_NUMBER_OF_DESKTOPS,
        _NET_WM_DESKTOP,
        _NET_CLOSE_WINDOW,
        _NET_WM_STATE,
        _NET_WM_STATE_FULLSCREEN,
        _NET_WM_STRUT,
        _NET_WM_STRUT_PARTIAL,
        _NET_WM_WINDOW_TYPE,
        _NET_WM_WINDOW_TYPE_DIALOG,
        _NET_WM_WINDOW_TYPE_UTILITY,
        _NET_WM_WINDOW_TYPE_TOOLTIP,
        _NET_WM_WINDOW_TYPE_NOTIFICATION,
        _NET_WM_WINDOW_TYPE_DOCK,
    }
}

impl Atoms {
    fn supported(&self) -> [u32; 16] {
        [
            self._NET_SUPPORTED,
            self._NET_SUPPORTING_WM_CHECK,
            self._NET_WM_NAME,
            self._NET_CLIENT_LIST,
            self._NET_ACTIVE_WINDOW,
            self._NET_CURRENT_DESKTOP,
            self._NET_NUMBER_OF_DESKTOPS,
            self._NET_WM_DESKTOP,
            self._NET_CLOSE_WINDOW,
            self._NET_WM_STATE,
            self._NET_WM_STATE_FULLSCREEN,
            self._NET_WM_STRUT,
            self._NET_WM_STRUT_PARTIAL,
            self._NET_WM_WINDOW_TYPE,
            self._NET_WM_WINDOW_TYPE_DIALOG,
            self._NET_WM_WINDOW_TYPE_UTILITY,
        ]
    }
}

impl From<ConnectionError> for ProtocolError {
    fn from(e: ConnectionError) -> Self { ProtocolError::Connection(e.to_string()) }
}

impl From<ReplyError> for ProtocolError {
    fn from(e: ReplyError) -> Self {
        match e {
            ReplyError::ConnectionError(e) => e.into(),
            ReplyError::X11Error(e) => protocol_error(&e),
        }
    }
}

impl From<ReplyOrIdError> for ProtocolError {
    fn from(e: ReplyOrIdError) -> Self {
        match e {
            ReplyOrIdError::X11Error(e) => protocol_error(&e),
            other => ProtocolError::Connection(other.to_string()),
        }
    }
}

fn protocol_error(e: &X11Error) -> ProtocolError {
    match e.error_kind {
        ErrorKind::Window => ProtocolError::BadWindow(WindowId(e.bad_value)),
        ErrorKind::Match => ProtocolError::BadMatch,
        ErrorKind::Drawable => ProtocolError::BadDrawable,
        ErrorKind::Access => ProtocolError::BadAccess,
        _ => ProtocolError::Rejected(e.error_code),
    }
}

/// Keycode to keysym table taken from the server's keyboard mapping.
struct Keymap {
    min_keycode: u8,
    per_keycode: usize,
    keysyms: Vec<u32>,
}

impl Keymap {
    fn load(conn: &RustConnection) -> anyhow::Result<Keymap> {
        let setup = conn.setup();
        let (min, max) = (setup.min_keycode, setup.max_keycode);
        let reply = conn.get_keyboard_mapping(min, max - min + 1)?.reply()?;
        Ok(Keymap {
            min_keycode: min,
            per_keycode: usize::from(reply.keysyms_per_keycode).max(1),
            keysyms: reply.keysyms,
        })
    }

    fn keysym(&self, keycode: u8) -> Option<Keysym> {
        let index = usize::from(keycode.checked_sub(self.min_keycode)?) * self.per_keycode;
        self.keysyms.get(index).copied().filter(|&s| s != 0).map(|s| Keysym(s).normalized())
    }

    fn keycodes(&self, keysym: Keysym) -> Vec<u8> {
        self.keysyms
            .chunks(self.per_keycode)
            .enumerate()
            .filter(|(_, syms)| syms.first().map(|&s| Keysym(s).normalized()) == Some(keysym))
            .filter_map(|(i, _)| u8::try_from(i).ok()?.checked_add(self.min_keycode))
            .collect()
    }
}

pub struct X11Server {
    conn: RustConnection,
    root: Window,
    screen: Rect,
    atoms: Atoms,
    keymap: Keymap,
    outline_gc: Gcontext,
    check_window: Window,
}

impl X11Server {
    /// Connects to `display` and takes over window management on its default
    /// screen. Fails if another window manager already redirects the root
    /// window.
    pub fn connect(display: Option<&str>) -> anyhow::Result<X11Server> {
        let (conn, screen_num) =
            x11rb::connect(display).context("cannot open display")?;
        let screen = conn.setup().roots[screen_num].clone();
        let root = screen.root;
        info!(screen = screen_num, root, "Connected to X server");

        let mask = EventMask::SUBSTRUCTURE_REDIRECT
            | EventMask::SUBSTRUCTURE_NOTIFY
            | EventMask::POINTER_MOTION
            | EventMask::ENTER_WINDOW;
        if conn
            .change_window_attributes(root, &ChangeWindowAttributesAux::new().event_mask(mask))?
            .check()
            .is_err()
        {
            bail!("another window manager is already running");
        }

        let atoms = Atoms::new(&conn)?.reply().context("failed to intern atoms")?;
        let keymap = Keymap::load(&conn).context("failed to read keyboard mapping")?;

        let outline_gc = conn.generate_id()?;
        conn.create_gc(
            outline_gc,
            root,
            &CreateGCAux::new()
                .function(GX::XOR)
                .foreground(screen.white_pixel ^ screen.black_pixel)
                .line_width(2)
                .subwindow_mode(SubwindowMode::INCLUDE_INFERIORS),
        )?;

        let check_window = conn.generate_id()?;
        conn.create_window(
            screen.root_depth,
            check_window,
            root,
            -1,
            -1,
            1,
            1,
            0,
            WindowClass::INPUT_OUTPUT,
            0,
            &CreateWindowAux::new(),
        )?;
        conn.flush()?;

        Ok(X11Server {
            screen: Rect::new(
                0,
                0,
                i32::from(screen.width_in_pixels),
                i32::from(screen.height_in_pixels),
            ),
            conn,
            root,
            atoms,
            keymap,
            outline_gc,
            check_window,
        })
    }

    fn translate(&self, event: XEvent) -> Option<Event> {
        let event = match event {
            XEvent::MapRequest(e) => Event::MapRequest(WindowId(e.window)),
            XEvent::UnmapNotify(e) if e.event != self.root => Event::Unmap(WindowId(e.window)),
            XEvent::DestroyNotify(e) if e.event != self.root => {
                Event::Destroy(WindowId(e.window))
            }
            XEvent::EnterNotify(e) => Event::PointerEnter(WindowId(e.event)),
            XEvent::ButtonPress(e) => Event::ButtonPress {
                window: WindowId(if e.child != x11rb::NONE { e.child } else { e.event }),
                button: MouseButton::from(e.detail),
                root: Point::new(i32::from(e.root_x), i32::from(e.root_y)),
                state: Modifiers::from_bits_truncate(u16::from(e.state)),
            },
            XEvent::ButtonRelease(e) => Event::ButtonRelease {
                window: WindowId(if e.child != x11rb::NONE { e.child } else { e.event }),
                button: MouseButton::from(e.detail),
                root: Point::new(i32::from(e.root_x), i32::from(e.root_y)),
                state: Modifiers::from_bits_truncate(u16::from(e.state)),
            },
            XEvent::MotionNotify(e) => Event::Motion {
                window: WindowId(e.event),
                root: Point::new(i32::from(e.root_x), i32::from(e.root_y)),
                state: Modifiers::from_bits_truncate(u16::from(e.state)),
            },
            XEvent::KeyPress(e) => Event::KeyPress {
                keysym: self.keymap.keysym(e.detail)?,
                state: Modifiers::from_bits_truncate(u16::from(e.state)),
            },
            XEvent::ClientMessage(e) => {
                let data = e.data.as_data32();
                let request = if e.type_ == self.atoms._NET_CURRENT_DESKTOP {
                    ClientRequest::CurrentDesktop(i64::from(data[0] as i32))
                } else if e.type_ == self.atoms._NET_CLOSE_WINDOW {
                    ClientRequest::CloseWindow
                } else if e.type_ == self.atoms._NET_ACTIVE_WINDOW {
                    ClientRequest::ActivateWindow
                } else {
                    ClientRequest::Other
                };
                Event::ClientMessage { window: WindowId(e.window), request }
            }
            XEvent::Error(e) => {
                let error = protocol_error(&e);
                match error {
                    ProtocolError::Rejected(_) => warn!(
                        request = e.major_opcode,
                        error = %error,
                        "X request failed"
                    ),
                    _ => debug!(request = e.major_opcode, error = %error, "X request failed"),
                }
                return None;
            }
            other => {
                trace!(?other, "Ignoring X event");
                return None;
            }
        };
        Some(event)
    }

    fn cardinals(&self, window: Window, property: u32, len: u32) -> Result<Vec<u32>, ProtocolError> {
        let reply = self
            .conn
            .get_property(false, window, property, AtomEnum::ANY, 0, len)?
            .reply()?;
        Ok(reply.value32().map(|v| v.collect()).unwrap_or_default())
    }

    fn size_hints(&self, window: Window) -> Result<SizeHints, ProtocolError> {
        let values =
            self.cardinals(window, AtomEnum::WM_NORMAL_HINTS.into(), SIZE_HINTS_LEN)?;
        let Some(&flags) = values.first() else {
            return Ok(SizeHints::default());
        };
        let size_at = |i: usize| -> Option<Size> {
            let w = *values.get(i)? as i32;
            let h = *values.get(i + 1)? as i32;
            Some(Size::new(w, h))
        };
        Ok(SizeHints {
            preferred: (flags & P_SIZE != 0).then(|| size_at(3)).flatten(),
            min: (flags & P_MIN_SIZE != 0).then(|| size_at(5)).flatten(),
            base: (flags & P_BASE_SIZE != 0).then(|| size_at(15)).flatten(),
        })
    }

    fn window_type(&self, window: Window) -> Result<WindowType, ProtocolError> {
        let atoms = &self.atoms;
        for ty in self.cardinals(window, atoms._NET_WM_WINDOW_TYPE, 32)? {
            let kind = match ty {
                t if t == atoms._NET_WM_WINDOW_TYPE_DIALOG => WindowType::Dialog,
                t if t == atoms._NET_WM_WINDOW_TYPE_UTILITY => WindowType::Utility,
                t if t == atoms._NET_WM_WINDOW_TYPE_TOOLTIP => WindowType::Tooltip,
                t if t == atoms._NET_WM_WINDOW_TYPE_NOTIFICATION => WindowType::Notification,
                t if t == atoms._NET_WM_WINDOW_TYPE_DOCK => WindowType::Dock,
                _ => continue,
            };
            return Ok(kind);
        }
        let transient = self.cardinals(window, atoms.WM_TRANSIENT_FOR, 1)?;
        if transient.first().is_some_and(|&w| w != x11rb::NONE) {
            return Ok(WindowType::Dialog);
        }
        Ok(WindowType::Normal)
    }

    fn class_name(&self, window: Window) -> Result<Option<String>, ProtocolError> {
        let reply = self
            .conn
            .get_property(false, window, AtomEnum::WM_CLASS, AtomEnum::STRING, 0, 256)?
            .reply()?;
        // WM_CLASS holds "instance\0class\0".
        let class = reply
            .value
            .split(|&b| b == 0)
            .nth(1)
            .filter(|c| !c.is_empty())
            .map(|c| String::from_utf8_lossy(c).into_owned());
        Ok(class)
    }

    fn strut(&self, window: Window) -> Result<Option<Strut>, ProtocolError> {
        let mut values = self.cardinals(window, self.atoms._NET_WM_STRUT_PARTIAL, 12)?;
        if values.len() < 4 {
            values = self.cardinals(window, self.atoms._NET_WM_STRUT, 4)?;
        }
        Ok(match values.as_slice() {
            [left, right, top, bottom, ..] => Some(Strut {
                left: *left,
                right: *right,
                top: *top,
                bottom: *bottom,
            }),
            _ => None,
        })
    }
}

impl WindowServer for X11Server {
    fn next_event(&mut self) -> Result<Event, ProtocolError> {
        loop {
            let event = self.conn.wait_for_event()?;
            if let Some(event) = self.translate(event) {
                return Ok(event);
            }
        }
    }

    fn poll_event(&mut self) -> Result<Option<Event>, ProtocolError> {
        while let Some(event) = self.conn.poll_for_event()? {
            if let Some(event) = self.translate(event) {
                return Ok(Some(event));
            }
        }
        Ok(None)
    }

    fn screen(&self) -> Rect { self.screen }

    fn window_info(&mut self, window: WindowId) -> Result<WindowInfo, ProtocolError> {
        let attributes = self.conn.get_window_attributes(window.0)?.reply()?;
        let geometry = self.conn.get_geometry(window.0)?.reply()?;
        Ok(WindowInfo {
            window,
            frame: Rect::new(
                i32::from(geometry.x),
                i32::from(geometry.y),
                i32::from(geometry.width),
                i32::from(geometry.height),
            ),
            override_redirect: attributes.override_redirect,
            size_hints: self.size_hints(window.0)?,
            window_type: self.window_type(window.0)?,
            class: self.class_name(window.0)?,
        })
    }

    fn struts(&mut self) -> Result<Vec<Strut>, ProtocolError> {
        let tree = self.conn.query_tree(self.root)?.reply()?;
        let mut struts = Vec::new();
        for child in tree.children {
            match self.strut(child) {
                Ok(Some(strut)) => struts.push(strut),
                Ok(None) => {}
                Err(ProtocolError::Connection(e)) => return Err(ProtocolError::Connection(e)),
                Err(e) => trace!(window = child, error = %e, "Skipping strut of vanished window"),
            }
        }
        Ok(struts)
    }

    fn supports_delete(&mut self, window: WindowId) -> Result<bool, ProtocolError> {
        let protocols = self.cardinals(window.0, self.atoms.WM_PROTOCOLS, 64)?;
        Ok(protocols.contains(&self.atoms.WM_DELETE_WINDOW))
    }

    fn watch(&mut self, window: WindowId) -> Result<(), ProtocolError> {
        let mask = EventMask::STRUCTURE_NOTIFY | EventMask::ENTER_WINDOW | EventMask::FOCUS_CHANGE;
        self.conn
            .change_window_attributes(window.0, &ChangeWindowAttributesAux::new().event_mask(mask))?;
        Ok(())
    }

    fn configure(&mut self, window: WindowId, frame: Rect) -> Result<(), ProtocolError> {
        let aux = ConfigureWindowAux::new()
            .x(frame.x)
            .y(frame.y)
            .width(frame.width.max(1) as u32)
            .height(frame.height.max(1) as u32);
        self.conn.configure_window(window.0, &aux)?;
        Ok(())
    }

    fn move_to(&mut self, window: WindowId, origin: Point) -> Result<(), ProtocolError> {
        self.conn.configure_window(window.0, &ConfigureWindowAux::new().x(origin.x).y(origin.y))?;
        Ok(())
    }

    fn restack(&mut self, window: WindowId, position: StackPosition) -> Result<(), ProtocolError> {
        let aux = match position {
            StackPosition::Top => ConfigureWindowAux::new().stack_mode(StackMode::ABOVE),
            StackPosition::Below(sibling) => {
                ConfigureWindowAux::new().sibling(sibling.0).stack_mode(StackMode::BELOW)
            }
        };
        self.conn.configure_window(window.0, &aux)?;
        Ok(())
    }

    fn map(&mut self, window: WindowId) -> Result<(), ProtocolError> {
        self.conn.map_window(window.0)?;
        Ok(())
    }

    fn unmap(&mut self, window: WindowId) -> Result<(), ProtocolError> {
        self.conn.unmap_window(window.0)?;
        Ok(())
    }

    fn set_focus(&mut self, window: Option<WindowId>) -> Result<(), ProtocolError> {
        let target = window.map_or(self.root, |w| w.0);
        self.conn.set_input_focus(InputFocus::POINTER_ROOT, target, x11rb::CURRENT_TIME)?;
        Ok(())
    }

    fn request_close(&mut self, window: WindowId) -> Result<(), ProtocolError> {
        let event = ClientMessageEvent::new(
            32,
            window.0,
            self.atoms.WM_PROTOCOLS,
            [self.atoms.WM_DELETE_WINDOW, x11rb::CURRENT_TIME, 0, 0, 0],
        );
        self.conn.send_event(false, window.0, EventMask::NO_EVENT, event)?;
        Ok(())
    }

    fn kill(&mut self, window: WindowId) -> Result<(), ProtocolError> {
        self.conn.kill_client(window.0)?;
        Ok(())
    }

    fn grab_keys(&mut self, bindings: &[KeyBinding]) -> Result<(), ProtocolError> {
        let root = self.root;
        for binding in bindings {
            let keycodes = self.keymap.keycodes(binding.keysym);
            if keycodes.is_empty() {
                warn!(key = %binding.keysym, "No keycode for bound key");
            }
            // Also grab with num lock and caps lock held.
            let lock_variants = [
                Modifiers::empty(),
                Modifiers::LOCK,
                Modifiers::MOD2,
                Modifiers::LOCK | Modifiers::MOD2,
            ];
            for keycode in keycodes {
                for extra in lock_variants {
                    let modifiers = ModMask::from((binding.modifiers | extra).bits());
                    self.conn.grab_key(
                        true,
                        root,
                        modifiers,
                        keycode,
                        GrabMode::ASYNC,
                        GrabMode::ASYNC,
                    )?;
                }
            }
        }
        Ok(())
    }

    fn grab_buttons(&mut self, modifier: Modifiers) -> Result<(), ProtocolError> {
        let mask = EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE | EventMask::POINTER_MOTION;
        for button in [ButtonIndex::M1, ButtonIndex::M3] {
            self.conn.grab_button(
                true,
                self.root,
                mask,
                GrabMode::ASYNC,
                GrabMode::ASYNC,
                x11rb::NONE,
                x11rb::NONE,
                button,
                ModMask::from(modifier.bits()),
            )?;
        }
        Ok(())
    }

    fn grab_pointer(&mut self) -> Result<(), ProtocolError> {
        let mask = EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE | EventMask::POINTER_MOTION;
        self.conn.grab_pointer(
            true,
            self.root,
            mask,
            GrabMode::ASYNC,
            GrabMode::ASYNC,
            x11rb::NONE,
            x11rb::NONE,
            x11rb::CURRENT_TIME,
        )?;
        Ok(())
    }

    fn ungrab_pointer(&mut self) -> Result<(), ProtocolError> {
        self.conn.ungrab_pointer(x11rb::CURRENT_TIME)?;
        Ok(())
    }

    fn draw_outline(&mut self, frame: Rect) -> Result<(), ProtocolError> {
        let rect = Rectangle {
            x: frame.x.clamp(i16::MIN.into(), i16::MAX.into()) as i16,
            y: frame.y.clamp(i16::MIN.into(), i16::MAX.into()) as i16,
            width: frame.width.clamp(1, u16::MAX.into()) as u16,
            height: frame.height.clamp(1, u16::MAX.into()) as u16,
        };
        self.conn.poly_rectangle(self.root, self.outline_gc, &[rect])?;
        Ok(())
    }

    fn publish(&mut self, property: Property) -> Result<(), ProtocolError> {
        let atoms = &self.atoms;
        let (root, conn) = (self.root, &self.conn);
        match property {
            Property::Supported => {
                conn.change_property32(
                    PropMode::REPLACE,
                    root,
                    atoms._NET_SUPPORTED,
                    AtomEnum::ATOM,
                    &atoms.supported(),
                )?;
            }
            Property::Identity(name) => {
                for window in [root, self.check_window] {
                    conn.change_property32(
                        PropMode::REPLACE,
                        window,
                        atoms._NET_SUPPORTING_WM_CHECK,
                        AtomEnum::WINDOW,
                        &[self.check_window],
                    )?;
                    conn.change_property8(
                        PropMode::REPLACE,
                        window,
                        atoms._NET_WM_NAME,
                        atoms.UTF8_STRING,
                        name.as_bytes(),
                    )?;
                }
            }
            Property::NumberOfDesktops(n) => {
                conn.change_property32(
                    PropMode::REPLACE,
                    root,
                    atoms._NET_NUMBER_OF_DESKTOPS,
                    AtomEnum::CARDINAL,
                    &[n],
                )?;
            }
            Property::CurrentDesktop(n) => {
                conn.change_property32(
                    PropMode::REPLACE,
                    root,
                    atoms._NET_CURRENT_DESKTOP,
                    AtomEnum::CARDINAL,
                    &[n],
                )?;
            }
            Property::ActiveWindow(window) => {
                conn.change_property32(
                    PropMode::REPLACE,
                    root,
                    atoms._NET_ACTIVE_WINDOW,
                    AtomEnum::WINDOW,
                    &[window.map_or(x11rb::NONE, |w| w.0)],
                )?;
            }
            Property::ClientList(windows) if windows.is_empty() => {
                conn.delete_property(root, atoms._NET_CLIENT_LIST)?;
            }
            Property::ClientList(windows) => {
                let ids: Vec<u32> = windows.iter().map(|w| w.0).collect();
                conn.change_property32(
                    PropMode::REPLACE,
                    root,
                    atoms._NET_CLIENT_LIST,
                    AtomEnum::WINDOW,
                    &ids,
                )?;
            }
            Property::WindowDesktop(window, desktop) => {
                conn.change_property32(
                    PropMode::REPLACE,
                    window.0,
                    atoms._NET_WM_DESKTOP,
                    AtomEnum::CARDINAL,
                    &[desktop],
                )?;
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ProtocolError> {
        self.conn.flush()?;
        Ok(())
    }
}

impl Drop for X11Server {
    fn drop(&mut self) {
        let _ = self.conn.destroy_window(self.check_window);
        let _ = self.conn.free_gc(self.outline_gc);
        let _ = self.conn.flush();
    }
}

impl std::fmt::Debug for X11Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("X11Server").field("root", &self.root).field("screen", &self.screen).finish()
    }
}
