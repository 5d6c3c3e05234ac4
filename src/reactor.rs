//! The reactor keeps the model and the display server coherent.
//!
//! It takes one event at a time from the [`WindowServer`], updates the
//! registry and workspaces, recomputes geometry for the active workspace and
//! applies the focus and stacking policy. Pointer drags run as a nested event
//! pump until the button is released or the dragged window goes away.

mod events;

#[cfg(test)]
mod testing;

use std::time::Duration;

pub use events::command::Command;
use events::command::CommandEventHandler;
use events::drag::DragEventHandler;
use events::window::WindowEventHandler;
use events::workspace::WorkspaceEventHandler;
use tracing::{debug, info, instrument, trace};

use crate::common::collections::{HashMap, VecDeque};
use crate::common::config::Config;
use crate::common::log::trace_misc;
use crate::interaction::InteractionController;
use crate::layout_engine::{LayoutEngine, LayoutInput, LayoutMode, TiledWindow, usable_area};
use crate::model::{ClientId, ClientKind, Focus, StackingOrder, WindowRegistry, WorkspaceManager};
use crate::sys::event::{Event, Modifiers, WindowId};
use crate::sys::geometry::Rect;
use crate::sys::window_server::{ProtocolError, ProtocolResultExt, Property, WindowServer};

const WM_NAME: &str = "skiff";

pub struct Reactor<S: WindowServer> {
    config: Config,
    server: S,
    registry: WindowRegistry,
    workspaces: WorkspaceManager,
    layout_engine: LayoutEngine,
    stacking: StackingOrder,
    focus: Focus,
    interaction: InteractionController,
    /// Unmap notifications caused by our own requests, which must not be
    /// mistaken for a client withdrawing its window.
    pending_unmaps: HashMap<WindowId, u32>,
    /// Events that arrived during a drag and still need handling.
    backlog: VecDeque<Event>,
    drag_modifier: Modifiers,
}

impl<S: WindowServer> Reactor<S> {
    pub fn new(config: Config, server: S) -> Self {
        let settings = &config.settings;
        Reactor {
            registry: WindowRegistry::new(settings.workspaces.capacity, settings.columns.clone()),
            workspaces: WorkspaceManager::new(
                settings.workspaces.count,
                settings.workspaces.default_layout,
            ),
            layout_engine: LayoutEngine::new(&settings.layout),
            stacking: StackingOrder::new(),
            focus: Focus::default(),
            interaction: InteractionController::new(&settings.interaction),
            pending_unmaps: HashMap::default(),
            backlog: VecDeque::new(),
            drag_modifier: settings.interaction.modifier(),
            config,
            server,
        }
    }

    /// Advertises the window manager and installs the key and button grabs.
    pub fn start(&mut self) -> Result<(), ProtocolError> {
        let properties = [
            Property::Supported,
            Property::Identity(WM_NAME),
            Property::NumberOfDesktops(self.workspaces.count() as u32),
            Property::CurrentDesktop(self.workspaces.active() as u32),
            Property::ActiveWindow(None),
            Property::ClientList(Vec::new()),
        ];
        for property in properties {
            self.server.publish(property).ignore_benign("publish")?;
        }
        let bindings: Vec<_> = self.config.keys.iter().map(|(binding, _)| *binding).collect();
        self.server.grab_keys(&bindings).ignore_benign("grab_keys")?;
        self.server.grab_buttons(self.drag_modifier).ignore_benign("grab_buttons")?;
        self.server.flush()?;
        info!(
            workspaces = self.workspaces.count(),
            bindings = bindings.len(),
            "Window manager started"
        );
        Ok(())
    }

    /// Handles events until the connection to the display server is lost.
    pub fn run(mut self) -> Result<(), ProtocolError> {
        self.start()?;
        loop {
            let event = match self.backlog.pop_front() {
                Some(event) => event,
                None => self.server.next_event()?,
            };
            self.handle_event(event)?;
            self.server.flush()?;
        }
    }

    #[instrument(name = "reactor::handle_event", skip(self), fields(event = ?event))]
    pub fn handle_event(&mut self, event: Event) -> Result<(), ProtocolError> {
        match event {
            Event::MapRequest(window) => WindowEventHandler::handle_map_request(self, window),
            Event::Unmap(window) => WindowEventHandler::handle_unmap(self, window),
            Event::Destroy(window) => WindowEventHandler::handle_destroy(self, window),
            Event::PointerEnter(window) => WindowEventHandler::handle_pointer_enter(self, window),
            Event::ButtonPress { window, button, root, state } => {
                DragEventHandler::handle_button_press(self, window, button, root, state)
            }
            Event::ButtonRelease { .. } | Event::Motion { .. } => {
                trace!("Pointer event outside of a drag");
                Ok(())
            }
            Event::KeyPress { keysym, state } => {
                CommandEventHandler::handle_key_press(self, keysym, state)
            }
            Event::ClientMessage { window, request } => {
                WorkspaceEventHandler::handle_client_message(self, window, request)
            }
        }
    }

    pub fn registry(&self) -> &WindowRegistry { &self.registry }

    pub fn workspaces(&self) -> &WorkspaceManager { &self.workspaces }

    pub fn focused(&self) -> Option<WindowId> { self.focus.current() }

    /// Issues a request whose failure only means the target is gone.
    fn request(
        &mut self,
        name: &str,
        f: impl FnOnce(&mut S) -> Result<(), ProtocolError>,
    ) -> Result<(), ProtocolError> {
        f(&mut self.server).ignore_benign(name).map(drop)
    }

    fn publish(&mut self, property: Property) -> Result<(), ProtocolError> {
        self.request("publish", |s| s.publish(property))
    }

    /// Republishes the client list if the managed set changed.
    fn publish_client_list(&mut self) -> Result<(), ProtocolError> {
        if !self.registry.take_dirty() {
            return Ok(());
        }
        let list = self.registry.client_list(&self.workspaces);
        self.publish(Property::ClientList(list))
    }

    fn usable_area(&mut self) -> Result<Rect, ProtocolError> {
        let struts = self.server.struts().ignore_benign("struts")?.unwrap_or_default();
        Ok(usable_area(self.server.screen(), &struts))
    }

    fn layout_input_windows(&self) -> Vec<TiledWindow> {
        let default_width = self.registry.default_column_width();
        self.registry
            .clients_in(&self.workspaces, self.workspaces.active())
            .filter(|(_, client)| client.kind == ClientKind::Normal)
            .map(|(client, c)| TiledWindow {
                client,
                column_width: c.column_width.unwrap_or(default_width),
            })
            .collect()
    }

    /// Recomputes and applies the geometry of the active workspace.
    fn arrange(&mut self) -> Result<(), ProtocolError> {
        let area = self.usable_area()?;
        let windows = self.layout_input_windows();
        let workspace = self.workspaces.active_workspace_mut();
        let mode = workspace.layout();
        if mode == LayoutMode::Scrolling {
            let clamped = self.layout_engine.scrolling().clamp_offset(
                area,
                &windows,
                workspace.scroll_offset(),
            );
            workspace.set_scroll_offset(clamped);
        }
        let input = LayoutInput {
            area,
            ratio: workspace.ratio(),
            scroll_offset: workspace.scroll_offset(),
            windows: &windows,
        };
        let layout = trace_misc("calculate_layout", || self.layout_engine.calculate(mode, &input));
        trace!(?mode, ?area, tiled = layout.len(), "Arranging workspace");

        for (id, frame) in layout {
            let Some(client) = self.registry.get_mut(id) else { continue };
            client.frame = frame;
            let window = client.window;
            self.request("configure", |s| s.configure(window, frame))?;
        }

        let floating: Vec<ClientId> = self
            .registry
            .clients_in(&self.workspaces, self.workspaces.active())
            .filter(|(_, client)| client.is_floating())
            .map(|(id, _)| id)
            .collect();
        for id in floating {
            let Some(client) = self.registry.get_mut(id) else { continue };
            if !client.user_placed {
                let frame = self.layout_engine.center_floating(area, client.frame);
                if frame != client.frame {
                    client.frame = frame;
                    let window = client.window;
                    self.request("configure", |s| s.configure(window, frame))?;
                }
            }
        }
        self.raise_floating()
    }

    /// Puts the floating clients of the active workspace back on top,
    /// keeping their relative order.
    fn raise_floating(&mut self) -> Result<(), ProtocolError> {
        let active = self.workspaces.active();
        let floating: Vec<WindowId> = self
            .stacking
            .floating()
            .filter(|&w| self.registry.by_window(w).is_some_and(|c| c.workspace == active))
            .collect();
        for window in floating {
            let position = self.stacking.raise(window, ClientKind::Floating);
            self.request("restack", |s| s.restack(window, position))?;
        }
        Ok(())
    }

    /// Gives `id` keyboard focus and raises it as far as its kind allows.
    /// `None` returns focus to the root window.
    fn focus_client(&mut self, id: Option<ClientId>) -> Result<(), ProtocolError> {
        let target = id.and_then(|id| self.registry.get(id)).map(|c| (c.window, c.kind));
        match target {
            Some((window, kind)) => {
                let position = self.stacking.raise(window, kind);
                self.request("restack", |s| s.restack(window, position))?;
                self.request("set_focus", |s| s.set_focus(Some(window)))?;
                if self.focus.set(Some(window)) {
                    debug!(?window, "Focused window");
                }
                self.publish(Property::ActiveWindow(Some(window)))
            }
            None => {
                self.focus.set(None);
                self.request("set_focus", |s| s.set_focus(None))?;
                self.publish(Property::ActiveWindow(None))
            }
        }
    }

    fn focused_client(&self) -> Option<ClientId> { self.registry.find(self.focus.current()?) }

    /// Unmaps a window on our own behalf.
    fn hide(&mut self, window: WindowId) -> Result<(), ProtocolError> {
        *self.pending_unmaps.entry(window).or_default() += 1;
        self.request("unmap", |s| s.unmap(window))
    }

    fn show(&mut self, window: WindowId) -> Result<(), ProtocolError> {
        self.request("map", |s| s.map(window))
    }

    /// Consumes one expected self-inflicted unmap notification for `window`.
    fn take_pending_unmap(&mut self, window: WindowId) -> bool {
        let Some(count) = self.pending_unmaps.get_mut(&window) else {
            return false;
        };
        *count -= 1;
        if *count == 0 {
            self.pending_unmaps.remove(&window);
        }
        true
    }

    /// Asks `window` to close, killing its client if it does not take part
    /// in the cooperative close protocol.
    fn close(&mut self, window: WindowId) -> Result<(), ProtocolError> {
        let cooperative =
            self.server.supports_delete(window).ignore_benign("supports_delete")?.unwrap_or(false);
        if cooperative {
            debug!(?window, "Requesting window close");
            self.request("request_close", |s| s.request_close(window))
        } else {
            debug!(?window, "Killing client");
            self.request("kill", |s| s.kill(window))
        }
    }

    /// Forgets a window that was destroyed or withdrawn.
    fn forget(&mut self, window: WindowId) -> Result<(), ProtocolError> {
        if let Some(outcome) = self.interaction.abort_for(window) {
            DragEventHandler::finish(self, outcome)?;
        }
        self.pending_unmaps.remove(&window);
        self.stacking.remove(window);
        let Some(client) = self.registry.remove(&mut self.workspaces, window) else {
            return Ok(());
        };
        if self.focus.holds(window) {
            let fallback = self
                .workspaces
                .workspace(client.workspace)
                .and_then(crate::model::focus::fallback)
                .filter(|_| client.workspace == self.workspaces.active());
            self.focus_client(fallback)?;
        }
        if client.workspace == self.workspaces.active() {
            self.arrange()?;
        }
        self.publish_client_list()
    }

    fn scroll_step_delay(&self) -> Duration { self.config.settings.scroll.step_delay() }
}
