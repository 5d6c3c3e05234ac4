use tracing::{debug, trace};

use crate::reactor::Reactor;
use crate::sys::event::WindowId;
use crate::sys::window_server::{
    ProtocolError, ProtocolResultExt, Property, WindowServer, WindowType,
};

pub struct WindowEventHandler;

impl WindowEventHandler {
    pub fn handle_map_request<S: WindowServer>(
        reactor: &mut Reactor<S>,
        window: WindowId,
    ) -> Result<(), ProtocolError> {
        if let Some(client) = reactor.registry.by_window(window) {
            if client.workspace != reactor.workspaces.active() {
                trace!(?window, workspace = client.workspace, "Ignoring map request from hidden workspace");
                return Ok(());
            }
            trace!(?window, "Managed window asked to be mapped again");
            return reactor.show(window);
        }
        let Some(info) = reactor.server.window_info(window).ignore_benign("window_info")? else {
            return Ok(());
        };
        if info.window_type == WindowType::Dock {
            debug!(?window, "Mapping dock without managing it");
            reactor.show(window)?;
            return reactor.arrange();
        }

        let active = reactor.workspaces.active();
        let screen = reactor.server.screen();
        let Some(id) = reactor.registry.add(&mut reactor.workspaces, active, &info, screen) else {
            return reactor.show(window);
        };
        let Some(frame) = reactor.registry.get(id).map(|c| c.frame) else {
            return Ok(());
        };

        reactor.request("watch", |s| s.watch(window))?;
        reactor.request("configure", |s| s.configure(window, frame))?;
        reactor.show(window)?;
        reactor.publish(Property::WindowDesktop(window, active as u32))?;
        reactor.publish_client_list()?;
        reactor.arrange()?;
        reactor.focus_client(Some(id))
    }

    pub fn handle_unmap<S: WindowServer>(
        reactor: &mut Reactor<S>,
        window: WindowId,
    ) -> Result<(), ProtocolError> {
        if reactor.take_pending_unmap(window) {
            trace!(?window, "Ignoring unmap we requested");
            return Ok(());
        }
        reactor.forget(window)
    }

    pub fn handle_destroy<S: WindowServer>(
        reactor: &mut Reactor<S>,
        window: WindowId,
    ) -> Result<(), ProtocolError> {
        reactor.forget(window)
    }

    pub fn handle_pointer_enter<S: WindowServer>(
        reactor: &mut Reactor<S>,
        window: WindowId,
    ) -> Result<(), ProtocolError> {
        if reactor.interaction.is_active() || reactor.focus.holds(window) {
            return Ok(());
        }
        let active = reactor.workspaces.active();
        let Some(id) = reactor.registry.find(window) else { return Ok(()) };
        if reactor.registry.get(id).is_some_and(|c| c.workspace == active) {
            reactor.focus_client(Some(id))?;
        }
        Ok(())
    }
}
