use tracing::{debug, trace};

use crate::reactor::Reactor;
use crate::sys::event::{ClientRequest, WindowId};
use crate::sys::window_server::{ProtocolError, WindowServer};

pub struct WorkspaceEventHandler;

impl WorkspaceEventHandler {
    pub fn handle_client_message<S: WindowServer>(
        reactor: &mut Reactor<S>,
        window: WindowId,
        request: ClientRequest,
    ) -> Result<(), ProtocolError> {
        match request {
            ClientRequest::CurrentDesktop(index) => {
                match usize::try_from(index).ok().filter(|&i| i < reactor.workspaces.count()) {
                    Some(index) => reactor.switch_workspace(index),
                    None => {
                        debug!(index, "Ignoring request for unknown desktop");
                        Ok(())
                    }
                }
            }
            ClientRequest::CloseWindow => {
                if reactor.registry.find(window).is_none() {
                    return Ok(());
                }
                reactor.close(window)
            }
            ClientRequest::ActivateWindow => {
                let Some(id) = reactor.registry.find(window) else { return Ok(()) };
                let Some(workspace) = reactor.registry.get(id).map(|c| c.workspace) else {
                    return Ok(());
                };
                reactor.switch_workspace(workspace)?;
                reactor.focus_client(Some(id))
            }
            ClientRequest::Other => {
                trace!(?window, "Ignoring client message");
                Ok(())
            }
        }
    }
}
