use std::time::Instant;

use tracing::{debug, trace};

use crate::interaction::{DragMode, Feedback, Outcome};
use crate::reactor::Reactor;
use crate::sys::event::{Event, Modifiers, MouseButton, WindowId};
use crate::sys::geometry::Point;
use crate::sys::window_server::{ProtocolError, WindowServer};

pub struct DragEventHandler;

impl DragEventHandler {
    pub fn handle_button_press<S: WindowServer>(
        reactor: &mut Reactor<S>,
        window: WindowId,
        button: MouseButton,
        pointer: Point,
        state: Modifiers,
    ) -> Result<(), ProtocolError> {
        if !state.keyboard().contains(reactor.drag_modifier) {
            return Ok(());
        }
        let Some(id) = reactor.registry.find(window) else { return Ok(()) };
        let Some((kind, frame)) = reactor.registry.get(id).map(|c| (c.kind, c.frame)) else {
            return Ok(());
        };

        if !reactor.interaction.begin(window, kind, frame, button, pointer) {
            trace!(?window, ?kind, ?button, "Not starting a drag");
            return reactor.focus_client(Some(id));
        }
        reactor.request("grab_pointer", |s| s.grab_pointer())?;
        reactor.focus_client(Some(id))?;
        reactor.server.flush()?;

        let result = Self::pump(reactor, window);
        reactor.request("ungrab_pointer", |s| s.ungrab_pointer())?;
        result
    }

    /// Runs the drag until the button is released or `window` goes away.
    /// Queued motion is coalesced so that only the latest position is drawn;
    /// unrelated events are kept for the main loop.
    fn pump<S: WindowServer>(reactor: &mut Reactor<S>, window: WindowId) -> Result<(), ProtocolError> {
        loop {
            let mut event = reactor.server.next_event()?;
            if let Event::Motion { root, .. } = event {
                let mut latest = root;
                let mut skipped = 0;
                let mut pending = None;
                while let Some(next) = reactor.server.poll_event()? {
                    match next {
                        Event::Motion { root, .. } => {
                            latest = root;
                            skipped += 1;
                        }
                        other => {
                            pending = Some(other);
                            break;
                        }
                    }
                }
                if skipped > 0 {
                    trace!(skipped, "Coalesced motion events");
                }
                let feedback = reactor.interaction.motion(latest, Instant::now());
                Self::show_feedback(reactor, window, feedback)?;
                reactor.server.flush()?;
                match pending {
                    Some(other) => event = other,
                    None => continue,
                }
            }

            match event {
                Event::ButtonRelease { .. } => {
                    if let Some(outcome) = reactor.interaction.release() {
                        Self::finish(reactor, outcome)?;
                    }
                    return Ok(());
                }
                Event::Destroy(w) | Event::Unmap(w) if w == window => {
                    if let Some(outcome) = reactor.interaction.abort_for(window) {
                        Self::finish(reactor, outcome)?;
                    }
                    reactor.backlog.push_back(event);
                    return Ok(());
                }
                Event::Motion { .. } | Event::PointerEnter(_) => {}
                other => {
                    trace!(event = ?other, "Deferring event until the drag ends");
                    reactor.backlog.push_back(other);
                }
            }
        }
    }

    fn show_feedback<S: WindowServer>(
        reactor: &mut Reactor<S>,
        window: WindowId,
        feedback: Feedback,
    ) -> Result<(), ProtocolError> {
        match feedback {
            Feedback::None => Ok(()),
            Feedback::Move(frame) => reactor.request("move", |s| s.move_to(window, frame.origin())),
            Feedback::Resize(frame) => reactor.request("configure", |s| s.configure(window, frame)),
            Feedback::Outline { erase, draw } => {
                if let Some(erase) = erase {
                    reactor.request("draw_outline", |s| s.draw_outline(erase))?;
                }
                reactor.request("draw_outline", |s| s.draw_outline(draw))
            }
        }
    }

    /// Applies the end of a session: erases any preview and, when committed,
    /// records and applies the final geometry.
    pub fn finish<S: WindowServer>(
        reactor: &mut Reactor<S>,
        outcome: Outcome,
    ) -> Result<(), ProtocolError> {
        match outcome {
            Outcome::Committed { window, mode, frame, erase } => {
                if let Some(erase) = erase {
                    reactor.request("draw_outline", |s| s.draw_outline(erase))?;
                }
                if let Some(client) =
                    reactor.registry.find(window).and_then(|id| reactor.registry.get_mut(id))
                {
                    client.frame = frame;
                    client.user_placed = true;
                }
                debug!(?window, ?mode, ?frame, "Drag committed");
                match mode {
                    DragMode::Move => reactor.request("move", |s| s.move_to(window, frame.origin())),
                    DragMode::Resize => reactor.request("configure", |s| s.configure(window, frame)),
                }
            }
            Outcome::Aborted { window, erase } => {
                debug!(?window, "Drag aborted");
                match erase {
                    Some(erase) => reactor.request("draw_outline", |s| s.draw_outline(erase)),
                    None => Ok(()),
                }
            }
        }
    }
}
