use std::thread;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::layout_engine::{Direction, LayoutInput, LayoutMode, ScrollAnimation};
use crate::model::focus;
use crate::reactor::Reactor;
use crate::sys::event::Modifiers;
use crate::sys::keysym::Keysym;
use crate::sys::window_server::{ProtocolError, Property, WindowServer};

/// Actions that can be bound to keys.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Close,
    FocusNext,
    ToggleFloating,
    SwitchWorkspace(usize),
    MoveToWorkspace(usize),
    IncreaseRatio,
    DecreaseRatio,
    CycleLayout,
    SetLayout(LayoutMode),
    ScrollLeft,
    ScrollRight,
    GrowColumn,
    ShrinkColumn,
}

impl Command {
    pub fn workspace_index(&self) -> Option<usize> {
        match self {
            Command::SwitchWorkspace(i) | Command::MoveToWorkspace(i) => Some(*i),
            _ => None,
        }
    }
}

pub struct CommandEventHandler;

impl CommandEventHandler {
    pub fn handle_key_press<S: WindowServer>(
        reactor: &mut Reactor<S>,
        keysym: Keysym,
        state: Modifiers,
    ) -> Result<(), ProtocolError> {
        let command = reactor
            .config
            .keys
            .iter()
            .find(|(binding, _)| binding.matches(keysym, state))
            .map(|(_, command)| *command);
        match command {
            Some(command) => Self::execute(reactor, command),
            None => {
                trace!(%keysym, ?state, "No binding for key");
                Ok(())
            }
        }
    }

    pub fn execute<S: WindowServer>(
        reactor: &mut Reactor<S>,
        command: Command,
    ) -> Result<(), ProtocolError> {
        info!(?command);
        let ratio_step = reactor.config.settings.layout.ratio_step;
        match command {
            Command::Close => match reactor.focus.current() {
                Some(window) => reactor.close(window),
                None => Ok(()),
            },
            Command::FocusNext => Self::focus_next(reactor),
            Command::ToggleFloating => Self::toggle_floating(reactor),
            Command::SwitchWorkspace(index) => reactor.switch_workspace(index),
            Command::MoveToWorkspace(index) => reactor.move_focused_to(index),
            Command::IncreaseRatio => {
                let ratio = reactor.workspaces.adjust_ratio(ratio_step);
                debug!(ratio, "Adjusted ratio");
                reactor.arrange()
            }
            Command::DecreaseRatio => {
                let ratio = reactor.workspaces.adjust_ratio(-ratio_step);
                debug!(ratio, "Adjusted ratio");
                reactor.arrange()
            }
            Command::CycleLayout => {
                let layout = reactor.workspaces.cycle_layout();
                debug!(%layout, "Switched layout");
                reactor.arrange()
            }
            Command::SetLayout(layout) => {
                reactor.workspaces.set_layout(layout);
                reactor.arrange()
            }
            Command::ScrollLeft => Self::scroll(reactor, Direction::Left),
            Command::ScrollRight => Self::scroll(reactor, Direction::Right),
            Command::GrowColumn => Self::resize_column(reactor, 1),
            Command::ShrinkColumn => Self::resize_column(reactor, -1),
        }
    }

    fn focus_next<S: WindowServer>(reactor: &mut Reactor<S>) -> Result<(), ProtocolError> {
        let Some(workspace) = reactor.workspaces.active_workspace() else {
            return Ok(());
        };
        let Some(next) = focus::next_in(workspace, &reactor.registry, reactor.focus.current())
        else {
            return Ok(());
        };
        reactor.focus_client(Some(next))?;

        if reactor.workspaces.active_workspace_mut().layout() == LayoutMode::Scrolling {
            let area = reactor.usable_area()?;
            let windows = reactor.layout_input_windows();
            let input = LayoutInput {
                area,
                ratio: 1.0,
                scroll_offset: reactor.workspaces.active_workspace_mut().scroll_offset(),
                windows: &windows,
            };
            let target = reactor.layout_engine.scrolling().reveal(&input, next);
            reactor.animate_scroll(target)?;
        }
        Ok(())
    }

    fn toggle_floating<S: WindowServer>(reactor: &mut Reactor<S>) -> Result<(), ProtocolError> {
        let Some(id) = reactor.focused_client() else { return Ok(()) };
        let Some((window, kind)) = reactor.registry.get(id).map(|c| (c.window, c.kind.toggled()))
        else {
            return Ok(());
        };
        reactor.registry.set_kind(&mut reactor.workspaces, id, kind);
        debug!(?window, ?kind, "Toggled floating");
        let position = reactor.stacking.raise(window, kind);
        reactor.request("restack", |s| s.restack(window, position))?;
        reactor.arrange()
    }

    fn scroll<S: WindowServer>(
        reactor: &mut Reactor<S>,
        direction: Direction,
    ) -> Result<(), ProtocolError> {
        if reactor.workspaces.active_workspace_mut().layout() != LayoutMode::Scrolling {
            return Ok(());
        }
        let area = reactor.usable_area()?;
        let windows = reactor.layout_input_windows();
        let input = LayoutInput {
            area,
            ratio: 1.0,
            scroll_offset: reactor.workspaces.active_workspace_mut().scroll_offset(),
            windows: &windows,
        };
        let target = reactor.layout_engine.scrolling().next_stop(&input, direction);
        reactor.animate_scroll(target)
    }

    fn resize_column<S: WindowServer>(reactor: &mut Reactor<S>, sign: i32) -> Result<(), ProtocolError> {
        let Some(id) = reactor.focused_client() else { return Ok(()) };
        let delta = sign * reactor.registry.column_step();
        if let Some(width) = reactor.registry.adjust_column_width(id, delta) {
            debug!(width, "Resized column");
        }
        reactor.arrange()
    }
}

impl<S: WindowServer> Reactor<S> {
    pub(crate) fn switch_workspace(&mut self, target: usize) -> Result<(), ProtocolError> {
        let Some(plan) = self.workspaces.switch(target) else {
            trace!(target, "Workspace switch is a no-op");
            return Ok(());
        };
        if let Some(workspace) = self.workspaces.active_workspace() {
            info!(from = plan.from, to = %workspace.name(), "Switched workspace");
        }
        for id in &plan.hide {
            if let Some(window) = self.registry.window(*id) {
                self.hide(window)?;
            }
        }
        for id in &plan.show {
            if let Some(window) = self.registry.window(*id) {
                self.show(window)?;
            }
        }
        self.publish(Property::CurrentDesktop(plan.to as u32))?;
        self.arrange()?;
        self.focus_client(plan.focus)
    }

    pub(crate) fn move_focused_to(&mut self, target: usize) -> Result<(), ProtocolError> {
        let Some(window) = self.focus.current() else { return Ok(()) };
        if !self.workspaces.move_client_to(&mut self.registry, window, target) {
            return Ok(());
        }
        debug!(?window, target, "Moved window to workspace");
        self.hide(window)?;
        self.publish(Property::WindowDesktop(window, target as u32))?;
        let fallback = self.workspaces.active_workspace().and_then(focus::fallback);
        self.focus_client(fallback)?;
        self.arrange()?;
        self.publish_client_list()
    }

    /// Moves the view of the active workspace to `target` in fixed steps,
    /// re-applying the layout after each one.
    pub(crate) fn animate_scroll(&mut self, target: i32) -> Result<(), ProtocolError> {
        let from = self.workspaces.active_workspace_mut().scroll_offset();
        let steps = self.config.settings.scroll.steps;
        let delay = self.scroll_step_delay();
        for offset in ScrollAnimation::new(from, target, steps) {
            self.workspaces.active_workspace_mut().set_scroll_offset(offset);
            self.arrange()?;
            self.server.flush()?;
            if !delay.is_zero() {
                thread::sleep(delay);
            }
        }
        Ok(())
    }
}
