use super::registry::{ClientId, WindowRegistry};
use super::workspace::Workspace;
use crate::sys::event::WindowId;

/// The single window holding keyboard focus, if any.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Focus {
    current: Option<WindowId>,
}

impl Focus {
    pub fn current(&self) -> Option<WindowId> { self.current }

    pub fn holds(&self, window: WindowId) -> bool { self.current == Some(window) }

    /// Returns whether the focus target changed.
    pub fn set(&mut self, window: Option<WindowId>) -> bool {
        std::mem::replace(&mut self.current, window) != window
    }
}

/// Client to focus after the focused one left `workspace`.
pub fn fallback(workspace: &Workspace) -> Option<ClientId> { workspace.first() }

/// The client after `current` in traversal order, wrapping around. Starts
/// from the first client when nothing on the workspace is focused.
pub fn next_in(
    workspace: &Workspace,
    registry: &WindowRegistry,
    current: Option<WindowId>,
) -> Option<ClientId> {
    let clients = workspace.clients();
    let position = current
        .and_then(|w| registry.find(w))
        .and_then(|id| clients.iter().position(|&c| c == id));
    match position {
        Some(pos) => clients.get((pos + 1) % clients.len()).copied(),
        None => clients.first().copied(),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::common::config::{ColumnSettings, LayoutMode};
    use crate::model::workspace::WorkspaceManager;
    use crate::sys::geometry::Rect;
    use crate::sys::window_server::WindowInfo;

    #[test]
    fn next_wraps_around() {
        let mut registry = WindowRegistry::new(8, ColumnSettings::default());
        let mut workspaces = WorkspaceManager::new(1, LayoutMode::MasterStack);
        let screen = Rect::new(0, 0, 100, 100);
        let ids: Vec<_> = (1..=3)
            .filter_map(|w| {
                let info = WindowInfo::new(WindowId(w), screen);
                registry.add(&mut workspaces, 0, &info, screen)
            })
            .collect();
        let ws = workspaces.workspace(0).unwrap();

        assert_eq!(next_in(ws, &registry, None), Some(ids[0]));
        assert_eq!(next_in(ws, &registry, Some(WindowId(1))), Some(ids[1]));
        assert_eq!(next_in(ws, &registry, Some(WindowId(3))), Some(ids[0]));
        assert_eq!(next_in(ws, &registry, Some(WindowId(99))), Some(ids[0]));
        assert_eq!(fallback(ws), Some(ids[0]));
    }

    #[test]
    fn focus_reports_changes() {
        let mut focus = Focus::default();
        assert!(focus.set(Some(WindowId(1))));
        assert!(!focus.set(Some(WindowId(1))));
        assert!(focus.holds(WindowId(1)));
        assert!(focus.set(None));
        assert_eq!(focus.current(), None);
    }
}
