use slotmap::{SlotMap, new_key_type};
use tracing::debug;

use super::workspace::WorkspaceManager;
use crate::common::collections::HashMap;
use crate::common::config::ColumnSettings;
use crate::sys::event::WindowId;
use crate::sys::geometry::{Point, Rect, Size};
use crate::sys::window_server::{SizeHints, WindowInfo};

new_key_type! {
    pub struct ClientId;
}

/// Off-screen parking spot for tiled clients that have not been laid out yet.
pub const PLACEHOLDER: Point = Point::new(-10000, -10000);

const FALLBACK_SIZE: Size = Size::new(800, 600);
const MIN_NATURAL_SIZE: i32 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClientKind {
    Normal,
    Floating,
}

impl ClientKind {
    pub fn toggled(self) -> ClientKind {
        match self {
            ClientKind::Normal => ClientKind::Floating,
            ClientKind::Floating => ClientKind::Normal,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Client {
    pub window: WindowId,
    pub frame: Rect,
    pub kind: ClientKind,
    /// Width of the client's column in the scrolling layout.
    pub column_width: Option<i32>,
    pub workspace: usize,
    pub class: Option<String>,
    /// Set once the user has moved or resized a floating client, after which
    /// it is no longer re-centered.
    pub user_placed: bool,
}

impl Client {
    pub fn is_floating(&self) -> bool { self.kind == ClientKind::Floating }
}

pub fn classify(info: &WindowInfo) -> ClientKind {
    if info.override_redirect || info.window_type.prefers_floating() {
        ClientKind::Floating
    } else {
        ClientKind::Normal
    }
}

/// The size a window asks for: the base size hint wins over the preferred
/// size hint, which wins over its current size. Degenerate dimensions fall
/// back to 800x600.
pub fn natural_size(hints: &SizeHints, current: Size) -> Size {
    let size = hints.base.or(hints.preferred).unwrap_or(current);
    Size::new(
        if size.width < MIN_NATURAL_SIZE { FALLBACK_SIZE.width } else { size.width },
        if size.height < MIN_NATURAL_SIZE { FALLBACK_SIZE.height } else { size.height },
    )
}

/// Owns every managed client record, keyed by stable [`ClientId`]s.
#[derive(Debug)]
pub struct WindowRegistry {
    clients: SlotMap<ClientId, Client>,
    windows: HashMap<WindowId, ClientId>,
    capacity: usize,
    columns: ColumnSettings,
    dirty: bool,
}

impl WindowRegistry {
    pub fn new(capacity: usize, columns: ColumnSettings) -> Self {
        WindowRegistry {
            clients: SlotMap::default(),
            windows: HashMap::default(),
            capacity,
            columns,
            dirty: false,
        }
    }

    pub fn len(&self) -> usize { self.clients.len() }

    pub fn is_empty(&self) -> bool { self.clients.is_empty() }

    /// Most clients a single workspace may hold.
    pub fn capacity(&self) -> usize { self.capacity }

    /// Starts managing `info.window` on `workspace`. Refuses silently when
    /// that workspace is full.
    pub fn add(
        &mut self,
        workspaces: &mut WorkspaceManager,
        workspace: usize,
        info: &WindowInfo,
        screen: Rect,
    ) -> Option<ClientId> {
        if let Some(&id) = self.windows.get(&info.window) {
            debug!(window = ?info.window, "Window is already managed");
            return Some(id);
        }
        let capacity = self.capacity;
        let ws = workspaces.workspace_mut(workspace)?;
        if ws.len() >= capacity {
            debug!(window = ?info.window, workspace, capacity, "Workspace is full, not managing window");
            return None;
        }

        let kind = classify(info);
        let size = natural_size(&info.size_hints, info.frame.size());
        let frame = match kind {
            ClientKind::Normal => Rect::from_parts(PLACEHOLDER, size),
            ClientKind::Floating => screen.centered(size),
        };
        let class = info.class.clone();
        let column_width = Some(self.columns.width_for(class.as_deref()));
        let id = self.clients.insert(Client {
            window: info.window,
            frame,
            kind,
            column_width,
            workspace,
            class,
            user_placed: false,
        });
        self.windows.insert(info.window, id);
        ws.push(id, kind);
        self.dirty = true;
        debug!(window = ?info.window, ?kind, workspace, "Managing window");
        Some(id)
    }

    /// Forgets `window` for good. Its workspace keeps the order of the
    /// remaining clients.
    pub fn remove(&mut self, workspaces: &mut WorkspaceManager, window: WindowId) -> Option<Client> {
        let id = self.windows.remove(&window)?;
        let client = self.clients.remove(id)?;
        if let Some(ws) = workspaces.workspace_mut(client.workspace) {
            ws.remove(id, client.kind);
        }
        self.dirty = true;
        debug!(?window, workspace = client.workspace, "Unmanaging window");
        Some(client)
    }

    pub fn find(&self, window: WindowId) -> Option<ClientId> { self.windows.get(&window).copied() }

    pub fn get(&self, id: ClientId) -> Option<&Client> { self.clients.get(id) }

    pub fn get_mut(&mut self, id: ClientId) -> Option<&mut Client> { self.clients.get_mut(id) }

    pub fn window(&self, id: ClientId) -> Option<WindowId> { self.get(id).map(|c| c.window) }

    pub fn by_window(&self, window: WindowId) -> Option<&Client> { self.get(self.find(window)?) }

    /// Clients of `workspace` in tiling order.
    pub fn clients_in<'a>(
        &'a self,
        workspaces: &'a WorkspaceManager,
        workspace: usize,
    ) -> impl Iterator<Item = (ClientId, &'a Client)> + 'a {
        workspaces
            .workspace(workspace)
            .map(|ws| ws.clients())
            .unwrap_or_default()
            .iter()
            .filter_map(|&id| Some((id, self.clients.get(id)?)))
    }

    /// Every managed window, workspace by workspace.
    pub fn client_list(&self, workspaces: &WorkspaceManager) -> Vec<WindowId> {
        workspaces
            .iter()
            .flat_map(|ws| ws.clients())
            .filter_map(|&id| self.window(id))
            .collect()
    }

    /// Returns whether the client set changed since the last call.
    pub fn take_dirty(&mut self) -> bool { std::mem::take(&mut self.dirty) }

    pub fn set_kind(&mut self, workspaces: &mut WorkspaceManager, id: ClientId, kind: ClientKind) -> bool {
        let Some(client) = self.clients.get_mut(id) else { return false };
        if client.kind == kind {
            return false;
        }
        if let Some(ws) = workspaces.workspace_mut(client.workspace) {
            ws.reclassify(client.kind, kind);
        }
        client.kind = kind;
        client.user_placed = false;
        self.dirty = true;
        true
    }

    pub(crate) fn assign_workspace(&mut self, id: ClientId, workspace: usize) {
        if let Some(client) = self.clients.get_mut(id) {
            client.workspace = workspace;
            self.dirty = true;
        }
    }

    /// Grows or shrinks a client's column by `delta`, within the column
    /// bounds. Returns the new width.
    pub fn adjust_column_width(&mut self, id: ClientId, delta: i32) -> Option<i32> {
        let columns = &self.columns;
        let client = self.clients.get_mut(id)?;
        let current = client.column_width.unwrap_or(columns.default_width);
        let width = columns.clamp(current.saturating_add(delta));
        client.column_width = Some(width);
        Some(width)
    }

    pub fn column_step(&self) -> i32 { self.columns.step }

    pub fn default_column_width(&self) -> i32 { self.columns.default_width }
}
