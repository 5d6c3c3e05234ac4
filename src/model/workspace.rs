use tracing::debug;

use super::registry::{ClientId, ClientKind, WindowRegistry};
use crate::common::config::LayoutMode;
use crate::sys::event::WindowId;

pub const MIN_RATIO: f64 = 0.1;
pub const MAX_RATIO: f64 = 1.0;
/// Ratio given to a workspace when its second tiled client arrives.
pub const SPLIT_RATIO: f64 = 0.5;

/// A virtual desktop: an ordered set of clients plus the layout state that
/// belongs to it alone.
#[derive(Debug, Clone, PartialEq)]
pub struct Workspace {
    index: usize,
    clients: Vec<ClientId>,
    ratio: f64,
    scroll_offset: i32,
    layout: LayoutMode,
    normal_count: usize,
    floating_count: usize,
}

impl Workspace {
    pub fn new(index: usize, layout: LayoutMode) -> Self {
        Workspace {
            index,
            clients: Vec::new(),
            ratio: MAX_RATIO,
            scroll_offset: 0,
            layout,
            normal_count: 0,
            floating_count: 0,
        }
    }

    pub fn index(&self) -> usize { self.index }

    pub fn name(&self) -> String { format!("workspace {}", self.index + 1) }

    /// Clients in tiling and traversal order.
    pub fn clients(&self) -> &[ClientId] { &self.clients }

    pub fn first(&self) -> Option<ClientId> { self.clients.first().copied() }

    pub fn len(&self) -> usize { self.clients.len() }

    pub fn is_empty(&self) -> bool { self.clients.is_empty() }

    pub fn contains(&self, id: ClientId) -> bool { self.clients.contains(&id) }

    pub fn ratio(&self) -> f64 { self.ratio }

    pub fn set_ratio(&mut self, ratio: f64) { self.ratio = ratio.clamp(MIN_RATIO, MAX_RATIO); }

    pub fn adjust_ratio(&mut self, delta: f64) -> f64 {
        self.set_ratio(self.ratio + delta);
        self.ratio
    }

    pub fn scroll_offset(&self) -> i32 { self.scroll_offset }

    pub fn set_scroll_offset(&mut self, offset: i32) { self.scroll_offset = offset; }

    pub fn layout(&self) -> LayoutMode { self.layout }

    pub fn set_layout(&mut self, layout: LayoutMode) { self.layout = layout; }

    pub fn normal_count(&self) -> usize { self.normal_count }

    pub fn floating_count(&self) -> usize { self.floating_count }

    pub(crate) fn push(&mut self, id: ClientId, kind: ClientKind) {
        self.clients.push(id);
        self.count(kind, 1);
    }

    /// Removes `id` while keeping the order of the remaining clients.
    pub(crate) fn remove(&mut self, id: ClientId, kind: ClientKind) -> bool {
        let Some(pos) = self.clients.iter().position(|&c| c == id) else {
            return false;
        };
        self.clients.remove(pos);
        self.count(kind, -1);
        true
    }

    pub(crate) fn reclassify(&mut self, from: ClientKind, to: ClientKind) {
        if from != to {
            self.count(from, -1);
            self.count(to, 1);
        }
    }

    fn count(&mut self, kind: ClientKind, delta: isize) {
        let previous = self.normal_count;
        let counter = match kind {
            ClientKind::Normal => &mut self.normal_count,
            ClientKind::Floating => &mut self.floating_count,
        };
        *counter = counter.saturating_add_signed(delta);

        if self.normal_count < previous && self.normal_count <= 1 {
            self.ratio = MAX_RATIO;
        } else if previous == 1 && self.normal_count == 2 && self.ratio == MAX_RATIO {
            self.ratio = SPLIT_RATIO;
        }
    }
}

/// What the caller has to do to carry out a workspace switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchPlan {
    pub from: usize,
    pub to: usize,
    pub hide: Vec<ClientId>,
    pub show: Vec<ClientId>,
    pub focus: Option<ClientId>,
}

#[derive(Debug)]
pub struct WorkspaceManager {
    workspaces: Vec<Option<Workspace>>,
    active: usize,
    default_layout: LayoutMode,
}

impl WorkspaceManager {
    pub fn new(count: usize, default_layout: LayoutMode) -> Self {
        let mut manager = WorkspaceManager {
            workspaces: vec![None; count.max(1)],
            active: 0,
            default_layout,
        };
        manager.active_workspace_mut();
        manager
    }

    pub fn count(&self) -> usize { self.workspaces.len() }

    pub fn active(&self) -> usize { self.active }

    pub fn default_layout(&self) -> LayoutMode { self.default_layout }

    /// The workspace at `index` if it has been used before.
    pub fn workspace(&self, index: usize) -> Option<&Workspace> {
        self.workspaces.get(index)?.as_ref()
    }

    /// The workspace at `index`, created on first use. `None` only when the
    /// index is out of range.
    pub fn workspace_mut(&mut self, index: usize) -> Option<&mut Workspace> {
        let layout = self.default_layout;
        let slot = self.workspaces.get_mut(index)?;
        Some(slot.get_or_insert_with(|| {
            debug!(workspace = index, "Initializing workspace");
            Workspace::new(index, layout)
        }))
    }

    pub fn active_workspace(&self) -> Option<&Workspace> { self.workspace(self.active) }

    pub fn active_workspace_mut(&mut self) -> &mut Workspace {
        let (index, layout) = (self.active, self.default_layout);
        self.workspaces[index].get_or_insert_with(|| Workspace::new(index, layout))
    }

    /// All initialized workspaces in index order.
    pub fn iter(&self) -> impl Iterator<Item = &Workspace> + '_ {
        self.workspaces.iter().flatten()
    }

    /// Makes `target` the active workspace. Returns `None`, touching nothing,
    /// when `target` is already active or does not exist.
    pub fn switch(&mut self, target: usize) -> Option<SwitchPlan> {
        if target == self.active || target >= self.count() {
            return None;
        }
        let hide = self.active_workspace_mut().clients().to_vec();
        let to = self.workspace_mut(target)?;
        let show = to.clients().to_vec();
        let focus = to.first();
        let from = std::mem::replace(&mut self.active, target);
        debug!(from, to = target, "Switching workspace");
        Some(SwitchPlan { from, to: target, hide, show, focus })
    }

    pub fn adjust_ratio(&mut self, delta: f64) -> f64 { self.active_workspace_mut().adjust_ratio(delta) }

    pub fn cycle_layout(&mut self) -> LayoutMode {
        let workspace = self.active_workspace_mut();
        workspace.set_layout(workspace.layout().next());
        workspace.layout()
    }

    pub fn set_layout(&mut self, layout: LayoutMode) { self.active_workspace_mut().set_layout(layout); }

    /// Moves the client owning `window` to workspace `target`, appending it
    /// there. Both workspaces keep the relative order of their other clients.
    /// Refuses when `target` is already at the registry's capacity.
    pub fn move_client_to(
        &mut self,
        registry: &mut WindowRegistry,
        window: WindowId,
        target: usize,
    ) -> bool {
        let Some(id) = registry.find(window) else { return false };
        let Some(client) = registry.get(id) else { return false };
        let (from, kind) = (client.workspace, client.kind);
        if from == target || target >= self.count() {
            return false;
        }
        let capacity = registry.capacity();
        if self.workspace(target).is_some_and(|ws| ws.len() >= capacity) {
            debug!(?window, workspace = target, capacity, "Workspace is full, not moving window");
            return false;
        }
        if let Some(source) = self.workspace_mut(from) {
            source.remove(id, kind);
        }
        if let Some(destination) = self.workspace_mut(target) {
            destination.push(id, kind);
        }
        registry.assign_workspace(id, target);
        true
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use slotmap::SlotMap;

    use super::*;

    fn ids(n: usize) -> Vec<ClientId> {
        let mut map = SlotMap::<ClientId, ()>::with_key();
        (0..n).map(|_| map.insert(())).collect()
    }

    #[test]
    fn removal_keeps_order_of_survivors() {
        let ids = ids(4);
        let mut ws = Workspace::new(0, LayoutMode::MasterStack);
        for &id in &ids {
            ws.push(id, ClientKind::Normal);
        }
        assert!(ws.remove(ids[1], ClientKind::Normal));
        assert_eq!(ws.clients(), &[ids[0], ids[2], ids[3]]);
        assert!(!ws.remove(ids[1], ClientKind::Normal));
        assert_eq!(ws.normal_count(), 3);
    }

    #[test]
    fn ratio_follows_tiled_count() {
        let ids = ids(3);
        let mut ws = Workspace::new(0, LayoutMode::MasterStack);
        ws.push(ids[0], ClientKind::Normal);
        assert_eq!(ws.ratio(), MAX_RATIO);
        ws.push(ids[1], ClientKind::Normal);
        assert_eq!(ws.ratio(), SPLIT_RATIO);

        ws.adjust_ratio(0.2);
        ws.push(ids[2], ClientKind::Floating);
        assert_eq!(ws.ratio(), 0.7);

        ws.remove(ids[0], ClientKind::Normal);
        assert_eq!(ws.ratio(), MAX_RATIO);
        assert_eq!(ws.floating_count(), 1);
    }

    #[test]
    fn ratio_is_clamped() {
        let mut ws = Workspace::new(0, LayoutMode::MasterStack);
        for _ in 0..40 {
            ws.adjust_ratio(-0.05);
            assert!((MIN_RATIO..=MAX_RATIO).contains(&ws.ratio()));
        }
        assert_eq!(ws.ratio(), MIN_RATIO);
        ws.adjust_ratio(5.0);
        assert_eq!(ws.ratio(), MAX_RATIO);
    }

    #[test]
    fn switching_to_active_or_missing_is_a_noop() {
        let mut manager = WorkspaceManager::new(3, LayoutMode::Scrolling);
        assert_eq!(manager.switch(0), None);
        assert_eq!(manager.switch(3), None);
        assert_eq!(manager.active(), 0);
        assert!(manager.workspace(1).is_none());
    }

    #[test]
    fn switch_initializes_target_lazily() {
        let ids = ids(2);
        let mut manager = WorkspaceManager::new(3, LayoutMode::Fibonacci);
        manager.active_workspace_mut().push(ids[0], ClientKind::Normal);
        manager.active_workspace_mut().push(ids[1], ClientKind::Floating);

        let plan = manager.switch(2).unwrap();
        assert_eq!(plan.hide, ids);
        assert!(plan.show.is_empty());
        assert_eq!(plan.focus, None);
        assert_eq!(manager.active(), 2);

        let target = manager.workspace(2).unwrap();
        assert_eq!(target.ratio(), MAX_RATIO);
        assert_eq!(target.scroll_offset(), 0);
        assert_eq!(target.layout(), LayoutMode::Fibonacci);
        assert!(manager.workspace(1).is_none());
    }

    #[test]
    fn cycle_layout_only_touches_active_workspace() {
        let mut manager = WorkspaceManager::new(2, LayoutMode::MasterStack);
        assert_eq!(manager.cycle_layout(), LayoutMode::Fibonacci);
        manager.switch(1);
        assert_eq!(manager.active_workspace_mut().layout(), LayoutMode::MasterStack);
        manager.set_layout(LayoutMode::Radial);
        assert_eq!(manager.workspace(0).unwrap().layout(), LayoutMode::Fibonacci);
    }
}
