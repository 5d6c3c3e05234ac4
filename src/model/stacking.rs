use super::registry::ClientKind;
use crate::sys::event::WindowId;
use crate::sys::window_server::StackPosition;

/// Bottom-to-top order of managed windows.
///
/// Floating windows always sit above every Normal window. Raising a Normal
/// window places it directly below the lowest Floating one, so the order can
/// be mirrored to the display server with a single restack request.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StackingOrder {
    order: Vec<(WindowId, ClientKind)>,
}

impl StackingOrder {
    pub fn new() -> Self { Self::default() }

    /// Raises `window` as far as its kind allows, inserting it if needed.
    /// Returns where the server has to put it.
    pub fn raise(&mut self, window: WindowId, kind: ClientKind) -> StackPosition {
        self.remove(window);
        match kind {
            ClientKind::Floating => {
                self.order.push((window, kind));
                StackPosition::Top
            }
            ClientKind::Normal => match self.lowest_floating() {
                Some(index) => {
                    let sibling = self.order[index].0;
                    self.order.insert(index, (window, kind));
                    StackPosition::Below(sibling)
                }
                None => {
                    self.order.push((window, kind));
                    StackPosition::Top
                }
            },
        }
    }

    pub fn remove(&mut self, window: WindowId) -> bool {
        let before = self.order.len();
        self.order.retain(|&(w, _)| w != window);
        self.order.len() != before
    }

    pub fn contains(&self, window: WindowId) -> bool { self.order.iter().any(|&(w, _)| w == window) }

    pub fn kind(&self, window: WindowId) -> Option<ClientKind> {
        self.order.iter().find(|&&(w, _)| w == window).map(|&(_, kind)| kind)
    }

    pub fn windows(&self) -> impl Iterator<Item = WindowId> + '_ { self.order.iter().map(|&(w, _)| w) }

    pub fn floating(&self) -> impl Iterator<Item = WindowId> + '_ {
        self.order
            .iter()
            .filter(|&&(_, kind)| kind == ClientKind::Floating)
            .map(|&(w, _)| w)
    }

    /// Holds whenever no Normal window sits above a Floating one.
    pub fn is_consistent(&self) -> bool {
        match self.lowest_floating() {
            Some(index) => self.order[index..].iter().all(|&(_, kind)| kind == ClientKind::Floating),
            None => true,
        }
    }

    fn lowest_floating(&self) -> Option<usize> {
        self.order.iter().position(|&(_, kind)| kind == ClientKind::Floating)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const N: ClientKind = ClientKind::Normal;
    const F: ClientKind = ClientKind::Floating;

    #[test]
    fn normal_windows_stay_below_floating() {
        let mut stack = StackingOrder::new();
        assert_eq!(stack.raise(WindowId(1), N), StackPosition::Top);
        assert_eq!(stack.raise(WindowId(2), F), StackPosition::Top);
        assert_eq!(stack.raise(WindowId(3), F), StackPosition::Top);
        assert_eq!(stack.raise(WindowId(4), N), StackPosition::Below(WindowId(2)));
        assert_eq!(stack.raise(WindowId(1), N), StackPosition::Below(WindowId(2)));
        assert_eq!(
            stack.windows().collect::<Vec<_>>(),
            vec![WindowId(4), WindowId(1), WindowId(2), WindowId(3)]
        );
        assert!(stack.is_consistent());
    }

    #[test]
    fn changing_kind_restacks() {
        let mut stack = StackingOrder::new();
        stack.raise(WindowId(1), N);
        stack.raise(WindowId(2), F);
        assert_eq!(stack.raise(WindowId(2), N), StackPosition::Top);
        assert_eq!(stack.kind(WindowId(2)), Some(N));
        assert_eq!(stack.raise(WindowId(1), F), StackPosition::Top);
        assert_eq!(stack.floating().collect::<Vec<_>>(), vec![WindowId(1)]);
        assert!(stack.remove(WindowId(1)));
        assert!(!stack.contains(WindowId(1)));
        assert!(stack.is_consistent());
    }

    #[test]
    fn interleavings_keep_floating_on_top() {
        let mut stack = StackingOrder::new();
        let kinds = [N, F, N, N, F, N, F, N];
        for (i, &kind) in kinds.iter().enumerate() {
            stack.raise(WindowId(i as u32), kind);
            assert!(stack.is_consistent());
        }
        for i in [3, 1, 5] {
            stack.remove(WindowId(i));
            stack.raise(WindowId(i + 1), kinds[i as usize + 1]);
            assert!(stack.is_consistent());
        }
    }
}
