pub mod focus;
pub mod registry;
pub mod stacking;
pub mod workspace;

pub use focus::Focus;
pub use registry::{Client, ClientId, ClientKind, WindowRegistry};
pub use stacking::StackingOrder;
pub use workspace::{SwitchPlan, Workspace, WorkspaceManager};
