use enum_dispatch::enum_dispatch;

use super::LayoutInput;
use crate::model::ClientId;
use crate::sys::geometry::Rect;

/// A tiling algorithm. Every system carries its own gap and border and does
/// its own arithmetic with them.
#[enum_dispatch]
pub trait LayoutSystem {
    /// Geometry for every window of `input`, in input order. Widths and
    /// heights are at least one pixel.
    fn calculate_layout(&self, input: &LayoutInput<'_>) -> Vec<(ClientId, Rect)>;
}

mod fibonacci;
pub use fibonacci::FibonacciLayoutSystem;
mod master_stack;
pub use master_stack::MasterStackLayoutSystem;
mod radial;
pub use radial::RadialLayoutSystem;
mod scrolling;
pub use scrolling::{ScrollAnimation, ScrollingLayoutSystem};

#[derive(Debug, Clone, Copy, PartialEq)]
#[enum_dispatch(LayoutSystem)]
pub enum LayoutSystemKind {
    MasterStack(MasterStackLayoutSystem),
    Fibonacci(FibonacciLayoutSystem),
    Radial(RadialLayoutSystem),
    Scrolling(ScrollingLayoutSystem),
}
