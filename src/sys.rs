//! Utilities for interfacing with the display server.

pub mod event;
pub mod geometry;
pub mod keysym;
pub mod window_server;
pub mod x11;
