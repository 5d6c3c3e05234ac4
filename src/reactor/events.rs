pub mod command;
pub mod drag;
pub mod window;
pub mod workspace;
