pub mod common;
pub mod interaction;
pub mod layout_engine;
pub mod model;
pub mod reactor;
pub mod sys;
