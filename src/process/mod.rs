//! External tool process spawning and output streaming.

mod lines;
mod log;
mod runner;
mod scripted;

pub use lines::*;
pub use log::*;
pub use runner::*;
pub use scripted::*;
