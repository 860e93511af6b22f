//! Source-control provider: resource groups kept in sync with ClearCase,
//! and the command table that drives it.

mod commands;
mod group;
mod provider;
mod resource;

pub use commands::*;
pub use group::*;
pub use provider::*;
pub use resource::*;
