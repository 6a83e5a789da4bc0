//! Command implementations.

mod replay;
mod settings;

pub use replay::{run_replay, DocumentKind, ReplayArgs};
pub use settings::show_config;
