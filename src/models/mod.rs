// Re-export all model types from submodules
mod common;
mod progress;
mod quest;
mod requests;

pub use progress::*;
pub use quest::*;
pub use requests::*;
