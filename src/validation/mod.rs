mod config;
pub mod quiz;
mod submission;

pub use config::validate_quest_config;
pub use submission::{reward_points, validate_submission};
