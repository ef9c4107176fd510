mod availability;
mod prerequisites;
mod workflow;

pub use availability::can_complete;
pub use workflow::QuestWorkflow;
