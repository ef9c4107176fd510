pub mod quests;
pub mod users;
