use chrono::{DateTime, Utc};

use crate::models::{Quest, QuestProgress, QuestStatus};

/// Whether a quest is currently submittable: it must be active and `now`
/// must fall inside the inclusive start/end window.
pub fn check_available(quest: &Quest, now: DateTime<Utc>) -> Result<(), String> {
    if quest.status != QuestStatus::Active {
        return Err(format!("quest is {}", quest.status.as_str()));
    }
    if let Some(start) = quest.start_date {
        if now < start {
            return Err("quest has not started yet".to_string());
        }
    }
    if let Some(end) = quest.end_date {
        if now > end {
            return Err("quest has ended".to_string());
        }
    }
    Ok(())
}

/// Whether another completion attempt is allowed given how many times the
/// user has already completed the quest. Rejections never count here; only
/// actual completions move the counter.
pub fn check_repeatable(quest: &Quest, completions: i32) -> Result<(), String> {
    if !quest.is_repeatable {
        if completions > 0 {
            return Err("quest already completed and is not repeatable".to_string());
        }
        return Ok(());
    }
    if let Some(max) = quest.max_completions {
        if completions >= max {
            return Err(format!("quest completion limit of {} reached", max));
        }
    }
    Ok(())
}

/// Read-path answer for "can this user complete this quest right now".
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Completability {
    pub can_complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Composes availability and repeat-eligibility without mutating anything.
/// Used by listing endpoints; the workflow re-runs the same checks under its
/// per-key lock before writing.
pub fn can_complete(quest: &Quest, progress: Option<&QuestProgress>, now: DateTime<Utc>) -> Completability {
    if let Err(reason) = check_available(quest, now) {
        return Completability { can_complete: false, reason: Some(reason) };
    }
    let completions = progress.map(|p| p.completion_count).unwrap_or(0);
    if let Err(reason) = check_repeatable(quest, completions) {
        return Completability { can_complete: false, reason: Some(reason) };
    }
    Completability { can_complete: true, reason: None }
}
