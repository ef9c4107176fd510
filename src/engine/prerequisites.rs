use std::collections::HashSet;

/// Outcome of a prerequisite check: the ids the user has not completed, in
/// the order the quest declares them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrerequisiteCheck {
    pub valid: bool,
    pub missing_quest_ids: Vec<i64>,
}

/// A prerequisite is missing iff the user has no completed progress for it.
/// Only the quest's direct dependency list is consulted; transitive
/// prerequisites are each quest's own concern, and cycles are rejected when
/// prerequisites are edited, not here.
pub fn missing_prerequisites(prerequisite_ids: &[i64], completed: &HashSet<i64>) -> PrerequisiteCheck {
    let missing_quest_ids: Vec<i64> = prerequisite_ids
        .iter()
        .copied()
        .filter(|id| !completed.contains(id))
        .collect();
    PrerequisiteCheck { valid: missing_quest_ids.is_empty(), missing_quest_ids }
}
