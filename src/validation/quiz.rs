use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuizScore {
    pub correct: usize,
    pub total: usize,
    pub min_required: usize,
    pub passed: bool,
}

/// Grades a quiz submission: one point per answer matching that question's
/// correct index. Passing requires every answer correct; there is no partial
/// credit threshold.
pub fn score_quiz(questions: &[QuizQuestion], answers: &[usize]) -> QuizScore {
    let total = questions.len();
    let correct = questions
        .iter()
        .zip(answers.iter())
        .filter(|(question, answer)| question.correct_answer_index == **answer)
        .count();
    let min_required = total;

    QuizScore {
        correct,
        total,
        min_required,
        passed: correct >= min_required,
    }
}

/// Reads the question list out of a quiz config. Config validation has
/// already checked the shape on the admin path, so a malformed list here is
/// reported, not assumed.
pub fn quiz_questions(config: &Value) -> Result<Vec<QuizQuestion>, String> {
    let questions = config
        .get("questions")
        .cloned()
        .ok_or_else(|| "field `questions` is required".to_string())?;
    serde_json::from_value(questions).map_err(|e| format!("field `questions` is malformed: {}", e))
}
