//! Per-question breakdown of a scored attempt.
//!
//! Correctness and explanations come only from the scoring response; this
//! module never re-grades anything.

use crate::models::{AnswerMap, AttemptResult, Quiz};

/// Shown in place of an answer that was never captured.
pub const NO_ANSWER: &str = "No answer";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Correct,
    Incorrect,
}

impl Verdict {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Correct => "Correct",
            Self::Incorrect => "Incorrect",
        }
    }
}

/// One question in the results view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRow {
    /// 1-based question number.
    pub number: usize,
    pub prompt: String,
    pub your_answer: String,
    pub correct_answer: String,
    pub verdict: Verdict,
    pub explanation: String,
}

/// Zip the quiz, the captured answers and the scoring response by position.
pub fn render(quiz: &Quiz, answers: &AnswerMap, result: &AttemptResult) -> Vec<ResultRow> {
    quiz.questions
        .iter()
        .zip(&result.results)
        .enumerate()
        .map(|(i, (question, outcome))| ResultRow {
            number: i + 1,
            prompt: question.prompt.clone(),
            your_answer: answers
                .get(i)
                .map(ToString::to_string)
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| NO_ANSWER.to_string()),
            correct_answer: outcome.correct_answer.to_string(),
            verdict: if outcome.correct {
                Verdict::Correct
            } else {
                Verdict::Incorrect
            },
            explanation: outcome.explanation.clone(),
        })
        .collect()
}

/// `Score: 3/5 (60.0%)`
pub fn summary(result: &AttemptResult) -> String {
    format!(
        "Score: {}/{} ({:.1}%)",
        result.score, result.total_questions, result.percentage
    )
}
