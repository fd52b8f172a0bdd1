// src/models/attempt.rs

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use validator::Validate;

/// Represents the 'quiz_attempts' table. Attempts are append-only history:
/// rows are never updated after insertion, the latest one decides the current
/// pass state and older ones remain for audit and statistics.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub id: i64,
    pub user_id: i64,
    pub module_id: i64,

    /// 1-based, strictly increasing per (user, module). Assigned by the
    /// database under a unique key, never reused or reset.
    pub attempt_number: i64,

    /// Percentage score, rounded to one decimal.
    pub score: f64,

    pub total_questions: i64,
    pub correct_answers: i64,

    /// True iff score >= the passing threshold.
    pub is_passed: bool,

    pub started_at: chrono::DateTime<chrono::Utc>,
    pub submitted_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Represents the 'quiz_answers' table: one row per answered question,
/// immutable once created.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub id: i64,
    pub attempt_id: i64,
    pub question_id: i64,
    pub selected_choice_ids: Json<Vec<i64>>,
    pub is_correct: bool,
    pub points_earned: f64,
}

/// One answer in a quiz submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmittedAnswer {
    pub question_id: i64,
    pub selected_choice_ids: Vec<i64>,
}

/// DTO for submitting a quiz attempt.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitQuizRequest {
    pub module_id: i64,
    pub started_at: chrono::DateTime<chrono::Utc>,
    #[validate(length(min = 1, message = "No answers submitted."))]
    pub answers: Vec<SubmittedAnswer>,
}

/// Result returned to the learner after a submission, including the stored
/// per-question answer records.
#[derive(Debug, Serialize)]
pub struct QuizResultResponse {
    pub attempt: QuizAttempt,
    pub module_number: i64,
    pub module_title: String,
    pub answers: Vec<AnswerRecord>,
    pub passed: bool,
    pub message: String,
}
