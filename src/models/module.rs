// src/models/module.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::config::TRACK_AUDIO;

/// Represents the 'modules' table. Catalog rows are reference data: the engine
/// never writes them, only the authoring system does.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Module {
    pub id: i64,

    /// Ordering key, unique across the catalog.
    pub number: i64,

    pub title: String,

    pub description: String,

    /// Delivery mode: 'TEXT_QUIZ' (text content + quiz) or 'AUDIO'.
    pub mode: String,

    pub audio_duration_seconds: Option<i64>,

    pub is_active: bool,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Module {
    pub fn is_audio(&self) -> bool {
        self.mode == TRACK_AUDIO
    }
}

/// Represents the 'quiz_questions' table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub id: i64,
    pub module_id: i64,
    pub position: i64,

    /// 'SINGLE' (one correct choice) or 'MULTIPLE' (a correct choice set).
    pub question_type: String,

    pub question_text: String,
    pub explanation: Option<String>,

    /// Weight of the question in the module score.
    pub points: i64,

    pub is_active: bool,
}

/// Represents the 'answer_choices' table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AnswerChoice {
    pub id: i64,
    pub question_id: i64,
    pub position: i64,
    pub choice_text: String,
    pub is_correct: bool,
}

/// DTO for sending a question to the client (excludes correct flags and
/// explanation so answers cannot be scraped before submission).
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub position: i64,
    #[serde(rename = "type")]
    pub question_type: String,
    pub question_text: String,
    pub points: i64,
    pub choices: Vec<PublicChoice>,
}

#[derive(Debug, Serialize)]
pub struct PublicChoice {
    pub id: i64,
    pub position: i64,
    pub choice_text: String,
}

/// Catalog entry enriched with the caller's completion status.
#[derive(Debug, Serialize)]
pub struct ModuleStatusEntry {
    pub id: i64,
    pub number: i64,
    pub title: String,
    pub description: String,
    pub mode: String,
    pub is_completed: bool,
    /// Best quiz score so far (text track only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_attempts: Option<i64>,
    /// Listen progress so far (audio track only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_percentage: Option<f64>,
}

/// Module detail response: the module plus its quiz questions in public form.
#[derive(Debug, Serialize)]
pub struct ModuleDetailResponse {
    #[serde(flatten)]
    pub module: Module,
    pub questions: Vec<PublicQuestion>,
}
