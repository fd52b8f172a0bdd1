// src/models/audio.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'audio_progress' table: one row per (user, module).
/// `progress_percentage` only ever moves up (max-merge on update);
/// `current_time_seconds` tracks the playhead for display and may go back.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AudioProgress {
    pub id: i64,
    pub user_id: i64,
    pub module_id: i64,
    pub progress_percentage: f64,
    pub current_time_seconds: i64,
    pub last_updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for a playback progress update.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateAudioProgressRequest {
    pub module_id: i64,
    #[validate(range(min = 0.0, max = 100.0, message = "Percentage must be within 0..=100."))]
    pub progress_percentage: f64,
    #[validate(range(min = 0, message = "Playback position must be non-negative."))]
    pub current_time_seconds: i64,
}

/// Response after a progress update: the stored (merged) state.
#[derive(Debug, Serialize)]
pub struct AudioProgressResponse {
    pub module_id: i64,
    pub progress_percentage: f64,
    pub current_time_seconds: i64,
    pub is_completed: bool,
}
