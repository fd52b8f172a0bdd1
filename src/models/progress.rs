// src/models/progress.rs

use serde::Serialize;

/// Derived per-user completion snapshot. Never stored: recomputed from the
/// catalog and the attempt/audio tables on every read, so a catalog that
/// grows is always reflected.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    pub total_modules: i64,
    pub completed_modules: i64,
    pub completion_percentage: f64,
    pub can_get_certificate: bool,
    /// Lowest-numbered module not yet passed, if any.
    pub next_module: Option<i64>,
}

/// Snapshot plus per-track statistics, as returned by the progress endpoint.
#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    pub track: String,
    #[serde(flatten)]
    pub snapshot: ProgressSnapshot,
    /// Text track only: attempts across all modules.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_quiz_attempts: Option<i64>,
    /// Text track only: mean of each module's best passing score.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_score: Option<f64>,
    /// Audio track only: total seconds of recorded listening position.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_audio_seconds: Option<i64>,
}
