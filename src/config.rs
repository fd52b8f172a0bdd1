// src/config.rs

use dotenvy::dotenv;
use std::env;

/// Minimum quiz score (percent) for a module to count as passed.
pub const PASSING_SCORE_PERCENTAGE: f64 = 80.0;

/// Length of certificate verification codes (uppercase alphanumerics).
pub const VERIFICATION_CODE_LENGTH: usize = 12;

/// Content track for learners working through text modules with quizzes.
pub const TRACK_TEXT_QUIZ: &str = "TEXT_QUIZ";

/// Content track for learners working through audio-only modules.
pub const TRACK_AUDIO: &str = "AUDIO";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub port: u16,
    /// Listen percentage at which an audio module counts as complete.
    /// Below 100 to tolerate playback rounding at the end of a file.
    pub audio_completion_threshold: f64,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86400);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000);

        let audio_completion_threshold = env::var("AUDIO_COMPLETION_THRESHOLD")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(95.0);

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            port,
            audio_completion_threshold,
            admin_username: env::var("ADMIN_USERNAME").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
        }
    }
}
