// src/models/user.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::config::{TRACK_AUDIO, TRACK_TEXT_QUIZ};

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    /// Unique username.
    pub username: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    /// Full name as it should appear on a certificate.
    pub full_name: String,

    /// User role: 'user' or 'admin'.
    pub role: String,

    /// Content track: 'TEXT_QUIZ' or 'AUDIO'. Decides which catalog the user
    /// sees and which completion signal (quiz vs. listen progress) applies.
    pub track: String,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl User {
    pub fn is_audio_track(&self) -> bool {
        self.track == TRACK_AUDIO
    }
}

/// DTO for creating a new user (Registration).
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(
        min = 3,
        max = 50,
        message = "Username length must be between 3 and 50 characters."
    ))]
    pub username: String,
    #[validate(length(
        min = 4,
        max = 128,
        message = "Password length must be between 4 and 128 characters."
    ))]
    pub password: String,
    #[validate(length(
        min = 1,
        max = 100,
        message = "Full name length must be between 1 and 100 characters."
    ))]
    pub full_name: String,
    #[validate(custom(function = validate_track))]
    pub track: String,
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 50))]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

fn validate_track(track: &str) -> Result<(), validator::ValidationError> {
    if track != TRACK_TEXT_QUIZ && track != TRACK_AUDIO {
        return Err(validator::ValidationError::new("unknown_track"));
    }
    Ok(())
}
