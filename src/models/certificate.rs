// src/models/certificate.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'certificates' table. Immutable once issued; at most one
/// row per user, enforced by a unique constraint.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Certificate {
    pub id: i64,
    pub user_id: i64,

    /// Opaque public lookup code, globally unique.
    pub verification_code: String,

    /// Name captured at issuance time; later profile edits do not change it.
    pub full_name: String,

    pub completion_date: Option<chrono::DateTime<chrono::Utc>>,
    pub total_modules_completed: i64,

    /// Mean of each module's best passing score. None for audio-track users,
    /// who have no numeric scores; not the same thing as 0.0.
    pub average_score: Option<f64>,
}

/// DTO for requesting a certificate.
#[derive(Debug, Deserialize, Validate)]
pub struct CertificateRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Full name length must be between 1 and 100 characters."
    ))]
    pub full_name: String,
}

/// Public-safe subset returned by the verification endpoint. Carries no user
/// id or contact data.
#[derive(Debug, Serialize)]
pub struct PublicCertificateView {
    pub full_name: String,
    pub completion_date: Option<chrono::DateTime<chrono::Utc>>,
    pub total_modules_completed: i64,
    pub average_score: Option<f64>,
    pub verification_code: String,
}

impl From<Certificate> for PublicCertificateView {
    fn from(c: Certificate) -> Self {
        Self {
            full_name: c.full_name,
            completion_date: c.completion_date,
            total_modules_completed: c.total_modules_completed,
            average_score: c.average_score,
            verification_code: c.verification_code,
        }
    }
}

/// Constant-shape verification response: unknown codes get `is_valid: false`
/// and no payload, valid codes get the public view.
#[derive(Debug, Serialize)]
pub struct VerificationResponse {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate: Option<PublicCertificateView>,
}
