// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
}

/// Certificate row joined with the owner, for the admin listing.
#[derive(Debug, Serialize, FromRow)]
pub struct AdminCertificateEntry {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub verification_code: String,
    pub full_name: String,
    pub completion_date: Option<chrono::DateTime<chrono::Utc>>,
    pub total_modules_completed: i64,
    pub average_score: Option<f64>,
}

/// Attempt row joined with user and module, for the admin listing.
#[derive(Debug, Serialize, FromRow)]
pub struct AdminAttemptEntry {
    pub id: i64,
    pub username: String,
    pub module_number: i64,
    pub attempt_number: i64,
    pub score: f64,
    pub is_passed: bool,
    pub submitted_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Lists issued certificates, newest first.
/// Admin only.
pub async fn list_certificates(
    State(pool): State<PgPool>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params.limit.unwrap_or(50).clamp(1, 200);

    let certificates = sqlx::query_as::<_, AdminCertificateEntry>(
        r#"
        SELECT c.id, c.user_id, u.username, c.verification_code, c.full_name,
               c.completion_date, c.total_modules_completed, c.average_score
        FROM certificates c
        JOIN users u ON c.user_id = u.id
        ORDER BY c.completion_date DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list certificates: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(certificates))
}

/// Lists recent quiz attempts across all users, newest first.
/// Admin only.
pub async fn list_attempts(
    State(pool): State<PgPool>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params.limit.unwrap_or(50).clamp(1, 200);

    let attempts = sqlx::query_as::<_, AdminAttemptEntry>(
        r#"
        SELECT a.id, u.username, m.number AS module_number, a.attempt_number,
               a.score, a.is_passed, a.submitted_at
        FROM quiz_attempts a
        JOIN users u ON a.user_id = u.id
        JOIN modules m ON a.module_id = m.id
        ORDER BY a.submitted_at DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list attempts: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(attempts))
}
