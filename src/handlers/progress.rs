// src/handlers/progress.rs

use std::collections::HashSet;

use axum::{Extension, Json, extract::State, response::IntoResponse};
use sqlx::{FromRow, PgPool};

use crate::{
    config::Config,
    error::AppError,
    handlers::auth::load_user,
    models::{
        progress::{ProgressResponse, ProgressSnapshot},
        user::User,
    },
    utils::jwt::Claims,
};

/// The slice of a catalog row the aggregator needs.
#[derive(Debug, Clone, FromRow)]
pub struct CatalogEntry {
    pub id: i64,
    pub number: i64,
}

/// Derives the completion snapshot from the catalog and the set of passed
/// module ids. Pure: recomputed from scratch on every read so a catalog that
/// grew since the last read is always reflected.
pub fn compute_snapshot(catalog: &[CatalogEntry], passed: &HashSet<i64>) -> ProgressSnapshot {
    let total_modules = catalog.len() as i64;
    let completed_modules = catalog.iter().filter(|m| passed.contains(&m.id)).count() as i64;

    let completion_percentage = if total_modules > 0 {
        completed_modules as f64 / total_modules as f64 * 100.0
    } else {
        0.0
    };

    // Catalog rows are ordered by number, so the first miss is the lowest.
    let next_module = catalog
        .iter()
        .find(|m| !passed.contains(&m.id))
        .map(|m| m.number);

    ProgressSnapshot {
        total_modules,
        completed_modules,
        completion_percentage,
        can_get_certificate: total_modules > 0 && completed_modules == total_modules,
        next_module,
    }
}

/// Loads the active catalog for a track, ordered by module number.
pub async fn load_catalog(pool: &PgPool, track: &str) -> Result<Vec<CatalogEntry>, AppError> {
    let catalog = sqlx::query_as::<_, CatalogEntry>(
        "SELECT id, number FROM modules
         WHERE is_active = TRUE AND mode = $1
         ORDER BY number",
    )
    .bind(track)
    .fetch_all(pool)
    .await?;

    Ok(catalog)
}

/// Loads the ids of modules the user has passed on their track: a passing
/// attempt for quiz users, listen progress at or above the completion
/// threshold for audio users.
pub async fn load_passed_module_ids(
    pool: &PgPool,
    config: &Config,
    user: &User,
) -> Result<HashSet<i64>, AppError> {
    let passed: Vec<i64> = if user.is_audio_track() {
        sqlx::query_scalar(
            "SELECT module_id FROM audio_progress
             WHERE user_id = $1 AND progress_percentage >= $2",
        )
        .bind(user.id)
        .bind(config.audio_completion_threshold)
        .fetch_all(pool)
        .await?
    } else {
        sqlx::query_scalar(
            "SELECT DISTINCT module_id FROM quiz_attempts
             WHERE user_id = $1 AND is_passed = TRUE",
        )
        .bind(user.id)
        .fetch_all(pool)
        .await?
    };

    Ok(passed.into_iter().collect())
}

/// Full snapshot for a user, shared by the progress and certificate handlers.
pub async fn snapshot_for_user(
    pool: &PgPool,
    config: &Config,
    user: &User,
) -> Result<ProgressSnapshot, AppError> {
    let catalog = load_catalog(pool, &user.track).await?;
    let passed = load_passed_module_ids(pool, config, user).await?;
    Ok(compute_snapshot(&catalog, &passed))
}

/// Returns the caller's progress snapshot plus per-track statistics.
pub async fn get_progress(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user = load_user(&pool, &claims).await?;
    let snapshot = snapshot_for_user(&pool, &config, &user).await?;

    let mut response = ProgressResponse {
        track: user.track.clone(),
        snapshot,
        total_quiz_attempts: None,
        average_score: None,
        total_audio_seconds: None,
    };

    if user.is_audio_track() {
        let total_seconds: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(current_time_seconds), 0)::BIGINT
             FROM audio_progress WHERE user_id = $1",
        )
        .bind(user.id)
        .fetch_one(&pool)
        .await?;
        response.total_audio_seconds = Some(total_seconds);
    } else {
        let total_attempts: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM quiz_attempts WHERE user_id = $1")
                .bind(user.id)
                .fetch_one(&pool)
                .await?;

        // Mean over each module's best passing score.
        let average_score: Option<f64> = sqlx::query_scalar(
            r#"
            SELECT AVG(best) FROM (
                SELECT MAX(score) AS best
                FROM quiz_attempts
                WHERE user_id = $1 AND is_passed = TRUE
                GROUP BY module_id
            ) best_scores
            "#,
        )
        .bind(user.id)
        .fetch_one(&pool)
        .await?;

        response.total_quiz_attempts = Some(total_attempts);
        response.average_score = average_score;
    }

    Ok(Json(response))
}
