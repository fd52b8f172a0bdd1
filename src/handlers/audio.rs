// src/handlers/audio.rs

use axum::{Extension, Json, extract::State, response::IntoResponse};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    handlers::auth::load_user,
    models::{
        audio::{AudioProgress, AudioProgressResponse, UpdateAudioProgressRequest},
        module::Module,
    },
    utils::jwt::Claims,
};

/// Records a playback progress event for an audio module (audio track only).
///
/// The stored percentage is merged with GREATEST inside the upsert, so a
/// backward seek updates the playhead but never lowers completion, and
/// duplicate or rapid updates are naturally idempotent. No read-modify-write
/// happens in application code.
pub async fn update_audio_progress(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateAudioProgressRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user = load_user(&pool, &claims).await?;
    if !user.is_audio_track() {
        return Err(AppError::BadRequest(
            "Audio tracking is only available on the audio track".to_string(),
        ));
    }

    let module = sqlx::query_as::<_, Module>(
        "SELECT id, number, title, description, mode, audio_duration_seconds, is_active, created_at
         FROM modules WHERE id = $1 AND is_active = TRUE",
    )
    .bind(payload.module_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Module not found".to_string()))?;

    if !module.is_audio() {
        return Err(AppError::BadRequest(
            "This module has no audio content".to_string(),
        ));
    }

    let progress = sqlx::query_as::<_, AudioProgress>(
        r#"
        INSERT INTO audio_progress (user_id, module_id, progress_percentage, current_time_seconds)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (user_id, module_id) DO UPDATE SET
            progress_percentage = GREATEST(audio_progress.progress_percentage, EXCLUDED.progress_percentage),
            current_time_seconds = EXCLUDED.current_time_seconds,
            last_updated_at = NOW()
        RETURNING id, user_id, module_id, progress_percentage, current_time_seconds, last_updated_at
        "#,
    )
    .bind(user.id)
    .bind(module.id)
    .bind(payload.progress_percentage)
    .bind(payload.current_time_seconds)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to upsert audio progress: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(AudioProgressResponse {
        module_id: module.id,
        progress_percentage: progress.progress_percentage,
        current_time_seconds: progress.current_time_seconds,
        is_completed: progress.progress_percentage >= config.audio_completion_threshold,
    }))
}
