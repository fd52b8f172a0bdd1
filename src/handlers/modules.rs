// src/handlers/modules.rs

use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use sqlx::{FromRow, PgPool, Postgres};

use crate::{
    config::Config,
    error::AppError,
    handlers::auth::load_user,
    models::module::{
        AnswerChoice, Module, ModuleDetailResponse, ModuleStatusEntry, PublicChoice,
        PublicQuestion, QuizQuestion,
    },
    utils::jwt::Claims,
};

const MODULE_COLUMNS: &str =
    "id, number, title, description, mode, audio_duration_seconds, is_active, created_at";

#[derive(Debug, FromRow)]
struct AttemptStats {
    module_id: i64,
    best_score: f64,
    total_attempts: i64,
    passed: bool,
}

#[derive(Debug, FromRow)]
struct AudioStats {
    module_id: i64,
    progress_percentage: f64,
}

/// Lists the caller's catalog (their track only, active modules, ordered by
/// number) together with their per-module status.
pub async fn list_modules(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user = load_user(&pool, &claims).await?;

    let modules = sqlx::query_as::<_, Module>(&format!(
        "SELECT {MODULE_COLUMNS} FROM modules
         WHERE is_active = TRUE AND mode = $1
         ORDER BY number"
    ))
    .bind(&user.track)
    .fetch_all(&pool)
    .await?;

    let entries: Vec<ModuleStatusEntry> = if user.is_audio_track() {
        let stats = sqlx::query_as::<_, AudioStats>(
            "SELECT module_id, progress_percentage FROM audio_progress WHERE user_id = $1",
        )
        .bind(user.id)
        .fetch_all(&pool)
        .await?;
        let by_module: HashMap<i64, AudioStats> =
            stats.into_iter().map(|s| (s.module_id, s)).collect();

        modules
            .into_iter()
            .map(|m| {
                let progress = by_module
                    .get(&m.id)
                    .map(|s| s.progress_percentage)
                    .unwrap_or(0.0);
                ModuleStatusEntry {
                    id: m.id,
                    number: m.number,
                    title: m.title,
                    description: m.description,
                    mode: m.mode,
                    is_completed: progress >= config.audio_completion_threshold,
                    best_score: None,
                    total_attempts: None,
                    progress_percentage: Some(progress),
                }
            })
            .collect()
    } else {
        let stats = sqlx::query_as::<_, AttemptStats>(
            r#"
            SELECT module_id,
                   MAX(score) AS best_score,
                   COUNT(*) AS total_attempts,
                   BOOL_OR(is_passed) AS passed
            FROM quiz_attempts
            WHERE user_id = $1
            GROUP BY module_id
            "#,
        )
        .bind(user.id)
        .fetch_all(&pool)
        .await?;
        let by_module: HashMap<i64, AttemptStats> =
            stats.into_iter().map(|s| (s.module_id, s)).collect();

        modules
            .into_iter()
            .map(|m| {
                let stats = by_module.get(&m.id);
                ModuleStatusEntry {
                    id: m.id,
                    number: m.number,
                    title: m.title,
                    description: m.description,
                    mode: m.mode,
                    is_completed: stats.map(|s| s.passed).unwrap_or(false),
                    best_score: stats.map(|s| s.best_score),
                    total_attempts: Some(stats.map(|s| s.total_attempts).unwrap_or(0)),
                    progress_percentage: None,
                }
            })
            .collect()
    };

    Ok(Json(entries))
}

/// Module detail with its quiz questions in public form (correct flags and
/// explanations stripped).
pub async fn get_module(
    State(pool): State<PgPool>,
    Path(module_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let module = sqlx::query_as::<_, Module>(&format!(
        "SELECT {MODULE_COLUMNS} FROM modules WHERE id = $1 AND is_active = TRUE"
    ))
    .bind(module_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Module not found".to_string()))?;

    let questions = sqlx::query_as::<_, QuizQuestion>(
        r#"
        SELECT id, module_id, position, question_type, question_text, explanation, points, is_active
        FROM quiz_questions
        WHERE module_id = $1 AND is_active = TRUE
        ORDER BY position
        "#,
    )
    .bind(module.id)
    .fetch_all(&pool)
    .await?;

    let mut public_questions: Vec<PublicQuestion> = questions
        .into_iter()
        .map(|q| PublicQuestion {
            id: q.id,
            position: q.position,
            question_type: q.question_type,
            question_text: q.question_text,
            points: q.points,
            choices: Vec::new(),
        })
        .collect();

    if !public_questions.is_empty() {
        let mut query_builder = sqlx::QueryBuilder::<Postgres>::new(
            "SELECT id, question_id, position, choice_text, is_correct
             FROM answer_choices WHERE question_id IN (",
        );
        let mut separated = query_builder.separated(",");
        for q in &public_questions {
            separated.push_bind(q.id);
        }
        separated.push_unseparated(") ORDER BY question_id, position");

        let choices: Vec<AnswerChoice> = query_builder.build_query_as().fetch_all(&pool).await?;

        let mut by_question: HashMap<i64, &mut PublicQuestion> =
            public_questions.iter_mut().map(|q| (q.id, q)).collect();
        for choice in choices {
            if let Some(question) = by_question.get_mut(&choice.question_id) {
                question.choices.push(PublicChoice {
                    id: choice.id,
                    position: choice.position,
                    choice_text: choice.choice_text,
                });
            }
        }
    }

    Ok(Json(ModuleDetailResponse {
        module,
        questions: public_questions,
    }))
}
