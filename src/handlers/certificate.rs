// src/handlers/certificate.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    config::{Config, VERIFICATION_CODE_LENGTH},
    error::{AppError, is_unique_violation},
    handlers::{auth::load_user, progress::snapshot_for_user},
    models::{
        certificate::{Certificate, CertificateRequest, PublicCertificateView, VerificationResponse},
        user::User,
    },
    utils::{code::generate_verification_code, jwt::Claims},
};

const CERTIFICATE_COLUMNS: &str =
    "id, user_id, verification_code, full_name, completion_date, total_modules_completed, average_score";

async fn find_certificate_for_user(
    pool: &PgPool,
    user_id: i64,
) -> Result<Option<Certificate>, AppError> {
    let certificate = sqlx::query_as::<_, Certificate>(&format!(
        "SELECT {CERTIFICATE_COLUMNS} FROM certificates WHERE user_id = $1"
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(certificate)
}

/// Mean of the user's best passing score per module. None when the user has
/// no passing attempts at all, i.e. the audio track.
async fn average_best_passing_score(pool: &PgPool, user: &User) -> Result<Option<f64>, AppError> {
    if user.is_audio_track() {
        return Ok(None);
    }

    let average: Option<f64> = sqlx::query_scalar(
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
    .fetch_one(pool)
    .await?;

    Ok(average)
}

/// Requests a completion certificate.
///
/// Idempotent: an existing certificate is returned unchanged. Otherwise the
/// user must have completed every module of their track; the row is created
/// with `ON CONFLICT (user_id) DO NOTHING`, so of two concurrent requests
/// exactly one inserts and the other observes the winning row. A clash on the
/// verification code regenerates and retries.
pub async fn request_certificate(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CertificateRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user = load_user(&pool, &claims).await?;

    if let Some(existing) = find_certificate_for_user(&pool, user.id).await? {
        return Ok((
            StatusCode::OK,
            Json(json!({
                "message": "You already have a valid certificate",
                "certificate": existing,
            })),
        ));
    }

    let snapshot = snapshot_for_user(&pool, &config, &user).await?;
    if !snapshot.can_get_certificate {
        return Err(AppError::NotEligible(format!(
            "Not all modules are completed yet ({}/{} done)",
            snapshot.completed_modules, snapshot.total_modules
        )));
    }

    let average_score = average_best_passing_score(&pool, &user).await?;

    let insert_sql = format!(
        r#"
        INSERT INTO certificates
            (user_id, verification_code, full_name, total_modules_completed, average_score)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (user_id) DO NOTHING
        RETURNING {CERTIFICATE_COLUMNS}
        "#
    );

    let mut tries = 0;
    let (certificate, created) = loop {
        tries += 1;
        let code = generate_verification_code(VERIFICATION_CODE_LENGTH);

        let inserted = sqlx::query_as::<_, Certificate>(&insert_sql)
            .bind(user.id)
            .bind(&code)
            .bind(&payload.full_name)
            .bind(snapshot.completed_modules)
            .bind(average_score)
            .fetch_optional(&pool)
            .await;

        match inserted {
            Ok(Some(certificate)) => break (certificate, true),
            Ok(None) => {
                // Lost the insert race: another request already created the
                // row. Return it instead of surfacing a conflict.
                let existing = find_certificate_for_user(&pool, user.id)
                    .await?
                    .ok_or_else(|| {
                        AppError::InternalServerError(
                            "Certificate insert raced but no row found".to_string(),
                        )
                    })?;
                break (existing, false);
            }
            Err(e) if is_unique_violation(&e) && tries < 5 => {
                // Verification code collision; draw another one.
                tracing::warn!("Verification code collision, regenerating");
                continue;
            }
            Err(e) => {
                tracing::error!("Failed to insert certificate: {:?}", e);
                return Err(AppError::from(e));
            }
        }
    };

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((
        status,
        Json(json!({
            "message": "Certificate issued successfully",
            "certificate": certificate,
        })),
    ))
}

/// Returns the caller's own certificate.
pub async fn get_my_certificate(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let certificate = find_certificate_for_user(&pool, claims.user_id())
        .await?
        .ok_or(AppError::NotFound("No certificate issued yet".to_string()))?;

    Ok(Json(certificate))
}

/// Public, unauthenticated certificate verification.
///
/// Unknown codes answer 200 with `is_valid: false` and nothing else, so the
/// response shape never hints whether a similar code exists.
pub async fn verify_certificate(
    State(pool): State<PgPool>,
    Path(verification_code): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let certificate = sqlx::query_as::<_, Certificate>(&format!(
        "SELECT {CERTIFICATE_COLUMNS} FROM certificates WHERE verification_code = $1"
    ))
    .bind(&verification_code)
    .fetch_optional(&pool)
    .await?;

    let response = match certificate {
        Some(certificate) => VerificationResponse {
            is_valid: true,
            certificate: Some(PublicCertificateView::from(certificate)),
        },
        None => VerificationResponse {
            is_valid: false,
            certificate: None,
        },
    };

    Ok(Json(response))
}
