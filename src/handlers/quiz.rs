// src/handlers/quiz.rs

use std::collections::{HashMap, HashSet};

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{PgPool, Postgres, types::Json as SqlJson};
use validator::Validate;

use crate::{
    config::PASSING_SCORE_PERCENTAGE,
    error::{AppError, is_unique_violation},
    handlers::auth::load_user,
    models::{
        attempt::{AnswerRecord, QuizAttempt, QuizResultResponse, SubmitQuizRequest, SubmittedAnswer},
        module::{AnswerChoice, Module, QuizQuestion},
    },
    utils::jwt::Claims,
};

const ATTEMPT_COLUMNS: &str = "id, user_id, module_id, attempt_number, score, \
     total_questions, correct_answers, is_passed, started_at, submitted_at";

/// Answer key for one question, prefetched from the catalog so scoring itself
/// touches no storage.
#[derive(Debug, Clone)]
pub struct QuestionKey {
    pub id: i64,
    pub question_type: String,
    pub points: i64,
    pub choice_ids: HashSet<i64>,
    pub correct_choice_ids: HashSet<i64>,
}

#[derive(Debug)]
pub struct ScoredAnswer {
    pub question_id: i64,
    pub selected_choice_ids: Vec<i64>,
    pub is_correct: bool,
    pub points_earned: f64,
}

#[derive(Debug)]
pub struct ScoredSubmission {
    pub score: f64,
    pub correct_answers: i64,
    pub total_questions: i64,
    pub is_passed: bool,
    pub answers: Vec<ScoredAnswer>,
}

/// Rounds to one decimal place, half away from zero (half-up for scores,
/// which are never negative).
fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Validates and scores a submission against the module's answer keys.
///
/// A question earns its full points iff the selected choice set equals the
/// correct choice set exactly; there is no partial credit. Every question in
/// the module counts toward the achievable total, answered or not.
pub fn score_submission(
    questions: &[QuestionKey],
    answers: &[SubmittedAnswer],
) -> Result<ScoredSubmission, AppError> {
    if questions.is_empty() {
        return Err(AppError::BadRequest(
            "Module has no quiz questions".to_string(),
        ));
    }

    let by_id: HashMap<i64, &QuestionKey> = questions.iter().map(|q| (q.id, q)).collect();

    let mut seen: HashSet<i64> = HashSet::new();
    let mut correct_answers = 0i64;
    let mut points_earned_total = 0i64;
    let mut scored = Vec::with_capacity(answers.len());

    for answer in answers {
        let question = by_id.get(&answer.question_id).ok_or_else(|| {
            AppError::BadRequest(format!(
                "Question {} does not belong to this module",
                answer.question_id
            ))
        })?;

        if !seen.insert(answer.question_id) {
            return Err(AppError::BadRequest(format!(
                "Question {} answered more than once",
                answer.question_id
            )));
        }

        if question.question_type == "SINGLE" && answer.selected_choice_ids.len() > 1 {
            return Err(AppError::BadRequest(format!(
                "Question {} accepts a single choice",
                answer.question_id
            )));
        }

        for choice_id in &answer.selected_choice_ids {
            if !question.choice_ids.contains(choice_id) {
                return Err(AppError::BadRequest(format!(
                    "Choice {} does not belong to question {}",
                    choice_id, answer.question_id
                )));
            }
        }

        let selected: HashSet<i64> = answer.selected_choice_ids.iter().copied().collect();
        let is_correct = selected == question.correct_choice_ids;
        let points_earned = if is_correct { question.points } else { 0 };

        if is_correct {
            correct_answers += 1;
        }
        points_earned_total += points_earned;

        scored.push(ScoredAnswer {
            question_id: answer.question_id,
            selected_choice_ids: answer.selected_choice_ids.clone(),
            is_correct,
            points_earned: points_earned as f64,
        });
    }

    let achievable: i64 = questions.iter().map(|q| q.points).sum();
    let score = if achievable > 0 {
        round_one_decimal(points_earned_total as f64 / achievable as f64 * 100.0)
    } else {
        0.0
    };

    Ok(ScoredSubmission {
        score,
        correct_answers,
        total_questions: questions.len() as i64,
        is_passed: score >= PASSING_SCORE_PERCENTAGE,
        answers: scored,
    })
}

/// Loads the active questions and answer keys for a module.
async fn load_question_keys(pool: &PgPool, module_id: i64) -> Result<Vec<QuestionKey>, AppError> {
    let questions = sqlx::query_as::<_, QuizQuestion>(
        r#"
        SELECT id, module_id, position, question_type, question_text, explanation, points, is_active
        FROM quiz_questions
        WHERE module_id = $1 AND is_active = TRUE
        ORDER BY position
        "#,
    )
    .bind(module_id)
    .fetch_all(pool)
    .await?;

    if questions.is_empty() {
        return Ok(Vec::new());
    }

    // Dynamic IN clause for the choice fetch
    let mut query_builder = sqlx::QueryBuilder::<Postgres>::new(
        "SELECT id, question_id, position, choice_text, is_correct
         FROM answer_choices WHERE question_id IN (",
    );

    let mut separated = query_builder.separated(",");
    for q in &questions {
        separated.push_bind(q.id);
    }
    separated.push_unseparated(")");

    let choices: Vec<AnswerChoice> = query_builder.build_query_as().fetch_all(pool).await?;

    let mut keys: Vec<QuestionKey> = questions
        .into_iter()
        .map(|q| QuestionKey {
            id: q.id,
            question_type: q.question_type,
            points: q.points,
            choice_ids: HashSet::new(),
            correct_choice_ids: HashSet::new(),
        })
        .collect();

    let mut by_id: HashMap<i64, &mut QuestionKey> = keys.iter_mut().map(|k| (k.id, k)).collect();
    for choice in choices {
        if let Some(key) = by_id.get_mut(&choice.question_id) {
            key.choice_ids.insert(choice.id);
            if choice.is_correct {
                key.correct_choice_ids.insert(choice.id);
            }
        }
    }

    Ok(keys)
}

/// Submits and scores a quiz attempt for a module (text track only).
///
/// The attempt number is assigned inside the insert itself, guarded by the
/// unique (user, module, attempt_number) key; a concurrent submission for the
/// same key makes the insert fail with a unique violation and we retry. The
/// attempt and its answer records land in one transaction.
pub async fn submit_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SubmitQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user = load_user(&pool, &claims).await?;
    if user.is_audio_track() {
        return Err(AppError::BadRequest(
            "Quizzes are only available on the text track".to_string(),
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

    let keys = load_question_keys(&pool, module.id).await?;
    let result = score_submission(&keys, &payload.answers)?;

    let insert_sql = format!(
        r#"
        INSERT INTO quiz_attempts
            (user_id, module_id, attempt_number, score, total_questions,
             correct_answers, is_passed, started_at)
        SELECT $1, $2, COALESCE(MAX(attempt_number), 0) + 1, $3, $4, $5, $6, $7
        FROM quiz_attempts
        WHERE user_id = $1 AND module_id = $2
        RETURNING {ATTEMPT_COLUMNS}
        "#
    );

    // Retry the transaction a few times: losing the attempt-number race is
    // the only expected unique violation here.
    let mut tries = 0;
    let (attempt, records) = loop {
        tries += 1;
        let mut tx = pool.begin().await?;

        let inserted = sqlx::query_as::<_, QuizAttempt>(&insert_sql)
            .bind(user.id)
            .bind(module.id)
            .bind(result.score)
            .bind(result.total_questions)
            .bind(result.correct_answers)
            .bind(result.is_passed)
            .bind(payload.started_at)
            .fetch_one(&mut *tx)
            .await;

        match inserted {
            Ok(attempt) => {
                let mut records = Vec::with_capacity(result.answers.len());
                for answer in &result.answers {
                    let record = sqlx::query_as::<_, AnswerRecord>(
                        r#"
                        INSERT INTO quiz_answers
                            (attempt_id, question_id, selected_choice_ids, is_correct, points_earned)
                        VALUES ($1, $2, $3, $4, $5)
                        RETURNING id, attempt_id, question_id, selected_choice_ids, is_correct, points_earned
                        "#,
                    )
                    .bind(attempt.id)
                    .bind(answer.question_id)
                    .bind(SqlJson(answer.selected_choice_ids.clone()))
                    .bind(answer.is_correct)
                    .bind(answer.points_earned)
                    .fetch_one(&mut *tx)
                    .await?;
                    records.push(record);
                }
                tx.commit().await?;
                break (attempt, records);
            }
            Err(e) if is_unique_violation(&e) && tries < 3 => {
                tx.rollback().await?;
                tracing::debug!(
                    "Attempt number race for user {} module {}, retrying",
                    user.id,
                    module.id
                );
                continue;
            }
            Err(e) => {
                tracing::error!("Failed to insert quiz attempt: {:?}", e);
                return Err(AppError::from(e));
            }
        }
    };

    let message = if result.is_passed {
        format!(
            "Congratulations! You passed the quiz with {:.1}%",
            attempt.score
        )
    } else {
        format!(
            "Score: {:.1}%. You need {:.0}% to pass this module. You can try again.",
            attempt.score, PASSING_SCORE_PERCENTAGE
        )
    };

    let passed = attempt.is_passed;
    Ok((
        StatusCode::CREATED,
        Json(QuizResultResponse {
            attempt,
            module_number: module.number,
            module_title: module.title,
            answers: records,
            passed,
            message,
        }),
    ))
}

/// Lists all of the caller's attempts, newest first.
pub async fn list_attempts(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let attempts = sqlx::query_as::<_, QuizAttempt>(&format!(
        "SELECT {ATTEMPT_COLUMNS} FROM quiz_attempts
         WHERE user_id = $1 ORDER BY submitted_at DESC"
    ))
    .bind(claims.user_id())
    .fetch_all(&pool)
    .await?;

    Ok(Json(attempts))
}

/// Lists the caller's attempts for one module, newest first.
pub async fn list_module_attempts(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(module_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let attempts = sqlx::query_as::<_, QuizAttempt>(&format!(
        "SELECT {ATTEMPT_COLUMNS} FROM quiz_attempts
         WHERE user_id = $1 AND module_id = $2 ORDER BY attempt_number DESC"
    ))
    .bind(claims.user_id())
    .bind(module_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(attempts))
}

/// Returns the caller's best attempt for a module.
pub async fn best_attempt(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(module_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let attempt = sqlx::query_as::<_, QuizAttempt>(&format!(
        "SELECT {ATTEMPT_COLUMNS} FROM quiz_attempts
         WHERE user_id = $1 AND module_id = $2
         ORDER BY score DESC, submitted_at DESC
         LIMIT 1"
    ))
    .bind(claims.user_id())
    .bind(module_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound(
        "No attempt found for this module".to_string(),
    ))?;

    Ok(Json(attempt))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(id: i64, question_type: &str, points: i64, choices: &[i64], correct: &[i64]) -> QuestionKey {
        QuestionKey {
            id,
            question_type: question_type.to_string(),
            points,
            choice_ids: choices.iter().copied().collect(),
            correct_choice_ids: correct.iter().copied().collect(),
        }
    }

    fn answer(question_id: i64, selected: &[i64]) -> SubmittedAnswer {
        SubmittedAnswer {
            question_id,
            selected_choice_ids: selected.to_vec(),
        }
    }

    #[test]
    fn test_single_question_correct_scores_full() {
        let questions = vec![key(1, "SINGLE", 1, &[1, 2, 3], &[2])];
        let result = score_submission(&questions, &[answer(1, &[2])]).unwrap();
        assert_eq!(result.score, 100.0);
        assert!(result.is_passed);
        assert_eq!(result.correct_answers, 1);
    }

    #[test]
    fn test_single_question_wrong_scores_zero() {
        let questions = vec![key(1, "SINGLE", 1, &[1, 2, 3], &[2])];
        let result = score_submission(&questions, &[answer(1, &[1])]).unwrap();
        assert_eq!(result.score, 0.0);
        assert!(!result.is_passed);
        assert_eq!(result.correct_answers, 0);
    }

    #[test]
    fn test_multiple_choice_requires_exact_set() {
        let questions = vec![key(1, "MULTIPLE", 2, &[1, 2, 3, 4], &[1, 3])];

        // Order-independent set equality.
        let full = score_submission(&questions, &[answer(1, &[3, 1])]).unwrap();
        assert_eq!(full.score, 100.0);

        // Subset of the correct set gets no partial credit.
        let partial = score_submission(&questions, &[answer(1, &[1])]).unwrap();
        assert_eq!(partial.score, 0.0);

        // Superset does not either.
        let superset = score_submission(&questions, &[answer(1, &[1, 3, 4])]).unwrap();
        assert_eq!(superset.score, 0.0);
    }

    #[test]
    fn test_weighted_points_and_rounding() {
        // 1 of 3 points earned: 33.333...% rounds to 33.3.
        let questions = vec![
            key(1, "SINGLE", 1, &[1, 2], &[1]),
            key(2, "SINGLE", 2, &[3, 4], &[3]),
        ];
        let result = score_submission(&questions, &[answer(1, &[1]), answer(2, &[4])]).unwrap();
        assert_eq!(result.score, 33.3);

        // 2 of 3 points: 66.666...% rounds to 66.7.
        let result = score_submission(&questions, &[answer(1, &[2]), answer(2, &[3])]).unwrap();
        assert_eq!(result.score, 66.7);
    }

    #[test]
    fn test_unanswered_questions_count_in_denominator() {
        let questions = vec![
            key(1, "SINGLE", 1, &[1, 2], &[1]),
            key(2, "SINGLE", 1, &[3, 4], &[3]),
        ];
        let result = score_submission(&questions, &[answer(1, &[1])]).unwrap();
        assert_eq!(result.score, 50.0);
        assert_eq!(result.total_questions, 2);
    }

    #[test]
    fn test_pass_threshold_is_eighty() {
        let questions: Vec<QuestionKey> = (1..=5)
            .map(|i| key(i, "SINGLE", 1, &[i * 10, i * 10 + 1], &[i * 10]))
            .collect();

        // 4/5 correct = 80.0, exactly at the threshold.
        let answers: Vec<SubmittedAnswer> = (1..=5)
            .map(|i| {
                let pick = if i < 5 { i * 10 } else { i * 10 + 1 };
                answer(i, &[pick])
            })
            .collect();
        let result = score_submission(&questions, &answers).unwrap();
        assert_eq!(result.score, 80.0);
        assert!(result.is_passed);

        // 3/5 correct = 60.0, below it.
        let answers: Vec<SubmittedAnswer> = (1..=5)
            .map(|i| {
                let pick = if i < 4 { i * 10 } else { i * 10 + 1 };
                answer(i, &[pick])
            })
            .collect();
        let result = score_submission(&questions, &answers).unwrap();
        assert_eq!(result.score, 60.0);
        assert!(!result.is_passed);
    }

    #[test]
    fn test_rejects_question_from_other_module() {
        let questions = vec![key(1, "SINGLE", 1, &[1, 2], &[1])];
        let err = score_submission(&questions, &[answer(99, &[1])]).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_rejects_multiple_selections_on_single_question() {
        let questions = vec![key(1, "SINGLE", 1, &[1, 2], &[1])];
        let err = score_submission(&questions, &[answer(1, &[1, 2])]).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_rejects_foreign_choice() {
        let questions = vec![key(1, "MULTIPLE", 1, &[1, 2], &[1])];
        let err = score_submission(&questions, &[answer(1, &[7])]).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_rejects_duplicate_answer() {
        let questions = vec![key(1, "SINGLE", 1, &[1, 2], &[1])];
        let err = score_submission(&questions, &[answer(1, &[1]), answer(1, &[2])]).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_rejects_module_without_questions() {
        let err = score_submission(&[], &[answer(1, &[1])]).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_round_one_decimal_half_up() {
        // .25 halves are exactly representable, so the half-up behavior is
        // observable without binary rounding noise.
        assert_eq!(round_one_decimal(99.25), 99.3);
        assert_eq!(round_one_decimal(0.25), 0.3);
        assert_eq!(round_one_decimal(87.44), 87.4);
        assert_eq!(round_one_decimal(100.0), 100.0);
    }
}
