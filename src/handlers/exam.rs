// src/handlers/exam.rs

use std::collections::{HashMap, HashSet};

use axum::{
    Extension, Json,
    extract::{Query, State},
};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        attempt::{ListAttemptParams, QuizAttempt, StartAttemptRequest, SubmitAnswersRequest,
            UserAnswer},
        enums::AnswerOption,
    },
    response::ApiResponse,
    utils::jwt::Claims,
};

/// Lists attempts: all of them, or the single attempt for
/// `?user=&quiz_set=` when both filters are given.
pub async fn list_attempts(
    State(pool): State<PgPool>,
    Query(params): Query<ListAttemptParams>,
) -> Result<ApiResponse, AppError> {
    if let (Some(user), Some(quiz_set)) = (params.user, params.quiz_set) {
        let attempt = sqlx::query_as::<_, QuizAttempt>(
            r#"
            SELECT id, user_id, quiz_set_id, start_at, end_at, is_submitted
            FROM quiz_attempts
            WHERE user_id = $1 AND quiz_set_id = $2
            "#,
        )
        .bind(user)
        .bind(quiz_set)
        .fetch_optional(&pool)
        .await?;

        return Ok(ApiResponse::ok(attempt));
    }

    let attempts = sqlx::query_as::<_, QuizAttempt>(
        r#"
        SELECT id, user_id, quiz_set_id, start_at, end_at, is_submitted
        FROM quiz_attempts
        ORDER BY start_at DESC
        "#,
    )
    .fetch_all(&pool)
    .await?;

    Ok(ApiResponse::ok(attempts))
}

/// Starts a quiz attempt for the authenticated user.
///
/// One attempt per (user, quiz set): a second start is refused with a
/// 406. Races between concurrent starts fall through to the unique
/// constraint and get the same answer.
pub async fn start_attempt(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<StartAttemptRequest>,
) -> Result<ApiResponse, AppError> {
    let user_id = claims.user_id()?;

    // A token can outlive its user (admins delete by username).
    let user_exists = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&pool)
        .await?;

    if user_exists.is_none() {
        return Err(AppError::NotFound("User does not exist".to_string()));
    }

    let set_exists = sqlx::query_scalar::<_, i64>("SELECT id FROM quiz_sets WHERE id = $1")
        .bind(payload.quiz_set)
        .fetch_optional(&pool)
        .await?;

    if set_exists.is_none() {
        return Err(AppError::NotFound("QuizSet does not exist".to_string()));
    }

    let already = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM quiz_attempts WHERE user_id = $1 AND quiz_set_id = $2",
    )
    .bind(user_id)
    .bind(payload.quiz_set)
    .fetch_optional(&pool)
    .await?;

    if already.is_some() {
        return Err(AppError::NotAcceptable(
            "You have already attempted this quiz set.".to_string(),
        ));
    }

    let attempt = sqlx::query_as::<_, QuizAttempt>(
        r#"
        INSERT INTO quiz_attempts (user_id, quiz_set_id, start_at, is_submitted)
        VALUES ($1, $2, NOW(), FALSE)
        RETURNING id, user_id, quiz_set_id, start_at, end_at, is_submitted
        "#,
    )
    .bind(user_id)
    .bind(payload.quiz_set)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if e.to_string().contains("unique constraint") || e.to_string().contains("23505") {
            AppError::NotAcceptable("You have already attempted this quiz set.".to_string())
        } else {
            tracing::error!("Failed to start attempt: {:?}", e);
            AppError::from(e)
        }
    })?;

    Ok(ApiResponse::created(attempt).with_message("Attempt started"))
}

/// Lists all stored answers.
pub async fn list_answers(State(pool): State<PgPool>) -> Result<ApiResponse, AppError> {
    let answers = sqlx::query_as::<_, UserAnswer>(
        r#"
        SELECT id, attempt_id, question_id, submitted_option, is_correct
        FROM user_answers
        ORDER BY id
        "#,
    )
    .fetch_all(&pool)
    .await?;

    Ok(ApiResponse::ok(answers))
}

/// Submits the answers for an attempt and finalizes it.
///
/// Inserting the answer rows (with correctness computed against the
/// stored correct options) and marking the attempt submitted happen in
/// one transaction; any failure rolls everything back.
pub async fn submit_answers(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SubmitAnswersRequest>,
) -> Result<ApiResponse, AppError> {
    payload.validate()?;

    let user_id = claims.user_id()?;

    let attempt = sqlx::query_as::<_, QuizAttempt>(
        r#"
        SELECT id, user_id, quiz_set_id, start_at, end_at, is_submitted
        FROM quiz_attempts
        WHERE id = $1
        "#,
    )
    .bind(payload.attempt)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Attempt not found".to_string()))?;

    if attempt.user_id != user_id && !claims.is_admin() {
        return Err(AppError::Forbidden(
            "This attempt belongs to another user".to_string(),
        ));
    }

    if attempt.is_submitted {
        return Err(AppError::NotAcceptable(
            "This attempt was already submitted.".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for answer in &payload.answers {
        if !seen.insert(answer.question) {
            return Err(AppError::NotAcceptable(format!(
                "Duplicate answer for question '{}'.",
                answer.question
            )));
        }
    }

    let question_ids: Vec<i64> = payload.answers.iter().map(|a| a.question).collect();

    let mut tx = pool.begin().await?;

    let keys = sqlx::query_as::<_, (i64, AnswerOption)>(
        "SELECT id, correct_option FROM questions WHERE id = ANY($1)",
    )
    .bind(&question_ids)
    .fetch_all(&mut *tx)
    .await?;

    let key_map: HashMap<i64, AnswerOption> = keys.into_iter().collect();

    for answer in &payload.answers {
        let correct = key_map.get(&answer.question).ok_or_else(|| {
            AppError::NotFound(format!("Question '{}' does not exist.", answer.question))
        })?;

        let is_correct = answer.selected_option == *correct;

        sqlx::query(
            r#"
            INSERT INTO user_answers (attempt_id, question_id, submitted_option, is_correct)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(attempt.id)
        .bind(answer.question)
        .bind(answer.selected_option)
        .bind(is_correct)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if e.to_string().contains("unique constraint") || e.to_string().contains("23505") {
                AppError::NotAcceptable(format!(
                    "An answer for question '{}' was already recorded.",
                    answer.question
                ))
            } else {
                tracing::error!("Failed to record answer: {:?}", e);
                AppError::from(e)
            }
        })?;
    }

    sqlx::query("UPDATE quiz_attempts SET is_submitted = TRUE, end_at = NOW() WHERE id = $1")
        .bind(attempt.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(ApiResponse::ok(()).with_message("saved quiz answers"))
}
