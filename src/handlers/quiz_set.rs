// src/handlers/quiz_set.rs

use axum::{
    Extension, Json,
    extract::{Query, State},
};
use sqlx::{PgPool, Postgres, Transaction};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        enums::{Difficulty, SetType},
        question::{PublicQuestion, Question},
        quiz_set::{
            ListQuizSetParams, QuizSetDetails, QuizSetLookupRequest, QuizSetRequest,
            QuizSetSummary,
        },
    },
    response::ApiResponse,
    utils::jwt::Claims,
};

use super::topic::IdParam;

/// Verifies that every submitted question exists, belongs to the set's
/// topic and carries the set's difficulty. The first offending question
/// aborts with a descriptive error naming it.
async fn check_set_questions(
    tx: &mut Transaction<'_, Postgres>,
    topic_id: i64,
    difficulty: Difficulty,
    question_ids: &[i64],
) -> Result<(), AppError> {
    let found = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, question_text, option_a, option_b, option_c, option_d,
               correct_option, topic_id, difficulty_level
        FROM questions
        WHERE id = ANY($1)
        "#,
    )
    .bind(question_ids)
    .fetch_all(&mut **tx)
    .await?;

    for id in question_ids {
        let question = found
            .iter()
            .find(|q| q.id == *id)
            .ok_or_else(|| AppError::NotFound(format!("Question '{}' does not exist.", id)))?;

        if question.topic_id != topic_id {
            return Err(AppError::NotAcceptable(format!(
                "Question '{}' does not belong to the quiz set's topic.",
                question.id
            )));
        }

        if question.difficulty_level != difficulty {
            return Err(AppError::NotAcceptable(format!(
                "Question '{}' has difficulty '{}', expected '{}'.",
                question.id,
                question.difficulty_level.as_str(),
                difficulty.as_str()
            )));
        }
    }

    Ok(())
}

async fn check_topic_exists(
    tx: &mut Transaction<'_, Postgres>,
    topic_id: i64,
) -> Result<(), AppError> {
    let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM topics WHERE id = $1")
        .bind(topic_id)
        .fetch_optional(&mut **tx)
        .await?;

    if exists.is_none() {
        return Err(AppError::NotFound(format!(
            "The topic '{}' does not exist.",
            topic_id
        )));
    }
    Ok(())
}

/// Lists quiz sets, optionally filtered by id and difficulty.
/// With `?detail=true` each set carries its questions (answers hidden).
pub async fn list_quiz_sets(
    State(pool): State<PgPool>,
    Query(params): Query<ListQuizSetParams>,
) -> Result<ApiResponse, AppError> {
    let summaries = sqlx::query_as::<_, QuizSetSummary>(
        r#"
        SELECT qs.id, qs.topic_id, t.name AS topic_name, qs.difficulty_level,
               qs.set_type, qs.total_time,
               COUNT(qsq.question_id) AS question_count
        FROM quiz_sets qs
        JOIN topics t ON t.id = qs.topic_id
        LEFT JOIN quiz_set_questions qsq ON qsq.quiz_set_id = qs.id
        WHERE ($1::BIGINT IS NULL OR qs.id = $1)
          AND ($2::TEXT IS NULL OR qs.difficulty_level = $2)
        GROUP BY qs.id, t.name
        ORDER BY t.name, qs.difficulty_level, qs.set_type
        "#,
    )
    .bind(params.id)
    .bind(params.difficulty.map(|d| d.as_str()))
    .fetch_all(&pool)
    .await?;

    if !params.detail.unwrap_or(false) {
        return Ok(ApiResponse::ok(summaries));
    }

    let mut detailed = Vec::with_capacity(summaries.len());
    for summary in summaries {
        let questions = sqlx::query_as::<_, PublicQuestion>(
            r#"
            SELECT q.id, q.question_text, q.option_a, q.option_b, q.option_c,
                   q.option_d, q.difficulty_level
            FROM questions q
            JOIN quiz_set_questions qsq ON qsq.question_id = q.id
            WHERE qsq.quiz_set_id = $1
            ORDER BY q.id
            "#,
        )
        .bind(summary.id)
        .fetch_all(&pool)
        .await?;

        detailed.push(QuizSetDetails {
            id: summary.id,
            topic_id: summary.topic_id,
            topic_name: summary.topic_name,
            difficulty_level: summary.difficulty_level,
            set_type: summary.set_type,
            total_time: summary.total_time,
            questions,
        });
    }

    Ok(ApiResponse::ok(detailed))
}

/// Creates a quiz set.
///
/// The set is unique per (topic, set type, difficulty). `total_time`
/// is derived from the difficulty, never taken from the client.
pub async fn create_quiz_set(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<QuizSetRequest>,
) -> Result<ApiResponse, AppError> {
    payload.validate()?;

    let created_by = claims.user_id()?;
    let mut tx = pool.begin().await?;

    check_topic_exists(&mut tx, payload.topic).await?;

    let duplicate = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT id FROM quiz_sets
        WHERE topic_id = $1 AND set_type = $2 AND difficulty_level = $3
        "#,
    )
    .bind(payload.topic)
    .bind(payload.set_type)
    .bind(payload.difficulty_level)
    .fetch_optional(&mut *tx)
    .await?;

    if duplicate.is_some() {
        return Err(AppError::NotAcceptable(format!(
            "A quiz set for this topic with set type '{}' and difficulty '{}' already exists.",
            payload.set_type.as_str(),
            payload.difficulty_level.as_str()
        )));
    }

    check_set_questions(&mut tx, payload.topic, payload.difficulty_level, &payload.questions)
        .await?;

    let set_id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO quiz_sets (topic_id, difficulty_level, set_type, total_time, created_by)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(payload.topic)
    .bind(payload.difficulty_level)
    .bind(payload.set_type)
    .bind(payload.difficulty_level.total_time_minutes())
    .bind(created_by)
    .fetch_one(&mut *tx)
    .await?;

    for question_id in &payload.questions {
        sqlx::query("INSERT INTO quiz_set_questions (quiz_set_id, question_id) VALUES ($1, $2)")
            .bind(set_id)
            .bind(question_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    Ok(ApiResponse::created(serde_json::json!({"id": set_id}))
        .with_message("Quiz set created successfully"))
}

/// Updates a quiz set: same validation as create, question links are
/// replaced atomically and total_time is re-derived from the (possibly
/// changed) difficulty.
pub async fn update_quiz_set(
    State(pool): State<PgPool>,
    Query(params): Query<IdParam>,
    Json(payload): Json<QuizSetRequest>,
) -> Result<ApiResponse, AppError> {
    payload.validate()?;

    let set_id = params.id.unwrap_or(0);
    if set_id == 0 {
        return Err(AppError::NotAcceptable(
            "Please select a quiz set Id".to_string(),
        ));
    }

    let mut tx = pool.begin().await?;

    let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM quiz_sets WHERE id = $1")
        .bind(set_id)
        .fetch_optional(&mut *tx)
        .await?;

    if exists.is_none() {
        return Err(AppError::NotFound("Quiz set not found".to_string()));
    }

    check_topic_exists(&mut tx, payload.topic).await?;

    let duplicate = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT id FROM quiz_sets
        WHERE topic_id = $1 AND set_type = $2 AND difficulty_level = $3 AND id <> $4
        "#,
    )
    .bind(payload.topic)
    .bind(payload.set_type)
    .bind(payload.difficulty_level)
    .bind(set_id)
    .fetch_optional(&mut *tx)
    .await?;

    if duplicate.is_some() {
        return Err(AppError::NotAcceptable(format!(
            "A quiz set for this topic with set type '{}' and difficulty '{}' already exists.",
            payload.set_type.as_str(),
            payload.difficulty_level.as_str()
        )));
    }

    check_set_questions(&mut tx, payload.topic, payload.difficulty_level, &payload.questions)
        .await?;

    sqlx::query(
        r#"
        UPDATE quiz_sets
        SET topic_id = $1, difficulty_level = $2, set_type = $3, total_time = $4
        WHERE id = $5
        "#,
    )
    .bind(payload.topic)
    .bind(payload.difficulty_level)
    .bind(payload.set_type)
    .bind(payload.difficulty_level.total_time_minutes())
    .bind(set_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM quiz_set_questions WHERE quiz_set_id = $1")
        .bind(set_id)
        .execute(&mut *tx)
        .await?;

    for question_id in &payload.questions {
        sqlx::query("INSERT INTO quiz_set_questions (quiz_set_id, question_id) VALUES ($1, $2)")
            .bind(set_id)
            .bind(question_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    Ok(ApiResponse::ok(()).with_message("Quiz set updated successfully"))
}

/// Deletes a quiz set by id.
pub async fn delete_quiz_set(
    State(pool): State<PgPool>,
    Query(params): Query<IdParam>,
) -> Result<ApiResponse, AppError> {
    let set_id = params.id.unwrap_or(0);
    if set_id == 0 {
        return Err(AppError::NotAcceptable(
            "Please select a quiz set Id".to_string(),
        ));
    }

    let result = sqlx::query("DELETE FROM quiz_sets WHERE id = $1")
        .bind(set_id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Quiz set not found".to_string()));
    }

    Ok(ApiResponse::ok(()).with_message("Quiz set deleted successfully"))
}

/// Student-facing lookup of a quiz set by (topic, difficulty, set type).
///
/// Difficulty and set type arrive as raw strings and unsupported values
/// are reported with a 406; the returned questions never include the
/// correct options.
pub async fn lookup_quiz_set(
    State(pool): State<PgPool>,
    Json(payload): Json<QuizSetLookupRequest>,
) -> Result<ApiResponse, AppError> {
    payload.validate()?;

    let difficulty: Difficulty = payload.difficulty.parse().map_err(|_| {
        AppError::NotAcceptable(format!(
            "The difficulty '{}' is not supported.",
            payload.difficulty
        ))
    })?;

    let set_type: SetType = payload.set_type.parse().map_err(|_| {
        AppError::NotAcceptable(format!(
            "The set type '{}' is not supported.",
            payload.set_type
        ))
    })?;

    let topic_name =
        sqlx::query_scalar::<_, String>("SELECT name FROM topics WHERE id = $1")
            .bind(payload.topic)
            .fetch_optional(&pool)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("The topic '{}' does not exist.", payload.topic))
            })?;

    let quiz_set = sqlx::query_as::<_, QuizSetSummary>(
        r#"
        SELECT qs.id, qs.topic_id, t.name AS topic_name, qs.difficulty_level,
               qs.set_type, qs.total_time,
               COUNT(qsq.question_id) AS question_count
        FROM quiz_sets qs
        JOIN topics t ON t.id = qs.topic_id
        LEFT JOIN quiz_set_questions qsq ON qsq.quiz_set_id = qs.id
        WHERE qs.topic_id = $1 AND qs.difficulty_level = $2 AND qs.set_type = $3
        GROUP BY qs.id, t.name
        "#,
    )
    .bind(payload.topic)
    .bind(difficulty)
    .bind(set_type)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| {
        AppError::NotFound(format!(
            "No quiz set for this choice 'Topic:{}, difficulty:{}, Set:{}'.",
            topic_name,
            difficulty.as_str(),
            set_type.as_str()
        ))
    })?;

    let questions = sqlx::query_as::<_, PublicQuestion>(
        r#"
        SELECT q.id, q.question_text, q.option_a, q.option_b, q.option_c,
               q.option_d, q.difficulty_level
        FROM questions q
        JOIN quiz_set_questions qsq ON qsq.question_id = q.id
        WHERE qsq.quiz_set_id = $1
        ORDER BY q.id
        "#,
    )
    .bind(quiz_set.id)
    .fetch_all(&pool)
    .await?;

    Ok(ApiResponse::ok(QuizSetDetails {
        id: quiz_set.id,
        topic_id: quiz_set.topic_id,
        topic_name: quiz_set.topic_name,
        difficulty_level: quiz_set.difficulty_level,
        set_type: quiz_set.set_type,
        total_time: quiz_set.total_time,
        questions,
    }))
}
