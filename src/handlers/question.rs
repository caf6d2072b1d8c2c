// src/handlers/question.rs

use axum::{
    Json,
    extract::{Query, State},
};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    models::question::{CreateQuestionPayload, Question},
    response::ApiResponse,
};

use super::topic::IdParam;

/// Lists all questions, including the correct options.
/// Reserved for teachers/admins; exam delivery goes through the
/// quiz-set lookup which strips answers.
pub async fn list_questions(State(pool): State<PgPool>) -> Result<ApiResponse, AppError> {
    let questions = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, question_text, option_a, option_b, option_c, option_d,
               correct_option, topic_id, difficulty_level
        FROM questions
        ORDER BY id
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list questions: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(ApiResponse::ok(questions))
}

/// Creates one question or a bulk list of questions.
///
/// Each question's topic must exist; option letters and difficulty are
/// closed enums so unknown values never reach the database. All inserts
/// share one transaction.
pub async fn create_questions(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateQuestionPayload>,
) -> Result<ApiResponse, AppError> {
    let requests = payload.into_vec();

    if requests.is_empty() {
        return Err(AppError::NotAcceptable("No questions submitted".to_string()));
    }

    for req in &requests {
        req.validate()?;
    }

    let mut tx = pool.begin().await?;

    for req in &requests {
        let topic_exists = sqlx::query_scalar::<_, i64>("SELECT id FROM topics WHERE id = $1")
            .bind(req.topic)
            .fetch_optional(&mut *tx)
            .await?;

        if topic_exists.is_none() {
            return Err(AppError::NotFound(format!(
                "The topic '{}' does not exist.",
                req.topic
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO questions
            (question_text, option_a, option_b, option_c, option_d,
             correct_option, topic_id, difficulty_level)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&req.question_text)
        .bind(&req.option_a)
        .bind(&req.option_b)
        .bind(&req.option_c)
        .bind(&req.option_d)
        .bind(req.correct_option)
        .bind(req.topic)
        .bind(req.difficulty_level)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(ApiResponse::ok(()).with_message("Question added successfully"))
}

/// Deletes a question by id. Questions have no update path; a wrong
/// question is removed and recreated.
pub async fn delete_question(
    State(pool): State<PgPool>,
    Query(params): Query<IdParam>,
) -> Result<ApiResponse, AppError> {
    let question_id = params.id.unwrap_or(0);
    if question_id == 0 {
        return Err(AppError::NotAcceptable(
            "Please select a question Id".to_string(),
        ));
    }

    let result = sqlx::query("DELETE FROM questions WHERE id = $1")
        .bind(question_id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete question: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    Ok(ApiResponse::ok(()).with_message("Question deleted successfully"))
}
