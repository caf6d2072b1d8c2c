// src/handlers/topic.rs

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        enums::Difficulty,
        topic::{CreateTopicsRequest, Topic, TopicDifficulties, UpdateTopicRequest,
            normalize_topic_name},
    },
    response::ApiResponse,
};

/// Query parameters for topic listing.
#[derive(Debug, Deserialize)]
pub struct ListTopicParams {
    pub flat: Option<String>,
}

/// Query parameter carrying a target id; defaults to 0 which is
/// rejected as "not selected".
#[derive(Debug, Deserialize)]
pub struct IdParam {
    pub id: Option<i64>,
}

/// Lists all topics. With `?flat=true` only the names are returned.
pub async fn list_topics(
    State(pool): State<PgPool>,
    Query(params): Query<ListTopicParams>,
) -> Result<ApiResponse, AppError> {
    let is_flat = matches!(
        params.flat.as_deref(),
        Some("true") | Some("True") | Some("t") | Some("T")
    );

    let topics = sqlx::query_as::<_, Topic>("SELECT id, name FROM topics ORDER BY name")
        .fetch_all(&pool)
        .await?;

    if is_flat {
        let names: Vec<String> = topics.into_iter().map(|t| t.name).collect();
        return Ok(ApiResponse::ok(names));
    }

    Ok(ApiResponse::ok(topics))
}

#[derive(Debug, sqlx::FromRow)]
struct TopicDifficultyRow {
    id: i64,
    name: String,
    difficulty_level: Option<Difficulty>,
}

/// For each topic, the distinct difficulty levels for which quiz sets
/// currently exist. Topics without any set report an empty list.
pub async fn topics_difficulties(State(pool): State<PgPool>) -> Result<ApiResponse, AppError> {
    let rows = sqlx::query_as::<_, TopicDifficultyRow>(
        r#"
        SELECT t.id, t.name, qs.difficulty_level
        FROM topics t
        LEFT JOIN quiz_sets qs ON qs.topic_id = t.id
        GROUP BY t.id, t.name, qs.difficulty_level
        ORDER BY t.name, qs.difficulty_level
        "#,
    )
    .fetch_all(&pool)
    .await?;

    let mut result: Vec<TopicDifficulties> = Vec::new();
    for row in rows {
        match result.last_mut() {
            Some(last) if last.id == row.id => {
                if let Some(level) = row.difficulty_level {
                    last.difficulties.push(level);
                }
            }
            _ => result.push(TopicDifficulties {
                id: row.id,
                name: row.name,
                difficulties: row.difficulty_level.into_iter().collect(),
            }),
        }
    }

    Ok(ApiResponse::ok(result))
}

/// Bulk-creates topics from a list of names.
///
/// Names are trimmed and title-cased before storage. Any duplicate,
/// either already stored or repeated within the batch, aborts the whole
/// request with a 406 naming the topic.
pub async fn create_topics(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateTopicsRequest>,
) -> Result<ApiResponse, AppError> {
    payload.validate()?;

    let mut tx = pool.begin().await?;

    for raw_name in &payload.topics {
        let name = normalize_topic_name(raw_name);

        let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM topics WHERE name = $1")
            .bind(&name)
            .fetch_optional(&mut *tx)
            .await?;

        if exists.is_some() {
            return Err(AppError::NotAcceptable(format!(
                "The topic '{}' already exists.",
                raw_name
            )));
        }

        sqlx::query("INSERT INTO topics (name) VALUES ($1)")
            .bind(&name)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    Ok(ApiResponse::ok(()).with_message("Topic added successfully"))
}

/// Renames a topic.
pub async fn update_topic(
    State(pool): State<PgPool>,
    Query(params): Query<IdParam>,
    Json(payload): Json<UpdateTopicRequest>,
) -> Result<ApiResponse, AppError> {
    payload.validate()?;

    let topic_id = params.id.unwrap_or(0);
    if topic_id == 0 {
        return Err(AppError::NotAcceptable(
            "Please select a topic Id".to_string(),
        ));
    }

    let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM topics WHERE id = $1")
        .bind(topic_id)
        .fetch_optional(&pool)
        .await?;

    if exists.is_none() {
        return Err(AppError::NotFound("Topic not found".to_string()));
    }

    let name = normalize_topic_name(&payload.topic);

    let taken = sqlx::query_scalar::<_, i64>("SELECT id FROM topics WHERE name = $1 AND id <> $2")
        .bind(&name)
        .bind(topic_id)
        .fetch_optional(&pool)
        .await?;

    if taken.is_some() {
        return Err(AppError::NotAcceptable(format!(
            "The topic '{}' already exists.",
            payload.topic
        )));
    }

    sqlx::query("UPDATE topics SET name = $1 WHERE id = $2")
        .bind(&name)
        .bind(topic_id)
        .execute(&pool)
        .await?;

    Ok(ApiResponse::ok(()).with_message("Topic updated successfully"))
}

/// Deletes a topic by id. Cascades to its questions and quiz sets.
pub async fn delete_topic(
    State(pool): State<PgPool>,
    Query(params): Query<IdParam>,
) -> Result<ApiResponse, AppError> {
    let topic_id = params.id.unwrap_or(0);
    if topic_id == 0 {
        return Err(AppError::NotAcceptable(
            "Please select a topic Id".to_string(),
        ));
    }

    let result = sqlx::query("DELETE FROM topics WHERE id = $1")
        .bind(topic_id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Topic not found".to_string()));
    }

    Ok(ApiResponse::ok(()).with_message("Topic deleted successfully"))
}
