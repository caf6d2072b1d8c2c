// src/handlers/report.rs

use axum::{
    Extension,
    extract::{Query, State},
};
use serde::Deserialize;
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::{
        attempt::{AttemptResult, LeaderboardEntry, TeacherSetReport, TopRankParams, TopRanker},
        enums::{Difficulty, SetType},
    },
    response::ApiResponse,
    utils::jwt::Claims,
};

/// round(correct / total * 100); total of zero yields 0, never a
/// division error.
fn percentage(correct: i64, total: i64) -> i64 {
    if total == 0 {
        return 0;
    }
    ((correct as f64 / total as f64) * 100.0).round() as i64
}

/// Renders the wall-clock duration of a finished attempt as "mm:ss".
fn format_completion_time(
    start_at: chrono::DateTime<chrono::Utc>,
    end_at: Option<chrono::DateTime<chrono::Utc>>,
) -> String {
    let seconds = end_at
        .map(|end| (end - start_at).num_seconds().max(0))
        .unwrap_or(0);
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[derive(Debug, Deserialize)]
pub struct ResultParams {
    pub user: Option<i64>,
}

#[derive(Debug, sqlx::FromRow)]
struct ResultRow {
    attempt_id: i64,
    quiz_set_id: i64,
    topic_name: String,
    difficulty_level: Difficulty,
    set_type: SetType,
    start_at: chrono::DateTime<chrono::Utc>,
    end_at: Option<chrono::DateTime<chrono::Utc>>,
    total_questions: i64,
    correct_answers: i64,
}

/// Per-attempt result report for a student: counts, rounded percentage
/// and completion time for every submitted attempt.
///
/// Students may only read their own results; admins may pass `?user=`.
pub async fn student_results(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<ResultParams>,
) -> Result<ApiResponse, AppError> {
    let caller_id = claims.user_id()?;
    let user_id = params.user.unwrap_or(caller_id);

    if user_id != caller_id && !claims.is_admin() {
        return Err(AppError::Forbidden(
            "You may only view your own results".to_string(),
        ));
    }

    let rows = sqlx::query_as::<_, ResultRow>(
        r#"
        SELECT a.id AS attempt_id, a.quiz_set_id, t.name AS topic_name,
               qs.difficulty_level, qs.set_type, a.start_at, a.end_at,
               COUNT(ua.id) AS total_questions,
               COALESCE(SUM(CASE WHEN ua.is_correct THEN 1 ELSE 0 END), 0) AS correct_answers
        FROM quiz_attempts a
        JOIN quiz_sets qs ON qs.id = a.quiz_set_id
        JOIN topics t ON t.id = qs.topic_id
        LEFT JOIN user_answers ua ON ua.attempt_id = a.id
        WHERE a.user_id = $1 AND a.is_submitted
        GROUP BY a.id, t.name, qs.difficulty_level, qs.set_type
        ORDER BY a.end_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await?;

    let results: Vec<AttemptResult> = rows
        .into_iter()
        .map(|row| AttemptResult {
            attempt_id: row.attempt_id,
            quiz_set_id: row.quiz_set_id,
            topic_name: row.topic_name,
            difficulty_level: row.difficulty_level,
            set_type: row.set_type,
            total_questions: row.total_questions,
            correct_answers: row.correct_answers,
            incorrect_answers: row.total_questions - row.correct_answers,
            percentage: percentage(row.correct_answers, row.total_questions),
            completion_time: format_completion_time(row.start_at, row.end_at),
        })
        .collect();

    Ok(ApiResponse::ok(results))
}

#[derive(Debug, sqlx::FromRow)]
struct TeacherSetRow {
    quiz_set_id: i64,
    topic_name: String,
    difficulty_level: Difficulty,
    set_type: SetType,
    question_count: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct AttemptCorrectRow {
    correct_answers: i64,
}

/// Report over the caller's own quiz sets: how many distinct users
/// submitted an attempt (the teacher's own attempts excluded), and of
/// those how many answered every question in the set correctly.
pub async fn teacher_report(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<ApiResponse, AppError> {
    let teacher_id = claims.user_id()?;

    let sets = sqlx::query_as::<_, TeacherSetRow>(
        r#"
        SELECT qs.id AS quiz_set_id, t.name AS topic_name, qs.difficulty_level,
               qs.set_type, COUNT(qsq.question_id) AS question_count
        FROM quiz_sets qs
        JOIN topics t ON t.id = qs.topic_id
        LEFT JOIN quiz_set_questions qsq ON qsq.quiz_set_id = qs.id
        WHERE qs.created_by = $1
        GROUP BY qs.id, t.name
        ORDER BY t.name, qs.difficulty_level, qs.set_type
        "#,
    )
    .bind(teacher_id)
    .fetch_all(&pool)
    .await?;

    let mut report = Vec::with_capacity(sets.len());

    for set in sets {
        let attempts = sqlx::query_as::<_, AttemptCorrectRow>(
            r#"
            SELECT COALESCE(SUM(CASE WHEN ua.is_correct THEN 1 ELSE 0 END), 0) AS correct_answers
            FROM quiz_attempts a
            LEFT JOIN user_answers ua ON ua.attempt_id = a.id
            WHERE a.quiz_set_id = $1 AND a.is_submitted AND a.user_id <> $2
            GROUP BY a.id
            "#,
        )
        .bind(set.quiz_set_id)
        .bind(teacher_id)
        .fetch_all(&pool)
        .await?;

        let attempt_count = attempts.len() as i64;
        let all_correct_count = attempts
            .iter()
            .filter(|a| set.question_count > 0 && a.correct_answers == set.question_count)
            .count() as i64;

        report.push(TeacherSetReport {
            quiz_set_id: set.quiz_set_id,
            topic_name: set.topic_name,
            difficulty_level: set.difficulty_level,
            set_type: set.set_type,
            attempt_count,
            all_correct_count,
            not_all_correct_count: attempt_count - all_correct_count,
        });
    }

    Ok(ApiResponse::ok(report))
}

#[derive(Debug, sqlx::FromRow)]
struct LeaderboardRow {
    username: String,
    topic_name: String,
    difficulty_level: Difficulty,
    set_type: SetType,
    correct_answers: i64,
    total_questions: i64,
    end_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Leaderboard over all submitted attempts, ordered by set type, then
/// correct count (descending), then submission time (earliest wins a
/// tie). An empty attempts table yields an empty list.
pub async fn leaderboard(State(pool): State<PgPool>) -> Result<ApiResponse, AppError> {
    let rows = sqlx::query_as::<_, LeaderboardRow>(
        r#"
        SELECT u.username, t.name AS topic_name, qs.difficulty_level, qs.set_type,
               COALESCE(SUM(CASE WHEN ua.is_correct THEN 1 ELSE 0 END), 0) AS correct_answers,
               COUNT(ua.id) AS total_questions,
               a.end_at
        FROM quiz_attempts a
        JOIN users u ON u.id = a.user_id
        JOIN quiz_sets qs ON qs.id = a.quiz_set_id
        JOIN topics t ON t.id = qs.topic_id
        LEFT JOIN user_answers ua ON ua.attempt_id = a.id
        WHERE a.is_submitted
        GROUP BY a.id, u.username, t.name, qs.difficulty_level, qs.set_type, a.end_at
        ORDER BY qs.set_type, correct_answers DESC, a.end_at ASC
        "#,
    )
    .fetch_all(&pool)
    .await?;

    let entries: Vec<LeaderboardEntry> = rows
        .into_iter()
        .map(|row| LeaderboardEntry {
            username: row.username,
            topic_name: row.topic_name,
            difficulty_level: row.difficulty_level,
            set_type: row.set_type,
            percentage: format!(
                "{}%",
                percentage(row.correct_answers, row.total_questions)
            ),
            correct_answers: row.correct_answers,
            total_questions: row.total_questions,
            end_at: row.end_at,
        })
        .collect();

    Ok(ApiResponse::ok(entries))
}

#[derive(Debug, sqlx::FromRow)]
struct TopRankRow {
    user_id: i64,
    username: String,
    correct_answers: i64,
    total_answers: i64,
}

/// Top-3 users by overall correct-answer percentage across all their
/// submitted answers, optionally filtered by topic and difficulty.
pub async fn leaderboard_top3(
    State(pool): State<PgPool>,
    Query(params): Query<TopRankParams>,
) -> Result<ApiResponse, AppError> {
    let rows = sqlx::query_as::<_, TopRankRow>(
        r#"
        SELECT u.id AS user_id, u.username,
               COALESCE(SUM(CASE WHEN ua.is_correct THEN 1 ELSE 0 END), 0) AS correct_answers,
               COUNT(ua.id) AS total_answers
        FROM user_answers ua
        JOIN quiz_attempts a ON a.id = ua.attempt_id AND a.is_submitted
        JOIN users u ON u.id = a.user_id
        JOIN questions q ON q.id = ua.question_id
        WHERE ($1::BIGINT IS NULL OR q.topic_id = $1)
          AND ($2::TEXT IS NULL OR q.difficulty_level = $2)
        GROUP BY u.id, u.username
        "#,
    )
    .bind(params.topic)
    .bind(params.difficulty.map(|d| d.as_str()))
    .fetch_all(&pool)
    .await?;

    let mut rankers: Vec<TopRanker> = rows
        .into_iter()
        .map(|row| TopRanker {
            user_id: row.user_id,
            username: row.username,
            percentage: percentage(row.correct_answers, row.total_answers),
            correct_answers: row.correct_answers,
            total_answers: row.total_answers,
        })
        .collect();

    // Percentage first; more answers breaks ties between equal rates.
    rankers.sort_by(|a, b| {
        b.percentage
            .cmp(&a.percentage)
            .then(b.total_answers.cmp(&a.total_answers))
    });
    rankers.truncate(3);

    Ok(ApiResponse::ok(rankers))
}
