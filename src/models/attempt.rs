// src/models/attempt.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

use super::enums::{AnswerOption, Difficulty, SetType};

/// Represents the 'quiz_attempts' table in the database.
///
/// One row per (user, quiz set): the one-attempt policy is enforced by
/// a unique constraint at the storage layer, so duplicate starts lose
/// the race cleanly.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub id: i64,
    pub user_id: i64,
    pub quiz_set_id: i64,
    pub start_at: chrono::DateTime<chrono::Utc>,
    pub end_at: Option<chrono::DateTime<chrono::Utc>>,
    pub is_submitted: bool,
}

/// Represents the 'user_answers' table in the database.
/// `is_correct` is computed at insert time against the question's
/// stored correct option.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserAnswer {
    pub id: i64,
    pub attempt_id: i64,
    pub question_id: i64,
    pub submitted_option: AnswerOption,
    pub is_correct: bool,
}

/// DTO for starting an attempt. The user comes from the token claims.
#[derive(Debug, Deserialize)]
pub struct StartAttemptRequest {
    pub quiz_set: i64,
}

/// One entry of a bulk answer submission.
#[derive(Debug, Serialize, Deserialize)]
pub struct AnswerEntry {
    pub question: i64,
    pub selected_option: AnswerOption,
}

/// DTO for the bulk answer submission that finalizes an attempt.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitAnswersRequest {
    pub attempt: i64,
    #[validate(length(min = 1, message = "No answers submitted."))]
    pub answers: Vec<AnswerEntry>,
}

/// Query parameters for listing attempts.
#[derive(Debug, Deserialize)]
pub struct ListAttemptParams {
    pub user: Option<i64>,
    pub quiz_set: Option<i64>,
}

/// Per-attempt result line in the student report.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptResult {
    pub attempt_id: i64,
    pub quiz_set_id: i64,
    pub topic_name: String,
    pub difficulty_level: Difficulty,
    pub set_type: SetType,
    pub total_questions: i64,
    pub correct_answers: i64,
    pub incorrect_answers: i64,
    /// round(correct / total * 100); 0 when the attempt has no answers.
    pub percentage: i64,
    /// "mm:ss" from end_at - start_at.
    pub completion_time: String,
}

/// Per-set line of the teacher report: how the teacher's own quiz sets
/// were attempted by others.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherSetReport {
    pub quiz_set_id: i64,
    pub topic_name: String,
    pub difficulty_level: Difficulty,
    pub set_type: SetType,
    pub attempt_count: i64,
    pub all_correct_count: i64,
    pub not_all_correct_count: i64,
}

/// One leaderboard row, ordered by set type, correct count, end time.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub username: String,
    pub topic_name: String,
    pub difficulty_level: Difficulty,
    pub set_type: SetType,
    pub correct_answers: i64,
    pub total_questions: i64,
    /// Rendered as "NN%".
    pub percentage: String,
    pub end_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// One of the top-3 rankers by overall correct-answer percentage.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopRanker {
    pub user_id: i64,
    pub username: String,
    pub correct_answers: i64,
    pub total_answers: i64,
    pub percentage: i64,
}

/// Query parameters for the top-3 ranking filters.
#[derive(Debug, Deserialize)]
pub struct TopRankParams {
    pub topic: Option<i64>,
    pub difficulty: Option<Difficulty>,
}
