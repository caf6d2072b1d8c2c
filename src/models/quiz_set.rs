// src/models/quiz_set.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

use super::{
    enums::{Difficulty, SetType},
    question::PublicQuestion,
};

/// Represents the 'quiz_sets' table in the database.
///
/// A quiz set is a fixed bundle of questions for one topic/difficulty,
/// distinguished from sibling sets by its letter-coded set type.
/// `total_time` is derived from the difficulty (Easy=10, Medium=15,
/// Hard=20 minutes), never supplied by the client.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuizSet {
    pub id: i64,

    pub topic_id: i64,

    pub difficulty_level: Difficulty,

    pub set_type: SetType,

    /// Time limit in minutes.
    pub total_time: i32,

    /// The teacher/admin who created the set. Drives the teacher report.
    pub created_by: i64,
}

/// Listing row joined with the topic name.
#[derive(Debug, Serialize, FromRow)]
pub struct QuizSetSummary {
    pub id: i64,
    pub topic_id: i64,
    pub topic_name: String,
    pub difficulty_level: Difficulty,
    pub set_type: SetType,
    pub total_time: i32,
    pub question_count: i64,
}

/// Detailed view: summary plus the linked questions, answers hidden.
#[derive(Debug, Serialize)]
pub struct QuizSetDetails {
    pub id: i64,
    pub topic_id: i64,
    pub topic_name: String,
    pub difficulty_level: Difficulty,
    pub set_type: SetType,
    pub total_time: i32,
    pub questions: Vec<PublicQuestion>,
}

/// DTO for creating or updating a quiz set.
#[derive(Debug, Deserialize, Validate)]
pub struct QuizSetRequest {
    pub topic: i64,
    pub difficulty_level: Difficulty,
    pub set_type: SetType,
    #[validate(length(min = 1, message = "A quiz set needs at least one question."))]
    pub questions: Vec<i64>,
}

/// DTO for the student-facing lookup by (topic, difficulty, set type).
/// Difficulty and set type arrive as raw strings so that unsupported
/// values can be reported with a 406 instead of a generic parse error.
#[derive(Debug, Deserialize, Validate)]
pub struct QuizSetLookupRequest {
    pub topic: i64,
    #[validate(length(min = 1))]
    pub difficulty: String,
    #[validate(length(min = 1))]
    pub set_type: String,
}

/// Query parameters for listing quiz sets.
#[derive(Debug, Deserialize)]
pub struct ListQuizSetParams {
    pub id: Option<i64>,
    pub difficulty: Option<Difficulty>,
    pub detail: Option<bool>,
}
