// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

use super::enums::{AnswerOption, Difficulty};

/// Represents the 'questions' table in the database.
///
/// Questions are immutable once created: there is no update path,
/// only delete. Attempts reference them by id.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,

    pub question_text: String,

    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,

    /// The correct option letter (A-D).
    pub correct_option: AnswerOption,

    pub topic_id: i64,

    pub difficulty_level: Difficulty,
}

/// DTO for delivering a question to an exam taker.
/// Excludes the correct option.
#[derive(Debug, Serialize, FromRow)]
pub struct PublicQuestion {
    pub id: i64,
    pub question_text: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub difficulty_level: Difficulty,
}

impl From<Question> for PublicQuestion {
    fn from(q: Question) -> Self {
        PublicQuestion {
            id: q.id,
            question_text: q.question_text,
            option_a: q.option_a,
            option_b: q.option_b,
            option_c: q.option_c,
            option_d: q.option_d,
            difficulty_level: q.difficulty_level,
        }
    }
}

/// DTO for creating a new question.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 2000))]
    pub question_text: String,
    #[validate(length(min = 1, max = 200))]
    pub option_a: String,
    #[validate(length(min = 1, max = 200))]
    pub option_b: String,
    #[validate(length(min = 1, max = 200))]
    pub option_c: String,
    #[validate(length(min = 1, max = 200))]
    pub option_d: String,
    pub correct_option: AnswerOption,
    pub topic: i64,
    pub difficulty_level: Difficulty,
}

/// The create endpoint accepts either a single question object or a
/// list of them (bulk insert).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CreateQuestionPayload {
    Single(CreateQuestionRequest),
    Bulk(Vec<CreateQuestionRequest>),
}

impl CreateQuestionPayload {
    pub fn into_vec(self) -> Vec<CreateQuestionRequest> {
        match self {
            CreateQuestionPayload::Single(q) => vec![q],
            CreateQuestionPayload::Bulk(qs) => qs,
        }
    }
}
