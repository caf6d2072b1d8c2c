// src/models/topic.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

use super::enums::Difficulty;

/// Represents the 'topics' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Topic {
    pub id: i64,

    /// Unique topic name, stored trimmed and title-cased.
    pub name: String,
}

/// DTO for bulk-creating topics from a list of names.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTopicsRequest {
    #[validate(length(min = 1, message = "At least one topic name is required."))]
    #[validate(custom(function = validate_topic_names))]
    pub topics: Vec<String>,
}

/// DTO for renaming a topic.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTopicRequest {
    #[validate(length(min = 1, max = 50))]
    pub topic: String,
}

/// Aggregated view: a topic plus the difficulty levels for which
/// quiz sets currently exist.
#[derive(Debug, Serialize)]
pub struct TopicDifficulties {
    pub id: i64,
    pub name: String,
    pub difficulties: Vec<Difficulty>,
}

fn validate_topic_names(names: &[String]) -> Result<(), validator::ValidationError> {
    for name in names {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(validator::ValidationError::new("topic_name_empty"));
        }
        if trimmed.len() > 50 {
            return Err(validator::ValidationError::new("topic_name_too_long"));
        }
    }
    Ok(())
}

/// Normalizes a raw topic name the way the API stores it:
/// trimmed, each word capitalized.
pub fn normalize_topic_name(raw: &str) -> String {
    raw.trim()
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
