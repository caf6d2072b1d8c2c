// src/models/enums.rs

use serde::{Deserialize, Serialize};

/// Option letter for a question (the four answer slots and the correct key).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "PascalCase")]
pub enum AnswerOption {
    A,
    B,
    C,
    D,
}

impl AnswerOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerOption::A => "A",
            AnswerOption::B => "B",
            AnswerOption::C => "C",
            AnswerOption::D => "D",
        }
    }
}

impl std::str::FromStr for AnswerOption {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(AnswerOption::A),
            "B" => Ok(AnswerOption::B),
            "C" => Ok(AnswerOption::C),
            "D" => Ok(AnswerOption::D),
            _ => Err(()),
        }
    }
}

/// Question / quiz-set difficulty. Drives the derived time limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "PascalCase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Time limit in minutes for a quiz set of this difficulty.
    /// Never user-supplied; always derived from this mapping.
    pub fn total_time_minutes(&self) -> i32 {
        match self {
            Difficulty::Easy => 10,
            Difficulty::Medium => 15,
            Difficulty::Hard => 20,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

impl std::str::FromStr for Difficulty {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Easy" => Ok(Difficulty::Easy),
            "Medium" => Ok(Difficulty::Medium),
            "Hard" => Ok(Difficulty::Hard),
            _ => Err(()),
        }
    }
}

/// Letter-coded quiz set variant, allowing multiple distinct sets per
/// topic/difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "PascalCase")]
pub enum SetType {
    A,
    B,
    C,
    D,
}

impl SetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SetType::A => "A",
            SetType::B => "B",
            SetType::C => "C",
            SetType::D => "D",
        }
    }
}

impl std::str::FromStr for SetType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(SetType::A),
            "B" => Ok(SetType::B),
            "C" => Ok(SetType::C),
            "D" => Ok(SetType::D),
            _ => Err(()),
        }
    }
}

/// User role. Stored lowercase in the database and in JWT claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Student,
    Teacher,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Student => "student",
            Role::Teacher => "teacher",
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Student
    }
}
