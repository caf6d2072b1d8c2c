// src/models/mod.rs

pub mod attempt;
pub mod enums;
pub mod question;
pub mod quiz_set;
pub mod topic;
pub mod user;
