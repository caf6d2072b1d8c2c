// src/response.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};

/// Uniform JSON response envelope.
///
/// Every endpoint, success or failure, answers with
/// `{"data": ..., "status_code": u16, "message": "...", "time_stamp": RFC3339}`
/// and a matching HTTP status code.
#[derive(Debug)]
pub struct ApiResponse {
    status: StatusCode,
    message: String,
    data: Value,
}

impl ApiResponse {
    /// 200 OK with a data payload.
    pub fn ok(data: impl Serialize) -> Self {
        Self {
            status: StatusCode::OK,
            message: String::new(),
            data: serde_json::to_value(data).unwrap_or(Value::Null),
        }
    }

    /// 201 Created with a data payload.
    pub fn created(data: impl Serialize) -> Self {
        Self {
            status: StatusCode::CREATED,
            message: String::new(),
            data: serde_json::to_value(data).unwrap_or(Value::Null),
        }
    }

    /// Arbitrary status with a human-readable message and no data.
    pub fn message(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            data: Value::Null,
        }
    }

    /// Attaches a message to an existing response.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "data": self.data,
            "status_code": self.status.as_u16(),
            "message": self.message,
            "time_stamp": chrono::Utc::now(),
        }));

        (self.status, body).into_response()
    }
}
