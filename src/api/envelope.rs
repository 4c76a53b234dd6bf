//! Response envelope shared by every endpoint:
//! `{success, message?, data?, count?, errors?, error?}`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::{error, warn};

use crate::error::TodoError;

/// One failed field check from the request gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct Envelope<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<FieldError>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Successful response.
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    status: StatusCode,
    message: Option<String>,
    data: Option<T>,
    count: Option<usize>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            message: None,
            data: Some(data),
            count: None,
        }
    }

    pub fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            ..Self::ok(data)
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }
}

impl ApiResponse<()> {
    /// Acknowledgement without a payload.
    pub fn ack(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            message: Some(message.into()),
            data: None,
            count: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let body = Envelope {
            success: true,
            message: self.message,
            data: self.data,
            count: self.count,
            errors: None,
            error: None,
        };
        (self.status, Json(body)).into_response()
    }
}

/// Failed response. Never carries internal detail unless built with
/// `expose_detail = true`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: Option<String>,
    pub errors: Option<Vec<FieldError>>,
    pub detail: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: Some(message.into()),
            errors: None,
            detail: None,
        }
    }

    /// 400 with per-field failures.
    pub fn validation(errors: Vec<FieldError>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: Some("Validation failed".to_string()),
            errors: Some(errors),
            detail: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn route_not_found(path: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("Route {path} not found"))
    }

    /// Map a domain error onto a status code and user-facing message.
    pub fn from_domain(err: TodoError, expose_detail: bool) -> Self {
        let (status, message) = match &err {
            TodoError::Validation(msg) | TodoError::InvalidArgument(msg) => {
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            TodoError::NotFound { entity, .. } => {
                (StatusCode::NOT_FOUND, format!("{entity} not found"))
            }
            TodoError::ReferentialIntegrity(_) => (
                StatusCode::BAD_REQUEST,
                "Foreign key constraint failed".to_string(),
            ),
            TodoError::Conflict(_) => (
                StatusCode::CONFLICT,
                "Unique constraint violation".to_string(),
            ),
            TodoError::TransientStorage(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }
        };

        if status.is_server_error() {
            error!(error = %err, "Request failed");
        } else {
            warn!(error = %err, status = status.as_u16(), "Request rejected");
        }

        let detail = match &err {
            TodoError::ReferentialIntegrity(_)
            | TodoError::Conflict(_)
            | TodoError::TransientStorage(_)
                if expose_detail =>
            {
                Some(err.to_string())
            }
            _ => None,
        };

        Self {
            status,
            message: Some(message),
            errors: None,
            detail,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body: Envelope<()> = Envelope {
            success: false,
            message: self.message,
            data: None,
            count: None,
            errors: self.errors,
            error: self.detail,
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_status_codes() {
        let cases = [
            (TodoError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (TodoError::InvalidArgument("x".into()), StatusCode::BAD_REQUEST),
            (TodoError::todo_not_found(1), StatusCode::NOT_FOUND),
            (TodoError::ReferentialIntegrity("fk".into()), StatusCode::BAD_REQUEST),
            (TodoError::Conflict("dup".into()), StatusCode::CONFLICT),
            (TodoError::TransientStorage("down".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from_domain(err, false).status, status);
        }
    }

    #[test]
    fn not_found_message_names_entity() {
        let err = ApiError::from_domain(TodoError::subtask_not_found(3), true);
        assert_eq!(err.message.as_deref(), Some("Subtask not found"));
        assert!(err.detail.is_none());
    }

    #[test]
    fn storage_detail_only_in_development() {
        let hidden = ApiError::from_domain(TodoError::TransientStorage("disk i/o".into()), false);
        assert!(hidden.detail.is_none());
        assert_eq!(hidden.message.as_deref(), Some("Database error"));

        let shown = ApiError::from_domain(TodoError::TransientStorage("disk i/o".into()), true);
        assert!(shown.detail.unwrap().contains("disk i/o"));
    }
}
