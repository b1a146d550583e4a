use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use derive_more::Display;
use serde_json::json;
use validator::ValidationErrors;

/// Failure taxonomy for the whole service. Every error kind is decided at
/// the point of failure; nothing downstream re-classifies by message text.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum AppError {
    #[display("{_0}")]
    Validation(String),

    #[display("Invalid page token")]
    InvalidPageToken,

    #[display("{_0}")]
    NotFound(String),

    #[display("{_0}")]
    Unauthorized(String),

    #[display("{_0}")]
    Gone(String),

    #[display("{_0}")]
    Storage(String),

    #[display("{_0}")]
    Internal(String),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidPageToken => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::FORBIDDEN,
            AppError::Gone(_) => StatusCode::GONE,
            AppError::Storage(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let kind = match self {
            AppError::Validation(_) | AppError::InvalidPageToken => "validation_error",
            AppError::NotFound(_) => "not_found",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Gone(_) => "gone",
            AppError::Storage(_) => "storage_error",
            AppError::Internal(_) => "internal_server_error",
        };

        // 5xx variants carry a generic phrase chosen at the point of failure;
        // backend detail is logged there and never echoed to the caller.
        if self.status_code().is_server_error() {
            tracing::error!(error = %self, "request failed with server error");
        }

        HttpResponse::build(self.status_code()).json(json!({
            "error": kind,
            "message": self.to_string(),
        }))
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let messages = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| {
                    let reason = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "invalid value".to_string());
                    format!("{}: {}", field, reason)
                })
            })
            .collect::<Vec<_>>()
            .join(", ");

        AppError::Validation(messages)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}
