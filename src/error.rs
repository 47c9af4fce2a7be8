use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::{DbErr, SqlErr};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};
use utoipa::ToSchema;
use validator::{ValidationErrors, ValidationErrorsKind};

use crate::schemas::ErrorResponse;

pub type Result<T, E = AppError> = std::result::Result<T, E>;

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
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

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{message}")]
    Validation {
        message: String,
        errors: Vec<FieldError>,
    },

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    TeamNotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    ForeignKeyConstraint(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("You cannot delete your own account")]
    SelfDelete,

    #[error("You cannot change your own role")]
    SelfRoleChange,

    #[error("{0}")]
    Storage(#[from] storage::Error),

    #[error("Database error: {0}")]
    Database(DbErr),

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation {
            message: "Invalid input data".to_string(),
            errors: vec![FieldError::new(field, message)],
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation { .. } => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::TeamNotFound(_) => "TEAM_NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::ForeignKeyConstraint(_) => "FOREIGN_KEY_CONSTRAINT",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::SelfDelete => "SELF_DELETE_ERROR",
            AppError::SelfRoleChange => "SELF_ROLE_CHANGE_ERROR",
            AppError::Storage(storage::Error::UnsupportedExtension { .. }) => "UNSUPPORTED_MEDIA_TYPE",
            AppError::Storage(storage::Error::FileTooLarge { .. }) => "PAYLOAD_TOO_LARGE",
            AppError::Storage(_) => "STORAGE_ERROR",
            AppError::Database(_) | AppError::PasswordHash(_) | AppError::Internal(_) => {
                "INTERNAL_ERROR"
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) | AppError::TeamNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ForeignKeyConstraint(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::SelfDelete | AppError::SelfRoleChange => StatusCode::BAD_REQUEST,
            AppError::Storage(storage::Error::UnsupportedExtension { .. }) => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            AppError::Storage(storage::Error::FileTooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Storage(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::PasswordHash(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn user_message(&self) -> String {
        match self {
            AppError::Database(_) | AppError::PasswordHash(_) | AppError::Internal(_) => {
                format!("Internal server error: {}", self)
            }
            _ => self.to_string(),
        }
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => {
                warn!("Unique constraint violation: {}", detail);
                AppError::Conflict("A record with this data already exists".to_string())
            }
            Some(SqlErr::ForeignKeyConstraintViolation(detail)) => {
                warn!("Foreign key constraint violation: {}", detail);
                AppError::ForeignKeyConstraint("Reference to a non-existent record".to_string())
            }
            _ => AppError::Database(err),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields = Vec::new();
        collect_field_errors(None, &errors, &mut fields);
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        AppError::Validation {
            message: "Invalid input data".to_string(),
            errors: fields,
        }
    }
}

fn collect_field_errors(prefix: Option<&str>, errors: &ValidationErrors, out: &mut Vec<FieldError>) {
    for (field, kind) in errors.errors() {
        let path = match prefix {
            Some(prefix) => format!("{}.{}", prefix, field),
            None => field.to_string(),
        };
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for error in field_errors {
                    let message = error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("failed '{}' validation", error.code));
                    out.push(FieldError::new(path.clone(), message));
                }
            }
            ValidationErrorsKind::Struct(nested) => collect_field_errors(Some(&path), nested, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect_field_errors(Some(&format!("{}[{}]", path, index)), nested, out);
                }
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(code = self.code(), "Request failed: {}", self);
        } else {
            warn!(code = self.code(), "Request rejected: {}", self);
        }

        let errors = match &self {
            AppError::Validation { errors, .. } if !errors.is_empty() => Some(errors.clone()),
            _ => None,
        };

        let body = ErrorResponse {
            success: false,
            message: self.user_message(),
            code: self.code().to_string(),
            errors,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 1, message = "name is required"))]
        name: String,
        #[validate(range(min = 0, max = 150))]
        age: i32,
    }

    #[test]
    fn validation_errors_become_sorted_field_errors() {
        let sample = Sample {
            name: String::new(),
            age: 200,
        };
        let err = AppError::from(sample.validate().unwrap_err());

        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        match err {
            AppError::Validation { errors, .. } => {
                assert_eq!(errors.len(), 2);
                assert_eq!(errors[0].field, "age");
                assert_eq!(errors[1], FieldError::new("name", "name is required"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn storage_errors_map_to_media_statuses() {
        let err = AppError::from(storage::Error::UnsupportedExtension {
            extension: "gif".to_string(),
            allowed: "jpg, jpeg, png, webp",
        });
        assert_eq!(err.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let err = AppError::from(storage::Error::FileTooLarge { size: 1, max_mb: 10 });
        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(err.code(), "PAYLOAD_TOO_LARGE");

        let err = AppError::from(storage::Error::Upload("boom".to_string()));
        assert_eq!(err.code(), "STORAGE_ERROR");
    }

    #[test]
    fn self_protection_codes() {
        assert_eq!(AppError::SelfDelete.code(), "SELF_DELETE_ERROR");
        assert_eq!(AppError::SelfRoleChange.code(), "SELF_ROLE_CHANGE_ERROR");
        assert_eq!(AppError::SelfDelete.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn plain_db_errors_are_internal() {
        let err = AppError::from(DbErr::Custom("disk on fire".to_string()));
        assert_eq!(err.code(), "INTERNAL_ERROR");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
