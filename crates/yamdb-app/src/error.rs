use std::collections::BTreeMap;

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    response::{IntoResponse, Response},
    Json,
};
use http::{header, StatusCode};
use serde_json::json;
use tracing::{debug, error};
use yamdb_dal::error::NON_FIELD;
use yamdb_types::{general::REQUIRED_MESSAGE, Denial};

/// Validation messages keyed by field name
pub type FieldErrors = BTreeMap<String, Vec<String>>;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid input: {0:?}")]
    Validation(FieldErrors),

    #[error("Authentication credentials were not provided")]
    NotAuthenticated,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("You do not have permission to perform this action")]
    PermissionDenied,

    #[error("{0} not found")]
    NotFound(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.into(), vec![message.into()]);
        ApiError::Validation(errors)
    }

    pub fn non_field(message: impl Into<String>) -> Self {
        Self::field(NON_FIELD, message)
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            ApiError::NotAuthenticated | ApiError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            ApiError::PermissionDenied => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            ApiError::Validation(errors) => {
                debug!("Invalid input: {errors:?}");
                (status, Json(errors)).into_response()
            }
            ApiError::NotAuthenticated | ApiError::InvalidToken(_) => {
                debug!("Unauthenticated: {self}");
                (
                    status,
                    [(header::WWW_AUTHENTICATE, "Bearer realm=\"api\"")],
                    Json(json!({"error": self.to_string()})),
                )
                    .into_response()
            }
            ApiError::Internal(e) => {
                error!("Internal error: {e:#}");
                (status, Json(json!({"error": "Internal server error"}))).into_response()
            }
            other => (status, Json(json!({"error": other.to_string()}))).into_response(),
        }
    }
}

impl From<yamdb_dal::Error> for ApiError {
    fn from(value: yamdb_dal::Error) -> Self {
        match value {
            yamdb_dal::Error::RecordNotFound(entity) => ApiError::NotFound(entity),
            yamdb_dal::Error::UniqueViolation { field, message } => ApiError::field(field, message),
            yamdb_dal::Error::InvalidReference { field, value } => {
                ApiError::field(field, format!("Object with slug={value} does not exist."))
            }
            yamdb_dal::Error::InvalidConfirmationCode => {
                ApiError::field("confirmation_code", "Invalid confirmation code.")
            }
            yamdb_dal::Error::InvalidOrderByField(field) => {
                ApiError::InvalidQuery(format!("Cannot sort by {field}"))
            }
            e @ (yamdb_dal::Error::DatabaseError(_)
            | yamdb_dal::Error::MigrateError(_)
            | yamdb_dal::Error::NotificationFailed(_)) => ApiError::Internal(e.into()),
        }
    }
}

impl From<yamdb_auth::Error> for ApiError {
    fn from(value: yamdb_auth::Error) -> Self {
        ApiError::Internal(value.into())
    }
}

impl From<Denial> for ApiError {
    fn from(value: Denial) -> Self {
        match value {
            Denial::NotAuthenticated => ApiError::NotAuthenticated,
            Denial::PermissionDenied => ApiError::PermissionDenied,
        }
    }
}

/// Nested paths like `genre[1]` are reported on the top level field
fn top_level_field(path: &str) -> &str {
    let end = path.find(['[', '.']).unwrap_or(path.len());
    match &path[..end] {
        "" => NON_FIELD,
        field => field,
    }
}

pub fn field_errors(report: &garde::Report) -> FieldErrors {
    let mut errors = FieldErrors::new();
    for (path, error) in report.iter() {
        let path = path.to_string();
        errors
            .entry(top_level_field(&path).to_string())
            .or_default()
            .push(error.message().to_string());
    }
    errors
}

impl From<garde::Report> for ApiError {
    fn from(report: garde::Report) -> Self {
        ApiError::Validation(field_errors(&report))
    }
}

/// serde reports only the first missing field as "missing field `name`"
fn missing_field(message: &str) -> Option<&str> {
    let (_, rest) = message.split_once("missing field `")?;
    rest.split_once('`').map(|(field, _)| field)
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let message = rejection.body_text();
        match rejection {
            JsonRejection::MissingJsonContentType(_) => ApiError::UnsupportedMediaType(message),
            JsonRejection::JsonDataError(_) => match missing_field(&message) {
                Some(field) => ApiError::field(field, REQUIRED_MESSAGE),
                None => ApiError::non_field(message),
            },
            JsonRejection::JsonSyntaxError(_) | JsonRejection::BytesRejection(_) => {
                ApiError::non_field(message)
            }
            _ => ApiError::non_field(message),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::InvalidQuery(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use garde::Validate;

    use super::*;

    #[derive(Validate)]
    struct Sample {
        #[garde(length(min = 1))]
        name: String,
        #[garde(inner(length(min = 2)))]
        tags: Vec<String>,
    }

    #[test]
    fn test_report_to_fields() {
        let sample = Sample {
            name: String::new(),
            tags: vec!["ok".into(), "x".into()],
        };
        let err = ApiError::from(sample.validate().unwrap_err());
        match err {
            ApiError::Validation(errors) => {
                assert_eq!(1, errors["name"].len());
                assert_eq!(1, errors["tags"].len());
            }
            other => panic!("Unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_missing_field() {
        assert_eq!(
            Some("name"),
            missing_field("Failed to deserialize: missing field `name` at line 1 column 2")
        );
        assert_eq!(None, missing_field("invalid type: integer"));
        assert_eq!("genre", top_level_field("genre[1]"));
        assert_eq!(NON_FIELD, top_level_field(""));
    }

    #[test]
    fn test_status_codes() {
        let cases = [
            (ApiError::from(Denial::NotAuthenticated), StatusCode::UNAUTHORIZED),
            (ApiError::from(Denial::PermissionDenied), StatusCode::FORBIDDEN),
            (
                ApiError::from(yamdb_dal::Error::RecordNotFound("Title".into())),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::from(yamdb_dal::Error::InvalidConfirmationCode),
                StatusCode::BAD_REQUEST,
            ),
            (ApiError::MethodNotAllowed, StatusCode::METHOD_NOT_ALLOWED),
            (
                ApiError::Internal(anyhow::anyhow!("boom")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(status, error.into_response().status());
        }
    }

    #[test]
    fn test_unauthenticated_header() {
        let response = ApiError::NotAuthenticated.into_response();
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
    }
}
