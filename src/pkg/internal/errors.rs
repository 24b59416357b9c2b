use std::collections::BTreeMap;

use axum::{
    Json,
    extract::multipart::MultipartError,
    http::{StatusCode, header::InvalidHeaderValue},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use validator::{ValidationErrors, ValidationErrorsKind};

use crate::conf::settings;

pub const TOKEN_EXPIRED_DETAIL: &str = "Your token has expired. Please log in again";

/// Discriminant of [`AppError`], used when only the category matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    DuplicateKey,
    InvalidId,
    MalformedToken,
    ExpiredToken,
    Other,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed on {} field(s)", .0.len())]
    Validation(BTreeMap<String, String>),

    #[error("duplicate value for {field}")]
    DuplicateKey { field: String },

    #[error("invalid {path}")]
    InvalidId { path: String },

    #[error("{0}")]
    MalformedToken(String),

    #[error("token expired")]
    ExpiredToken,

    #[error("{}", .message.as_deref().unwrap_or("Server Error"))]
    Other {
        status: Option<StatusCode>,
        message: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

#[derive(Debug)]
pub struct Normalized {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation(_) => ErrorKind::Validation,
            AppError::DuplicateKey { .. } => ErrorKind::DuplicateKey,
            AppError::InvalidId { .. } => ErrorKind::InvalidId,
            AppError::MalformedToken(_) => ErrorKind::MalformedToken,
            AppError::ExpiredToken => ErrorKind::ExpiredToken,
            AppError::Other { .. } => ErrorKind::Other,
        }
    }

    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        AppError::Other {
            status: Some(status),
            message: Some(message.into()),
            source: None,
        }
    }

    pub fn internal<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        AppError::Other {
            status: None,
            message: None,
            source: Some(Box::new(err)),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn field(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation(BTreeMap::from([(field.to_string(), message.into())]))
    }

    pub fn invalid_id(path: &str) -> Self {
        AppError::InvalidId {
            path: path.to_string(),
        }
    }

    /// Maps the error onto the `{success, message, errors}` wire shape.
    /// First matching kind wins; `with_trace` attaches the debug chain.
    pub fn normalize(&self, with_trace: bool) -> Normalized {
        let mut errors = BTreeMap::new();
        let (status, message) = match self {
            AppError::Validation(fields) => {
                errors.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
                (StatusCode::BAD_REQUEST, "Validation Error".to_string())
            }
            AppError::DuplicateKey { field } => {
                errors.insert(
                    field.clone(),
                    format!("{} is already in use", capitalize(field)),
                );
                (
                    StatusCode::BAD_REQUEST,
                    "Duplicate field value entered".to_string(),
                )
            }
            AppError::InvalidId { path } => {
                errors.insert("id".to_string(), format!("Invalid {}", path));
                (StatusCode::BAD_REQUEST, "Resource not found".to_string())
            }
            AppError::MalformedToken(detail) => {
                errors.insert("token".to_string(), detail.clone());
                (StatusCode::UNAUTHORIZED, "Invalid token".to_string())
            }
            AppError::ExpiredToken => {
                errors.insert("token".to_string(), TOKEN_EXPIRED_DETAIL.to_string());
                (StatusCode::UNAUTHORIZED, "Token expired".to_string())
            }
            AppError::Other {
                status, message, ..
            } => (
                status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                message.clone().unwrap_or_else(|| "Server Error".to_string()),
            ),
        };
        Normalized {
            status,
            body: ErrorBody {
                success: false,
                message,
                errors: (!errors.is_empty()).then_some(errors),
                stack: with_trace.then(|| format!("{:?}", self)),
            },
        }
    }
}

fn capitalize(field: &str) -> String {
    let mut chars = field.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `hourly_rate` -> `hourlyRate`, matching the serde names on the wire.
fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

pub fn flatten_validation(
    errors: &ValidationErrors,
    prefix: &str,
    out: &mut BTreeMap<String, String>,
) {
    for (field, kind) in errors.errors() {
        let name = camel_case(&field.to_string());
        let path = if prefix.is_empty() {
            name
        } else {
            format!("{}.{}", prefix, name)
        };
        match kind {
            ValidationErrorsKind::Field(errs) => {
                if let Some(err) = errs.first() {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{} is invalid", path));
                    out.entry(path).or_insert(message);
                }
            }
            ValidationErrorsKind::Struct(inner) => flatten_validation(inner, &path, out),
            ValidationErrorsKind::List(items) => {
                for (idx, inner) in items {
                    flatten_validation(inner, &format!("{}[{}]", path, idx), out);
                }
            }
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields = BTreeMap::new();
        flatten_validation(&errors, "", &mut fields);
        AppError::Validation(fields)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::not_found("Resource not found"),
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                let field = db
                    .constraint()
                    .map(|c| constraint_field(c, db.table()))
                    .unwrap_or_else(|| "field".to_string());
                AppError::DuplicateKey { field }
            }
            _ => {
                tracing::error!("database error: {}", &err);
                AppError::internal(err)
            }
        }
    }
}

/// `users_email_key` on table `users` -> `email`.
fn constraint_field(constraint: &str, table: Option<&str>) -> String {
    let trimmed = constraint.strip_suffix("_key").unwrap_or(constraint);
    let trimmed = table
        .and_then(|t| trimmed.strip_prefix(&format!("{}_", t)))
        .unwrap_or(trimmed);
    camel_case(trimmed)
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::ExpiredToken,
            _ => AppError::MalformedToken(err.to_string()),
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::Other {
            status: Some(err.status()),
            message: Some(err.body_text()),
            source: Some(Box::new(err)),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::internal(err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::internal(err)
    }
}

impl From<InvalidHeaderValue> for AppError {
    fn from(err: InvalidHeaderValue) -> Self {
        AppError::internal(err)
    }
}

impl AppError {
    /// Renders the error body, with the stack only outside production.
    pub fn into_response_for(self, production: bool) -> Response {
        let normalized = self.normalize(!production);
        if normalized.status.is_server_error() {
            tracing::error!("request failed: {:?}", &self);
        } else {
            tracing::debug!("request rejected: {}", &self);
        }
        (normalized.status, Json(normalized.body)).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.into_response_for(settings.is_production())
    }
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;
    use validator::Validate;

    use super::*;

    #[test]
    fn test_validation_kind() {
        let err = AppError::field("email", "Please enter a valid email");
        let n = err.normalize(false);
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(n.status, StatusCode::BAD_REQUEST);
        assert_eq!(n.body.message, "Validation Error");
        assert_eq!(
            n.body.errors.unwrap().get("email").map(String::as_str),
            Some("Please enter a valid email")
        );
        assert!(!n.body.success);
    }

    #[test]
    fn test_duplicate_key_capitalizes_first_letter_only() {
        let n = AppError::DuplicateKey {
            field: "email".into(),
        }
        .normalize(false);
        assert_eq!(n.status, StatusCode::BAD_REQUEST);
        assert_eq!(n.body.message, "Duplicate field value entered");
        assert_eq!(n.body.errors.unwrap()["email"], "Email is already in use");

        let n = AppError::DuplicateKey {
            field: "userName".into(),
        }
        .normalize(false);
        assert_eq!(n.body.errors.unwrap()["userName"], "UserName is already in use");
    }

    #[test]
    fn test_invalid_id() {
        let n = AppError::invalid_id("jobId").normalize(false);
        assert_eq!(n.status, StatusCode::BAD_REQUEST);
        assert_eq!(n.body.message, "Resource not found");
        assert_eq!(n.body.errors.unwrap()["id"], "Invalid jobId");
    }

    #[test]
    fn test_token_kinds() {
        let n = AppError::MalformedToken("InvalidSignature".into()).normalize(false);
        assert_eq!(n.status, StatusCode::UNAUTHORIZED);
        assert_eq!(n.body.message, "Invalid token");
        assert_eq!(n.body.errors.unwrap()["token"], "InvalidSignature");

        let n = AppError::ExpiredToken.normalize(false);
        assert_eq!(n.status, StatusCode::UNAUTHORIZED);
        assert_eq!(n.body.message, "Token expired");
        assert_eq!(n.body.errors.unwrap()["token"], TOKEN_EXPIRED_DETAIL);
    }

    #[test]
    fn test_jwt_errors_map_to_token_kinds() {
        let expired: AppError =
            jsonwebtoken::errors::Error::from(jsonwebtoken::errors::ErrorKind::ExpiredSignature)
                .into();
        assert_eq!(expired.kind(), ErrorKind::ExpiredToken);
        let bad: AppError =
            jsonwebtoken::errors::Error::from(jsonwebtoken::errors::ErrorKind::InvalidToken).into();
        assert_eq!(bad.kind(), ErrorKind::MalformedToken);
    }

    #[test]
    fn test_other_defaults() {
        let n = AppError::Other {
            status: None,
            message: None,
            source: None,
        }
        .normalize(false);
        assert_eq!(n.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(n.body.message, "Server Error");
        assert!(n.body.errors.is_none());

        let n = AppError::forbidden("Not allowed").normalize(false);
        assert_eq!(n.status, StatusCode::FORBIDDEN);
        assert_eq!(n.body.message, "Not allowed");
    }

    #[test]
    fn test_empty_errors_and_trace_omitted() {
        let n = AppError::Validation(BTreeMap::new()).normalize(false);
        assert!(n.body.errors.is_none());
        let json = serde_json::to_value(&n.body).unwrap();
        assert!(json.get("errors").is_none());
        assert!(json.get("stack").is_none());

        let n = AppError::not_found("Job not found").normalize(true);
        assert!(n.body.stack.is_some());
    }

    async fn rendered(err: AppError, production: bool) -> (StatusCode, serde_json::Value) {
        let response = err.into_response_for(production);
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn failing() -> AppError {
        AppError::internal(std::io::Error::other("disk full"))
    }

    #[traced_test]
    #[tokio::test]
    async fn test_production_response_hides_stack() {
        let (status, body) = rendered(failing(), true).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Server Error");
        assert!(body.get("stack").is_none());

        let (_, body) = rendered(AppError::field("email", "Email is required"), true).await;
        assert_eq!(body["errors"]["email"], "Email is required");
        assert!(body.get("stack").is_none());
    }

    #[traced_test]
    #[tokio::test]
    async fn test_development_response_carries_stack() {
        let (status, body) = rendered(failing(), false).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["stack"].as_str().unwrap().contains("disk full"));
    }

    #[test]
    fn test_constraint_field() {
        assert_eq!(constraint_field("users_email_key", Some("users")), "email");
        assert_eq!(constraint_field("users_email_key", None), "usersEmail");
        assert_eq!(camel_case("hourly_rate"), "hourlyRate");
    }

    #[derive(Validate)]
    struct Probe {
        #[validate(length(min = 1, message = "Name is required"))]
        display_name: String,
    }

    #[test]
    fn test_from_validator_errors_uses_wire_names() {
        let err: AppError = Probe {
            display_name: String::new(),
        }
        .validate()
        .unwrap_err()
        .into();
        match err {
            AppError::Validation(fields) => {
                assert_eq!(fields["displayName"], "Name is required")
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
