use std::collections::BTreeMap;
use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::{DbErr, SqlErr};
use serde::{Deserialize, Serialize};

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Uniform error body returned by every HTTP endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// HTTP status category (e.g. "Not Found", "Unprocessable Entity")
    pub error: String,
    /// Machine-readable error code (e.g. "another_timer_running")
    pub code: String,
    /// Human-readable error description
    pub message: String,
    /// Field-keyed validation messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<BTreeMap<String, Vec<String>>>,
    /// Correlation id of the request that failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// RFC 3339 timestamp when the error occurred
    pub timestamp: String,
}

/// Field-keyed map of validation messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn into_map(self) -> BTreeMap<String, Vec<String>> {
        self.0
    }

    /// `Ok(())` when nothing was collected, otherwise a `ValidationError`.
    pub fn into_result(self) -> Result<(), ServiceError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::ValidationError(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{}: {}", field, message)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Business preconditions that refuse a command without retrying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Precondition {
    #[error("another timer is already running for assignment {assignment_id}")]
    AnotherTimerRunning { assignment_id: String },

    #[error("assignment is completed")]
    AssignmentCompleted,

    #[error("assignment is already completed")]
    AlreadyCompleted,

    #[error("no active timer")]
    NoActiveTimer,

    #[error("no time has been recorded against this assignment")]
    ZeroHoursWorked,

    #[error("project incharge and expected completion date must be set before creating tasks")]
    MissingProjectConfiguration,

    #[error("{entity} is still referenced by {references}")]
    ReferencedRecord { entity: String, references: String },
}

impl Precondition {
    pub fn code(&self) -> &'static str {
        match self {
            Self::AnotherTimerRunning { .. } => "another_timer_running",
            Self::AssignmentCompleted => "assignment_completed",
            Self::AlreadyCompleted => "already_completed",
            Self::NoActiveTimer => "no_active_timer",
            Self::ZeroHoursWorked => "zero_hours_worked",
            Self::MissingProjectConfiguration => "missing_project_configuration",
            Self::ReferencedRecord { .. } => "referenced_record",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(FieldErrors),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Precondition failed: {0}")]
    PreconditionFailed(Precondition),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Sequence exhausted: {0}")]
    SequenceExhausted(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<DbErr> for ServiceError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => {
                return ServiceError::Conflict(detail);
            }
            Some(SqlErr::ForeignKeyConstraintViolation(detail)) => {
                return ServiceError::PreconditionFailed(Precondition::ReferencedRecord {
                    entity: "record".to_string(),
                    references: detail,
                });
            }
            _ => {}
        }

        match err {
            DbErr::ConnectionAcquire(e) => ServiceError::Unavailable(e.to_string()),
            DbErr::Conn(e) => ServiceError::Unavailable(e.to_string()),
            other => {
                let text = other.to_string();
                if text.contains("could not serialize access")
                    || text.contains("deadlock detected")
                    || text.contains("database is locked")
                {
                    ServiceError::Conflict(text)
                } else {
                    ServiceError::DatabaseError(other)
                }
            }
        }
    }
}

impl From<validator::ValidationErrors> for FieldErrors {
    fn from(err: validator::ValidationErrors) -> Self {
        let mut fields = FieldErrors::new();
        for (field, errors) in err.field_errors() {
            for error in errors {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| error.code.to_string());
                fields.add(field.to_string(), message);
            }
        }
        if fields.is_empty() {
            fields.add("__all__", err.to_string());
        }
        fields
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.into())
    }
}

impl ServiceError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ServiceError::ValidationError(FieldErrors::single(field, message))
    }

    pub fn not_found(entity: &str, id: impl fmt::Display) -> Self {
        ServiceError::NotFound(format!("{} {} not found", entity, id))
    }

    pub fn precondition(precondition: Precondition) -> Self {
        ServiceError::PreconditionFailed(precondition)
    }

    /// True for errors the command runner may retry once.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::Conflict(_))
    }

    /// Machine-readable code used in the error body.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DatabaseError(_) => "database_error",
            Self::NotFound(_) => "not_found",
            Self::ValidationError(_) => "validation_error",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::Conflict(_) => "conflict",
            Self::PreconditionFailed(p) => p.code(),
            Self::InvalidTransition(_) => "invalid_transition",
            Self::SequenceExhausted(_) => "sequence_exhausted",
            Self::Unavailable(_) => "unavailable",
            Self::EventError(_) => "event_error",
            Self::InternalError(_) => "internal_error",
        }
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::PreconditionFailed(_) | Self::InvalidTransition(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::DatabaseError(_)
            | Self::SequenceExhausted(_)
            | Self::EventError(_)
            | Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::EventError(_) | Self::InternalError(_) => "Internal server error".to_string(),
            Self::ValidationError(fields) => format!("Validation failed: {}", fields),
            Self::PreconditionFailed(p) => p.to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let request_id = current_request_id();

        if status.is_server_error() {
            tracing::error!(
                request_id = request_id.as_deref().unwrap_or("-"),
                error = %self,
                "request failed"
            );
        } else {
            tracing::debug!(
                request_id = request_id.as_deref().unwrap_or("-"),
                error = %self,
                "request rejected"
            );
        }

        let fields = match &self {
            ServiceError::ValidationError(fields) => Some(fields.clone().into_map()),
            _ => None,
        };

        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            code: self.code().to_string(),
            message: self.response_message(),
            fields,
            request_id,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use validator::Validate;

    #[tokio::test]
    async fn service_error_response_includes_request_id() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("req-123"), async {
                ServiceError::NotFound("missing".into()).into_response()
            })
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload.request_id.as_deref(), Some("req-123"));
        assert_eq!(payload.code, "not_found");
    }

    #[tokio::test]
    async fn validation_error_body_carries_field_map() {
        let mut fields = FieldErrors::new();
        fields.add("purchase_date", "must not be after sales_confirmation_date");
        fields.add("quantity", "must be greater than zero");

        let response = ServiceError::ValidationError(fields).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        let map = payload.fields.unwrap();
        assert_eq!(map.len(), 2);
        assert!(map.contains_key("quantity"));
    }

    #[test]
    fn service_error_status_code_mapping() {
        assert_eq!(
            ServiceError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::validation("f", "bad").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::Forbidden("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ServiceError::Conflict("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::precondition(Precondition::NoActiveTimer).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ServiceError::InvalidTransition("same".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ServiceError::Unavailable("db".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ServiceError::SequenceExhausted("Z999".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn precondition_codes_are_stable() {
        let err = ServiceError::precondition(Precondition::AnotherTimerRunning {
            assignment_id: "ASID_000001".into(),
        });
        assert_eq!(err.code(), "another_timer_running");
        assert!(err.response_message().contains("ASID_000001"));
        assert!(!err.is_retryable());
        assert!(ServiceError::Conflict("dup".into()).is_retryable());
    }

    #[test]
    fn response_message_hides_internal_details() {
        assert_eq!(
            ServiceError::InternalError("sensitive".into()).response_message(),
            "Internal server error"
        );
        assert_eq!(
            ServiceError::DatabaseError(DbErr::Custom("boom".into())).response_message(),
            "Database error"
        );
    }

    #[test]
    fn connection_failures_map_to_unavailable() {
        let err: ServiceError = DbErr::ConnectionAcquire(sea_orm::ConnAcquireErr::Timeout).into();
        assert!(matches!(err, ServiceError::Unavailable(_)));
    }

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 1, message = "must not be empty"))]
        name: String,
    }

    #[test]
    fn validator_errors_become_field_map() {
        let err: ServiceError = Sample {
            name: String::new(),
        }
        .validate()
        .unwrap_err()
        .into();
        match err {
            ServiceError::ValidationError(fields) => {
                assert_eq!(fields.get("name"), Some(&["must not be empty".to_string()][..]));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
