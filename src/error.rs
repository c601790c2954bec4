use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::engine::policy::DenyReason;
use crate::models::shipment::ShipmentStatus;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("user {0} not found")]
    UserNotFound(String),

    #[error("conversation {0} not found")]
    ConversationNotFound(String),

    #[error("shipment {0} not found")]
    ShipmentNotFound(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("forbidden: {0}")]
    Forbidden(DenyReason),

    #[error("user {user_id} is not a participant of conversation {conversation_id}")]
    NotParticipant {
        conversation_id: String,
        user_id: String,
    },

    #[error("transition from {from} to {to} is not allowed")]
    InvalidTransition {
        from: ShipmentStatus,
        to: ShipmentStatus,
    },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Storage(#[source] StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable code the client uses to pick a remediation
    /// flow.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::UserNotFound(_) => "user_not_found",
            AppError::ConversationNotFound(_) => "conversation_not_found",
            AppError::ShipmentNotFound(_) => "shipment_not_found",
            AppError::NotFound(_) => "not_found",
            AppError::Validation(_) => "validation_error",
            AppError::Forbidden(reason) => reason.code(),
            AppError::NotParticipant { .. } => "not_participant",
            AppError::InvalidTransition { .. } => "invalid_transition",
            AppError::Conflict(_) => "conflict",
            AppError::Storage(_) => "storage_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    pub(crate) fn status(&self) -> StatusCode {
        match self {
            AppError::UserNotFound(_)
            | AppError::ConversationNotFound(_)
            | AppError::ShipmentNotFound(_)
            | AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden(_) | AppError::NotParticipant { .. } => StatusCode::FORBIDDEN,
            AppError::InvalidTransition { .. } | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Storage(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Missing entities keep their typed not-found error instead of surfacing as
/// a storage failure. Anything else the store reports is a server fault.
impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { kind, id } => match kind {
                "user" => AppError::UserNotFound(id),
                "conversation" => AppError::ConversationNotFound(id),
                "shipment" => AppError::ShipmentNotFound(id),
                _ => AppError::NotFound(format!("{kind} {id} not found")),
            },
            err @ StoreError::DuplicateKey { .. } => AppError::Storage(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = Json(json!({
            "error": self.to_string(),
            "code": self.code(),
        }));

        (status, body).into_response()
    }
}
