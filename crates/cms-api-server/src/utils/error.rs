use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

/// API-level error taxonomy. Every variant carries a stable machine code and
/// an HTTP status; none of these is fatal to the process.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Cannot create existing post.")]
    PostExists,

    /// The requested item does not resolve to a stored post.
    #[error("Invalid post ID.")]
    PostNotFound,

    /// A supplied `object_id` does not resolve during write preparation.
    #[error("Invalid post ID.")]
    InvalidPostId,

    #[error("Invalid term ID.")]
    InvalidTermId,

    #[error("Request missing widget type.")]
    WidgetMissingType,

    #[error("Requested widget type was not found.")]
    WidgetTypeNotFound,

    #[error("Invalid parameter: {0}")]
    InvalidParam(String),

    /// Failure reported by the object store or one of its subsystems,
    /// carried through with the status the classification step assigned.
    #[error("{message}")]
    Store {
        code: String,
        message: String,
        status: StatusCode,
    },

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn code(&self) -> &str {
        match self {
            ApiError::PostExists => "rest_post_exists",
            ApiError::PostNotFound | ApiError::InvalidPostId => "rest_post_invalid_id",
            ApiError::InvalidTermId => "rest_term_invalid_id",
            ApiError::WidgetMissingType => "rest_widget_missing_type",
            ApiError::WidgetTypeNotFound => "rest_widget_type_not_found",
            ApiError::InvalidParam(_) => "rest_invalid_param",
            ApiError::Store { code, .. } => code,
            ApiError::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::PostExists
            | ApiError::InvalidPostId
            | ApiError::InvalidTermId
            | ApiError::WidgetMissingType
            | ApiError::InvalidParam(_) => StatusCode::BAD_REQUEST,
            ApiError::PostNotFound | ApiError::WidgetTypeNotFound => StatusCode::NOT_FOUND,
            ApiError::Store { status, .. } => *status,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Classify a save failure from the store: the internal insert/update
    /// failure codes map to 500, anything else the store reports maps to 400.
    pub fn from_save_error(err: StoreError, creating: bool) -> Self {
        let fatal = if creating {
            "db_insert_error"
        } else {
            "db_update_error"
        };
        let status = if err.code == fatal {
            StatusCode::INTERNAL_SERVER_ERROR
        } else {
            StatusCode::BAD_REQUEST
        };
        ApiError::Store {
            code: err.code,
            message: err.message,
            status,
        }
    }

    /// Metadata failures are propagated unchanged, with whatever status the
    /// metadata subsystem attached.
    pub fn from_meta_error(err: StoreError) -> Self {
        let status = err
            .status
            .and_then(|s| StatusCode::from_u16(s).ok())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        ApiError::Store {
            code: err.code,
            message: err.message,
            status,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    code: String,
    message: String,
    data: serde_json::Value,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code().to_string();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!("{}: {}", code, message);
        } else {
            tracing::warn!("{}: {}", code, message);
        }

        let body = Json(ErrorResponse {
            code,
            message,
            data: json!({ "status": status.as_u16() }),
        });

        (status, body).into_response()
    }
}
