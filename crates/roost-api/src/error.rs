use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Handler failure. Every variant but `Internal` is a client error whose
/// message is returned as-is in `{"detail": ...}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(&'static str),

    #[error("{0}")]
    Validation(&'static str),

    #[error("{0}")]
    Unauthorized(&'static str),

    /// The request could not be extracted. Keeps axum's status (400, 415
    /// or 422) and its explanation.
    #[error("{detail}")]
    Rejected { status: StatusCode, detail: String },

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Rejected { status, .. } => *status,
            ApiError::Internal(e) => {
                error!("Request failed: {:#}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

macro_rules! from_rejection {
    ($($rejection:ty),+) => {
        $(
            impl From<$rejection> for ApiError {
                fn from(rejection: $rejection) -> Self {
                    ApiError::Rejected {
                        status: rejection.status(),
                        detail: rejection.body_text(),
                    }
                }
            }
        )+
    };
}

from_rejection!(JsonRejection, QueryRejection, PathRejection);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_errors_do_not_leak_details() {
        let err = ApiError::from(anyhow::anyhow!("disk I/O error at /var/lib/roost.db"));
        assert_eq!(err.to_string(), "Internal server error");
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn client_errors_map_to_their_status() {
        assert_eq!(ApiError::NotFound("User not found").into_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Conflict("dup").into_response().status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::Validation("bad").into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn rejections_keep_their_status_and_text() {
        let err = ApiError::Rejected {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            detail: "missing field `title`".into(),
        };
        assert_eq!(err.to_string(), "missing field `title`");
        assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
