//! HTTP error mapping
//!
//! Every failure leaves the server as a problem JSON body. Errors raised
//! against a known entity also carry the `X-{app}-error` alert headers.

use axum::Json;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error};

use gestioneau_core::Error as CoreError;

/// Media type required by PATCH
pub const MERGE_PATCH_JSON: &str = "application/merge-patch+json";

#[derive(Debug, Error)]
pub enum ApiError {
    /// Rejected request on a known entity, with alert headers
    #[error("{message}")]
    Alert {
        status: StatusCode,
        message: String,
        entity_name: String,
        error_key: &'static str,
        headers: HeaderMap,
    },

    #[error("Content type '{0}' is not supported, expected application/merge-patch+json")]
    UnsupportedMediaType(String),

    #[error("Malformed request body: {0}")]
    MalformedBody(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Alert { status, .. } => *status,
            ApiError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::MalformedBody(_) => StatusCode::BAD_REQUEST,
            ApiError::Core(e) => match e {
                CoreError::BadRequest(_) => StatusCode::BAD_REQUEST,
                CoreError::NotFound { .. } | CoreError::UnknownResource(_) => {
                    StatusCode::NOT_FOUND
                }
                // The store's integrity rules are not mapped to a client error
                CoreError::ConstraintViolation(_)
                | CoreError::DatabaseError(_)
                | CoreError::SearchError(_)
                | CoreError::ConfigError(_)
                | CoreError::Serialization(_)
                | CoreError::Unexpected(_)
                | CoreError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

/// Problem body of every error response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
    pub title: String,
    pub status: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_key: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            debug!(status = status.as_u16(), error = %self, "Request rejected");
        }

        match self {
            ApiError::Alert {
                message,
                entity_name,
                error_key,
                headers,
                ..
            } => {
                let problem = Problem {
                    title: message,
                    status: status.as_u16(),
                    message: format!("error.{}", error_key),
                    detail: None,
                    entity_name: Some(entity_name),
                    error_key: Some(error_key.to_string()),
                };
                (status, headers, Json(problem)).into_response()
            }
            other => {
                let problem = Problem {
                    title: status
                        .canonical_reason()
                        .unwrap_or("Error")
                        .to_string(),
                    status: status.as_u16(),
                    message: format!("error.http.{}", status.as_u16()),
                    detail: Some(other.to_string()),
                    entity_name: None,
                    error_key: None,
                };
                (status, Json(problem)).into_response()
            }
        }
    }
}
