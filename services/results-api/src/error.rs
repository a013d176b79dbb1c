// Copyright 2025 BenchHub Contributors
// SPDX-License-Identifier: Apache-2.0

//! JSON error responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use benchhub_benchmarks::SourceError;
use chrono::Utc;
use serde_json::json;
use std::io::ErrorKind;
use tracing::error;

/// Error returned by a handler.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = code;
        self
    }
}

impl From<SourceError> for ApiError {
    fn from(err: SourceError) -> Self {
        match &err {
            SourceError::Io { source, .. } if source.kind() == ErrorKind::NotFound => {
                Self::not_found(err.to_string())
            }
            SourceError::InvalidReference(_) => {
                Self::bad_request("invalid_reference", err.to_string())
            }
            _ => {
                error!(error = %err, "Failed to read results");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "results_unreadable",
                    err.to_string(),
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "code": self.code,
                "message": self.message,
            },
            "meta": {
                "timestamp": Utc::now().to_rfc3339(),
            }
        }));
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_maps_to_not_found() {
        let err = SourceError::Io {
            reference: "results/index.json".to_string(),
            source: std::io::Error::new(ErrorKind::NotFound, "gone"),
        };
        let api: ApiError = err.into();
        assert_eq!(api.status, StatusCode::NOT_FOUND);
        assert_eq!(api.code, "not_found");
    }

    #[test]
    fn test_other_io_errors_are_server_errors() {
        let err = SourceError::Io {
            reference: "results/index.json".to_string(),
            source: std::io::Error::new(ErrorKind::PermissionDenied, "denied"),
        };
        let api: ApiError = err.into();
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
