//! Errors that abort a job request before a response body can be shaped.
//!
//! Analysis problems are not here: they travel as data inside
//! `AnalysisResult::Failed` and still produce a 200 response.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum WorkerError {
    /// Malformed job request (400)
    #[error("{0}")]
    BadRequest(String),

    /// Storage fetch failed (500)
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Temporary file handling failed (500)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl WorkerError {
    pub fn status(&self) -> StatusCode {
        match self {
            WorkerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            WorkerError::BadRequest(_) => "BAD_REQUEST",
            WorkerError::Storage(_) => "STORAGE_ERROR",
            WorkerError::Io(_) => "IO_ERROR",
            WorkerError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for WorkerError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        }));

        (self.status(), body).into_response()
    }
}

pub type WorkerResult<T> = Result<T, WorkerError>;
