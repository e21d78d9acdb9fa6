//! Error handling.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::header,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use sled::transaction::TransactionError;
use std::error::Error;
use thiserror::Error;
use tracing::{event, Level};
use uuid::Uuid;

/// X-Ray server error type
///
/// This type encapsulates the various errors that may occur.
/// Each variant may result in a different API error response.
#[derive(Debug, Error)]
pub enum XRayError {
    /// A step reported more selected candidates than candidates in total
    #[error("inconsistent candidate counts for step {step_id} ({selected} selected > {total} total)")]
    CandidateCountMismatch {
        step_id: Uuid,
        total: u64,
        selected: u64,
    },

    /// Error deserialising request data into a request model
    #[error("request data is not valid")]
    RequestDataJsonRejection(#[from] JsonRejection),

    /// Error validating request data (single error)
    #[error("request data is not valid")]
    RequestDataValidationSingle(#[from] validator::ValidationError),

    /// Error validating request data (multiple errors)
    #[error("request data is not valid")]
    RequestDataValidation(#[from] validator::ValidationErrors),

    /// Error extracting identifiers from the request path
    #[error("request path is not valid")]
    RequestPathRejection(#[from] PathRejection),

    /// Error deserialising the request query string
    #[error("request query is not valid")]
    RequestQueryRejection(#[from] QueryRejection),

    /// No run exists with the requested ID
    #[error("run not found with id {run_id}")]
    RunNotFound { run_id: Uuid },

    /// Error (de)serialising a stored record
    #[error("failed to (de)serialise stored record")]
    Serialisation(#[from] serde_json::Error),

    /// No step exists with the requested ID
    #[error("step not found with id {step_id}")]
    StepNotFound { step_id: Uuid },

    /// Error reading from or writing to the store
    #[error("error accessing the store")]
    Storage(#[from] sled::Error),

    /// A store transaction was aborted
    #[error("store transaction aborted")]
    StorageTransactionAborted,

    /// Error converting between integer types
    #[error(transparent)]
    TryFromInt(#[from] std::num::TryFromIntError),
}

impl From<TransactionError<()>> for XRayError {
    /// Convert from a sled [TransactionError] into an `XRayError`.
    fn from(error: TransactionError<()>) -> Self {
        match error {
            TransactionError::Abort(()) => XRayError::StorageTransactionAborted,
            TransactionError::Storage(error) => XRayError::Storage(error),
        }
    }
}

impl IntoResponse for XRayError {
    /// Convert from an `XRayError` into an [axum::response::Response].
    fn into_response(self) -> Response {
        ErrorResponse::from(self).into_response()
    }
}

/// Body of error response
///
/// Implements serde (de)serialise.
#[derive(Deserialize, Serialize)]
struct ErrorBody {
    /// Main error message
    message: String,

    /// Optional list of causes
    #[serde(skip_serializing_if = "Option::is_none")]
    caused_by: Option<Vec<String>>,
}

impl ErrorBody {
    /// Return a new ErrorBody
    ///
    /// # Arguments
    ///
    /// * `error`: The error that occurred
    fn new<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        let message = error.to_string();
        let mut causes = Vec::new();
        let mut current = error.source();
        while let Some(source) = current {
            causes.push(source.to_string());
            current = source.source();
        }
        // Remove duplicate entries.
        causes.dedup();
        let caused_by = if causes.is_empty() {
            None
        } else {
            Some(causes)
        };
        ErrorBody { message, caused_by }
    }
}

/// A response to send in error cases
///
/// Carries the `success` flag of the API envelope, always false here.
#[derive(Deserialize, Serialize)]
struct ErrorResponse {
    /// HTTP status of the response
    #[serde(skip)]
    status: StatusCode,

    /// Always false for errors
    success: bool,

    /// Response body
    error: ErrorBody,
}

impl ErrorResponse {
    /// Return a new ErrorResponse
    ///
    /// # Arguments
    ///
    /// * `status`: HTTP status of the response
    /// * `error`: The error that occurred. This will be formatted into a suitable `ErrorBody`
    fn new<E>(status: StatusCode, error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        ErrorResponse {
            status,
            success: false,
            error: ErrorBody::new(error),
        }
    }

    /// Return a 400 bad request ErrorResponse
    fn bad_request<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        Self::new(StatusCode::BAD_REQUEST, error)
    }

    /// Return a 404 not found ErrorResponse
    fn not_found<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        Self::new(StatusCode::NOT_FOUND, error)
    }

    /// Return a 500 internal server error ErrorResponse
    fn internal_server_error<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, error)
    }
}

impl From<XRayError> for ErrorResponse {
    /// Convert from an `XRayError` into an `ErrorResponse`.
    fn from(error: XRayError) -> Self {
        let response = match &error {
            // Bad request
            XRayError::RequestDataJsonRejection(_)
            | XRayError::RequestDataValidationSingle(_)
            | XRayError::RequestDataValidation(_)
            | XRayError::RequestPathRejection(_)
            | XRayError::RequestQueryRejection(_) => Self::bad_request(&error),

            // Not found
            XRayError::RunNotFound { run_id: _ } | XRayError::StepNotFound { step_id: _ } => {
                Self::not_found(&error)
            }

            // Internal server error
            XRayError::CandidateCountMismatch {
                step_id: _,
                total: _,
                selected: _,
            }
            | XRayError::Serialisation(_)
            | XRayError::Storage(_)
            | XRayError::StorageTransactionAborted
            | XRayError::TryFromInt(_) => Self::internal_server_error(&error),
        };

        // Log server errors.
        if response.status.is_server_error() {
            event!(Level::ERROR, "{}", error.to_string());
            let mut current = error.source();
            while let Some(source) = current {
                event!(Level::ERROR, "Caused by: {}", source.to_string());
                current = source.source();
            }
        }

        response
    }
}

impl IntoResponse for ErrorResponse {
    /// Convert from an `ErrorResponse` into an `axum::response::Response`.
    ///
    /// Renders the response as JSON.
    fn into_response(self) -> Response {
        let json_body = serde_json::to_string_pretty(&self);
        match json_body {
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to serialise error response: {}", err),
            )
                .into_response(),
            Ok(json_body) => (
                self.status,
                [(&header::CONTENT_TYPE, mime::APPLICATION_JSON.to_string())],
                json_body,
            )
                .into_response(),
        }
    }
}
