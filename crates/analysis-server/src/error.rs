//! HTTP error mapping.
//!
//! Every handler failure is an [`ApiError`], rendered as
//! `{"error": "<message>"}` with a 4xx or 500 status.

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chess_analysis::{CommentaryError, EvaluatorFailure};
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// A required request field was empty. The message is sent as is.
    #[error("{0}")]
    MissingField(&'static str),
    #[error("Invalid PGN format")]
    InvalidRecord,
    #[error("Invalid FEN: {0}")]
    InvalidPosition(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    CommentaryUnavailable(String),
    #[error("{0}")]
    EvaluatorUnavailable(String),
    #[error("{0}")]
    Upstream(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingField(_)
            | ApiError::InvalidRecord
            | ApiError::InvalidPosition(_)
            | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::CommentaryUnavailable(_)
            | ApiError::EvaluatorUnavailable(_)
            | ApiError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<CommentaryError> for ApiError {
    fn from(e: CommentaryError) -> Self {
        match e {
            CommentaryError::NotConfigured | CommentaryError::Unavailable(_) => {
                ApiError::CommentaryUnavailable(e.to_string())
            }
            other => ApiError::Upstream(other.to_string()),
        }
    }
}

impl From<EvaluatorFailure> for ApiError {
    fn from(e: EvaluatorFailure) -> Self {
        match e {
            EvaluatorFailure::Unavailable(reason) => ApiError::EvaluatorUnavailable(reason),
            EvaluatorFailure::Engine(e) => ApiError::Upstream(format!("Stockfish error: {}", e)),
        }
    }
}

/// JSON body extractor whose rejections are rendered as [`ApiError`].
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(ApiError::BadRequest(rejection.body_text())),
        }
    }
}
