use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum LensError {
    #[error("classification too uncertain (confidence {confidence:.2})")]
    ClassificationAmbiguous { confidence: f64 },

    #[error("unsupported intent: {0}")]
    UnsupportedIntent(String),

    #[error("query execution failed: {0}")]
    QueryExecutionFailed(#[from] SqlxError),

    #[error("classifier service error: {0}")]
    ClassifierService(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(#[from] figment::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LensError {
    /// Message shown next to the chat transcript. Never includes store internals.
    pub fn user_message(&self) -> String {
        match self {
            LensError::ClassificationAmbiguous { .. } => {
                "I'm not sure what you're asking. Could you rephrase the question?".to_string()
            }
            LensError::UnsupportedIntent(reason) => format!("I don't understand: {reason}"),
            LensError::ClassifierService(_) | LensError::Http(_) | LensError::Json(_) => {
                "The language service is unavailable right now. Please try again later."
                    .to_string()
            }
            LensError::QueryExecutionFailed(_) | LensError::Config(_) | LensError::Io(_) => {
                "Something went wrong while running the query.".to_string()
            }
        }
    }
}

impl IntoResponse for LensError {
    fn into_response(self) -> axum::response::Response {
        let (status, code) = match &self {
            LensError::ClassificationAmbiguous { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "AMBIGUOUS")
            }
            LensError::UnsupportedIntent(_) => (StatusCode::UNPROCESSABLE_ENTITY, "UNSUPPORTED"),
            LensError::ClassifierService(_) | LensError::Http(_) | LensError::Json(_) => {
                (StatusCode::BAD_GATEWAY, "BAD_GATEWAY")
            }
            LensError::QueryExecutionFailed(_) | LensError::Config(_) | LensError::Io(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };
        let body = ApiErrorBody {
            code: code.to_string(),
            message: self.user_message(),
        };
        (status, Json(ApiErrorResponse { error: body })).into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}
