use axum::{Json, extract::State};
use serde::Deserialize;
use tracing::info;

use crate::pipeline::QueryResponse;
use crate::query::intent::Classification;
use crate::{LensError, router::LensState};

#[derive(Debug, Deserialize)]
pub struct QuestionBody {
    pub text: String,
}

/// Classify only; nothing is executed or audited.
pub async fn classify_handler(
    State(state): State<LensState>,
    Json(body): Json<QuestionBody>,
) -> Result<Json<Classification>, LensError> {
    let classification = state.pipeline.classify(&body.text).await?;
    Ok(Json(classification))
}

/// Full round trip. Failures are reported in the body with `success: false`
/// so the chat client can show the message inline.
pub async fn query_handler(
    State(state): State<LensState>,
    Json(body): Json<QuestionBody>,
) -> Json<QueryResponse> {
    info!(chars = body.text.chars().count(), "question received");
    Json(state.pipeline.run(&body.text).await)
}

pub async fn healthz_handler() -> &'static str {
    "ok"
}
