use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::handlers::query::{classify_handler, healthz_handler, query_handler};
use crate::pipeline::QueryPipeline;
use crate::service::classifier::Classifier;

#[derive(Clone)]
pub struct LensState {
    pub pipeline: Arc<QueryPipeline<Classifier>>,
}

impl LensState {
    pub fn new(pipeline: QueryPipeline<Classifier>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

/// Endpoints:
/// - POST /api/classify  - classification only
/// - POST /api/query     - classify, execute and shape into a widget
/// - GET  /healthz       - liveness
pub fn lens_router(state: LensState) -> Router {
    Router::new()
        .route("/api/classify", post(classify_handler))
        .route("/api/query", post(query_handler))
        .route("/healthz", get(healthz_handler))
        .with_state(state)
}
