use asset_lens::QueryPipeline;
use asset_lens::config::Config;
use asset_lens::db::{InventoryStorage, NewEquipment};
use asset_lens::router::{LensState, lens_router};
use asset_lens::service::classifier::{Classifier, KeywordClassifier};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use serde_json::Value;
use tower::ServiceExt;

async fn app() -> Router {
    let storage = InventoryStorage::connect("sqlite::memory:")
        .await
        .expect("in-memory store");
    let rows = [("AST-000001", "IT"), ("AST-000002", "IT"), ("AST-000003", "HR")]
        .into_iter()
        .map(|(tag, department)| NewEquipment {
            asset_tag: tag.to_string(),
            name: format!("Item {tag}"),
            category: "Office Equipment".to_string(),
            purchase_price: 1000.0,
            current_value: 750.0,
            department: department.to_string(),
            status: "Active".to_string(),
            ..NewEquipment::default()
        })
        .collect::<Vec<_>>();
    storage
        .insert_equipment_many(&rows)
        .await
        .expect("fixture insert");

    let classifier = Classifier::Keyword(KeywordClassifier::new());
    let pipeline = QueryPipeline::new(classifier, storage, &Config::default());
    lens_router(LensState::new(pipeline))
}

async fn post_json(app: Router, uri: &str, text: &str) -> (StatusCode, Value) {
    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(serde_json::json!({ "text": text }).to_string()))
                .expect("failed to build request"),
        )
        .await
        .expect("request failed");
    let status = resp.status();
    let body = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    let json = serde_json::from_slice(&body).expect("response body was not json");
    (status, json)
}

#[tokio::test]
async fn healthz_returns_ok() {
    let resp = app()
        .await
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .body(Body::empty())
                .expect("failed to build request"),
        )
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    let body = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn classify_route_returns_entities() {
    let (status, body) = post_json(app().await, "/api/classify", "Which devices belong to HR?").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["intent_kind"], "filtered");
    assert_eq!(body["entities"]["department"], "HR");
}

#[tokio::test]
async fn query_route_renders_group_by_chart() {
    let (status, body) = post_json(app().await, "/api/query", "Show equipment by department").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["intent_kind"], "group_by");
    assert_eq!(body["widget"]["widget_kind"], "chart");
    assert_eq!(body["widget"]["data"]["chart_type"], "bar");
    assert_eq!(body["widget"]["data"]["points"][0]["label"], "IT");
    assert_eq!(body["widget"]["data"]["points"][0]["value"].as_f64(), Some(2.0));
}

#[tokio::test]
async fn query_route_reports_failures_inline() {
    let (status, body) = post_json(app().await, "/api/query", "sing me a song").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert!(body.get("widget").is_none());
    assert!(
        body["message"]
            .as_str()
            .is_some_and(|m| m.starts_with("I don't understand"))
    );
}
