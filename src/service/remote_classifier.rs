use backon::ExponentialBuilder;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::api::completion_api::CompletionApi;
use crate::config::ClassifierConfig;
use crate::error::LensError;
use crate::query::intent::{
    AggregateFn, AggregationHint, Classification, Entities, IntentKind, PriceFilter,
    clamp_confidence,
};
use crate::service::classifier::IntentClassifier;
use crate::types::completion::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, RemoteIntent, ResponseFormat,
};

const SYSTEM_PROMPT: &str = r#"You classify questions about an equipment inventory.
Reply with a single JSON object and nothing else, using these keys:
  intent: one of aggregate, filtered, status, group_by, financial, maintenance, insert, update, delete, unknown
  confidence: number between 0 and 1
  department, category, status, condition, equipment_name, asset_tag: string or null
  price_min, price_max: number or null (bounds on current value)
  aggregation_type: sum, count, avg, min or max, or null
  aggregation_field: current_value, purchase_price or depreciation, or null
  group_by_field: department, category, status, location or condition, or null
  explanation: one short sentence
Categories: IT Equipment, Manufacturing Equipment, Office Equipment, Medical Devices, Vehicles, Tools.
Statuses: Active, In Maintenance, Out of Service, Retired, On Loan.
Conditions: Excellent, Good, Fair, Poor, Needs Repair.
Asset tags look like AST-000123. Use unknown when the question is not about the inventory."#;

/// Classifier backed by an OpenAI-compatible chat completions endpoint.
pub struct RemoteClassifier {
    client: reqwest::Client,
    endpoint: Url,
    api_key: Option<String>,
    model: String,
    temperature: f64,
    retry_policy: ExponentialBuilder,
}

impl RemoteClassifier {
    pub fn new(cfg: &ClassifierConfig) -> Result<Self, LensError> {
        let endpoint = cfg.endpoint.clone().ok_or_else(|| {
            LensError::ClassifierService("remote backend needs classifier.endpoint".to_string())
        })?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        let retry_policy = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(500))
            .with_max_delay(Duration::from_secs(3))
            .with_max_times(3)
            .with_jitter();
        Ok(Self {
            client,
            endpoint,
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
            temperature: cfg.temperature,
            retry_policy,
        })
    }

    fn request_body(&self, text: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            temperature: self.temperature,
            messages: vec![
                ChatMessage::system(SYSTEM_PROMPT),
                ChatMessage::user(format!("Question: {text}")),
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
        }
    }
}

impl IntentClassifier for RemoteClassifier {
    async fn classify(&self, text: &str) -> Result<Classification, LensError> {
        if text.trim().is_empty() {
            return Ok(Classification::unknown());
        }

        let body = self.request_body(text);
        let resp = CompletionApi::try_post_chat(
            self.client.clone(),
            &self.endpoint,
            self.api_key.as_deref(),
            self.retry_policy,
            &body,
        )
        .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(LensError::ClassifierService(format!(
                "upstream returned {status}"
            )));
        }

        let completion: ChatCompletionResponse = resp.json().await?;
        let Some(content) = completion.first_content() else {
            warn!("classifier service returned no content; treating as unknown");
            return Ok(Classification::unknown());
        };

        match serde_json::from_str::<RemoteIntent>(content) {
            Ok(remote) => {
                debug!(intent = %remote.intent, explanation = ?remote.explanation, "remote classification");
                Ok(remote.into())
            }
            Err(e) => {
                warn!(error = %e, "unparseable classifier output; treating as unknown");
                Ok(Classification::unknown())
            }
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("null"))
}

impl From<RemoteIntent> for Classification {
    fn from(r: RemoteIntent) -> Self {
        let intent_kind = IntentKind::parse_lenient(&r.intent);
        let confidence = match intent_kind {
            IntentKind::Unknown => 0.0,
            _ => clamp_confidence(r.confidence.unwrap_or(0.5)),
        };
        let aggregation = non_blank(r.aggregation_type)
            .and_then(|t| AggregateFn::parse_lenient(&t))
            .map(|function| AggregationHint {
                function,
                column: non_blank(r.aggregation_field),
            });
        Classification {
            intent_kind,
            entities: Entities {
                department: non_blank(r.department),
                category: non_blank(r.category),
                status: non_blank(r.status),
                condition: non_blank(r.condition),
                equipment_name: non_blank(r.equipment_name),
                asset_tag: non_blank(r.asset_tag).map(|t| t.to_ascii_uppercase()),
            },
            filters: PriceFilter {
                price_min: r.price_min.filter(|v| v.is_finite()),
                price_max: r.price_max.filter(|v| v.is_finite()),
            },
            aggregation,
            group_by: non_blank(r.group_by_field),
            confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_intent_maps_onto_classification() {
        let remote: RemoteIntent = serde_json::from_str(
            r#"{
                "intent": "aggregate_query",
                "confidence": 0.92,
                "department": "IT",
                "category": "",
                "price_min": 100.0,
                "aggregation_type": "sum",
                "aggregation_field": "current_value",
                "explanation": "total value"
            }"#,
        )
        .unwrap();
        let c: Classification = remote.into();
        assert_eq!(c.intent_kind, IntentKind::Aggregate);
        assert_eq!(c.confidence, 0.92);
        assert_eq!(c.entities.department.as_deref(), Some("IT"));
        assert_eq!(c.entities.category, None);
        assert_eq!(c.filters.price_min, Some(100.0));
        assert_eq!(
            c.aggregation,
            Some(AggregationHint {
                function: AggregateFn::Sum,
                column: Some("current_value".to_string()),
            })
        );
    }

    #[test]
    fn unrecognised_intent_degrades_to_unknown() {
        let remote: RemoteIntent =
            serde_json::from_str(r#"{"intent":"tell_a_joke","confidence":0.99}"#).unwrap();
        let c: Classification = remote.into();
        assert_eq!(c.intent_kind, IntentKind::Unknown);
        assert_eq!(c.confidence, 0.0);
    }

    #[test]
    fn out_of_range_confidence_is_clamped() {
        let remote: RemoteIntent =
            serde_json::from_str(r#"{"intent":"filtered","confidence":7}"#).unwrap();
        let c: Classification = remote.into();
        assert_eq!(c.confidence, 1.0);
    }

    #[test]
    fn missing_endpoint_is_rejected() {
        let cfg = ClassifierConfig::default();
        assert!(matches!(
            RemoteClassifier::new(&cfg),
            Err(LensError::ClassifierService(_))
        ));
    }

    #[tokio::test]
    async fn blank_text_skips_the_service() {
        let cfg = ClassifierConfig {
            endpoint: Some(Url::parse("http://127.0.0.1:9/v1/chat/completions").unwrap()),
            ..ClassifierConfig::default()
        };
        let classifier = RemoteClassifier::new(&cfg).unwrap();
        let c = classifier.classify("   ").await.unwrap();
        assert_eq!(c.intent_kind, IntentKind::Unknown);
    }

    mod served {
        use super::*;
        use crate::config::ClassifierBackend;
        use axum::{
            Json, Router,
            http::StatusCode,
            response::IntoResponse,
            routing::post,
        };
        use serde_json::{Value, json};
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};
        use tokio::net::TcpListener;

        async fn serve(app: Router) -> Url {
            let listener = TcpListener::bind("127.0.0.1:0")
                .await
                .expect("bind local listener");
            let addr = listener.local_addr().expect("local addr");
            tokio::spawn(async move {
                axum::serve(listener, app).await.expect("serve");
            });
            Url::parse(&format!("http://{addr}/v1/chat/completions")).expect("endpoint url")
        }

        fn classifier_for(endpoint: Url) -> RemoteClassifier {
            RemoteClassifier::new(&ClassifierConfig {
                backend: ClassifierBackend::Remote,
                endpoint: Some(endpoint),
                timeout_secs: 5,
                ..ClassifierConfig::default()
            })
            .expect("classifier")
        }

        fn completion(content: &str) -> Value {
            json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] })
        }

        fn replying(body: Value) -> Router {
            Router::new().route(
                "/v1/chat/completions",
                post(move || {
                    let body = body.clone();
                    async move { Json(body) }
                }),
            )
        }

        #[tokio::test]
        async fn well_formed_reply_is_classified() {
            let app = replying(completion(
                r#"{"intent":"group_by","confidence":0.8,"group_by_field":"category"}"#,
            ));
            let c = classifier_for(serve(app).await)
                .classify("equipment per category")
                .await
                .expect("classified");
            assert_eq!(c.intent_kind, IntentKind::GroupBy);
            assert_eq!(c.group_by.as_deref(), Some("category"));
            assert_eq!(c.confidence, 0.8);
        }

        #[tokio::test]
        async fn client_error_status_is_a_service_error() {
            let app = Router::new().route(
                "/v1/chat/completions",
                post(|| async { (StatusCode::UNAUTHORIZED, "bad key") }),
            );
            let err = classifier_for(serve(app).await)
                .classify("how many laptops")
                .await
                .expect_err("should fail");
            assert!(matches!(err, LensError::ClassifierService(_)));
        }

        #[tokio::test]
        async fn empty_or_garbled_content_degrades_to_unknown() {
            for content in ["", "I think they want a count", "{\"intent\": "] {
                let app = replying(completion(content));
                let c = classifier_for(serve(app).await)
                    .classify("how many laptops")
                    .await
                    .expect("degrades instead of failing");
                assert_eq!(c.intent_kind, IntentKind::Unknown, "{content:?}");
                assert_eq!(c.confidence, 0.0);
            }
        }

        #[tokio::test]
        async fn server_error_is_retried_until_success() {
            let hits = Arc::new(AtomicUsize::new(0));
            let counter = hits.clone();
            let app = Router::new().route(
                "/v1/chat/completions",
                post(move || {
                    let counter = counter.clone();
                    async move {
                        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                            return (StatusCode::SERVICE_UNAVAILABLE, "warming up").into_response();
                        }
                        Json(completion(r#"{"intent":"aggregate","confidence":0.9}"#))
                            .into_response()
                    }
                }),
            );
            let c = classifier_for(serve(app).await)
                .classify("how many laptops")
                .await
                .expect("retried");
            assert_eq!(c.intent_kind, IntentKind::Aggregate);
            assert_eq!(hits.load(Ordering::SeqCst), 2);
        }
    }
}
