//! One question in, one widget out: classify, build, execute, shape, audit.

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::audit::{AuditRecord, AuditSink};
use crate::config::Config;
use crate::db::InventoryStorage;
use crate::error::LensError;
use crate::query::builder::{self, BuildContext, BuiltQuery};
use crate::query::intent::{Classification, IntentKind};
use crate::query::shaper::{self, ResultSet, Widget};
use crate::service::classifier::IntentClassifier;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResponse {
    pub intent_kind: IntentKind,
    pub confidence: f64,
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub widget: Option<Widget>,
}

pub struct QueryPipeline<C, A = InventoryStorage> {
    classifier: C,
    storage: InventoryStorage,
    audit: A,
    confidence_threshold: f64,
    row_limit: u32,
    maintenance_window_days: u32,
}

impl<C: IntentClassifier> QueryPipeline<C, InventoryStorage> {
    /// Pipeline that audits into the same store it queries.
    pub fn new(classifier: C, storage: InventoryStorage, cfg: &Config) -> Self {
        let audit = storage.clone();
        Self::with_audit(classifier, storage, audit, cfg)
    }
}

impl<C: IntentClassifier, A: AuditSink> QueryPipeline<C, A> {
    pub fn with_audit(classifier: C, storage: InventoryStorage, audit: A, cfg: &Config) -> Self {
        Self {
            classifier,
            storage,
            audit,
            confidence_threshold: cfg.classifier.confidence_threshold,
            row_limit: cfg.query.row_limit,
            maintenance_window_days: cfg.query.maintenance_window_days,
        }
    }

    pub async fn classify(&self, text: &str) -> Result<Classification, LensError> {
        self.classifier.classify(text).await
    }

    pub async fn run(&self, text: &str) -> QueryResponse {
        self.run_on(text, Utc::now().date_naive()).await
    }

    /// Same as [`run`](Self::run) with an explicit "today" for date windows.
    pub async fn run_on(&self, text: &str, today: NaiveDate) -> QueryResponse {
        let mut classification: Option<Classification> = None;
        let outcome = self.execute(text, today, &mut classification).await;

        let (intent_kind, confidence) = classification
            .as_ref()
            .map(|c| (c.intent_kind, c.confidence))
            .unwrap_or((IntentKind::Unknown, 0.0));

        match outcome {
            Ok((query, rows)) => {
                let record = audit_record(text, classification.as_ref(), &query, &rows);
                let widget = shaper::shape(&query, rows);
                info!(
                    intent = %intent_kind,
                    widget = %widget.widget_id,
                    "query answered"
                );
                self.append_audit(record).await;
                QueryResponse {
                    intent_kind,
                    confidence,
                    success: true,
                    message: widget.summary_text.clone(),
                    widget: Some(widget),
                }
            }
            Err(e) => {
                match &e {
                    LensError::QueryExecutionFailed(inner) => {
                        error!(intent = %intent_kind, error = %inner, "query execution failed")
                    }
                    LensError::ClassifierService(_) | LensError::Http(_) => {
                        warn!(error = %e, "classifier unavailable")
                    }
                    other => debug!(intent = %intent_kind, reason = %other, "question not answered"),
                }
                let record = AuditRecord::new(intent_kind.as_str(), text, false)
                    .with_changes(Some(e.to_string()));
                self.append_audit(record).await;
                QueryResponse {
                    intent_kind,
                    confidence,
                    success: false,
                    message: e.user_message(),
                    widget: None,
                }
            }
        }
    }

    async fn execute(
        &self,
        text: &str,
        today: NaiveDate,
        out: &mut Option<Classification>,
    ) -> Result<(BuiltQuery, ResultSet), LensError> {
        let classification = out.insert(self.classifier.classify(text).await?);
        debug!(
            intent = %classification.intent_kind,
            confidence = classification.confidence,
            "classified"
        );

        if classification.intent_kind != IntentKind::Unknown
            && classification.confidence < self.confidence_threshold
        {
            return Err(LensError::ClassificationAmbiguous {
                confidence: classification.confidence,
            });
        }

        let ctx = BuildContext {
            today,
            maintenance_window_days: self.maintenance_window_days,
            row_limit: self.row_limit,
        };
        let query = builder::build(classification, &ctx)?;
        let rows = self.storage.execute(&query).await?;
        Ok((query, rows))
    }

    async fn append_audit(&self, record: AuditRecord) {
        if let Err(e) = self.audit.append(record).await {
            warn!(error = %e, "failed to append audit record");
        }
    }
}

fn audit_record(
    text: &str,
    classification: Option<&Classification>,
    query: &BuiltQuery,
    rows: &ResultSet,
) -> AuditRecord {
    let record = AuditRecord::new(query.intent.as_str(), text, true);
    match query.intent {
        // The deleted row is gone, so its id cannot be referenced.
        IntentKind::Delete => record.with_changes(Some(format!("deleted {} row(s)", rows.rows.len()))),
        IntentKind::Update => {
            let equipment_id = rows
                .column_index("id")
                .and_then(|i| rows.rows.first().and_then(|r| r[i].as_i64()));
            let changes = classification.and_then(|c| serde_json::to_string(&c.entities).ok());
            record.with_equipment(equipment_id).with_changes(changes)
        }
        _ => record,
    }
}
