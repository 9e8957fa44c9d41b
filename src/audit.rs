//! Append-only record of executed queries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;

use crate::error::LensError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub equipment_id: Option<i64>,
    pub user_query: String,
    pub changes: Option<String>,
    pub success: bool,
}

impl AuditRecord {
    pub fn new(action: impl Into<String>, user_query: impl Into<String>, success: bool) -> Self {
        Self {
            timestamp: Utc::now(),
            action: action.into(),
            equipment_id: None,
            user_query: user_query.into(),
            changes: None,
            success,
        }
    }

    pub fn with_equipment(mut self, equipment_id: Option<i64>) -> Self {
        self.equipment_id = equipment_id;
        self
    }

    pub fn with_changes(mut self, changes: Option<String>) -> Self {
        self.changes = changes;
        self
    }
}

/// Write-once sink the pipeline calls after every execution.
pub trait AuditSink: Send + Sync {
    fn append(&self, record: AuditRecord) -> impl Future<Output = Result<(), LensError>> + Send;
}
