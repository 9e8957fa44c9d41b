//! Typed output of intent classification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of things a user can ask for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    Aggregate,
    Filtered,
    Status,
    GroupBy,
    Financial,
    Maintenance,
    Insert,
    Update,
    Delete,
    #[default]
    Unknown,
}

impl IntentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aggregate => "aggregate",
            Self::Filtered => "filtered",
            Self::Status => "status",
            Self::GroupBy => "group_by",
            Self::Financial => "financial",
            Self::Maintenance => "maintenance",
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Unknown => "unknown",
        }
    }

    /// Lenient parse used for classifier service output. Anything unrecognised
    /// is `Unknown`.
    pub fn parse_lenient(raw: &str) -> Self {
        let normalized = raw.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.trim_end_matches("_query") {
            "aggregate" => Self::Aggregate,
            "filtered" | "filter" => Self::Filtered,
            "status" => Self::Status,
            "group_by" | "groupby" => Self::GroupBy,
            "financial" => Self::Financial,
            "maintenance" => Self::Maintenance,
            "insert" => Self::Insert,
            "update" => Self::Update,
            "delete" => Self::Delete,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured values pulled out of the question. Absent means "not mentioned".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entities {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_tag: Option<String>,
}

impl Entities {
    pub fn is_empty(&self) -> bool {
        self == &Entities::default()
    }
}

/// Inclusive price bounds on `current_value`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_max: Option<f64>,
}

impl PriceFilter {
    pub fn is_empty(&self) -> bool {
        self.price_min.is_none() && self.price_max.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateFn {
    Sum,
    Count,
    Avg,
    Min,
    Max,
}

impl AggregateFn {
    pub fn sql(&self) -> &'static str {
        match self {
            Self::Sum => "SUM",
            Self::Count => "COUNT",
            Self::Avg => "AVG",
            Self::Min => "MIN",
            Self::Max => "MAX",
        }
    }

    pub fn parse_lenient(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "sum" | "total" => Some(Self::Sum),
            "count" => Some(Self::Count),
            "avg" | "average" | "mean" => Some(Self::Avg),
            "min" | "minimum" => Some(Self::Min),
            "max" | "maximum" => Some(Self::Max),
            _ => None,
        }
    }
}

/// What to aggregate. `column` is unvalidated text from the classifier; the
/// builder maps it onto the schema or rejects it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationHint {
    pub function: AggregateFn,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub intent_kind: IntentKind,
    #[serde(default)]
    pub entities: Entities,
    #[serde(default)]
    pub filters: PriceFilter,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<AggregationHint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<String>,
    pub confidence: f64,
}

impl Classification {
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn new(intent_kind: IntentKind, confidence: f64) -> Self {
        Self {
            intent_kind,
            confidence: clamp_confidence(confidence),
            ..Self::default()
        }
    }
}

pub(crate) fn clamp_confidence(raw: f64) -> f64 {
    if raw.is_nan() { 0.0 } else { raw.clamp(0.0, 1.0) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lenient_intent_parse_accepts_service_spellings() {
        assert_eq!(IntentKind::parse_lenient("aggregate_query"), IntentKind::Aggregate);
        assert_eq!(IntentKind::parse_lenient("Group By"), IntentKind::GroupBy);
        assert_eq!(IntentKind::parse_lenient("maintenance_query"), IntentKind::Maintenance);
        assert_eq!(IntentKind::parse_lenient("summarize"), IntentKind::Unknown);
        assert_eq!(IntentKind::parse_lenient(""), IntentKind::Unknown);
    }

    #[test]
    fn classification_clamps_confidence() {
        assert_eq!(Classification::new(IntentKind::Filtered, 1.7).confidence, 1.0);
        assert_eq!(Classification::new(IntentKind::Filtered, -0.2).confidence, 0.0);
    }

    #[test]
    fn empty_entities_serialize_to_empty_object() {
        let json = serde_json::to_value(Entities::default()).unwrap();
        assert_eq!(json, serde_json::json!({}));
    }
}
