//! Deterministic SQL construction for classified intents.
//!
//! Only identifiers taken from the closed enums below are ever written into
//! the SQL text. Every value that originates from the user's question is
//! emitted as a `?` placeholder and carried in [`BuiltQuery::params`].

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::config::QueryConfig;
use crate::error::LensError;
use crate::query::intent::{AggregateFn, AggregationHint, Classification, Entities, IntentKind, PriceFilter};

const EQUIPMENT_TABLE: &str = "equipment";
const DEFAULT_STATUS: &str = "Active";

/// Per-request inputs that are not part of the classification.
#[derive(Debug, Clone, Copy)]
pub struct BuildContext {
    pub today: NaiveDate,
    pub maintenance_window_days: u32,
    pub row_limit: u32,
}

impl BuildContext {
    pub fn new(today: NaiveDate, cfg: &QueryConfig) -> Self {
        Self {
            today,
            maintenance_window_days: cfg.maintenance_window_days,
            row_limit: cfg.row_limit,
        }
    }
}

/// A value bound to one `?` placeholder.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlParam {
    Text(String),
    Real(f64),
    Integer(i64),
}

/// How the measure of a result should be formatted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Currency,
    Count,
    Plain,
}

/// Display hints carried from the builder to the result shaper.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Presentation {
    pub widget_id: String,
    pub title: String,
    pub unit: Unit,
    /// Noun for the rows or groups, e.g. `department` for a group-by.
    pub subject: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuiltQuery {
    pub intent: IntentKind,
    pub sql: String,
    pub params: Vec<SqlParam>,
    pub presentation: Presentation,
}

impl BuiltQuery {
    pub fn placeholder_count(&self) -> usize {
        self.sql.matches('?').count()
    }
}

/// Columns a result may be grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupColumn {
    Department,
    Category,
    Status,
    Location,
    Condition,
}

impl GroupColumn {
    pub fn parse(raw: &str) -> Option<Self> {
        match normalize_ident(raw).trim_end_matches('s') {
            "department" | "dept" => Some(Self::Department),
            "category" | "categorie" | "type" => Some(Self::Category),
            "status" | "statu" | "statuse" => Some(Self::Status),
            "location" | "site" => Some(Self::Location),
            "condition" => Some(Self::Condition),
            _ => None,
        }
    }

    pub fn sql(&self) -> &'static str {
        match self {
            Self::Department => "department",
            Self::Category => "category",
            Self::Status => "status",
            Self::Location => "location",
            Self::Condition => "condition",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Department => "Department",
            Self::Category => "Category",
            Self::Status => "Status",
            Self::Location => "Location",
            Self::Condition => "Condition",
        }
    }
}

/// Numeric expressions that can be aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measure {
    CurrentValue,
    PurchasePrice,
    Depreciation,
    DepreciationRate,
    MaintenanceIntervalDays,
}

impl Measure {
    pub fn parse(raw: &str) -> Option<Self> {
        match normalize_ident(raw).as_str() {
            "current_value" | "value" | "total_value" | "worth" => Some(Self::CurrentValue),
            "purchase_price" | "price" | "cost" | "purchase_cost" => Some(Self::PurchasePrice),
            "depreciation" | "total_depreciation" => Some(Self::Depreciation),
            "depreciation_rate" => Some(Self::DepreciationRate),
            "maintenance_interval_days" | "maintenance_interval" => {
                Some(Self::MaintenanceIntervalDays)
            }
            _ => None,
        }
    }

    pub fn sql(&self) -> &'static str {
        match self {
            Self::CurrentValue => "current_value",
            Self::PurchasePrice => "purchase_price",
            Self::Depreciation => "purchase_price - current_value",
            Self::DepreciationRate => "depreciation_rate",
            Self::MaintenanceIntervalDays => "maintenance_interval_days",
        }
    }

    fn alias(&self) -> &'static str {
        match self {
            Self::CurrentValue => "value",
            Self::PurchasePrice => "price",
            Self::Depreciation => "depreciation",
            Self::DepreciationRate => "depreciation_rate",
            Self::MaintenanceIntervalDays => "maintenance_interval",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::CurrentValue => "Equipment Value",
            Self::PurchasePrice => "Purchase Price",
            Self::Depreciation => "Depreciation",
            Self::DepreciationRate => "Depreciation Rate",
            Self::MaintenanceIntervalDays => "Maintenance Interval (days)",
        }
    }

    fn unit(&self) -> Unit {
        match self {
            Self::CurrentValue | Self::PurchasePrice | Self::Depreciation => Unit::Currency,
            Self::DepreciationRate | Self::MaintenanceIntervalDays => Unit::Plain,
        }
    }
}

fn normalize_ident(raw: &str) -> String {
    raw.trim().to_ascii_lowercase().replace([' ', '-'], "_")
}

/// Conjunction of predicates with their bound values.
#[derive(Default)]
struct Predicates {
    clauses: Vec<&'static str>,
    params: Vec<SqlParam>,
}

impl Predicates {
    fn push(&mut self, clause: &'static str, param: SqlParam) {
        self.clauses.push(clause);
        self.params.push(param);
    }

    /// One predicate per present entity or bound; absent ones are omitted.
    fn from_filters(entities: &Entities, filters: &PriceFilter) -> Self {
        let mut preds = Self::default();
        if let Some(v) = &entities.department {
            preds.push("department = ? COLLATE NOCASE", SqlParam::Text(v.clone()));
        }
        if let Some(v) = &entities.category {
            preds.push("category = ? COLLATE NOCASE", SqlParam::Text(v.clone()));
        }
        if let Some(v) = &entities.status {
            preds.push("status = ? COLLATE NOCASE", SqlParam::Text(v.clone()));
        }
        if let Some(v) = &entities.condition {
            preds.push("condition = ? COLLATE NOCASE", SqlParam::Text(v.clone()));
        }
        if let Some(v) = &entities.equipment_name {
            preds.push("name LIKE ?", SqlParam::Text(format!("%{v}%")));
        }
        if let Some(v) = &entities.asset_tag {
            preds.push("asset_tag = ? COLLATE NOCASE", SqlParam::Text(v.clone()));
        }
        if let Some(min) = filters.price_min {
            preds.push("current_value >= ?", SqlParam::Real(min));
        }
        if let Some(max) = filters.price_max {
            preds.push("current_value <= ?", SqlParam::Real(max));
        }
        preds
    }

    fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }
}

/// Translate a classification into a parameterized query.
pub fn build(classification: &Classification, ctx: &BuildContext) -> Result<BuiltQuery, LensError> {
    let entities = &classification.entities;
    let filters = &classification.filters;
    match classification.intent_kind {
        IntentKind::Aggregate => build_aggregate(
            IntentKind::Aggregate,
            classification.aggregation.as_ref(),
            entities,
            filters,
        ),
        IntentKind::Financial => {
            let default = AggregationHint {
                function: AggregateFn::Sum,
                column: Some("current_value".to_string()),
            };
            build_aggregate(
                IntentKind::Financial,
                Some(classification.aggregation.as_ref().unwrap_or(&default)),
                entities,
                filters,
            )
        }
        IntentKind::Filtered => Ok(build_listing(IntentKind::Filtered, entities, filters, ctx)),
        IntentKind::Status => {
            let mut entities = entities.clone();
            entities.status.get_or_insert_with(|| DEFAULT_STATUS.to_string());
            Ok(build_listing(IntentKind::Status, &entities, filters, ctx))
        }
        IntentKind::GroupBy => build_group_by(classification, entities, filters),
        IntentKind::Maintenance => Ok(build_maintenance(entities, filters, ctx)),
        IntentKind::Update => build_update(entities),
        IntentKind::Delete => build_delete(entities),
        IntentKind::Insert => Err(LensError::UnsupportedIntent(
            "adding equipment needs a name, category, department and purchase price".to_string(),
        )),
        IntentKind::Unknown => Err(LensError::UnsupportedIntent(
            "could not work out what you want to know about the inventory".to_string(),
        )),
    }
}

fn is_row_count_target(column: &str) -> bool {
    matches!(
        normalize_ident(column).as_str(),
        "*" | "" | "id" | "equipment" | "items" | "item" | "assets" | "rows" | "asset_tag"
    )
}

fn build_aggregate(
    intent: IntentKind,
    hint: Option<&AggregationHint>,
    entities: &Entities,
    filters: &PriceFilter,
) -> Result<BuiltQuery, LensError> {
    let function = hint.map(|h| h.function).unwrap_or(AggregateFn::Count);
    let column = hint.and_then(|h| h.column.as_deref());

    let measure = match (function, column) {
        (AggregateFn::Count, None) => None,
        (AggregateFn::Count, Some(c)) if is_row_count_target(c) => None,
        (_, None) => Some(Measure::CurrentValue),
        (_, Some(c)) => Some(Measure::parse(c).ok_or_else(|| {
            LensError::UnsupportedIntent(format!("there is no numeric column called '{c}'"))
        })?),
    };

    let (expr, alias, title, unit) = match measure {
        None => (
            "COUNT(*)".to_string(),
            "count".to_string(),
            "Equipment Count".to_string(),
            Unit::Count,
        ),
        Some(m) => {
            let (prefix, unit) = match function {
                AggregateFn::Sum => ("Total", m.unit()),
                AggregateFn::Avg => ("Average", m.unit()),
                AggregateFn::Min => ("Minimum", m.unit()),
                AggregateFn::Max => ("Maximum", m.unit()),
                AggregateFn::Count => ("Equipment with", Unit::Count),
            };
            (
                format!("{}({})", function.sql(), m.sql()),
                format!("{}_{}", function.sql().to_ascii_lowercase(), m.alias()),
                format!("{prefix} {}", m.label()),
                unit,
            )
        }
    };

    let preds = Predicates::from_filters(entities, filters);
    let sql = format!(
        "SELECT {expr} AS {alias} FROM {EQUIPMENT_TABLE}{}",
        preds.where_sql()
    );
    let widget_id = match intent {
        IntentKind::Financial => "financial_metric".to_string(),
        _ => format!("aggregate_{alias}"),
    };
    Ok(BuiltQuery {
        intent,
        sql,
        params: preds.params,
        presentation: Presentation {
            widget_id,
            title,
            unit,
            subject: "equipment".to_string(),
        },
    })
}

fn build_listing(
    intent: IntentKind,
    entities: &Entities,
    filters: &PriceFilter,
    ctx: &BuildContext,
) -> BuiltQuery {
    let mut preds = Predicates::from_filters(entities, filters);
    let sql = format!(
        "SELECT * FROM {EQUIPMENT_TABLE}{} ORDER BY name LIMIT ?",
        preds.where_sql()
    );
    preds.params.push(SqlParam::Integer(i64::from(ctx.row_limit)));
    let title = match (intent, &entities.status) {
        (IntentKind::Status, Some(status)) => format!("{status} Equipment"),
        _ => "Equipment List".to_string(),
    };
    BuiltQuery {
        intent,
        sql,
        params: preds.params,
        presentation: Presentation {
            widget_id: "equipment_table".to_string(),
            title,
            unit: Unit::Count,
            subject: "equipment item".to_string(),
        },
    }
}

fn build_group_by(
    classification: &Classification,
    entities: &Entities,
    filters: &PriceFilter,
) -> Result<BuiltQuery, LensError> {
    let column = match classification.group_by.as_deref() {
        None => GroupColumn::Department,
        Some(raw) => GroupColumn::parse(raw).ok_or_else(|| {
            LensError::UnsupportedIntent(format!("cannot group equipment by '{raw}'"))
        })?,
    };
    let metric = match &classification.aggregation {
        None
        | Some(AggregationHint {
            function: AggregateFn::Count,
            ..
        }) => None,
        Some(hint) => {
            let measure = match hint.column.as_deref() {
                None => Measure::CurrentValue,
                Some(c) => Measure::parse(c).ok_or_else(|| {
                    LensError::UnsupportedIntent(format!("there is no numeric column called '{c}'"))
                })?,
            };
            Some((hint.function, measure))
        }
    };

    let (select, order, unit, title) = match metric {
        None => (
            "COUNT(*) AS count".to_string(),
            "count".to_string(),
            Unit::Count,
            format!("Equipment by {}", column.label()),
        ),
        Some((AggregateFn::Sum, m)) => {
            let alias = format!("total_{}", m.alias());
            (
                format!("COALESCE(SUM({}), 0) AS {alias}", m.sql()),
                alias,
                m.unit(),
                format!("{} by {}", m.label(), column.label()),
            )
        }
        Some((function, m)) => {
            let alias = format!("{}_{}", function.sql().to_ascii_lowercase(), m.alias());
            let prefix = match function {
                AggregateFn::Min => "Minimum",
                AggregateFn::Max => "Maximum",
                _ => "Average",
            };
            (
                format!("{}({}) AS {alias}", function.sql(), m.sql()),
                alias,
                m.unit(),
                format!("{prefix} {} by {}", m.label(), column.label()),
            )
        }
    };

    let preds = Predicates::from_filters(entities, filters);
    let col = column.sql();
    let sql = format!(
        "SELECT {col} AS group_name, {select} FROM {EQUIPMENT_TABLE}{} \
         GROUP BY {col} ORDER BY {order} DESC, group_name",
        preds.where_sql()
    );
    Ok(BuiltQuery {
        intent: IntentKind::GroupBy,
        sql,
        params: preds.params,
        presentation: Presentation {
            widget_id: "group_by_chart".to_string(),
            title,
            unit,
            subject: col.to_string(),
        },
    })
}

fn build_maintenance(entities: &Entities, filters: &PriceFilter, ctx: &BuildContext) -> BuiltQuery {
    let window_end = ctx
        .today
        .checked_add_days(Days::new(u64::from(ctx.maintenance_window_days)))
        .unwrap_or(NaiveDate::MAX);

    let mut preds = Predicates::default();
    preds.push(
        "next_maintenance_date >= ?",
        SqlParam::Text(ctx.today.format("%Y-%m-%d").to_string()),
    );
    preds.push(
        "next_maintenance_date <= ?",
        SqlParam::Text(window_end.format("%Y-%m-%d").to_string()),
    );
    let rest = Predicates::from_filters(entities, filters);
    preds.clauses.extend(rest.clauses);
    preds.params.extend(rest.params);

    let sql = format!(
        "SELECT asset_tag, name, category, department, next_maintenance_date, \
         last_maintenance_date FROM {EQUIPMENT_TABLE}{} \
         ORDER BY next_maintenance_date, asset_tag LIMIT ?",
        preds.where_sql()
    );
    preds.params.push(SqlParam::Integer(i64::from(ctx.row_limit)));
    BuiltQuery {
        intent: IntentKind::Maintenance,
        sql,
        params: preds.params,
        presentation: Presentation {
            widget_id: "maintenance_table".to_string(),
            title: format!(
                "Maintenance Due in the Next {} Days",
                ctx.maintenance_window_days
            ),
            unit: Unit::Count,
            subject: "equipment item".to_string(),
        },
    }
}

fn require_asset_tag(entities: &Entities, action: &str) -> Result<String, LensError> {
    entities
        .asset_tag
        .clone()
        .ok_or_else(|| LensError::UnsupportedIntent(format!("{action} needs an asset tag such as AST-000123")))
}

fn build_update(entities: &Entities) -> Result<BuiltQuery, LensError> {
    let tag = require_asset_tag(entities, "updating equipment")?;

    let mut sets = Vec::new();
    let mut params = Vec::new();
    for (column, value) in [
        ("status", &entities.status),
        ("condition", &entities.condition),
        ("department", &entities.department),
    ] {
        if let Some(v) = value {
            sets.push(format!("{column} = ?"));
            params.push(SqlParam::Text(v.clone()));
        }
    }
    if sets.is_empty() {
        return Err(LensError::UnsupportedIntent(
            "tell me the new status, condition or department".to_string(),
        ));
    }
    params.push(SqlParam::Text(tag));

    let sql = format!(
        "UPDATE {EQUIPMENT_TABLE} SET {}, updated_at = CURRENT_TIMESTAMP WHERE asset_tag = ? \
         RETURNING id, asset_tag, name, status, condition, department",
        sets.join(", ")
    );
    Ok(BuiltQuery {
        intent: IntentKind::Update,
        sql,
        params,
        presentation: Presentation {
            widget_id: "updated_equipment".to_string(),
            title: "Updated Equipment".to_string(),
            unit: Unit::Count,
            subject: "equipment item".to_string(),
        },
    })
}

fn build_delete(entities: &Entities) -> Result<BuiltQuery, LensError> {
    let tag = require_asset_tag(entities, "deleting equipment")?;
    Ok(BuiltQuery {
        intent: IntentKind::Delete,
        sql: format!(
            "DELETE FROM {EQUIPMENT_TABLE} WHERE asset_tag = ? RETURNING id, asset_tag, name"
        ),
        params: vec![SqlParam::Text(tag)],
        presentation: Presentation {
            widget_id: "deleted_equipment".to_string(),
            title: "Deleted Equipment".to_string(),
            unit: Unit::Count,
            subject: "equipment item".to_string(),
        },
    })
}
