//! Turns result rows into a widget the dashboard renderer can draw.

use serde::Serialize;

use crate::query::builder::{BuiltQuery, Unit};
use crate::query::intent::IntentKind;

/// One typed cell as decoded from the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl CellValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Integer(v) => Some(*v as f64),
            CellValue::Real(v) => Some(*v),
            CellValue::Null | CellValue::Text(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CellValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    fn label(&self) -> String {
        match self {
            CellValue::Null => "(none)".to_string(),
            CellValue::Integer(v) => v.to_string(),
            CellValue::Real(v) => v.to_string(),
            CellValue::Text(s) => s.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl ResultSet {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetKind {
    Scorecard,
    Table,
    Chart,
    NoData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WidgetData {
    Scorecard {
        value: f64,
        display: String,
        unit: Unit,
    },
    Table {
        columns: Vec<String>,
        rows: Vec<Vec<CellValue>>,
    },
    Chart {
        chart_type: &'static str,
        category: String,
        measure: String,
        points: Vec<ChartPoint>,
    },
    Empty {
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Widget {
    pub widget_id: String,
    pub widget_kind: WidgetKind,
    pub title: String,
    pub data: WidgetData,
    pub summary_text: String,
}

/// Pick a widget for `rows`: empty → no-data, 1×1 number → scorecard,
/// several category/measure rows → chart, anything else → table.
pub fn shape(query: &BuiltQuery, rows: ResultSet) -> Widget {
    if rows.is_empty() {
        return no_data(query);
    }

    if rows.rows.len() == 1 && rows.columns.len() == 1 {
        let cell = &rows.rows[0][0];
        let scalar_intent = matches!(query.intent, IntentKind::Aggregate | IntentKind::Financial);
        match cell.as_f64() {
            Some(value) => return scorecard(query, value),
            None if scalar_intent && *cell == CellValue::Null => return scorecard(query, 0.0),
            None => {}
        }
    }

    if is_chartable(&rows) {
        return chart(query, rows);
    }

    table(query, rows)
}

fn is_chartable(rows: &ResultSet) -> bool {
    rows.rows.len() >= 2
        && rows.columns.len() == 2
        && rows.rows.iter().all(|r| {
            matches!(r[0], CellValue::Text(_) | CellValue::Null)
                && (r[1].as_f64().is_some() || r[1] == CellValue::Null)
        })
}

fn scorecard(query: &BuiltQuery, value: f64) -> Widget {
    let display = format_measure(value, query.presentation.unit);
    Widget {
        widget_id: query.presentation.widget_id.clone(),
        widget_kind: WidgetKind::Scorecard,
        title: query.presentation.title.clone(),
        summary_text: format!("{}: {display}", query.presentation.title),
        data: WidgetData::Scorecard {
            value,
            display,
            unit: query.presentation.unit,
        },
    }
}

fn chart(query: &BuiltQuery, rows: ResultSet) -> Widget {
    let points: Vec<ChartPoint> = rows
        .rows
        .iter()
        .map(|r| ChartPoint {
            label: r[0].label(),
            value: r[1].as_f64().unwrap_or(0.0),
        })
        .collect();
    let mut columns = rows.columns.into_iter();
    let category = columns.next().unwrap_or_default();
    let measure = columns.next().unwrap_or_default();

    let total: f64 = points.iter().map(|p| p.value).sum();
    let subject = &query.presentation.subject;
    let groups = format!("{} {}", points.len(), pluralize(subject, points.len()));
    let summary_text = match query.presentation.unit {
        Unit::Count => format!(
            "Showing {groups} with {} total items",
            format_measure(total, Unit::Count)
        ),
        // Averages and extremes do not add up across groups.
        unit if measure.starts_with("total_") => {
            format!("Showing {groups} totalling {}", format_measure(total, unit))
        }
        _ => format!("Showing {groups}"),
    };
    Widget {
        widget_id: query.presentation.widget_id.clone(),
        widget_kind: WidgetKind::Chart,
        title: query.presentation.title.clone(),
        data: WidgetData::Chart {
            chart_type: "bar",
            category,
            measure,
            points,
        },
        summary_text,
    }
}

fn table(query: &BuiltQuery, rows: ResultSet) -> Widget {
    let n = rows.rows.len();
    let money: Vec<bool> = rows.columns.iter().map(|c| is_money_column(c)).collect();
    let noun = pluralize(&query.presentation.subject, n);
    let summary_text = match query.intent {
        IntentKind::Update => format!("Updated {n} {noun}"),
        IntentKind::Delete => format!("Deleted {n} {noun}"),
        _ => format!("Found {n} {noun}"),
    };
    Widget {
        widget_id: query.presentation.widget_id.clone(),
        widget_kind: WidgetKind::Table,
        title: query.presentation.title.clone(),
        data: WidgetData::Table {
            columns: rows.columns.iter().map(|c| column_label(c)).collect(),
            rows: rows
                .rows
                .into_iter()
                .map(|row| row.into_iter().zip(&money).map(display_cell).collect())
                .collect(),
        },
        summary_text,
    }
}

fn is_money_column(name: &str) -> bool {
    matches!(
        name,
        "current_value" | "purchase_price" | "cost" | "total_value" | "depreciation"
    )
}

fn display_cell((cell, &money): (CellValue, &bool)) -> CellValue {
    match (money, cell.as_f64()) {
        (true, Some(v)) => CellValue::Text(format_measure(v, Unit::Currency)),
        _ => cell,
    }
}

/// Header shown for a result column.
fn column_label(name: &str) -> String {
    let known = match name {
        "id" => "ID",
        "asset_tag" => "Asset Tag",
        "current_value" => "Value",
        "purchase_price" => "Purchase Price",
        "next_maintenance_date" => "Next Maintenance",
        "last_maintenance_date" => "Last Maintenance",
        "maintenance_interval_days" => "Maintenance Interval (days)",
        "warranty_expiry_date" => "Warranty Expiry",
        "group_name" => "Group",
        _ => "",
    };
    if !known.is_empty() {
        return known.to_string();
    }
    name.split('_')
        .filter(|w| !w.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn no_data(query: &BuiltQuery) -> Widget {
    let message = match query.intent {
        IntentKind::Update | IntentKind::Delete => "No equipment found with that asset tag",
        IntentKind::Maintenance => "No equipment is due for maintenance in this window",
        IntentKind::GroupBy => "No data found",
        _ => "No equipment found matching your criteria",
    };
    Widget {
        widget_id: "no_data".to_string(),
        widget_kind: WidgetKind::NoData,
        title: query.presentation.title.clone(),
        data: WidgetData::Empty {
            message: message.to_string(),
        },
        summary_text: message.to_string(),
    }
}

fn pluralize(noun: &str, n: usize) -> String {
    if n == 1 {
        return noun.to_string();
    }
    if noun.ends_with('s') {
        format!("{noun}es")
    } else if let Some(stem) = noun
        .strip_suffix('y')
        .filter(|stem| !stem.ends_with(['a', 'e', 'i', 'o', 'u']))
    {
        format!("{stem}ies")
    } else {
        format!("{noun}s")
    }
}

/// `$1,234.56` for money, `1,234` for counts, plain numbers otherwise.
pub fn format_measure(value: f64, unit: Unit) -> String {
    match unit {
        Unit::Currency => {
            let sign = if value < 0.0 { "-" } else { "" };
            format!("{sign}${}", group_thousands(value.abs(), 2))
        }
        Unit::Count => group_thousands(value.round(), 0),
        Unit::Plain if value.fract() == 0.0 => group_thousands(value, 0),
        Unit::Plain => group_thousands(value, 2),
    }
}

fn group_thousands(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if value < 0.0 && formatted.chars().any(|c| c != '0' && c != '.') {
        "-"
    } else {
        ""
    };
    match frac_part {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}
