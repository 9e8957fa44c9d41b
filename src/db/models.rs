use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Equipment row as stored. Dates are `YYYY-MM-DD` text in SQLite and decode
/// straight into `NaiveDate`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbEquipment {
    pub id: i64,
    pub asset_tag: String,
    pub name: String,
    pub category: String,
    pub manufacturer: Option<String>,
    pub model_number: Option<String>,
    pub serial_number: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub purchase_price: f64,
    pub current_value: f64,
    pub depreciation_rate: Option<f64>,
    pub department: String,
    pub location: Option<String>,
    pub assigned_to: Option<String>,
    pub status: String,
    pub condition: Option<String>,
    pub last_maintenance_date: Option<NaiveDate>,
    pub next_maintenance_date: Option<NaiveDate>,
    pub maintenance_interval_days: Option<i64>,
    pub warranty_expiry_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Fields supplied by data-load tooling when creating equipment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NewEquipment {
    pub asset_tag: String,
    pub name: String,
    pub category: String,
    pub manufacturer: Option<String>,
    pub model_number: Option<String>,
    pub serial_number: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub purchase_price: f64,
    pub current_value: f64,
    pub depreciation_rate: Option<f64>,
    pub department: String,
    pub location: Option<String>,
    pub assigned_to: Option<String>,
    pub status: String,
    pub condition: Option<String>,
    pub last_maintenance_date: Option<NaiveDate>,
    pub next_maintenance_date: Option<NaiveDate>,
    pub maintenance_interval_days: Option<i64>,
    pub warranty_expiry_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbMaintenanceEntry {
    pub id: i64,
    pub equipment_id: i64,
    pub maintenance_date: NaiveDate,
    pub maintenance_type: String,
    pub description: Option<String>,
    pub cost: Option<f64>,
    pub performed_by: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewMaintenanceEntry {
    pub equipment_id: i64,
    pub maintenance_date: NaiveDate,
    pub maintenance_type: String,
    pub description: Option<String>,
    pub cost: Option<f64>,
    pub performed_by: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbAuditEntry {
    pub id: i64,
    pub timestamp: String,
    pub action: String,
    pub equipment_id: Option<i64>,
    pub user_query: String,
    pub changes: Option<String>,
    pub success: bool,
}
