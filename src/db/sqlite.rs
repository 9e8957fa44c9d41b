use crate::audit::{AuditRecord, AuditSink};
use crate::db::models::{DbAuditEntry, DbEquipment, DbMaintenanceEntry, NewEquipment, NewMaintenanceEntry};
use crate::db::schema::SQLITE_INIT;
use crate::error::LensError;
use crate::query::builder::{BuiltQuery, SqlParam};
use crate::query::shaper::{CellValue, ResultSet};
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Pool, Row, Sqlite, ValueRef};
use std::str::FromStr;
use tracing::debug;

pub type SqlitePool = Pool<Sqlite>;

#[derive(Clone)]
pub struct InventoryStorage {
    pool: SqlitePool,
}

impl InventoryStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the database at `database_url` with foreign
    /// keys enforced, and make sure the schema exists.
    pub async fn connect(database_url: &str) -> Result<Self, LensError> {
        let connect_opts = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        if let Some(parent) = connect_opts.get_filename().parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let mut pool_opts = SqlitePoolOptions::new();
        // Each in-memory connection is its own database.
        if database_url.contains(":memory:") || database_url.contains("mode=memory") {
            pool_opts = pool_opts
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }
        let pool = pool_opts.connect_with(connect_opts).await?;
        let storage = Self::new(pool);
        storage.init_schema().await?;
        Ok(storage)
    }

    /// Initialize the schema by executing the bundled DDL.
    pub async fn init_schema(&self) -> Result<(), LensError> {
        // execute statements one by one (sqlx::query runs a single statement)
        for stmt in SQLITE_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Run a built query with its bound parameters and decode every cell.
    pub async fn execute(&self, query: &BuiltQuery) -> Result<ResultSet, LensError> {
        debug!(sql = %query.sql, params = query.params.len(), "executing query");
        let mut q = sqlx::query::<Sqlite>(&query.sql);
        for param in &query.params {
            q = bind_param(q, param);
        }
        let rows = q.fetch_all(&self.pool).await?;

        let columns = rows
            .first()
            .map(|r| r.columns().iter().map(|c| c.name().to_string()).collect())
            .unwrap_or_default();
        let rows = rows
            .iter()
            .map(decode_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ResultSet { columns, rows })
    }

    /// Insert one equipment row. Returns its id; a duplicate asset tag fails
    /// with the store's UNIQUE violation.
    pub async fn insert_equipment(&self, e: &NewEquipment) -> Result<i64, LensError> {
        let rec: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO equipment (
                asset_tag, name, category, manufacturer, model_number, serial_number,
                purchase_date, purchase_price, current_value, depreciation_rate,
                department, location, assigned_to, status, condition,
                last_maintenance_date, next_maintenance_date, maintenance_interval_days,
                warranty_expiry_date, notes
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&e.asset_tag)
        .bind(&e.name)
        .bind(&e.category)
        .bind(&e.manufacturer)
        .bind(&e.model_number)
        .bind(&e.serial_number)
        .bind(e.purchase_date)
        .bind(e.purchase_price)
        .bind(e.current_value)
        .bind(e.depreciation_rate)
        .bind(&e.department)
        .bind(&e.location)
        .bind(&e.assigned_to)
        .bind(&e.status)
        .bind(&e.condition)
        .bind(e.last_maintenance_date)
        .bind(e.next_maintenance_date)
        .bind(e.maintenance_interval_days)
        .bind(e.warranty_expiry_date)
        .bind(&e.notes)
        .fetch_one(&self.pool)
        .await?;
        Ok(rec.0)
    }

    /// Batch insert using a single transaction. Returns ids in the same order.
    pub async fn insert_equipment_many(&self, items: &[NewEquipment]) -> Result<Vec<i64>, LensError> {
        let mut tx = self.pool.begin().await?;
        let mut ids = Vec::with_capacity(items.len());
        for e in items {
            let rec: (i64,) = sqlx::query_as(
                r#"
                INSERT INTO equipment (
                    asset_tag, name, category, purchase_date, purchase_price, current_value,
                    department, location, status, condition,
                    last_maintenance_date, next_maintenance_date
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                RETURNING id
                "#,
            )
            .bind(&e.asset_tag)
            .bind(&e.name)
            .bind(&e.category)
            .bind(e.purchase_date)
            .bind(e.purchase_price)
            .bind(e.current_value)
            .bind(&e.department)
            .bind(&e.location)
            .bind(&e.status)
            .bind(&e.condition)
            .bind(e.last_maintenance_date)
            .bind(e.next_maintenance_date)
            .fetch_one(&mut *tx)
            .await?;
            ids.push(rec.0);
        }
        tx.commit().await?;
        Ok(ids)
    }

    pub async fn get_by_asset_tag(&self, asset_tag: &str) -> Result<Option<DbEquipment>, LensError> {
        let row = sqlx::query_as::<_, DbEquipment>(
            r#"SELECT id, asset_tag, name, category, manufacturer, model_number, serial_number,
               purchase_date, purchase_price, current_value, depreciation_rate, department,
               location, assigned_to, status, condition, last_maintenance_date,
               next_maintenance_date, maintenance_interval_days, warranty_expiry_date, notes
               FROM equipment WHERE asset_tag = ?"#,
        )
        .bind(asset_tag)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn equipment_count(&self) -> Result<i64, LensError> {
        let rec: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM equipment")
            .fetch_one(&self.pool)
            .await?;
        Ok(rec.0)
    }

    pub async fn add_maintenance_entry(&self, m: &NewMaintenanceEntry) -> Result<i64, LensError> {
        let rec: (i64,) = sqlx::query_as(
            r#"INSERT INTO maintenance_log (
                   equipment_id, maintenance_date, maintenance_type, description, cost, performed_by
               ) VALUES (?, ?, ?, ?, ?, ?)
               RETURNING id"#,
        )
        .bind(m.equipment_id)
        .bind(m.maintenance_date)
        .bind(&m.maintenance_type)
        .bind(&m.description)
        .bind(m.cost)
        .bind(&m.performed_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(rec.0)
    }

    pub async fn maintenance_history(&self, equipment_id: i64) -> Result<Vec<DbMaintenanceEntry>, LensError> {
        let rows = sqlx::query_as::<_, DbMaintenanceEntry>(
            r#"SELECT id, equipment_id, maintenance_date, maintenance_type, description, cost,
               performed_by FROM maintenance_log WHERE equipment_id = ?
               ORDER BY maintenance_date DESC, id DESC"#,
        )
        .bind(equipment_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn recent_audit(&self, limit: u32) -> Result<Vec<DbAuditEntry>, LensError> {
        let rows = sqlx::query_as::<_, DbAuditEntry>(
            r#"SELECT id, timestamp, action, equipment_id, user_query, changes, success
               FROM audit_log ORDER BY id DESC LIMIT ?"#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

impl AuditSink for InventoryStorage {
    async fn append(&self, record: AuditRecord) -> Result<(), LensError> {
        sqlx::query(
            r#"INSERT INTO audit_log (timestamp, action, equipment_id, user_query, changes, success)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(record.timestamp.to_rfc3339())
        .bind(record.action)
        .bind(record.equipment_id)
        .bind(record.user_query)
        .bind(record.changes)
        .bind(record.success)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn bind_param<'q>(
    q: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
    param: &SqlParam,
) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
    match param {
        SqlParam::Text(v) => q.bind(v.clone()),
        SqlParam::Real(v) => q.bind(*v),
        SqlParam::Integer(v) => q.bind(*v),
    }
}

/// Decode by runtime storage class so computed columns (`SUM(...)`) and
/// declared columns go through the same path.
fn decode_row(row: &SqliteRow) -> Result<Vec<CellValue>, LensError> {
    (0..row.columns().len())
        .map(|i| -> Result<CellValue, LensError> {
            if row.try_get_raw(i)?.is_null() {
                return Ok(CellValue::Null);
            }
            if let Ok(v) = row.try_get::<i64, _>(i) {
                return Ok(CellValue::Integer(v));
            }
            if let Ok(v) = row.try_get::<f64, _>(i) {
                return Ok(CellValue::Real(v));
            }
            Ok(CellValue::Text(row.try_get::<String, _>(i)?))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_connection_is_never_reaped() {
        let storage = InventoryStorage::connect("sqlite::memory:")
            .await
            .expect("in-memory store");
        let opts = storage.pool.options();
        assert_eq!(opts.get_max_connections(), 1);
        assert!(opts.get_idle_timeout().is_none());
        assert!(opts.get_max_lifetime().is_none());
        assert_eq!(storage.equipment_count().await.expect("count"), 0);
    }
}
