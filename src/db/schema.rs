//! SQL DDL for the inventory store.
//! Statements are executed one at a time, so none of them may contain `;`
//! inside a body.

/// SQLite schema with:
/// - `equipment` keyed by `id`, `asset_tag` UNIQUE
/// - `maintenance_log` rows removed with their equipment (`ON DELETE CASCADE`)
/// - `audit_log` with an optional equipment reference, also cascading
/// - dates stored as `YYYY-MM-DD` TEXT, booleans as INTEGER 0/1
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS equipment (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    asset_tag TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    category TEXT NOT NULL,
    manufacturer TEXT NULL,
    model_number TEXT NULL,
    serial_number TEXT NULL,
    purchase_date TEXT NULL,
    purchase_price REAL NOT NULL DEFAULT 0,
    current_value REAL NOT NULL DEFAULT 0,
    depreciation_rate REAL NULL,
    department TEXT NOT NULL,
    location TEXT NULL,
    assigned_to TEXT NULL,
    status TEXT NOT NULL DEFAULT 'Active',
    condition TEXT NULL,
    last_maintenance_date TEXT NULL,
    next_maintenance_date TEXT NULL,
    maintenance_interval_days INTEGER NULL,
    warranty_expiry_date TEXT NULL,
    notes TEXT NULL,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_equipment_department ON equipment(department);
CREATE INDEX IF NOT EXISTS idx_equipment_category ON equipment(category);
CREATE INDEX IF NOT EXISTS idx_equipment_status ON equipment(status);
CREATE INDEX IF NOT EXISTS idx_equipment_next_maintenance ON equipment(next_maintenance_date);

CREATE TABLE IF NOT EXISTS maintenance_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    equipment_id INTEGER NOT NULL REFERENCES equipment(id) ON DELETE CASCADE,
    maintenance_date TEXT NOT NULL,
    maintenance_type TEXT NOT NULL,
    description TEXT NULL,
    cost REAL NULL,
    performed_by TEXT NULL,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_maintenance_log_equipment ON maintenance_log(equipment_id);

CREATE TABLE IF NOT EXISTS audit_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL, -- RFC3339
    action TEXT NOT NULL,
    equipment_id INTEGER NULL REFERENCES equipment(id) ON DELETE CASCADE,
    user_query TEXT NOT NULL,
    changes TEXT NULL,
    success INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_audit_log_timestamp ON audit_log(timestamp);
"#;
