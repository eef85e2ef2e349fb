//! Database schema initialization
//!
//! Table-per-subclass layout: `specialists` and `insured_patients` hold only
//! the extension columns and share the primary key of their base table, with
//! a cascading foreign key back to it.

use rusqlite::{params, Connection, OptionalExtension};

use super::error::StoreError;

/// Current schema version, recorded in `schema_version`
pub const SCHEMA_VERSION: i32 = 1;

/// Managed tables in creation (parent-first) order
pub const TABLES: [&str; 9] = [
    "doctors",
    "specialists",
    "insurance",
    "patients",
    "insured_patients",
    "drugs",
    "visits",
    "prescriptions",
    "prescription_drugs",
];

/// The managed table set, in creation order
pub fn table_names() -> &'static [&'static str] {
    &TABLES
}

const SCHEMA_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS schema_version (
        version INTEGER PRIMARY KEY
    );

    CREATE TABLE IF NOT EXISTS doctors (
        doctor_id INTEGER PRIMARY KEY,
        first_name TEXT NOT NULL DEFAULT '',
        surname TEXT NOT NULL DEFAULT '',
        address TEXT NOT NULL DEFAULT '',
        email TEXT NOT NULL DEFAULT '',
        specialization TEXT
    );

    -- Doctor subclass
    CREATE TABLE IF NOT EXISTS specialists (
        specialist_id INTEGER PRIMARY KEY,
        experience INTEGER NOT NULL,
        FOREIGN KEY (specialist_id) REFERENCES doctors(doctor_id)
            ON DELETE CASCADE ON UPDATE CASCADE
    );

    CREATE TABLE IF NOT EXISTS insurance (
        insurance_id INTEGER PRIMARY KEY,
        company TEXT NOT NULL DEFAULT '',
        address TEXT NOT NULL DEFAULT '',
        phone TEXT NOT NULL DEFAULT ''
    );

    CREATE TABLE IF NOT EXISTS patients (
        patient_id INTEGER PRIMARY KEY,
        first_name TEXT NOT NULL DEFAULT '',
        surname TEXT NOT NULL DEFAULT '',
        postcode TEXT NOT NULL DEFAULT '',
        address TEXT NOT NULL DEFAULT '',
        phone TEXT NOT NULL DEFAULT '',
        email TEXT NOT NULL DEFAULT '',
        insurance_id INTEGER,
        FOREIGN KEY (insurance_id) REFERENCES insurance(insurance_id)
    );
    CREATE INDEX IF NOT EXISTS idx_patients_insurance ON patients(insurance_id);

    -- Patient subclass
    CREATE TABLE IF NOT EXISTS insured_patients (
        patient_id INTEGER PRIMARY KEY,
        insurance_type TEXT NOT NULL,
        insurance_company_name TEXT NOT NULL,
        duration_of_insurance INTEGER NOT NULL,
        FOREIGN KEY (patient_id) REFERENCES patients(patient_id)
            ON DELETE CASCADE ON UPDATE CASCADE
    );

    CREATE TABLE IF NOT EXISTS drugs (
        drug_id INTEGER PRIMARY KEY,
        name TEXT NOT NULL DEFAULT '',
        side_effects TEXT NOT NULL DEFAULT '',
        benefits TEXT NOT NULL DEFAULT ''
    );

    CREATE TABLE IF NOT EXISTS visits (
        visit_id INTEGER PRIMARY KEY AUTOINCREMENT,
        patient_id INTEGER NOT NULL,
        doctor_id INTEGER NOT NULL,
        date_of_visit TEXT NOT NULL,
        symptoms TEXT NOT NULL DEFAULT '',
        diagnosis TEXT NOT NULL DEFAULT '',
        FOREIGN KEY (patient_id) REFERENCES patients(patient_id),
        FOREIGN KEY (doctor_id) REFERENCES doctors(doctor_id)
    );
    CREATE INDEX IF NOT EXISTS idx_visits_patient ON visits(patient_id);
    CREATE INDEX IF NOT EXISTS idx_visits_doctor ON visits(doctor_id);

    CREATE TABLE IF NOT EXISTS prescriptions (
        prescription_id INTEGER PRIMARY KEY,
        date_prescribed TEXT NOT NULL,
        dosage TEXT NOT NULL DEFAULT '',
        duration TEXT NOT NULL DEFAULT '',
        comment TEXT NOT NULL DEFAULT '',
        patient_id INTEGER NOT NULL,
        prescriber_id INTEGER,
        FOREIGN KEY (patient_id) REFERENCES patients(patient_id),
        FOREIGN KEY (prescriber_id) REFERENCES doctors(doctor_id)
    );
    CREATE INDEX IF NOT EXISTS idx_prescriptions_patient ON prescriptions(patient_id);

    -- Prescription <-> Drug bridge
    CREATE TABLE IF NOT EXISTS prescription_drugs (
        prescription_id INTEGER NOT NULL,
        drug_id INTEGER NOT NULL,
        PRIMARY KEY (prescription_id, drug_id),
        FOREIGN KEY (prescription_id) REFERENCES prescriptions(prescription_id)
            ON DELETE CASCADE,
        FOREIGN KEY (drug_id) REFERENCES drugs(drug_id)
    );
    CREATE INDEX IF NOT EXISTS idx_prescription_drugs_drug ON prescription_drugs(drug_id);
"#;

/// Create every table and index if absent.
///
/// Idempotent: on an existing database with the current version this only
/// verifies the recorded version. Any failure is a [`StoreError::Schema`],
/// which callers must treat as fatal.
pub fn ensure_schema(conn: &mut Connection) -> Result<(), StoreError> {
    let tx = conn
        .transaction()
        .map_err(|e| StoreError::Schema(e.to_string()))?;

    tx.execute_batch(SCHEMA_SQL)
        .map_err(|e| StoreError::Schema(e.to_string()))?;

    let recorded: Option<i32> = tx
        .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))
        .optional()
        .map_err(|e| StoreError::Schema(e.to_string()))?
        .flatten();

    match recorded {
        None => {
            tx.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![SCHEMA_VERSION],
            )
            .map_err(|e| StoreError::Schema(e.to_string()))?;
        }
        Some(v) if v == SCHEMA_VERSION => {}
        Some(v) => {
            return Err(StoreError::Schema(format!(
                "database has schema version {}, expected {}",
                v, SCHEMA_VERSION
            )));
        }
    }

    tx.commit().map_err(|e| StoreError::Schema(e.to_string()))?;
    tracing::debug!(version = SCHEMA_VERSION, "schema ready");
    Ok(())
}

/// Drop every managed table, children first
pub fn drop_schema(conn: &mut Connection) -> Result<(), StoreError> {
    let tx = conn
        .transaction()
        .map_err(|e| StoreError::Schema(e.to_string()))?;

    for table in TABLES.iter().rev() {
        tx.execute_batch(&format!("DROP TABLE IF EXISTS {};", table))
            .map_err(|e| StoreError::Schema(e.to_string()))?;
    }
    tx.execute_batch("DROP TABLE IF EXISTS schema_version;")
        .map_err(|e| StoreError::Schema(e.to_string()))?;

    tx.commit().map_err(|e| StoreError::Schema(e.to_string()))?;
    tracing::info!("schema dropped");
    Ok(())
}

/// Names of managed tables that currently exist
pub fn existing_tables(conn: &Connection) -> Result<Vec<String>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(names
        .into_iter()
        .filter(|name| TABLES.contains(&name.as_str()))
        .collect())
}

/// Row count for each managed table, in creation order
pub fn table_counts(conn: &Connection) -> Result<Vec<(&'static str, i64)>, StoreError> {
    TABLES
        .iter()
        .map(|table| -> Result<(&'static str, i64), StoreError> {
            let count: i64 =
                conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                    row.get(0)
                })?;
            Ok((*table, count))
        })
        .collect()
}
