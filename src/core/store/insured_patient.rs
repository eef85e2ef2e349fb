//! Insured-patient store
//!
//! The base `patients` row must already exist; `insert` only writes the
//! `insured_patients` extension row.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::patient::{patient_from_row, update_base};
use super::{expect_row, RecordStore};
use crate::core::db::ConnectionProvider;
use crate::core::error::StoreError;
use crate::entities::InsuredPatient;

const ENTITY: &str = "insured_patient";

const SELECT: &str = "SELECT p.patient_id, p.first_name, p.surname, p.postcode, p.address, p.phone, p.email,
            p.insurance_id, i.insurance_type, i.insurance_company_name, i.duration_of_insurance
     FROM insured_patients i
     JOIN patients p ON i.patient_id = p.patient_id";

pub struct InsuredPatientStore<'a, P: ConnectionProvider> {
    provider: &'a P,
}

impl<'a, P: ConnectionProvider> InsuredPatientStore<'a, P> {
    pub fn new(provider: &'a P) -> Self {
        Self { provider }
    }
}

fn insured_from_row(row: &Row) -> rusqlite::Result<InsuredPatient> {
    Ok(InsuredPatient {
        patient: patient_from_row(row)?,
        insurance_type: row.get("insurance_type")?,
        insurance_company: row.get("insurance_company_name")?,
        duration_months: row.get("duration_of_insurance")?,
    })
}

fn fetch(conn: &Connection, id: i64) -> rusqlite::Result<Option<InsuredPatient>> {
    conn.query_row(
        &format!("{} WHERE i.patient_id = ?1", SELECT),
        params![id],
        insured_from_row,
    )
    .optional()
}

impl<P: ConnectionProvider> RecordStore for InsuredPatientStore<'_, P> {
    type Record = InsuredPatient;

    /// Fails with `ReferentialIntegrity` when the patient row is missing
    fn insert(&self, insured: &InsuredPatient) -> Result<i64, StoreError> {
        let id = insured.id();
        self.provider.with_connection(|conn| {
            conn.execute(
                "INSERT INTO insured_patients
                     (patient_id, insurance_type, insurance_company_name, duration_of_insurance)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    id,
                    insured.insurance_type,
                    insured.insurance_company,
                    insured.duration_months
                ],
            )
            .map_err(|e| StoreError::from_write(e, ENTITY, id))?;
            Ok(id)
        })
    }

    fn get_by_id(&self, id: i64) -> Result<Option<InsuredPatient>, StoreError> {
        self.provider.with_connection(|conn| Ok(fetch(conn, id)?))
    }

    /// Writes the patient base columns and the insurance columns together
    fn update(&self, insured: &InsuredPatient) -> Result<(), StoreError> {
        let id = insured.id();
        self.provider.with_connection(|conn| {
            let tx = conn.transaction()?;
            let changed = tx
                .execute(
                    "UPDATE insured_patients
                     SET insurance_type = ?1, insurance_company_name = ?2, duration_of_insurance = ?3
                     WHERE patient_id = ?4",
                    params![
                        insured.insurance_type,
                        insured.insurance_company,
                        insured.duration_months,
                        id
                    ],
                )
                .map_err(|e| StoreError::from_write(e, ENTITY, id))?;
            expect_row(changed, ENTITY, id)?;
            update_base(&tx, &insured.patient)
                .map_err(|e| StoreError::from_write(e, "patient", id))?;
            tx.commit()?;
            Ok(())
        })
    }

    /// Removes only the insured-patient row; the patient stays
    fn delete(&self, id: i64) -> Result<(), StoreError> {
        self.provider.with_connection(|conn| {
            let changed = conn
                .execute("DELETE FROM insured_patients WHERE patient_id = ?1", params![id])
                .map_err(|e| StoreError::from_write(e, ENTITY, id))?;
            expect_row(changed, ENTITY, id)
        })
    }

    fn list_all(&self) -> Result<Vec<InsuredPatient>, StoreError> {
        self.provider.with_connection(|conn| {
            let mut stmt = conn.prepare(&format!("{} ORDER BY p.patient_id", SELECT))?;
            let rows = stmt
                .query_map([], insured_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}
