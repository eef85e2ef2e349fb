//! Patient store (base table `patients`)

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{expect_row, RecordStore};
use crate::core::db::ConnectionProvider;
use crate::core::error::StoreError;
use crate::entities::Patient;

const ENTITY: &str = "patient";

const SELECT: &str = "SELECT patient_id, first_name, surname, postcode, address, phone, email, insurance_id
     FROM patients";

pub struct PatientStore<'a, P: ConnectionProvider> {
    provider: &'a P,
}

impl<'a, P: ConnectionProvider> PatientStore<'a, P> {
    pub fn new(provider: &'a P) -> Self {
        Self { provider }
    }

    /// Patients covered by one insurer
    pub fn by_insurance(&self, insurance_id: i64) -> Result<Vec<Patient>, StoreError> {
        self.provider.with_connection(|conn| {
            let mut stmt =
                conn.prepare(&format!("{} WHERE insurance_id = ?1 ORDER BY patient_id", SELECT))?;
            let patients = stmt
                .query_map(params![insurance_id], patient_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(patients)
        })
    }
}

pub(crate) fn patient_from_row(row: &Row) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: row.get("patient_id")?,
        first_name: row.get("first_name")?,
        surname: row.get("surname")?,
        postcode: row.get("postcode")?,
        address: row.get("address")?,
        phone: row.get("phone")?,
        email: row.get("email")?,
        insurance_id: row.get("insurance_id")?,
    })
}

pub(crate) fn fetch(conn: &Connection, id: i64) -> rusqlite::Result<Option<Patient>> {
    conn.query_row(
        &format!("{} WHERE patient_id = ?1", SELECT),
        params![id],
        patient_from_row,
    )
    .optional()
}

pub(crate) fn update_base(conn: &Connection, patient: &Patient) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE patients SET first_name = ?1, surname = ?2, postcode = ?3, address = ?4,
             phone = ?5, email = ?6, insurance_id = ?7
         WHERE patient_id = ?8",
        params![
            patient.first_name,
            patient.surname,
            patient.postcode,
            patient.address,
            patient.phone,
            patient.email,
            patient.insurance_id,
            patient.id
        ],
    )
}

impl<P: ConnectionProvider> RecordStore for PatientStore<'_, P> {
    type Record = Patient;

    /// Inserting a patient never creates an insured-patient row, even with an
    /// insurance reference; use `InsuredPatientStore` for that.
    fn insert(&self, patient: &Patient) -> Result<i64, StoreError> {
        self.provider.with_connection(|conn| {
            conn.execute(
                "INSERT INTO patients (patient_id, first_name, surname, postcode, address, phone, email, insurance_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    patient.id,
                    patient.first_name,
                    patient.surname,
                    patient.postcode,
                    patient.address,
                    patient.phone,
                    patient.email,
                    patient.insurance_id
                ],
            )
            .map_err(|e| StoreError::from_write(e, ENTITY, patient.id))?;
            Ok(patient.id)
        })
    }

    fn get_by_id(&self, id: i64) -> Result<Option<Patient>, StoreError> {
        self.provider.with_connection(|conn| Ok(fetch(conn, id)?))
    }

    fn update(&self, patient: &Patient) -> Result<(), StoreError> {
        self.provider.with_connection(|conn| {
            let changed = update_base(conn, patient)
                .map_err(|e| StoreError::from_write(e, ENTITY, patient.id))?;
            expect_row(changed, ENTITY, patient.id)
        })
    }

    /// Removes the insured-patient row first, then the patient, in one
    /// transaction. Visits and prescriptions must be removed beforehand.
    fn delete(&self, id: i64) -> Result<(), StoreError> {
        self.provider.with_connection(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM insured_patients WHERE patient_id = ?1", params![id])
                .map_err(|e| StoreError::from_write(e, "insured_patient", id))?;
            let changed = tx
                .execute("DELETE FROM patients WHERE patient_id = ?1", params![id])
                .map_err(|e| StoreError::from_write(e, ENTITY, id))?;
            expect_row(changed, ENTITY, id)?;
            tx.commit()?;
            Ok(())
        })
    }

    fn list_all(&self) -> Result<Vec<Patient>, StoreError> {
        self.provider.with_connection(|conn| {
            let mut stmt = conn.prepare(&format!("{} ORDER BY patient_id", SELECT))?;
            let patients = stmt
                .query_map([], patient_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(patients)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::test_support::{patient, provider};
    use crate::core::store::{InsuranceStore, InsuredPatientStore};
    use crate::entities::{Insurance, InsuranceType, InsuredPatient};

    fn with_insurer(db: &crate::core::db::SharedConnection, id: i64) {
        InsuranceStore::new(db)
            .insert(&Insurance {
                id,
                company: "Folksam".to_string(),
                ..Default::default()
            })
            .unwrap();
    }

    #[test]
    fn test_insert_with_unknown_insurer_fails() {
        let db = provider();
        let err = PatientStore::new(&db)
            .insert(&patient(10, Some(99)))
            .unwrap_err();
        assert!(matches!(err, StoreError::ReferentialIntegrity { entity: "patient", .. }));
    }

    #[test]
    fn test_insert_does_not_create_insured_patient() {
        let db = provider();
        with_insurer(&db, 1);
        PatientStore::new(&db).insert(&patient(10, Some(1))).unwrap();

        assert_eq!(InsuredPatientStore::new(&db).get_by_id(10).unwrap(), None);
    }

    #[test]
    fn test_delete_removes_insured_row() {
        let db = provider();
        with_insurer(&db, 1);
        PatientStore::new(&db).insert(&patient(10, Some(1))).unwrap();
        InsuredPatientStore::new(&db)
            .insert(&InsuredPatient {
                patient: patient(10, Some(1)),
                insurance_type: InsuranceType::Gold,
                insurance_company: "Folksam".to_string(),
                duration_months: 12,
            })
            .unwrap();

        PatientStore::new(&db).delete(10).unwrap();

        assert_eq!(InsuredPatientStore::new(&db).get_by_id(10).unwrap(), None);
        assert_eq!(PatientStore::new(&db).get_by_id(10).unwrap(), None);
    }

    #[test]
    fn test_by_insurance() {
        let db = provider();
        with_insurer(&db, 1);
        let store = PatientStore::new(&db);
        store.insert(&patient(10, Some(1))).unwrap();
        store.insert(&patient(11, None)).unwrap();
        store.insert(&patient(12, Some(1))).unwrap();

        let ids: Vec<i64> = store.by_insurance(1).unwrap().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![10, 12]);
    }

    #[test]
    fn test_update_clears_insurance() {
        let db = provider();
        with_insurer(&db, 1);
        let store = PatientStore::new(&db);
        store.insert(&patient(10, Some(1))).unwrap();

        store.update(&patient(10, None)).unwrap();

        assert_eq!(store.get_by_id(10).unwrap().unwrap().insurance_id, None);
    }
}
