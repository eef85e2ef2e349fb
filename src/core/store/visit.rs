//! Visit store
//!
//! Visit ids are generated by the database; the `id` of a record passed to
//! `insert` is ignored.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{doctor, expect_row, patient, RecordStore};
use crate::core::db::ConnectionProvider;
use crate::core::error::StoreError;
use crate::entities::{HydratedVisit, Visit};

const ENTITY: &str = "visit";

const SELECT: &str =
    "SELECT visit_id, patient_id, doctor_id, date_of_visit, symptoms, diagnosis FROM visits";

pub struct VisitStore<'a, P: ConnectionProvider> {
    provider: &'a P,
}

impl<'a, P: ConnectionProvider> VisitStore<'a, P> {
    pub fn new(provider: &'a P) -> Self {
        Self { provider }
    }

    /// Load a visit together with its doctor and patient
    pub fn get_hydrated(&self, id: i64) -> Result<Option<HydratedVisit>, StoreError> {
        self.provider.with_connection(|conn| {
            let Some(visit) = fetch(conn, id)? else {
                return Ok(None);
            };
            let doctor = doctor::fetch(conn, visit.doctor_id)?.ok_or(StoreError::NotFound {
                entity: "doctor",
                id: visit.doctor_id,
            })?;
            let patient = patient::fetch(conn, visit.patient_id)?.ok_or(StoreError::NotFound {
                entity: "patient",
                id: visit.patient_id,
            })?;
            Ok(Some(HydratedVisit {
                visit,
                doctor,
                patient,
            }))
        })
    }

    /// Visits for one patient, oldest first
    pub fn for_patient(&self, patient_id: i64) -> Result<Vec<Visit>, StoreError> {
        self.provider.with_connection(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{} WHERE patient_id = ?1 ORDER BY date_of_visit, visit_id",
                SELECT
            ))?;
            let visits = stmt
                .query_map(params![patient_id], visit_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(visits)
        })
    }
}

fn visit_from_row(row: &Row) -> rusqlite::Result<Visit> {
    Ok(Visit {
        id: row.get("visit_id")?,
        date: row.get("date_of_visit")?,
        symptoms: row.get("symptoms")?,
        diagnosis: row.get("diagnosis")?,
        doctor_id: row.get("doctor_id")?,
        patient_id: row.get("patient_id")?,
    })
}

fn fetch(conn: &Connection, id: i64) -> rusqlite::Result<Option<Visit>> {
    conn.query_row(
        &format!("{} WHERE visit_id = ?1", SELECT),
        params![id],
        visit_from_row,
    )
    .optional()
}

impl<P: ConnectionProvider> RecordStore for VisitStore<'_, P> {
    type Record = Visit;

    /// Returns the generated visit id
    fn insert(&self, visit: &Visit) -> Result<i64, StoreError> {
        self.provider.with_connection(|conn| {
            conn.execute(
                "INSERT INTO visits (patient_id, doctor_id, date_of_visit, symptoms, diagnosis)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    visit.patient_id,
                    visit.doctor_id,
                    visit.date,
                    visit.symptoms,
                    visit.diagnosis
                ],
            )
            .map_err(|e| StoreError::from_write(e, ENTITY, visit.id))?;
            Ok(conn.last_insert_rowid())
        })
    }

    fn get_by_id(&self, id: i64) -> Result<Option<Visit>, StoreError> {
        self.provider.with_connection(|conn| Ok(fetch(conn, id)?))
    }

    fn update(&self, visit: &Visit) -> Result<(), StoreError> {
        self.provider.with_connection(|conn| {
            let changed = conn
                .execute(
                    "UPDATE visits SET patient_id = ?1, doctor_id = ?2, date_of_visit = ?3,
                         symptoms = ?4, diagnosis = ?5
                     WHERE visit_id = ?6",
                    params![
                        visit.patient_id,
                        visit.doctor_id,
                        visit.date,
                        visit.symptoms,
                        visit.diagnosis,
                        visit.id
                    ],
                )
                .map_err(|e| StoreError::from_write(e, ENTITY, visit.id))?;
            expect_row(changed, ENTITY, visit.id)
        })
    }

    fn delete(&self, id: i64) -> Result<(), StoreError> {
        self.provider.with_connection(|conn| {
            let changed = conn
                .execute("DELETE FROM visits WHERE visit_id = ?1", params![id])
                .map_err(|e| StoreError::from_write(e, ENTITY, id))?;
            expect_row(changed, ENTITY, id)
        })
    }

    fn list_all(&self) -> Result<Vec<Visit>, StoreError> {
        self.provider.with_connection(|conn| {
            let mut stmt = conn.prepare(&format!("{} ORDER BY visit_id", SELECT))?;
            let visits = stmt
                .query_map([], visit_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(visits)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::test_support::{doctor, patient, provider};
    use crate::core::store::{DoctorStore, PatientStore};
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn seeded() -> crate::core::db::SharedConnection {
        let db = provider();
        DoctorStore::new(&db).insert(&doctor(1, None)).unwrap();
        PatientStore::new(&db).insert(&patient(10, None)).unwrap();
        db
    }

    #[test]
    fn test_insert_generates_ids() {
        let db = seeded();
        let store = VisitStore::new(&db);

        let first = store
            .insert(&Visit::new(day(1), 1, 10, "Cough", "Cold"))
            .unwrap();
        let second = store
            .insert(&Visit::new(day(2), 1, 10, "Fever", "Flu"))
            .unwrap();

        assert!(second > first);
        let found = store.get_by_id(second).unwrap().unwrap();
        assert_eq!(found.date, day(2));
        assert_eq!(found.diagnosis, "Flu");
    }

    #[test]
    fn test_insert_unknown_doctor_is_referential_error() {
        let db = seeded();
        let err = VisitStore::new(&db)
            .insert(&Visit::new(day(1), 77, 10, "Cough", "Cold"))
            .unwrap_err();
        assert!(matches!(err, StoreError::ReferentialIntegrity { entity: "visit", .. }));
    }

    #[test]
    fn test_get_hydrated_loads_related_records() {
        let db = seeded();
        let store = VisitStore::new(&db);
        let id = store
            .insert(&Visit::new(day(4), 1, 10, "Rash", "Allergy"))
            .unwrap();

        let hydrated = store.get_hydrated(id).unwrap().unwrap();
        assert_eq!(hydrated.doctor, doctor(1, None));
        assert_eq!(hydrated.patient, patient(10, None));
        assert_eq!(hydrated.visit.id, id);
        assert_eq!(store.get_hydrated(id + 100).unwrap(), None);
    }

    #[test]
    fn test_update_and_delete() {
        let db = seeded();
        let store = VisitStore::new(&db);
        let id = store
            .insert(&Visit::new(day(1), 1, 10, "Cough", "Cold"))
            .unwrap();

        let mut visit = store.get_by_id(id).unwrap().unwrap();
        visit.diagnosis = "Bronchitis".to_string();
        store.update(&visit).unwrap();
        assert_eq!(store.get_by_id(id).unwrap().unwrap().diagnosis, "Bronchitis");

        store.delete(id).unwrap();
        assert_eq!(store.get_by_id(id).unwrap(), None);
        assert!(matches!(store.delete(id), Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn test_for_patient_is_ordered_by_date() {
        let db = seeded();
        PatientStore::new(&db).insert(&patient(11, None)).unwrap();
        let store = VisitStore::new(&db);
        store.insert(&Visit::new(day(9), 1, 10, "b", "b")).unwrap();
        store.insert(&Visit::new(day(3), 1, 10, "a", "a")).unwrap();
        store.insert(&Visit::new(day(5), 1, 11, "c", "c")).unwrap();

        let dates: Vec<NaiveDate> = store
            .for_patient(10)
            .unwrap()
            .iter()
            .map(|v| v.date)
            .collect();
        assert_eq!(dates, vec![day(3), day(9)]);
    }
}
