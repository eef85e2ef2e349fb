//! Prescription store
//!
//! A prescription is one `prescriptions` row plus one `prescription_drugs`
//! bridge row per drug. Every write touches both inside a transaction.

use std::collections::{BTreeMap, BTreeSet};

use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};

use super::drug::drug_from_row;
use super::{expect_row, RecordStore};
use crate::core::db::ConnectionProvider;
use crate::core::error::StoreError;
use crate::entities::{Drug, Prescription};

const ENTITY: &str = "prescription";

const SELECT: &str = "SELECT prescription_id, date_prescribed, dosage, duration, comment, patient_id, prescriber_id
     FROM prescriptions";

pub struct PrescriptionStore<'a, P: ConnectionProvider> {
    provider: &'a P,
}

impl<'a, P: ConnectionProvider> PrescriptionStore<'a, P> {
    pub fn new(provider: &'a P) -> Self {
        Self { provider }
    }

    /// Drug ids linked to a prescription; empty when there are none
    pub fn drug_ids(&self, id: i64) -> Result<BTreeSet<i64>, StoreError> {
        self.provider
            .with_connection(|conn| Ok(linked_drug_ids(conn, id)?))
    }

    /// Full drug records linked to a prescription
    pub fn drugs_for(&self, id: i64) -> Result<Vec<Drug>, StoreError> {
        self.provider.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT d.drug_id, d.name, d.side_effects, d.benefits
                 FROM prescription_drugs pd
                 JOIN drugs d ON pd.drug_id = d.drug_id
                 WHERE pd.prescription_id = ?1
                 ORDER BY d.drug_id",
            )?;
            let drugs = stmt
                .query_map(params![id], drug_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(drugs)
        })
    }
}

/// Row without its drug set
fn prescription_from_row(row: &Row) -> rusqlite::Result<Prescription> {
    Ok(Prescription {
        id: row.get("prescription_id")?,
        date: row.get("date_prescribed")?,
        dosage: row.get("dosage")?,
        duration: row.get("duration")?,
        comment: row.get("comment")?,
        patient_id: row.get("patient_id")?,
        prescriber_id: row.get("prescriber_id")?,
        drug_ids: BTreeSet::new(),
    })
}

fn linked_drug_ids(conn: &Connection, id: i64) -> rusqlite::Result<BTreeSet<i64>> {
    let mut stmt = conn.prepare(
        "SELECT drug_id FROM prescription_drugs WHERE prescription_id = ?1 ORDER BY drug_id",
    )?;
    let ids = stmt
        .query_map(params![id], |row| row.get(0))?
        .collect::<Result<BTreeSet<i64>, _>>()?;
    Ok(ids)
}

fn fetch(conn: &Connection, id: i64) -> rusqlite::Result<Option<Prescription>> {
    let found = conn
        .query_row(
            &format!("{} WHERE prescription_id = ?1", SELECT),
            params![id],
            prescription_from_row,
        )
        .optional()?;

    match found {
        Some(mut prescription) => {
            prescription.drug_ids = linked_drug_ids(conn, id)?;
            Ok(Some(prescription))
        }
        None => Ok(None),
    }
}

/// Insert one bridge row per drug, reusing a single prepared statement
fn link_drugs(tx: &Transaction, prescription: &Prescription) -> Result<(), StoreError> {
    let mut stmt = tx.prepare_cached(
        "INSERT INTO prescription_drugs (prescription_id, drug_id) VALUES (?1, ?2)",
    )?;
    for drug_id in &prescription.drug_ids {
        stmt.execute(params![prescription.id, drug_id])
            .map_err(|e| StoreError::from_write(e, ENTITY, prescription.id))?;
    }
    Ok(())
}

impl<P: ConnectionProvider> RecordStore for PrescriptionStore<'_, P> {
    type Record = Prescription;

    /// Writes the prescription row and all bridge rows atomically. An unknown
    /// drug or patient rolls the whole insert back.
    fn insert(&self, prescription: &Prescription) -> Result<i64, StoreError> {
        let id = prescription.id;
        self.provider.with_connection(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO prescriptions
                     (prescription_id, date_prescribed, dosage, duration, comment, patient_id, prescriber_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    id,
                    prescription.date,
                    prescription.dosage,
                    prescription.duration,
                    prescription.comment,
                    prescription.patient_id,
                    prescription.prescriber_id
                ],
            )
            .map_err(|e| StoreError::from_write(e, ENTITY, id))?;
            link_drugs(&tx, prescription)?;
            tx.commit()?;
            Ok(id)
        })
    }

    fn get_by_id(&self, id: i64) -> Result<Option<Prescription>, StoreError> {
        self.provider.with_connection(|conn| Ok(fetch(conn, id)?))
    }

    /// Updates the scalar columns and replaces the drug set wholesale
    fn update(&self, prescription: &Prescription) -> Result<(), StoreError> {
        let id = prescription.id;
        self.provider.with_connection(|conn| {
            let tx = conn.transaction()?;
            let changed = tx
                .execute(
                    "UPDATE prescriptions SET date_prescribed = ?1, dosage = ?2, duration = ?3,
                         comment = ?4, patient_id = ?5, prescriber_id = ?6
                     WHERE prescription_id = ?7",
                    params![
                        prescription.date,
                        prescription.dosage,
                        prescription.duration,
                        prescription.comment,
                        prescription.patient_id,
                        prescription.prescriber_id,
                        id
                    ],
                )
                .map_err(|e| StoreError::from_write(e, ENTITY, id))?;
            expect_row(changed, ENTITY, id)?;
            tx.execute(
                "DELETE FROM prescription_drugs WHERE prescription_id = ?1",
                params![id],
            )?;
            link_drugs(&tx, prescription)?;
            tx.commit()?;
            Ok(())
        })
    }

    /// Bridge rows go first, then the prescription
    fn delete(&self, id: i64) -> Result<(), StoreError> {
        self.provider.with_connection(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM prescription_drugs WHERE prescription_id = ?1",
                params![id],
            )?;
            let changed = tx
                .execute("DELETE FROM prescriptions WHERE prescription_id = ?1", params![id])
                .map_err(|e| StoreError::from_write(e, ENTITY, id))?;
            expect_row(changed, ENTITY, id)?;
            tx.commit()?;
            Ok(())
        })
    }

    fn list_all(&self) -> Result<Vec<Prescription>, StoreError> {
        self.provider.with_connection(|conn| {
            let mut links: BTreeMap<i64, BTreeSet<i64>> = BTreeMap::new();
            {
                let mut stmt =
                    conn.prepare("SELECT prescription_id, drug_id FROM prescription_drugs")?;
                let rows = stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))?;
                for row in rows {
                    let (prescription_id, drug_id) = row?;
                    links.entry(prescription_id).or_default().insert(drug_id);
                }
            }

            let mut stmt = conn.prepare(&format!("{} ORDER BY prescription_id", SELECT))?;
            let prescriptions = stmt
                .query_map([], prescription_from_row)?
                .map(|row| {
                    row.map(|mut p| {
                        p.drug_ids = links.remove(&p.id).unwrap_or_default();
                        p
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(prescriptions)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::test_support::{doctor, patient, provider};
    use crate::core::store::{DoctorStore, DrugStore, PatientStore};
    use chrono::NaiveDate;

    fn seeded() -> crate::core::db::SharedConnection {
        let db = provider();
        DoctorStore::new(&db).insert(&doctor(1, None)).unwrap();
        PatientStore::new(&db).insert(&patient(10, None)).unwrap();
        let drugs = DrugStore::new(&db);
        for (id, name) in [(1, "Aspirin"), (2, "Ibuprofen"), (3, "Paracetamol")] {
            drugs
                .insert(&Drug {
                    id,
                    name: name.to_string(),
                    ..Default::default()
                })
                .unwrap();
        }
        db
    }

    fn prescription(id: i64, drugs: &[i64]) -> Prescription {
        Prescription {
            id,
            date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            dosage: "2x daily".to_string(),
            duration: "10 days".to_string(),
            comment: "With food".to_string(),
            patient_id: 10,
            prescriber_id: Some(1),
            drug_ids: drugs.iter().copied().collect(),
        }
    }

    #[test]
    fn test_insert_writes_bridge_rows() {
        let db = seeded();
        let store = PrescriptionStore::new(&db);
        store.insert(&prescription(500, &[1, 2])).unwrap();

        let found = store.get_by_id(500).unwrap().unwrap();
        assert_eq!(found, prescription(500, &[1, 2]));
        let names: Vec<String> = store
            .drugs_for(500)
            .unwrap()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["Aspirin", "Ibuprofen"]);
    }

    #[test]
    fn test_insert_unknown_drug_rolls_back() {
        let db = seeded();
        let store = PrescriptionStore::new(&db);

        let err = store.insert(&prescription(500, &[1, 42])).unwrap_err();

        assert!(matches!(err, StoreError::ReferentialIntegrity { .. }));
        assert_eq!(store.get_by_id(500).unwrap(), None);
        assert!(store.drug_ids(500).unwrap().is_empty());
    }

    #[test]
    fn test_update_replaces_drug_set() {
        let db = seeded();
        let store = PrescriptionStore::new(&db);
        store.insert(&prescription(500, &[1, 2])).unwrap();

        let mut changed = prescription(500, &[3]);
        changed.dosage = "1x daily".to_string();
        store.update(&changed).unwrap();

        assert_eq!(store.drug_ids(500).unwrap(), BTreeSet::from([3]));
        assert_eq!(store.get_by_id(500).unwrap().unwrap(), changed);

        let listed = store.list_all().unwrap();
        let found = listed.iter().find(|p| p.id == 500).unwrap();
        assert_eq!(found.drug_ids, BTreeSet::from([3]));
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let db = seeded();
        let err = PrescriptionStore::new(&db)
            .update(&prescription(9, &[1]))
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "prescription", id: 9 }));
    }

    #[test]
    fn test_delete_removes_bridge_rows() {
        let db = seeded();
        let store = PrescriptionStore::new(&db);
        store.insert(&prescription(500, &[1, 2])).unwrap();

        store.delete(500).unwrap();

        assert_eq!(store.get_by_id(500).unwrap(), None);
        assert!(store.drug_ids(500).unwrap().is_empty());
        // drugs themselves survive
        assert!(DrugStore::new(&db).get_by_id(1).unwrap().is_some());
    }

    #[test]
    fn test_list_all_groups_drugs() {
        let db = seeded();
        let store = PrescriptionStore::new(&db);
        store.insert(&prescription(501, &[2])).unwrap();
        store.insert(&prescription(500, &[1, 3])).unwrap();
        store.insert(&prescription(502, &[])).unwrap();

        let all = store.list_all().unwrap();
        let summary: Vec<(i64, Vec<i64>)> = all
            .iter()
            .map(|p| (p.id, p.drug_ids.iter().copied().collect()))
            .collect();
        assert_eq!(
            summary,
            vec![(500, vec![1, 3]), (501, vec![2]), (502, vec![])]
        );
    }
}
