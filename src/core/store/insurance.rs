//! Insurance store

use rusqlite::{params, OptionalExtension, Row};

use super::{expect_row, RecordStore};
use crate::core::db::ConnectionProvider;
use crate::core::error::StoreError;
use crate::entities::Insurance;

const ENTITY: &str = "insurance";

const SELECT: &str = "SELECT insurance_id, company, address, phone FROM insurance";

pub struct InsuranceStore<'a, P: ConnectionProvider> {
    provider: &'a P,
}

impl<'a, P: ConnectionProvider> InsuranceStore<'a, P> {
    pub fn new(provider: &'a P) -> Self {
        Self { provider }
    }
}

fn insurance_from_row(row: &Row) -> rusqlite::Result<Insurance> {
    Ok(Insurance {
        id: row.get("insurance_id")?,
        company: row.get("company")?,
        address: row.get("address")?,
        phone: row.get("phone")?,
    })
}

impl<P: ConnectionProvider> RecordStore for InsuranceStore<'_, P> {
    type Record = Insurance;

    fn insert(&self, insurance: &Insurance) -> Result<i64, StoreError> {
        self.provider.with_connection(|conn| {
            conn.execute(
                "INSERT INTO insurance (insurance_id, company, address, phone) VALUES (?1, ?2, ?3, ?4)",
                params![insurance.id, insurance.company, insurance.address, insurance.phone],
            )
            .map_err(|e| StoreError::from_write(e, ENTITY, insurance.id))?;
            Ok(insurance.id)
        })
    }

    fn get_by_id(&self, id: i64) -> Result<Option<Insurance>, StoreError> {
        self.provider.with_connection(|conn| {
            Ok(conn
                .query_row(
                    &format!("{} WHERE insurance_id = ?1", SELECT),
                    params![id],
                    insurance_from_row,
                )
                .optional()?)
        })
    }

    fn update(&self, insurance: &Insurance) -> Result<(), StoreError> {
        self.provider.with_connection(|conn| {
            let changed = conn
                .execute(
                    "UPDATE insurance SET company = ?1, address = ?2, phone = ?3 WHERE insurance_id = ?4",
                    params![insurance.company, insurance.address, insurance.phone, insurance.id],
                )
                .map_err(|e| StoreError::from_write(e, ENTITY, insurance.id))?;
            expect_row(changed, ENTITY, insurance.id)
        })
    }

    /// Fails with `ReferentialIntegrity` while patients reference the insurer
    fn delete(&self, id: i64) -> Result<(), StoreError> {
        self.provider.with_connection(|conn| {
            let changed = conn
                .execute("DELETE FROM insurance WHERE insurance_id = ?1", params![id])
                .map_err(|e| StoreError::from_write(e, ENTITY, id))?;
            expect_row(changed, ENTITY, id)
        })
    }

    fn list_all(&self) -> Result<Vec<Insurance>, StoreError> {
        self.provider.with_connection(|conn| {
            let mut stmt = conn.prepare(&format!("{} ORDER BY insurance_id", SELECT))?;
            let rows = stmt
                .query_map([], insurance_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::test_support::{patient, provider};
    use crate::core::store::PatientStore;

    fn folksam() -> Insurance {
        Insurance {
            id: 1,
            company: "Folksam".to_string(),
            address: "Bohusgatan 14".to_string(),
            phone: "0771-950950".to_string(),
        }
    }

    #[test]
    fn test_crud_cycle() {
        let db = provider();
        let store = InsuranceStore::new(&db);
        store.insert(&folksam()).unwrap();

        let mut changed = folksam();
        changed.phone = "08-000000".to_string();
        store.update(&changed).unwrap();
        assert_eq!(store.get_by_id(1).unwrap(), Some(changed));

        store.delete(1).unwrap();
        assert!(store.list_all().unwrap().is_empty());
    }

    #[test]
    fn test_delete_referenced_insurer_fails() {
        let db = provider();
        InsuranceStore::new(&db).insert(&folksam()).unwrap();
        PatientStore::new(&db).insert(&patient(10, Some(1))).unwrap();

        let err = InsuranceStore::new(&db).delete(1).unwrap_err();
        assert!(matches!(err, StoreError::ReferentialIntegrity { .. }));
    }
}
