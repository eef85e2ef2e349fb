//! Drug store

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{expect_row, RecordStore};
use crate::core::db::ConnectionProvider;
use crate::core::error::StoreError;
use crate::entities::Drug;

const ENTITY: &str = "drug";

const SELECT: &str = "SELECT drug_id, name, side_effects, benefits FROM drugs";

pub struct DrugStore<'a, P: ConnectionProvider> {
    provider: &'a P,
}

impl<'a, P: ConnectionProvider> DrugStore<'a, P> {
    pub fn new(provider: &'a P) -> Self {
        Self { provider }
    }
}

pub(crate) fn drug_from_row(row: &Row) -> rusqlite::Result<Drug> {
    Ok(Drug {
        id: row.get("drug_id")?,
        name: row.get("name")?,
        side_effects: row.get("side_effects")?,
        benefits: row.get("benefits")?,
    })
}

fn fetch(conn: &Connection, id: i64) -> rusqlite::Result<Option<Drug>> {
    conn.query_row(
        &format!("{} WHERE drug_id = ?1", SELECT),
        params![id],
        drug_from_row,
    )
    .optional()
}

impl<P: ConnectionProvider> RecordStore for DrugStore<'_, P> {
    type Record = Drug;

    fn insert(&self, drug: &Drug) -> Result<i64, StoreError> {
        self.provider.with_connection(|conn| {
            conn.execute(
                "INSERT INTO drugs (drug_id, name, side_effects, benefits) VALUES (?1, ?2, ?3, ?4)",
                params![drug.id, drug.name, drug.side_effects, drug.benefits],
            )
            .map_err(|e| StoreError::from_write(e, ENTITY, drug.id))?;
            Ok(drug.id)
        })
    }

    fn get_by_id(&self, id: i64) -> Result<Option<Drug>, StoreError> {
        self.provider.with_connection(|conn| Ok(fetch(conn, id)?))
    }

    fn update(&self, drug: &Drug) -> Result<(), StoreError> {
        self.provider.with_connection(|conn| {
            let changed = conn
                .execute(
                    "UPDATE drugs SET name = ?1, side_effects = ?2, benefits = ?3 WHERE drug_id = ?4",
                    params![drug.name, drug.side_effects, drug.benefits, drug.id],
                )
                .map_err(|e| StoreError::from_write(e, ENTITY, drug.id))?;
            expect_row(changed, ENTITY, drug.id)
        })
    }

    /// Fails with `ReferentialIntegrity` while a prescription lists the drug
    fn delete(&self, id: i64) -> Result<(), StoreError> {
        self.provider.with_connection(|conn| {
            let changed = conn
                .execute("DELETE FROM drugs WHERE drug_id = ?1", params![id])
                .map_err(|e| StoreError::from_write(e, ENTITY, id))?;
            expect_row(changed, ENTITY, id)
        })
    }

    fn list_all(&self) -> Result<Vec<Drug>, StoreError> {
        self.provider.with_connection(|conn| {
            let mut stmt = conn.prepare(&format!("{} ORDER BY drug_id", SELECT))?;
            let drugs = stmt
                .query_map([], drug_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(drugs)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::test_support::provider;

    #[test]
    fn test_get_missing_is_none() {
        let db = provider();
        assert_eq!(DrugStore::new(&db).get_by_id(1).unwrap(), None);
    }

    #[test]
    fn test_update_and_list() {
        let db = provider();
        let store = DrugStore::new(&db);
        let mut drug = Drug {
            id: 3,
            name: "Amoxicillin".to_string(),
            side_effects: "Diarrhoea".to_string(),
            benefits: "Antibiotic".to_string(),
        };
        store.insert(&drug).unwrap();

        drug.benefits = "Treats bacterial infections".to_string();
        store.update(&drug).unwrap();

        assert_eq!(store.list_all().unwrap(), vec![drug]);
    }
}
