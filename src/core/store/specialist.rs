//! Specialist store: manages both the `doctors` base row and the
//! `specialists` extension row

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::doctor::{doctor_from_row, update_base, upsert};
use super::{expect_row, RecordStore};
use crate::core::db::ConnectionProvider;
use crate::core::error::StoreError;
use crate::entities::Specialist;

const ENTITY: &str = "specialist";

const SELECT: &str = "SELECT d.doctor_id, d.first_name, d.surname, d.address, d.email, d.specialization, s.experience
     FROM specialists s
     JOIN doctors d ON s.specialist_id = d.doctor_id";

pub struct SpecialistStore<'a, P: ConnectionProvider> {
    provider: &'a P,
}

impl<'a, P: ConnectionProvider> SpecialistStore<'a, P> {
    pub fn new(provider: &'a P) -> Self {
        Self { provider }
    }
}

fn specialist_from_row(row: &Row) -> rusqlite::Result<Specialist> {
    Ok(Specialist {
        doctor: doctor_from_row(row)?,
        years_of_experience: row.get("experience")?,
    })
}

fn fetch(conn: &Connection, id: i64) -> rusqlite::Result<Option<Specialist>> {
    conn.query_row(
        &format!("{} WHERE s.specialist_id = ?1", SELECT),
        params![id],
        specialist_from_row,
    )
    .optional()
}

impl<P: ConnectionProvider> RecordStore for SpecialistStore<'_, P> {
    type Record = Specialist;

    /// Upserts the doctor row, then inserts the specialist row. Both run in
    /// one transaction: if the specialist insert fails the doctor row is
    /// left as it was.
    fn insert(&self, specialist: &Specialist) -> Result<i64, StoreError> {
        let id = specialist.id();
        self.provider.with_connection(|conn| {
            let tx = conn.transaction()?;
            upsert(&tx, &specialist.doctor).map_err(|e| StoreError::from_write(e, "doctor", id))?;
            tx.execute(
                "INSERT INTO specialists (specialist_id, experience) VALUES (?1, ?2)",
                params![id, specialist.years_of_experience],
            )
            .map_err(|e| StoreError::from_write(e, ENTITY, id))?;
            tx.commit()?;
            Ok(id)
        })
    }

    fn get_by_id(&self, id: i64) -> Result<Option<Specialist>, StoreError> {
        self.provider.with_connection(|conn| Ok(fetch(conn, id)?))
    }

    fn update(&self, specialist: &Specialist) -> Result<(), StoreError> {
        let id = specialist.id();
        self.provider.with_connection(|conn| {
            let tx = conn.transaction()?;
            let changed = tx
                .execute(
                    "UPDATE specialists SET experience = ?1 WHERE specialist_id = ?2",
                    params![specialist.years_of_experience, id],
                )
                .map_err(|e| StoreError::from_write(e, ENTITY, id))?;
            expect_row(changed, ENTITY, id)?;
            update_base(&tx, &specialist.doctor)
                .map_err(|e| StoreError::from_write(e, "doctor", id))?;
            tx.commit()?;
            Ok(())
        })
    }

    /// Removes only the specialist row; the doctor stays
    fn delete(&self, id: i64) -> Result<(), StoreError> {
        self.provider.with_connection(|conn| {
            let changed = conn
                .execute("DELETE FROM specialists WHERE specialist_id = ?1", params![id])
                .map_err(|e| StoreError::from_write(e, ENTITY, id))?;
            expect_row(changed, ENTITY, id)
        })
    }

    fn list_all(&self) -> Result<Vec<Specialist>, StoreError> {
        self.provider.with_connection(|conn| {
            let mut stmt = conn.prepare(&format!("{} ORDER BY d.doctor_id", SELECT))?;
            let specialists = stmt
                .query_map([], specialist_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(specialists)
        })
    }
}
