//! Doctor store (base table `doctors`)

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{expect_row, RecordStore};
use crate::core::db::ConnectionProvider;
use crate::core::error::StoreError;
use crate::entities::Doctor;

const ENTITY: &str = "doctor";

const SELECT: &str =
    "SELECT doctor_id, first_name, surname, address, email, specialization FROM doctors";

pub struct DoctorStore<'a, P: ConnectionProvider> {
    provider: &'a P,
}

impl<'a, P: ConnectionProvider> DoctorStore<'a, P> {
    pub fn new(provider: &'a P) -> Self {
        Self { provider }
    }
}

pub(crate) fn doctor_from_row(row: &Row) -> rusqlite::Result<Doctor> {
    Ok(Doctor {
        id: row.get("doctor_id")?,
        first_name: row.get("first_name")?,
        surname: row.get("surname")?,
        address: row.get("address")?,
        email: row.get("email")?,
        specialization: row.get("specialization")?,
    })
}

pub(crate) fn fetch(conn: &Connection, id: i64) -> rusqlite::Result<Option<Doctor>> {
    conn.query_row(
        &format!("{} WHERE doctor_id = ?1", SELECT),
        params![id],
        doctor_from_row,
    )
    .optional()
}

/// Insert or overwrite the base row. Used by the specialist store, which
/// owns both halves of a specialist.
pub(crate) fn upsert(conn: &Connection, doctor: &Doctor) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO doctors (doctor_id, first_name, surname, address, email, specialization)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(doctor_id) DO UPDATE SET
             first_name = excluded.first_name,
             surname = excluded.surname,
             address = excluded.address,
             email = excluded.email,
             specialization = excluded.specialization",
        params![
            doctor.id,
            doctor.first_name,
            doctor.surname,
            doctor.address,
            doctor.email,
            doctor.specialization
        ],
    )
}

pub(crate) fn update_base(conn: &Connection, doctor: &Doctor) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE doctors SET first_name = ?1, surname = ?2, address = ?3, email = ?4, specialization = ?5
         WHERE doctor_id = ?6",
        params![
            doctor.first_name,
            doctor.surname,
            doctor.address,
            doctor.email,
            doctor.specialization,
            doctor.id
        ],
    )
}

impl<P: ConnectionProvider> RecordStore for DoctorStore<'_, P> {
    type Record = Doctor;

    /// Inserting a doctor never creates a specialist row, whatever the
    /// specialization; use `SpecialistStore` for that.
    fn insert(&self, doctor: &Doctor) -> Result<i64, StoreError> {
        self.provider.with_connection(|conn| {
            conn.execute(
                "INSERT INTO doctors (doctor_id, first_name, surname, address, email, specialization)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    doctor.id,
                    doctor.first_name,
                    doctor.surname,
                    doctor.address,
                    doctor.email,
                    doctor.specialization
                ],
            )
            .map_err(|e| StoreError::from_write(e, ENTITY, doctor.id))?;
            Ok(doctor.id)
        })
    }

    fn get_by_id(&self, id: i64) -> Result<Option<Doctor>, StoreError> {
        self.provider
            .with_connection(|conn| Ok(fetch(conn, id)?))
    }

    fn update(&self, doctor: &Doctor) -> Result<(), StoreError> {
        self.provider.with_connection(|conn| {
            let changed = update_base(conn, doctor)
                .map_err(|e| StoreError::from_write(e, ENTITY, doctor.id))?;
            expect_row(changed, ENTITY, doctor.id)
        })
    }

    /// Removes the specialist row first, then the doctor, in one transaction.
    /// Fails with `ReferentialIntegrity` while visits or prescriptions still
    /// reference the doctor; nothing is removed in that case.
    fn delete(&self, id: i64) -> Result<(), StoreError> {
        self.provider.with_connection(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM specialists WHERE specialist_id = ?1", params![id])
                .map_err(|e| StoreError::from_write(e, "specialist", id))?;
            let changed = tx
                .execute("DELETE FROM doctors WHERE doctor_id = ?1", params![id])
                .map_err(|e| StoreError::from_write(e, ENTITY, id))?;
            expect_row(changed, ENTITY, id)?;
            tx.commit()?;
            Ok(())
        })
    }

    fn list_all(&self) -> Result<Vec<Doctor>, StoreError> {
        self.provider.with_connection(|conn| {
            let mut stmt = conn.prepare(&format!("{} ORDER BY doctor_id", SELECT))?;
            let doctors = stmt
                .query_map([], doctor_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(doctors)
        })
    }
}
