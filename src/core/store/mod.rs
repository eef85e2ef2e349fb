//! Record stores: CRUD per entity
//!
//! Every store is generic over a
//! [`ConnectionProvider`](super::db::ConnectionProvider) and acquires one
//! connection per call. Multi-statement operations (subclass pairs, the
//! prescription bridge, parent deletes) run inside a single transaction.
//!
//! Shared contract:
//! - `get_by_id` returns `Ok(None)` when nothing matches
//! - `update` / `delete` of a missing id return [`StoreError::NotFound`]
//! - foreign key violations surface as [`StoreError::ReferentialIntegrity`]

mod doctor;
mod drug;
mod insurance;
mod insured_patient;
mod patient;
mod prescription;
mod specialist;
mod visit;

pub use doctor::DoctorStore;
pub use drug::DrugStore;
pub use insurance::InsuranceStore;
pub use insured_patient::InsuredPatientStore;
pub use patient::PatientStore;
pub use prescription::PrescriptionStore;
pub use specialist::SpecialistStore;
pub use visit::VisitStore;

use super::error::StoreError;

/// Generic CRUD contract implemented by every entity store
pub trait RecordStore {
    type Record;

    /// Insert a record and return its id (generated for visits)
    fn insert(&self, record: &Self::Record) -> Result<i64, StoreError>;

    fn get_by_id(&self, id: i64) -> Result<Option<Self::Record>, StoreError>;

    fn update(&self, record: &Self::Record) -> Result<(), StoreError>;

    fn delete(&self, id: i64) -> Result<(), StoreError>;

    /// All records, re-queried on every call
    fn list_all(&self) -> Result<Vec<Self::Record>, StoreError>;
}

/// Turn a zero row count from an UPDATE/DELETE into `NotFound`
fn expect_row(changed: usize, entity: &'static str, id: i64) -> Result<(), StoreError> {
    if changed == 0 {
        Err(StoreError::NotFound { entity, id })
    } else {
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::core::db::{ConnectionProvider, SharedConnection};
    use crate::core::schema::ensure_schema;
    use crate::entities::{Doctor, Patient};

    /// In-memory database with the schema applied
    pub fn provider() -> SharedConnection {
        let provider = SharedConnection::in_memory().unwrap();
        provider.with_connection(ensure_schema).unwrap();
        provider
    }

    pub fn doctor(id: i64, specialization: Option<&str>) -> Doctor {
        Doctor {
            id,
            first_name: format!("Doc{}", id),
            surname: "Surname".to_string(),
            address: "Street 1".to_string(),
            email: format!("doc{}@hospital.test", id),
            specialization: specialization.map(str::to_string),
        }
    }

    pub fn patient(id: i64, insurance_id: Option<i64>) -> Patient {
        Patient {
            id,
            first_name: format!("Pat{}", id),
            surname: "Surname".to_string(),
            postcode: "12345".to_string(),
            address: "Road 2".to_string(),
            phone: "555-0100".to_string(),
            email: format!("pat{}@mail.test", id),
            insurance_id,
        }
    }
}
