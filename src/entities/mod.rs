//! Entity type definitions
//!
//! Base entities map one-to-one onto base tables. Subclass entities
//! ([`Specialist`], [`InsuredPatient`]) compose their base record with the
//! extension columns stored under the same id in the subclass table.
//!
//! **People:**
//! - [`Doctor`] / [`Specialist`]
//! - [`Patient`] / [`InsuredPatient`]
//!
//! **Reference data:**
//! - [`Insurance`] - insurers referenced by patients
//! - [`Drug`] - drugs referenced by prescriptions
//!
//! **Clinical records:**
//! - [`Visit`] - one doctor seeing one patient
//! - [`Prescription`] - drugs prescribed to a patient (many-to-many with drugs)

pub mod doctor;
pub mod drug;
pub mod insurance;
pub mod patient;
pub mod prescription;
pub mod visit;

pub use doctor::{Doctor, Specialist};
pub use drug::Drug;
pub use insurance::Insurance;
pub use patient::{InsuranceType, InsuredPatient, Patient};
pub use prescription::Prescription;
pub use visit::{HydratedVisit, Visit};
