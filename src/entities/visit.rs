//! Visit entity type

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Doctor, Patient};

/// A patient visit. The id is assigned by the database on insert.
///
/// Reads are shallow: only the doctor and patient ids are loaded. Use
/// `VisitStore::get_hydrated` for the full related records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visit {
    /// Ignored on insert
    pub id: i64,
    pub date: NaiveDate,
    pub symptoms: String,
    pub diagnosis: String,
    pub doctor_id: i64,
    pub patient_id: i64,
}

impl Visit {
    /// A visit not yet stored
    pub fn new(
        date: NaiveDate,
        doctor_id: i64,
        patient_id: i64,
        symptoms: impl Into<String>,
        diagnosis: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            date,
            symptoms: symptoms.into(),
            diagnosis: diagnosis.into(),
            doctor_id,
            patient_id,
        }
    }
}

/// A visit with its doctor and patient loaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HydratedVisit {
    pub visit: Visit,
    pub doctor: Doctor,
    pub patient: Patient,
}
