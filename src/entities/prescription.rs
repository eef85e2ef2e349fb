//! Prescription entity type

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A prescription for one patient covering any number of drugs.
///
/// `drug_ids` mirrors the `prescription_drugs` bridge rows exactly; an update
/// replaces the whole set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prescription {
    pub id: i64,
    pub date: NaiveDate,
    pub dosage: String,
    pub duration: String,
    pub comment: String,
    pub patient_id: i64,

    /// Prescribing doctor, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prescriber_id: Option<i64>,

    #[serde(default)]
    pub drug_ids: BTreeSet<i64>,
}
