//! Doctor and Specialist entity types

use serde::{Deserialize, Serialize};

/// A doctor (base table `doctors`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: i64,
    pub first_name: String,
    pub surname: String,
    pub address: String,
    pub email: String,

    /// Free-text specialization; a non-empty value marks the doctor as a
    /// specialist candidate during classification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,
}

impl Doctor {
    /// Specialization trimmed, or `None` when missing or blank
    pub fn specialization(&self) -> Option<&str> {
        self.specialization
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.surname).trim().to_string()
    }
}

/// A doctor with a `specialists` extension row of the same id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Specialist {
    #[serde(flatten)]
    pub doctor: Doctor,
    pub years_of_experience: i32,
}

impl Specialist {
    pub fn id(&self) -> i64 {
        self.doctor.id
    }
}
