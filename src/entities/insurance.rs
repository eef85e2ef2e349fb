//! Insurance company entity type

use serde::{Deserialize, Serialize};

/// An insurer referenced by patients
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insurance {
    pub id: i64,
    pub company: String,
    pub address: String,
    pub phone: String,
}
