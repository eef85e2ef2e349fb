//! Drug entity type

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Drug {
    pub id: i64,
    pub name: String,
    pub side_effects: String,
    pub benefits: String,
}
