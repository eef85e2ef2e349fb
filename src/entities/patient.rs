//! Patient and InsuredPatient entity types

use std::fmt;
use std::str::FromStr;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

/// A patient (base table `patients`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: i64,
    pub first_name: String,
    pub surname: String,
    pub postcode: String,
    pub address: String,
    pub phone: String,
    pub email: String,

    /// Insurer reference; `None` means uninsured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insurance_id: Option<i64>,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.surname).trim().to_string()
    }
}

/// Coverage tier assigned to an insured patient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InsuranceType {
    Basic,
    Gold,
    Premium,
}

impl InsuranceType {
    pub const ALL: [InsuranceType; 3] = [
        InsuranceType::Basic,
        InsuranceType::Gold,
        InsuranceType::Premium,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InsuranceType::Basic => "Basic",
            InsuranceType::Gold => "Gold",
            InsuranceType::Premium => "Premium",
        }
    }
}

impl fmt::Display for InsuranceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InsuranceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "basic" => Ok(InsuranceType::Basic),
            "gold" => Ok(InsuranceType::Gold),
            "premium" => Ok(InsuranceType::Premium),
            other => Err(format!("unknown insurance type '{}'", other)),
        }
    }
}

impl ToSql for InsuranceType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for InsuranceType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        text.parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

/// A patient with an `insured_patients` extension row of the same id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsuredPatient {
    #[serde(flatten)]
    pub patient: Patient,
    pub insurance_type: InsuranceType,
    pub insurance_company: String,
    pub duration_months: i32,
}

impl InsuredPatient {
    pub fn id(&self) -> i64 {
        self.patient.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insurance_type_parse_is_case_insensitive() {
        assert_eq!("gold".parse::<InsuranceType>().unwrap(), InsuranceType::Gold);
        assert_eq!(" PREMIUM ".parse::<InsuranceType>().unwrap(), InsuranceType::Premium);
        assert!("platinum".parse::<InsuranceType>().is_err());
    }

    #[test]
    fn test_insurance_type_display() {
        assert_eq!(InsuranceType::Basic.to_string(), "Basic");
    }
}
