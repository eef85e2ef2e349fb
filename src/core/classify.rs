//! Subclass classification pass
//!
//! After the bulk load, base rows are scanned once to decide which doctors
//! are specialists and which patients are insured. The subclass-only columns
//! are not present in the source data, so they are synthesized through a
//! [`ClassificationPolicy`]. Synthesized values are placeholders within the
//! declared bounds, never authoritative data.
//!
//! This is a one-shot pass, not a trigger: doctors and patients inserted later
//! through the stores do not get subclass rows automatically. Callers create
//! them explicitly with `SpecialistStore` / `InsuredPatientStore`.

use std::ops::RangeInclusive;

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use rusqlite::{params, Connection};
use serde::Serialize;

use super::error::StoreError;
use crate::entities::InsuranceType;

/// Bounds for synthesized years of experience
pub const EXPERIENCE_YEARS: RangeInclusive<i32> = 1..=30;

/// Bounds for synthesized insurance duration in months
pub const INSURANCE_MONTHS: RangeInclusive<i32> = 6..=29;

/// Company name used when the referenced insurer has none
pub const PLACEHOLDER_COMPANY: &str = "PlaceholderCo";

/// Source of the synthesized subclass columns
pub trait ClassificationPolicy {
    fn experience_years(&mut self) -> i32;
    fn insurance_type(&mut self) -> InsuranceType;
    fn insurance_duration_months(&mut self) -> i32;
}

/// Uniform random sampling within the declared bounds
#[derive(Debug)]
pub struct RandomPolicy<R = StdRng> {
    rng: R,
}

impl RandomPolicy<StdRng> {
    /// Seeded from the operating system; values are not reproducible
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Reproducible sampling for a given seed
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomPolicy<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> RandomPolicy<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> ClassificationPolicy for RandomPolicy<R> {
    fn experience_years(&mut self) -> i32 {
        self.rng.random_range(EXPERIENCE_YEARS)
    }

    fn insurance_type(&mut self) -> InsuranceType {
        *InsuranceType::ALL
            .choose(&mut self.rng)
            .unwrap_or(&InsuranceType::Basic)
    }

    fn insurance_duration_months(&mut self) -> i32 {
        self.rng.random_range(INSURANCE_MONTHS)
    }
}

/// Rows created by one classification pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClassificationReport {
    pub specialists_created: usize,
    pub insured_patients_created: usize,
}

/// Derive specialist and insured-patient rows from the base tables.
///
/// Existing subclass rows are left untouched, so running the pass twice
/// creates nothing the second time.
pub fn materialize_subclasses(
    conn: &mut Connection,
    policy: &mut dyn ClassificationPolicy,
) -> Result<ClassificationReport, StoreError> {
    let tx = conn.transaction()?;
    let mut report = ClassificationReport::default();

    {
        let candidates: Vec<i64> = {
            let mut stmt = tx.prepare(
                "SELECT doctor_id FROM doctors
                 WHERE TRIM(COALESCE(specialization, '')) <> ''
                 ORDER BY doctor_id",
            )?;
            let rows = stmt.query_map([], |row| row.get(0))?;
            rows.collect::<Result<_, _>>()?
        };

        let mut insert = tx.prepare(
            "INSERT OR IGNORE INTO specialists (specialist_id, experience) VALUES (?1, ?2)",
        )?;
        for doctor_id in candidates {
            let experience = clamp(policy.experience_years(), &EXPERIENCE_YEARS);
            report.specialists_created += insert.execute(params![doctor_id, experience])?;
        }
    }

    {
        let candidates: Vec<(i64, Option<String>)> = {
            let mut stmt = tx.prepare(
                "SELECT p.patient_id, i.company
                 FROM patients p
                 LEFT JOIN insurance i ON p.insurance_id = i.insurance_id
                 WHERE COALESCE(p.insurance_id, 0) <> 0
                 ORDER BY p.patient_id",
            )?;
            let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
            rows.collect::<Result<_, _>>()?
        };

        let mut insert = tx.prepare(
            "INSERT OR IGNORE INTO insured_patients
                 (patient_id, insurance_type, insurance_company_name, duration_of_insurance)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        for (patient_id, company) in candidates {
            let company = company
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| PLACEHOLDER_COMPANY.to_string());
            let insurance_type = policy.insurance_type();
            let months = clamp(policy.insurance_duration_months(), &INSURANCE_MONTHS);
            report.insured_patients_created +=
                insert.execute(params![patient_id, insurance_type, company, months])?;
        }
    }

    tx.commit()?;
    tracing::info!(
        specialists = report.specialists_created,
        insured_patients = report.insured_patients_created,
        "classification pass complete"
    );
    Ok(report)
}

fn clamp(value: i32, bounds: &RangeInclusive<i32>) -> i32 {
    if !bounds.contains(&value) {
        tracing::warn!(value, "synthesized value out of range, clamping");
    }
    value.clamp(*bounds.start(), *bounds.end())
}
