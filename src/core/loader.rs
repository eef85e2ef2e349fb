//! Bulk loading of the base tables from delimited text
//!
//! Six sources, one per base entity, each a header line followed by
//! comma-separated rows. Malformed rows are skipped and recorded in the
//! [`LoadReport`]; one bad row never aborts a source.

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::PathBuf;
use std::time::Instant;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use rusqlite::{params, Connection, Transaction};
use rust_embed::Embed;
use serde::Serialize;

use super::error::{constraint_kind, ConstraintKind, StoreError};

/// Sample data set compiled into the binary
#[derive(Embed)]
#[folder = "data/"]
struct SampleData;

/// The six bulk sources, one per base entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Doctor,
    Insurance,
    Patient,
    Drug,
    Visit,
    Prescription,
}

impl SourceKind {
    /// Parents before children: patients reference insurance, visits and
    /// prescriptions reference doctors, patients and drugs
    pub const LOAD_ORDER: [SourceKind; 6] = [
        SourceKind::Doctor,
        SourceKind::Insurance,
        SourceKind::Patient,
        SourceKind::Drug,
        SourceKind::Visit,
        SourceKind::Prescription,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Doctor => "Doctor",
            SourceKind::Insurance => "Insurance",
            SourceKind::Patient => "Patient",
            SourceKind::Drug => "Drug",
            SourceKind::Visit => "Visit",
            SourceKind::Prescription => "Prescription",
        }
    }

    /// File name used by directory and embedded sources
    pub fn file_name(&self) -> String {
        format!("{}.csv", self.as_str())
    }

    /// Minimum number of fields a data line must carry
    pub fn column_count(&self) -> usize {
        match self {
            SourceKind::Doctor => 6,
            SourceKind::Insurance => 4,
            SourceKind::Patient => 8,
            SourceKind::Drug => 4,
            SourceKind::Visit => 5,
            SourceKind::Prescription => 8,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the bulk sources come from
pub trait DataSource {
    /// Open one source, or `None` if this provider has no data for it
    fn open(&self, kind: SourceKind) -> Result<Option<Box<dyn Read + '_>>, StoreError>;
}

/// The sample data set shipped inside the binary
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedSource;

impl DataSource for EmbeddedSource {
    fn open(&self, kind: SourceKind) -> Result<Option<Box<dyn Read + '_>>, StoreError> {
        Ok(SampleData::get(&kind.file_name())
            .map(|file| Box::new(Cursor::new(file.data)) as Box<dyn Read>))
    }
}

/// A directory holding `Doctor.csv`, `Insurance.csv`, ...
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl DataSource for DirectorySource {
    fn open(&self, kind: SourceKind) -> Result<Option<Box<dyn Read + '_>>, StoreError> {
        let path = self.dir.join(kind.file_name());
        if !path.is_file() {
            return Ok(None);
        }
        let file = File::open(&path).map_err(|e| StoreError::Source {
            source_name: path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(Some(Box::new(BufReader::new(file))))
    }
}

/// In-memory sources, mostly for tests
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    texts: HashMap<SourceKind, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: SourceKind, text: impl Into<String>) -> Self {
        self.texts.insert(kind, text.into());
        self
    }
}

impl DataSource for MemorySource {
    fn open(&self, kind: SourceKind) -> Result<Option<Box<dyn Read + '_>>, StoreError> {
        Ok(self
            .texts
            .get(&kind)
            .map(|text| Box::new(text.as_bytes()) as Box<dyn Read + '_>))
    }
}

/// Why a row was skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowErrorKind {
    /// Fewer fields than the entity has columns
    TooFewFields,
    /// The row names a parent that does not exist
    ReferentialIntegrity,
    /// The line could not be decoded at all
    Csv,
}

/// One skipped row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    pub source: SourceKind,
    pub line: u64,
    pub kind: RowErrorKind,
    pub message: String,
}

/// Outcome of loading one source
#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    pub source: SourceKind,
    /// The source was not provided
    pub missing: bool,
    pub rows_read: usize,
    pub rows_inserted: usize,
    /// Rows whose key was already present
    pub duplicates: usize,
    /// Fields replaced by a sentinel (0 or today) because they did not parse
    pub sentinels: usize,
    /// Repeated prescription lines whose dosage, duration, comment or date
    /// differ from the first line with that id; only the first line's
    /// values are kept
    pub conflicts: usize,
    pub errors: Vec<RowError>,
}

impl SourceReport {
    fn new(source: SourceKind) -> Self {
        Self {
            source,
            missing: false,
            rows_read: 0,
            rows_inserted: 0,
            duplicates: 0,
            sentinels: 0,
            conflicts: 0,
            errors: Vec::new(),
        }
    }
}

/// Outcome of a full bulk load
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub sources: Vec<SourceReport>,
    pub duration_ms: u64,
}

impl LoadReport {
    pub fn source(&self, kind: SourceKind) -> Option<&SourceReport> {
        self.sources.iter().find(|s| s.source == kind)
    }

    pub fn error_count(&self) -> usize {
        self.sources.iter().map(|s| s.errors.len()).sum()
    }

    pub fn rows_inserted(&self) -> usize {
        self.sources.iter().map(|s| s.rows_inserted).sum()
    }

    pub fn errors(&self) -> impl Iterator<Item = &RowError> {
        self.sources.iter().flat_map(|s| s.errors.iter())
    }
}

/// Load every source in dependency order
pub fn load_all(conn: &mut Connection, sources: &dyn DataSource) -> Result<LoadReport, StoreError> {
    let start = Instant::now();
    let mut report = LoadReport::default();

    for kind in SourceKind::LOAD_ORDER {
        let source_report = load_source(conn, sources, kind)?;
        tracing::info!(
            source = %kind,
            read = source_report.rows_read,
            inserted = source_report.rows_inserted,
            duplicates = source_report.duplicates,
            errors = source_report.errors.len(),
            "loaded source"
        );
        report.sources.push(source_report);
    }

    report.duration_ms = start.elapsed().as_millis() as u64;
    Ok(report)
}

/// Load a single source inside one transaction
pub fn load_source(
    conn: &mut Connection,
    sources: &dyn DataSource,
    kind: SourceKind,
) -> Result<SourceReport, StoreError> {
    let mut report = SourceReport::new(kind);

    let Some(reader) = sources.open(kind)? else {
        tracing::warn!(source = %kind, "source not found, skipping");
        report.missing = true;
        return Ok(report);
    };

    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .quoting(false)
        .from_reader(reader);

    let tx = conn.transaction()?;

    for result in rdr.records() {
        let record = match result {
            Ok(r) => r,
            Err(e) if e.is_io_error() => {
                return Err(StoreError::Source {
                    source_name: kind.file_name(),
                    message: e.to_string(),
                });
            }
            Err(e) => {
                let line = e.position().map(|p| p.line()).unwrap_or(0);
                report.rows_read += 1;
                skip_row(&mut report, line, RowErrorKind::Csv, e.to_string());
                continue;
            }
        };

        if is_blank(&record) {
            continue;
        }

        report.rows_read += 1;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        if record.len() < kind.column_count() {
            let message = format!(
                "expected {} fields, found {}: {}",
                kind.column_count(),
                record.len(),
                record.iter().collect::<Vec<_>>().join(",")
            );
            skip_row(&mut report, line, RowErrorKind::TooFewFields, message);
            continue;
        }

        let mut fields = Fields::new(&record);
        let outcome = insert_row(&tx, kind, &mut fields, &mut report.conflicts);
        report.sentinels += fields.sentinels;

        match outcome {
            Ok(true) => report.rows_inserted += 1,
            Ok(false) => {
                report.duplicates += 1;
                tracing::debug!(source = %kind, line, "duplicate row ignored");
            }
            Err(e) if constraint_kind(&e) == Some(ConstraintKind::ForeignKey) => {
                skip_row(
                    &mut report,
                    line,
                    RowErrorKind::ReferentialIntegrity,
                    e.to_string(),
                );
            }
            Err(e) => return Err(StoreError::Database(e)),
        }
    }

    tx.commit()?;
    Ok(report)
}

fn skip_row(report: &mut SourceReport, line: u64, kind: RowErrorKind, message: String) {
    tracing::warn!(source = %report.source, line, ?kind, "skipping row: {}", message);
    report.errors.push(RowError {
        source: report.source,
        line,
        kind,
        message,
    });
}

fn is_blank(record: &StringRecord) -> bool {
    record.len() == 1 && record.get(0).is_some_and(str::is_empty)
}

/// Field accessor applying the sentinel policy.
///
/// Known data-quality compromise, kept for compatibility with existing data
/// files: an unparseable integer becomes 0 and an unparseable date becomes
/// today. Every substitution is counted so callers can see how often it
/// happened.
struct Fields<'a> {
    record: &'a StringRecord,
    sentinels: usize,
}

impl<'a> Fields<'a> {
    fn new(record: &'a StringRecord) -> Self {
        Self {
            record,
            sentinels: 0,
        }
    }

    fn text(&self, idx: usize) -> &'a str {
        self.record.get(idx).unwrap_or("")
    }

    /// Ids and references are 32-bit in the source data; anything wider
    /// is treated as unparseable
    fn int(&mut self, idx: usize) -> i64 {
        match self.text(idx).parse::<i32>() {
            Ok(n) => i64::from(n),
            Err(_) => {
                self.sentinels += 1;
                0
            }
        }
    }

    /// Integer where 0 means "no reference"
    fn reference(&mut self, idx: usize) -> Option<i64> {
        Some(self.int(idx)).filter(|&n| n != 0)
    }

    fn date(&mut self, idx: usize) -> NaiveDate {
        match NaiveDate::parse_from_str(self.text(idx), "%Y-%m-%d") {
            Ok(d) => d,
            Err(_) => {
                self.sentinels += 1;
                chrono::Local::now().date_naive()
            }
        }
    }
}

/// Insert one parsed row. `Ok(false)` means the key already existed.
fn insert_row(
    tx: &Transaction,
    kind: SourceKind,
    f: &mut Fields,
    conflicts: &mut usize,
) -> rusqlite::Result<bool> {
    let changed = match kind {
        SourceKind::Doctor => {
            let specialization = Some(f.text(5)).filter(|s| !s.is_empty());
            tx.prepare_cached(
                "INSERT OR IGNORE INTO doctors (doctor_id, first_name, surname, address, email, specialization)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?
            .execute(params![f.int(0), f.text(1), f.text(2), f.text(3), f.text(4), specialization])?
        }
        SourceKind::Insurance => tx
            .prepare_cached(
                "INSERT OR IGNORE INTO insurance (insurance_id, company, address, phone)
                 VALUES (?1, ?2, ?3, ?4)",
            )?
            .execute(params![f.int(0), f.text(1), f.text(2), f.text(3)])?,
        SourceKind::Patient => tx
            .prepare_cached(
                "INSERT OR IGNORE INTO patients (patient_id, first_name, surname, postcode, address, phone, email, insurance_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?
            .execute(params![
                f.int(0),
                f.text(1),
                f.text(2),
                f.text(3),
                f.text(4),
                f.text(5),
                f.text(6),
                f.reference(7)
            ])?,
        SourceKind::Drug => tx
            .prepare_cached(
                "INSERT OR IGNORE INTO drugs (drug_id, name, side_effects, benefits)
                 VALUES (?1, ?2, ?3, ?4)",
            )?
            .execute(params![f.int(0), f.text(1), f.text(2), f.text(3)])?,
        // Visits have no natural key; an identical visit counts as a duplicate
        SourceKind::Visit => tx
            .prepare_cached(
                "INSERT INTO visits (patient_id, doctor_id, date_of_visit, symptoms, diagnosis)
                 SELECT ?1, ?2, ?3, ?4, ?5
                 WHERE NOT EXISTS (
                     SELECT 1 FROM visits
                     WHERE patient_id = ?1 AND doctor_id = ?2 AND date_of_visit = ?3
                       AND symptoms = ?4 AND diagnosis = ?5
                 )",
            )?
            .execute(params![f.int(0), f.int(1), f.date(2), f.text(3), f.text(4)])?,
        SourceKind::Prescription => insert_prescription_row(tx, f, conflicts)?,
    };
    Ok(changed > 0)
}

/// A prescription line adds the prescription (once per id) plus one bridge
/// row for its drug, so repeated ids build a multi-drug prescription.
fn insert_prescription_row(
    tx: &Transaction,
    f: &mut Fields,
    conflicts: &mut usize,
) -> rusqlite::Result<usize> {
    let id = f.int(0);
    let date = f.date(1);
    let drug_id = f.reference(5);
    let prescriber_id = f.reference(6);
    let patient_id = f.int(7);

    tx.execute_batch("SAVEPOINT prescription_row")?;
    let result = (|| -> rusqlite::Result<(usize, bool)> {
        let mut changed = tx
            .prepare_cached(
                "INSERT OR IGNORE INTO prescriptions (prescription_id, date_prescribed, dosage, duration, comment, patient_id, prescriber_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?
            .execute(params![id, date, f.text(2), f.text(3), f.text(4), patient_id, prescriber_id])?;

        let conflicting = changed == 0
            && tx
                .prepare_cached(
                    "SELECT COUNT(*) FROM prescriptions
                     WHERE prescription_id = ?1
                       AND (date_prescribed <> ?2 OR dosage <> ?3 OR duration <> ?4 OR comment <> ?5)",
                )?
                .query_row(params![id, date, f.text(2), f.text(3), f.text(4)], |row| {
                    row.get::<_, i64>(0)
                })?
                > 0;

        if let Some(drug_id) = drug_id {
            changed += tx
                .prepare_cached(
                    "INSERT OR IGNORE INTO prescription_drugs (prescription_id, drug_id) VALUES (?1, ?2)",
                )?
                .execute(params![id, drug_id])?;
        }
        Ok((changed, conflicting))
    })();

    match result {
        Ok((changed, conflicting)) => {
            tx.execute_batch("RELEASE prescription_row")?;
            if conflicting {
                *conflicts += 1;
                tracing::warn!(
                    prescription = id,
                    "repeated prescription line differs from the first; keeping the first line's values"
                );
            }
            Ok(changed)
        }
        Err(e) => {
            tx.execute_batch("ROLLBACK TO prescription_row; RELEASE prescription_row")?;
            Err(e)
        }
    }
}
