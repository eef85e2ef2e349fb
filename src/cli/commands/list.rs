//! `hospital list` command - Dump the records of one entity

use clap::ValueEnum;
use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use tabled::{builder::Builder, settings::Style};

use crate::cli::args::OutputFormat;
use crate::cli::commands::{open_database, resolve_config};
use crate::cli::GlobalOpts;
use crate::core::store::{
    DoctorStore, DrugStore, InsuranceStore, InsuredPatientStore, PatientStore, PrescriptionStore,
    RecordStore, SpecialistStore, VisitStore,
};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityKind {
    Doctor,
    Specialist,
    Insurance,
    Patient,
    InsuredPatient,
    Drug,
    Visit,
    Prescription,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Entity to list
    #[arg(value_enum)]
    pub entity: EntityKind,

    /// Output format
    #[arg(long, short = 'f', default_value = "table")]
    pub format: OutputFormat,
}

pub fn run(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let config = resolve_config(global);
    let db = open_database(&config);

    if !db.path().exists() {
        return Err(miette::miette!(
            help = "Run `hospital init` first",
            "No database at {}",
            db.path().display()
        ));
    }

    let format = args.format;
    match args.entity {
        EntityKind::Doctor => print_records(
            &DoctorStore::new(&db).list_all()?,
            format,
            &["ID", "Name", "Email", "Specialization"],
            |d| {
                vec![
                    d.id.to_string(),
                    d.full_name(),
                    d.email.clone(),
                    d.specialization().unwrap_or("").to_string(),
                ]
            },
        ),
        EntityKind::Specialist => print_records(
            &SpecialistStore::new(&db).list_all()?,
            format,
            &["ID", "Name", "Specialization", "Experience"],
            |s| {
                vec![
                    s.id().to_string(),
                    s.doctor.full_name(),
                    s.doctor.specialization().unwrap_or("").to_string(),
                    s.years_of_experience.to_string(),
                ]
            },
        ),
        EntityKind::Insurance => print_records(
            &InsuranceStore::new(&db).list_all()?,
            format,
            &["ID", "Company", "Address", "Phone"],
            |i| {
                vec![
                    i.id.to_string(),
                    i.company.clone(),
                    i.address.clone(),
                    i.phone.clone(),
                ]
            },
        ),
        EntityKind::Patient => print_records(
            &PatientStore::new(&db).list_all()?,
            format,
            &["ID", "Name", "Postcode", "Phone", "Insurance"],
            |p| {
                vec![
                    p.id.to_string(),
                    p.full_name(),
                    p.postcode.clone(),
                    p.phone.clone(),
                    optional(p.insurance_id),
                ]
            },
        ),
        EntityKind::InsuredPatient => print_records(
            &InsuredPatientStore::new(&db).list_all()?,
            format,
            &["ID", "Name", "Type", "Company", "Months"],
            |p| {
                vec![
                    p.id().to_string(),
                    p.patient.full_name(),
                    p.insurance_type.to_string(),
                    p.insurance_company.clone(),
                    p.duration_months.to_string(),
                ]
            },
        ),
        EntityKind::Drug => print_records(
            &DrugStore::new(&db).list_all()?,
            format,
            &["ID", "Name", "Side effects", "Benefits"],
            |d| {
                vec![
                    d.id.to_string(),
                    d.name.clone(),
                    d.side_effects.clone(),
                    d.benefits.clone(),
                ]
            },
        ),
        EntityKind::Visit => print_records(
            &VisitStore::new(&db).list_all()?,
            format,
            &["ID", "Date", "Patient", "Doctor", "Symptoms", "Diagnosis"],
            |v| {
                vec![
                    v.id.to_string(),
                    v.date.to_string(),
                    v.patient_id.to_string(),
                    v.doctor_id.to_string(),
                    v.symptoms.clone(),
                    v.diagnosis.clone(),
                ]
            },
        ),
        EntityKind::Prescription => print_records(
            &PrescriptionStore::new(&db).list_all()?,
            format,
            &["ID", "Date", "Patient", "Prescriber", "Dosage", "Duration", "Drugs"],
            |p| {
                vec![
                    p.id.to_string(),
                    p.date.to_string(),
                    p.patient_id.to_string(),
                    optional(p.prescriber_id),
                    p.dosage.clone(),
                    p.duration.clone(),
                    p.drug_ids
                        .iter()
                        .map(i64::to_string)
                        .collect::<Vec<_>>()
                        .join(","),
                ]
            },
        ),
    }
}

fn optional(id: Option<i64>) -> String {
    id.map(|n| n.to_string()).unwrap_or_default()
}

fn print_records<T: Serialize>(
    records: &[T],
    format: OutputFormat,
    headers: &[&str],
    row: impl Fn(&T) -> Vec<String>,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(records).into_diagnostic()?);
        }
        OutputFormat::Tsv => {
            println!("{}", headers.join("\t"));
            for record in records {
                let fields: Vec<String> = row(record).iter().map(|f| tsv_field(f)).collect();
                println!("{}", fields.join("\t"));
            }
        }
        OutputFormat::Table => {
            if records.is_empty() {
                println!("No records found.");
                return Ok(());
            }
            let mut table = Builder::default();
            table.push_record(headers.iter().map(|h| h.to_string()));
            for record in records {
                table.push_record(row(record));
            }
            println!("{}", table.build().with(Style::markdown()));
            println!();
            println!("{} record(s) found", style(records.len()).cyan());
        }
    }
    Ok(())
}

/// Keep one record per line in TSV output
fn tsv_field(value: &str) -> String {
    value.replace(['\t', '\n', '\r'], " ")
}
