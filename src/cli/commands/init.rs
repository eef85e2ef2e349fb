//! `hospital init` command - Bootstrap the database

use console::style;
use miette::Result;
use std::path::PathBuf;
use tabled::{builder::Builder, settings::Style};

use crate::cli::commands::{open_database, resolve_config};
use crate::cli::GlobalOpts;
use crate::core::bootstrap::BootstrapReport;
use crate::core::schema::drop_schema;
use crate::core::{
    Config, ConnectionProvider, DataSource, DirectorySource, EmbeddedSource, Lifecycle,
    RandomPolicy,
};

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Drop every table before loading
    #[arg(long)]
    pub reset: bool,

    /// Directory holding the CSV files (default: built-in sample data)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Seed for synthesized specialist and insurance values
    #[arg(long)]
    pub seed: Option<u64>,
}

pub fn run(args: InitArgs, global: &GlobalOpts) -> Result<()> {
    let mut config = resolve_config(global);
    config.merge(Config {
        database: None,
        data_dir: args.data_dir,
        seed: args.seed,
    });
    let db = open_database(&config);

    if args.reset {
        db.with_connection(drop_schema)?;
        println!("{} Dropped existing tables", style("✓").green());
    }

    let sources: Box<dyn DataSource> = match config.data_dir {
        Some(ref dir) => {
            if !dir.is_dir() {
                return Err(miette::miette!(
                    "Data directory not found: {}",
                    dir.display()
                ));
            }
            Box::new(DirectorySource::new(dir.clone()))
        }
        None => Box::new(EmbeddedSource),
    };
    let mut policy = match config.seed {
        Some(seed) => RandomPolicy::seeded(seed),
        None => RandomPolicy::new(),
    };

    println!(
        "{} Initializing {}",
        style("→").blue(),
        style(db.path().display()).cyan()
    );
    let report = Lifecycle::global().ensure_initialized(&db, sources.as_ref(), &mut policy)?;

    print_report(&report, global.verbose);
    Ok(())
}

fn print_report(report: &BootstrapReport, verbose: bool) {
    let mut table = Builder::default();
    table.push_record(["Source", "Read", "Inserted", "Duplicates", "Sentinels", "Conflicts", "Errors"]);
    for source in &report.load.sources {
        if source.missing {
            table.push_record([
                source.source.to_string(),
                "missing".to_string(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
            ]);
            continue;
        }
        table.push_record([
            source.source.to_string(),
            source.rows_read.to_string(),
            source.rows_inserted.to_string(),
            source.duplicates.to_string(),
            source.sentinels.to_string(),
            source.conflicts.to_string(),
            source.errors.len().to_string(),
        ]);
    }
    println!("{}", table.build().with(Style::markdown()));
    println!();

    println!(
        "{} Loaded {} row(s) in {}ms",
        style("✓").green(),
        style(report.load.rows_inserted()).cyan(),
        report.load.duration_ms
    );
    println!(
        "  Specialists created:      {}",
        style(report.classification.specialists_created).cyan()
    );
    println!(
        "  Insured patients created: {}",
        style(report.classification.insured_patients_created).cyan()
    );

    let error_count = report.load.error_count();
    if error_count > 0 {
        println!();
        println!(
            "{} {} row(s) skipped",
            style("!").yellow(),
            style(error_count).yellow()
        );
        if verbose {
            for error in report.load.errors() {
                println!(
                    "  {}:{} {}",
                    error.source.file_name(),
                    error.line,
                    style(&error.message).dim()
                );
            }
        } else {
            println!("  Use {} to list them", style("--verbose").yellow());
        }
    }
}
