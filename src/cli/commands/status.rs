//! `hospital status` command - Show table row counts

use console::style;
use miette::{IntoDiagnostic, Result};
use tabled::{builder::Builder, settings::Style};

use crate::cli::args::OutputFormat;
use crate::cli::commands::{open_database, resolve_config};
use crate::cli::GlobalOpts;
use crate::core::schema::{existing_tables, table_counts, table_names};
use crate::core::ConnectionProvider;

#[derive(clap::Args, Debug)]
pub struct StatusArgs {
    /// Output format
    #[arg(long, short = 'f', default_value = "table")]
    pub format: OutputFormat,
}

pub fn run(args: StatusArgs, global: &GlobalOpts) -> Result<()> {
    let config = resolve_config(global);
    let db = open_database(&config);

    if !db.path().exists() {
        println!(
            "{} No database at {}",
            style("!").yellow(),
            style(db.path().display()).cyan()
        );
        println!("  Run {} to create it", style("hospital init").yellow());
        return Ok(());
    }

    let counts = db.with_connection(|conn| {
        let existing = existing_tables(conn)?;
        if existing.len() < table_names().len() {
            return Ok(None);
        }
        Ok(Some(table_counts(conn)?))
    })?;

    let Some(counts) = counts else {
        println!(
            "{} Database at {} is not initialized",
            style("!").yellow(),
            style(db.path().display()).cyan()
        );
        println!("  Run {} to create it", style("hospital init").yellow());
        return Ok(());
    };

    match args.format {
        OutputFormat::Json => {
            let rows: Vec<serde_json::Value> = counts
                .iter()
                .map(|(table, rows)| serde_json::json!({ "table": table, "rows": rows }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows).into_diagnostic()?);
        }
        OutputFormat::Tsv => {
            for (table, rows) in &counts {
                println!("{}\t{}", table, rows);
            }
        }
        OutputFormat::Table => {
            println!("{}", style("Database Status").bold());
            println!("{}", style("─".repeat(40)).dim());
            println!("  Location: {}", db.path().display());
            println!();

            let mut table = Builder::default();
            table.push_record(["Table", "Rows"]);
            for (name, rows) in &counts {
                table.push_record([name.to_string(), rows.to_string()]);
            }
            println!("{}", table.build().with(Style::markdown()));
        }
    }

    Ok(())
}
