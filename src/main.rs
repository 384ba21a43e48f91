use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use family_records::config::DEFAULT_CONFIG_FILE;
use family_records::{
    export, logging, registry, Config, EntryWorkflow, JsonFileStore, RawEntry, Submission,
};
use std::fs::File;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "family-records")]
#[command(about = "Schema-driven entry of family records")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Record document (overrides config file)
    #[arg(short, long, env = "FAMILY_RECORDS_DATA")]
    data: Option<PathBuf>,

    /// Log level (overrides config file)
    #[arg(long, env = "FAMILY_RECORDS_LOG")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive entry form (default)
    Tui,
    /// List categories with their record counts
    Categories,
    /// Show the fields of a category
    Schema { category: String },
    /// Print the stored records of a category
    List { category: String },
    /// Validate and store one record
    Add {
        category: String,
        /// Field value as "Field=value" (repeatable)
        #[arg(short, long = "field", value_name = "FIELD=VALUE")]
        fields: Vec<String>,
    },
    /// Write a category's records as CSV
    Export { category: String, output: PathBuf },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load(&cli.config)?.with_overrides(cli.data, None, cli.log_level);
    let command = cli.command.unwrap_or(Command::Tui);

    // Keep log lines off the terminal UI
    if matches!(command, Command::Tui) && config.logging.file.is_none() {
        config.logging.file = Some(PathBuf::from("family-records.log"));
    }
    logging::init(&config.logging)?;

    let store = JsonFileStore::new(&config.store.path);
    let mut workflow = EntryWorkflow::open(registry(), store)
        .with_context(|| format!("Failed to open record document {:?}", config.store.path))?;

    match command {
        Command::Tui => run_ui_mode(workflow),
        Command::Categories => {
            for category in workflow.categories() {
                let count = workflow.records(&category.name)?.len();
                println!("{:<42} {:>5}", category.name, count);
            }
            Ok(())
        }
        Command::Schema { category } => {
            let schema = workflow.schema(&category)?;
            for field in &schema.fields {
                let mut notes: Vec<String> = Vec::new();
                if field.is_required() {
                    notes.push("required".to_string());
                }
                if field.is_date() {
                    notes.push("DD/MM/YYYY".to_string());
                }
                if field.is_non_negative() {
                    notes.push(">= 0".to_string());
                }
                if let Some(allowed) = field.allowed_values() {
                    notes.push(allowed.join("|"));
                }
                println!("{:<40} {:<8} {}", field.name, field.kind.name(), notes.join(", "));
            }
            Ok(())
        }
        Command::List { category } => {
            let records = workflow.records(&category)?;
            if records.is_empty() {
                println!("No records in {}", category);
            }
            for (i, record) in records.iter().enumerate() {
                println!("#{}", i + 1);
                for (name, value) in record.iter() {
                    println!("  {}: {}", name, value);
                }
            }
            Ok(())
        }
        Command::Add { category, fields } => {
            let raw = parse_fields(&fields)?;
            match workflow.submit(&category, &raw)? {
                Submission::Accepted(_) => {
                    println!("✓ Entry added to {}", category);
                    Ok(())
                }
                Submission::Rejected(errors) => {
                    for error in &errors {
                        eprintln!("✗ {}", error);
                    }
                    bail!("{} field(s) need fixing", errors.len())
                }
            }
        }
        Command::Export { category, output } => {
            let schema = workflow.schema(&category)?;
            let records = workflow.records(&category)?;
            let file = File::create(&output)
                .with_context(|| format!("Failed to create {}", output.display()))?;
            let written = export::write_csv(schema, records, file)?;
            println!("✓ Exported {} record(s) to {}", written, output.display());
            Ok(())
        }
    }
}

/// "Field=value" pairs → raw entry; everything is passed as text and typed
/// by the validator.
fn parse_fields(pairs: &[String]) -> Result<RawEntry> {
    pairs
        .iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(field, value)| (field.trim().to_string(), value.to_string()))
                .ok_or_else(|| anyhow!("Expected FIELD=VALUE, got '{}'", pair))
        })
        .collect::<Result<Vec<_>>>()
        .map(|pairs| pairs.into_iter().collect())
}

#[cfg(feature = "tui")]
fn run_ui_mode(workflow: EntryWorkflow<'static, JsonFileStore>) -> Result<()> {
    let mut app = family_records::ui::App::new(workflow);
    family_records::ui::run_ui(&mut app)
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_workflow: EntryWorkflow<'static, JsonFileStore>) -> Result<()> {
    bail!("TUI mode not available; rebuild with `--features tui` or use a subcommand")
}
