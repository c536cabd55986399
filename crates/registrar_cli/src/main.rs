//! Operator CLI over the registrar core.
//!
//! # Responsibility
//! - Open the record store, load config and start logging.
//! - Expose batch provisioning and grade export to shell scripts.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use registrar_core::service::{ClassService, ProvisionClassesRequest, ReportScope, ReportService};
use registrar_core::{core_version, init_logging_from_config, CoreConfig, ServiceError, SqliteStore};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "registrar")]
#[command(about = "School registrar record store")]
struct Cli {
    /// SQLite database file; created and migrated when missing
    #[arg(long, global = true, default_value = "registrar.db")]
    db: PathBuf,

    /// JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Absolute log directory; overrides the config value
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the core version
    Version,

    /// Open the next classes of a department cohort
    ProvisionClasses {
        #[arg(long)]
        department: u8,
        /// Cohort (enrollment) year, e.g. 2024
        #[arg(long)]
        year: i32,
        #[arg(long)]
        count: u8,
        #[arg(long)]
        max_students: u32,
    },

    /// List the classes of a department cohort
    Cohort {
        #[arg(long)]
        department: u8,
        #[arg(long)]
        year: i32,
    },

    /// Write the grade report as CSV
    ExportGrades {
        /// Output file; defaults to `<sheet name>.csv` in the current directory
        #[arg(long)]
        out: Option<PathBuf>,
        /// Only grades of this department's subjects
        #[arg(long)]
        department: Option<u8>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if let Command::Version = cli.command {
        println!("registrar_core version={}", core_version());
        return Ok(());
    }

    let mut config = match &cli.config {
        Some(path) => CoreConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => CoreConfig::default(),
    };
    if cli.log_dir.is_some() {
        config.log_dir = cli.log_dir.clone();
        config.validate()?;
    }
    init_logging_from_config(&config).map_err(anyhow::Error::msg)?;

    let store = Arc::new(
        SqliteStore::open(&cli.db)
            .with_context(|| format!("opening database {}", cli.db.display()))?,
    );

    match cli.command {
        Command::Version => Ok(()),
        Command::ProvisionClasses {
            department,
            year,
            count,
            max_students,
        } => provision_classes(
            &ClassService::new(store, &config),
            ProvisionClassesRequest {
                department_id: department,
                academic_year: year,
                count,
                max_students,
            },
        ),
        Command::Cohort { department, year } => {
            let classes = ClassService::new(store, &config).cohort_classes(department, year)?;
            for class in classes {
                println!("{}\t{}\tmax={}", class.id, class.name, class.max_students);
            }
            Ok(())
        }
        Command::ExportGrades { out, department } => {
            let scope = department.map_or(ReportScope::All, ReportScope::Department);
            let service = ReportService::new(store, &config);
            let (report, out) = match out {
                Some(path) => (service.export_grade_report(scope, &path)?, path),
                None => service.export_grade_report_into(scope, ".")?,
            };
            println!(
                "wrote {} rows ({}) to {}",
                report.rows.len(),
                report.sheet_name,
                out.display()
            );
            Ok(())
        }
    }
}

fn provision_classes(
    service: &ClassService<SqliteStore>,
    request: ProvisionClassesRequest,
) -> Result<()> {
    match service.provision_classes(request) {
        Ok(classes) => {
            for class in &classes {
                println!("{}\t{}", class.id, class.name);
            }
            println!("created {} classes", classes.len());
            Ok(())
        }
        Err(ServiceError::PartialBatch {
            created,
            failed_sequence,
            source,
        }) => {
            for class in &created {
                println!("{}\t{}", class.id, class.name);
            }
            anyhow::bail!(
                "created {} classes, then sequence {failed_sequence:02} failed: {source}",
                created.len()
            )
        }
        Err(err) => Err(err.into()),
    }
}
