use std::path::PathBuf;
use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use serde::Serialize;
use container_tracker::errors::TrackerError;
use container_tracker::init;
use container_tracker::models::{ContainerSize, Destination, NewShipment, ShipmentEdit, ShipmentRecord, ShipmentStatus, TIMESTAMP_FORMAT, parse_timestamp};

#[derive(Parser)]
#[command(name = "container-tracker")]
#[command(about = "Tracks outbound shipping containers in a shared spreadsheet", long_about = None)]
struct Cli {
    /// Print results as JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the active records
    List,

    /// Register a new container as pending
    Register {
        container_id: String,
        #[arg(long, short)]
        destination: Destination,
        #[arg(long, short, default_value = "40")]
        size: ContainerSize,
        #[arg(long)]
        seal: String,
        /// Registration time (YYYY-MM-DD[ HH:MM:SS]); defaults to now
        #[arg(long, value_parser = parse_work_date)]
        date: Option<NaiveDateTime>,
    },

    /// Mark a container completed (shipped)
    Complete { container_id: String },

    /// Return a completed container to pending
    Reopen { container_id: String },

    /// Flip a container between pending and completed
    Toggle { container_id: String },

    /// Change fields of a container
    Edit {
        container_id: String,
        #[arg(long, short)]
        destination: Option<Destination>,
        #[arg(long, short)]
        size: Option<ContainerSize>,
        #[arg(long)]
        seal: Option<String>,
        #[arg(long)]
        status: Option<ShipmentStatus>,
        /// New registration time (YYYY-MM-DD[ HH:MM:SS])
        #[arg(long, value_parser = parse_work_date)]
        date: Option<NaiveDateTime>,
    },

    /// Delete a container from the active sheet
    Delete { container_id: String },

    /// Count active containers by status
    Summary,

    /// List the containers eligible for barcode labels
    Barcodes,

    /// Move today's completed containers into the daily archive
    Cutover,

    /// Roll the daily archives of a month (YYYY-MM, default current) into the monthly archive
    ArchiveMonth {
        #[arg(long, value_parser = parse_month)]
        month: Option<NaiveDate>,
    },

    /// Copy the active sheet into a snapshot sheet
    Snapshot {
        /// Also delete old snapshots, keeping the configured number
        #[arg(long)]
        prune: bool,
    },

    /// List archive sheets, newest first
    Backups,

    /// Show what an archive sheet holds and what a restore would bring back
    Preview { sheet: String },

    /// Restore archived containers that are not active; all of them unless some are named
    Restore {
        sheet: String,
        container_ids: Vec<String>,
    },

    /// Write the active records to a CSV file
    Export { path: PathBuf },

    /// Show the latest change-log lines
    History {
        #[arg(long, short, default_value_t = 20)]
        limit: usize,
    },
}

fn parse_month(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(&format!("{}-01", raw.trim()), "%Y-%m-%d")
        .map_err(|_| format!("expected YYYY-MM, got {:?}", raw))
}

fn parse_work_date(raw: &str) -> Result<NaiveDateTime, String> {
    parse_timestamp(raw).ok_or_else(|| format!("expected YYYY-MM-DD or YYYY-MM-DD HH:MM:SS, got {:?}", raw))
}

/// Exit status for a failed command: 2 when the input was rejected, 1 otherwise
fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<TrackerError>() {
        Some(e) if e.is_validation() => 2,
        _ => 1,
    }
}

/// The main entry point of the container tracker
#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {:#}", e);
        std::process::exit(exit_code(&e));
    }
}

/// Parses the command line, builds the application context and runs one command
///
/// # Returns
///
/// * `Ok(())` if the command completed
/// * `Err(anyhow::Error)` if initialization or the command failed
async fn run() -> Result<()> {
    let cli = Cli::parse();
    let ctx = init::initialize().await?;
    let controller = &ctx.controller;
    let out = Output { json: cli.json };

    match cli.command {
        Commands::List => {
            let records = controller.list().await?;
            out.records(&records)?;
        }
        Commands::Register { container_id, destination, size, seal, date } => {
            let form = NewShipment {
                container_id,
                destination,
                size_feet: size,
                seal_id: seal,
                registered_at: date,
            };
            let record = controller.register(form).await?;
            out.records(std::slice::from_ref(&record))?;
        }
        Commands::Complete { container_id } => {
            out.records(&[controller.complete(&container_id).await?])?;
        }
        Commands::Reopen { container_id } => {
            out.records(&[controller.reopen(&container_id).await?])?;
        }
        Commands::Toggle { container_id } => {
            out.records(&[controller.toggle(&container_id).await?])?;
        }
        Commands::Edit { container_id, destination, size, seal, status, date } => {
            let edit = ShipmentEdit { destination, size_feet: size, seal_id: seal, status, registered_at: date };
            out.records(&[controller.edit(&container_id, edit).await?])?;
        }
        Commands::Delete { container_id } => {
            controller.delete(&container_id).await?;
            out.line(&format!("deleted {}", container_id));
        }
        Commands::Summary => {
            let summary = controller.summary().await?;
            out.value(&summary, || format!(
                "total {}, pending {}, completed {}",
                summary.total, summary.pending, summary.completed
            ))?;
        }
        Commands::Barcodes => {
            let labels = controller.barcode_candidates().await?;
            out.value(&labels, || labels.iter()
                .map(|l| format!("{}\t{}\t{}ft", l.payload, l.destination, l.size_feet))
                .collect::<Vec<_>>()
                .join("\n"))?;
        }
        Commands::Cutover => {
            let report = controller.cutover().await?;
            out.value(&report, || {
                let target = report.archive.as_ref().map(|a| a.sheet.as_str()).unwrap_or("-");
                format!(
                    "{} total, {} archived to {}, {} carried over",
                    report.total, report.archived, target, report.carried_over
                )
            })?;
        }
        Commands::ArchiveMonth { month } => {
            let outcome = controller.archive_month(month).await?;
            out.value(&outcome, || match &outcome {
                Some(o) => format!("{} rows in {}", o.total_rows, o.sheet),
                None => "no daily archives for that month".to_string(),
            })?;
        }
        Commands::Snapshot { prune } => {
            let name = controller.snapshot().await?;
            out.line(&format!("snapshot {}", name));
            if prune {
                for deleted in controller.prune_snapshots(None).await? {
                    out.line(&format!("deleted {}", deleted));
                }
            }
        }
        Commands::Backups => {
            let sheets = controller.backups().await?;
            out.value(&sheets, || sheets.join("\n"))?;
        }
        Commands::Preview { sheet } => {
            let preview = controller.preview(&sheet).await?;
            if out.json {
                out.value(&preview, String::new)?;
            } else {
                out.line(&format!(
                    "{}: {} pending, {} completed, {} recoverable",
                    preview.sheet, preview.pending, preview.completed, preview.recoverable.len()
                ));
                out.records(&preview.recoverable)?;
            }
        }
        Commands::Restore { sheet, container_ids } => {
            let report = controller.restore(&sheet, &container_ids).await?;
            out.value(&report, || format!(
                "restored {} from {} ({} already active)",
                report.restored.len(), report.sheet, report.already_active
            ))?;
        }
        Commands::Export { path } => {
            let written = controller.export(&path).await?;
            out.line(&format!("wrote {} records to {}", written, path.display()));
        }
        Commands::History { limit } => {
            let entries = controller.history(limit).await?;
            out.value(&entries, || entries.iter()
                .map(|e| format!("{}  {}", e.logged_at.format(TIMESTAMP_FORMAT), e.message))
                .collect::<Vec<_>>()
                .join("\n"))?;
        }
    }

    Ok(())
}

/// Renders command results on stdout
struct Output {
    json: bool,
}

impl Output {
    fn line(&self, text: &str) {
        println!("{}", text);
    }

    fn value<T: Serialize>(&self, value: &T, text: impl FnOnce() -> String) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            let text = text();
            if !text.is_empty() {
                println!("{}", text);
            }
        }
        Ok(())
    }

    fn records(&self, records: &[ShipmentRecord]) -> Result<()> {
        self.value(&records, || records.iter()
            .map(|r| format!(
                "{}  {:<6}  {}ft  {:<12}  {:<9}  {}  {}",
                r.container_id,
                r.destination.label(),
                r.size_feet.feet(),
                r.seal_id,
                r.status().to_string(),
                r.registered_at.format(TIMESTAMP_FORMAT),
                r.completed_at().map(|t| t.format(TIMESTAMP_FORMAT).to_string()).unwrap_or_default(),
            ))
            .collect::<Vec<_>>()
            .join("\n"))
    }
}
