use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

mod config;
mod db;
mod error;
mod models;
mod normalize;
mod pipeline;
mod reader;
mod report;
mod surveys;

use config::{ReplaceStrategy, StoreConfig};
use error::IngestError;
use surveys::{ReportKind, SurveyKind};

#[derive(Parser)]
#[command(name = "evaluacion-docente-loader")]
#[command(about = "Loads teacher evaluation spreadsheets and exports final reports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the survey tables that accept uploads
    Surveys,
    /// Replace a survey table with the rows of a spreadsheet
    Import {
        #[arg(long, value_enum)]
        survey: SurveyKind,
        #[arg(long)]
        file: PathBuf,
        /// Overrides REPLACE_STRATEGY
        #[arg(long, value_enum)]
        strategy: Option<ReplaceStrategy>,
        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// Parse and validate a spreadsheet without touching the store
    Check {
        #[arg(long, value_enum)]
        survey: SurveyKind,
        #[arg(long)]
        file: PathBuf,
    },
    /// Print the dashboard URL for a survey
    Dashboard {
        #[arg(long, value_enum)]
        survey: SurveyKind,
    },
    /// Download a report table as an xlsx file
    Export {
        #[arg(long, value_enum)]
        report: ReportKind,
        /// Defaults to the report's download name
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = StoreConfig::from_env().context("invalid store configuration")?;

    match cli.command {
        Commands::Surveys => {
            for kind in SurveyKind::ALL {
                let schema = kind.schema();
                println!(
                    "- {} -> {} ({} columns)",
                    kind.key(),
                    schema.table_name,
                    schema.width()
                );
            }
        }
        Commands::Import {
            survey,
            file,
            strategy,
            json,
        } => {
            if let Some(strategy) = strategy {
                config.strategy = strategy;
            }
            let bytes = std::fs::read(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let upload = pipeline::Upload {
                bytes,
                file_name: file.file_name().map(|n| n.to_string_lossy().to_string()),
            };
            info!(survey = survey.key(), file = %file.display(), "upload received");

            let outcome = pipeline::ingest(survey, upload, &config, || db::connect(&config)).await;

            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                println!("{}", outcome.message);
                println!("Redirect: {}", outcome.redirect_to);
            }
            if !outcome.success {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Check { survey, file } => {
            let schema = survey.schema();
            let checked = reader::SpreadsheetReader::from_path(&file)
                .and_then(|reader| pipeline::prepare_rows(reader, &schema));
            match checked {
                Ok(rows) => println!(
                    "{} rows ready for {} ({} columns).",
                    rows.len(),
                    schema.table_name,
                    schema.width()
                ),
                Err(err) => {
                    eprintln!("{err}");
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        Commands::Dashboard { survey } => {
            println!("{}", survey.dashboard_url(&config.dashboard_base_url));
        }
        Commands::Export { report, out } => {
            match report::export(report, || db::connect(&config)).await {
                Ok(download) => {
                    let out = out.unwrap_or_else(|| PathBuf::from(download.file_name));
                    std::fs::write(&out, &download.bytes)
                        .with_context(|| format!("failed to write {}", out.display()))?;
                    println!(
                        "Report written to {} ({}).",
                        out.display(),
                        download.mime_type
                    );
                }
                Err(IngestError::Connection(err)) => {
                    tracing::error!(error = %err, "store unreachable");
                    eprintln!("{}", report::CONNECTION_FAILURE_TEXT);
                    return Ok(ExitCode::FAILURE);
                }
                Err(err) => {
                    eprintln!("{err}");
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
