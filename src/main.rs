//! ixbrl-viewer CLI - build inline XBRL viewers from a report model dump

use anyhow::{Context, Result};
use clap::{Parser as ClapParser, Subcommand};
use colored::*;
use log::{Level, LevelFilter, Log, Metadata, Record};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use ixbrl_viewer::features::FEATURE_DEFINITIONS;
use ixbrl_viewer::validation::UnbufferedLog;
use ixbrl_viewer::{
    Document, DocumentSet, FeatureConfig, LogHandler, LogRecord, LogRecordBuffer, ReportModel,
    SaveOptions, ViewerBuilder, ViewerOptions, EXCEPTION_MESSAGE_CODE,
};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Inline XBRL viewer builder
#[derive(ClapParser)]
#[command(name = "ixbrl-viewer")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a viewer from a JSON report model
    Build {
        /// Report model (one report or an array of reports)
        model: PathBuf,

        /// Output file, directory or zip archive
        #[arg(short, long)]
        out: PathBuf,

        /// URL of the viewer script referenced by the output
        #[arg(long, default_value = ixbrl_viewer::builder::DEFAULT_SCRIPT_URL)]
        viewer_url: String,

        /// Buffered validation log (JSON array of records) to include
        #[arg(long)]
        validation_messages: Option<PathBuf>,

        /// Include validation messages in the viewer
        #[arg(long)]
        show_validations: bool,

        /// Write a zip archive
        #[arg(long)]
        zip: bool,

        /// Put the viewer into a separate stub page
        #[arg(long)]
        stub: bool,

        /// Viewer script to copy next to the output
        #[arg(long)]
        copy_script: Option<PathBuf>,

        /// Suffix added to output file names before the extension
        #[arg(long)]
        suffix: Option<String>,

        /// Filing-documents archive to bundle and advertise
        #[arg(long)]
        filing_documents: Option<PathBuf>,

        /// Enable a viewer feature (KEY or KEY=VALUE)
        #[arg(short, long = "feature")]
        features: Vec<String>,
    },

    /// List the available viewer features
    Features,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ModelInput {
    Many(Vec<ReportModel>),
    One(Box<ReportModel>),
}

impl ModelInput {
    fn into_reports(self) -> Vec<ReportModel> {
        match self {
            ModelInput::Many(reports) => reports,
            ModelInput::One(report) => vec![*report],
        }
    }
}

struct TerminalLogger;

impl Log for TerminalLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let tag = if record.target().starts_with("viewer:") {
            record.target().to_string()
        } else {
            record.level().to_string().to_lowercase()
        };
        let tag = match record.level() {
            Level::Error => format!("[{}]", tag).red().bold(),
            Level::Warn => format!("[{}]", tag).yellow(),
            Level::Info => format!("[{}]", tag).cyan(),
            Level::Debug | Level::Trace => format!("[{}]", tag).dimmed(),
        };
        eprintln!("{} {}", tag, record.args());
    }

    fn flush(&self) {}
}

static LOGGER: TerminalLogger = TerminalLogger;

fn main() {
    let cli = Cli::parse();

    // Only fails if a logger is already installed.
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    });

    if let Err(e) = run(cli.command) {
        log::error!(target: EXCEPTION_MESSAGE_CODE, "{:#}", e);
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Build {
            model,
            out,
            viewer_url,
            validation_messages,
            show_validations,
            zip,
            stub,
            copy_script,
            suffix,
            filing_documents,
            features,
        } => {
            let start = Instant::now();

            let input: ModelInput = serde_json::from_slice(
                &fs::read(&model).with_context(|| format!("Failed to read {}", model.display()))?,
            )
            .with_context(|| format!("Failed to parse report model {}", model.display()))?;
            let reports = input.into_reports();
            let base = model.parent().unwrap_or_else(|| Path::new("."));

            let mut feature_config = FeatureConfig::new();
            for arg in &features {
                feature_config.set_from_arg(arg)?;
            }

            let buffer = match &validation_messages {
                Some(path) => {
                    let records: Vec<LogRecord> = serde_json::from_slice(
                        &fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?,
                    )
                    .with_context(|| format!("Failed to parse validation log {}", path.display()))?;
                    Some(LogRecordBuffer::from_records(records))
                }
                None => None,
            };
            let log_handler: &dyn LogHandler = match &buffer {
                Some(buffer) => buffer,
                None => &UnbufferedLog,
            };

            let mut options = ViewerOptions::new()
                .with_script_url(viewer_url)
                .with_stub_viewer(stub)
                .with_validations(show_validations || validation_messages.is_some());
            if let Some(name) = filing_documents.as_ref().and_then(|p| p.file_name()) {
                options = options.with_filing_documents(name.to_string_lossy());
            }

            let mut builder = ViewerBuilder::new(log_handler, options).with_features(feature_config);
            let mut documents = DocumentSet::new();
            for report in &reports {
                for doc in &report.documents {
                    if documents.contains_key(&doc.filename) {
                        continue;
                    }
                    let path = base.join(doc.location.as_deref().unwrap_or(&doc.filename));
                    let bytes = fs::read(&path)
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    let parsed = Document::parse(&bytes)
                        .with_context(|| format!("Failed to parse {}", path.display()))?;
                    documents.insert(doc.filename.clone(), parsed);
                }
                builder.process_report(report);
            }

            let viewer = builder.create_viewer(&documents)?;

            let mut save = SaveOptions::new().zip(zip);
            if let Some(script) = copy_script {
                save = save.with_script(script);
            }
            if let Some(suffix) = suffix {
                save = save.with_suffix(suffix);
            }
            if let Some(path) = filing_documents {
                save = save.with_filing_documents(path);
            }
            viewer
                .save(&out, &save)
                .with_context(|| format!("Failed to save viewer to {}", out.display()))?;

            println!("{} {}", "✓".green().bold(), out.display());
            println!("  Reports: {}", reports.len());
            println!("  Files: {}", viewer.files.len());
            println!("  Time: {:.2}ms", start.elapsed().as_secs_f64() * 1000.0);
        }

        Commands::Features => {
            for def in FEATURE_DEFINITIONS {
                let key = if def.takes_value {
                    format!("{}=VALUE", def.key)
                } else {
                    def.key.to_string()
                };
                println!("{} ({})", key.bold(), def.label);
                println!("  {}", def.description);
            }
        }
    }

    Ok(())
}
