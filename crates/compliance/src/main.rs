//! `compliance`: the orchestrator CLI. Wires Ingestion, Extraction/Field
//! Matching, Decision Logic, and Export behind one pipeline run, plus
//! standalone entry points for configuration validation, SLA cohort
//! queries, health checks, and audit reporting.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::{presets::UTF8_FULL, Table};
use compliance_core::config::{validate_config, OutputFormat, ProcessingConfig, SlaConfig};
use compliance_db::{InMemoryAuditRepository, InMemoryFileMetadataRepository, InMemoryReviewCaseRepository};
use compliance_events::EventBus;
use compliance_health::{
    ComponentHealthRecord, HealthMonitor, HealthProbe, PerformanceSlo, RunningStats, TempFilesystemProbe, WorkerAvailabilityProbe,
};
use compliance_security::Ed25519Signer;
use compliance_sla::{InMemorySlaCaseSource, SlaCaseInput, SlaTracker};

use compliance::PipelineRuntime;

#[derive(Parser)]
#[command(name = "compliance", version, about = "Regulatory document compliance pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full Ingestion -> Extraction -> Decision Logic -> Export pipeline over a local directory.
    Run {
        /// Directory to treat as the regulator site.
        #[arg(long)]
        source: PathBuf,
        /// Directory to write moved files, exported bundles, and intake copies to.
        #[arg(long)]
        out: PathBuf,
        /// Glob patterns (single `*` wildcard) identifying downloadable files.
        #[arg(long, value_delimiter = ',', default_value = "*.xml,*.docx,*.pdf")]
        patterns: Vec<String>,
    },
    /// Show or validate a processing configuration preset (§4.11).
    Config {
        #[arg(long, value_enum, default_value_t = ConfigPreset::Default)]
        preset: ConfigPreset,
    },
    /// Report on a small set of synthetic SLA cases to exercise the escalation ladder (§4.9).
    Sla,
    /// Run the component/runtime/performance health checks (§4.10).
    Health,
}

#[derive(Copy, Clone, ValueEnum)]
enum ConfigPreset {
    Default,
    HighPerformance,
    Conservative,
}

impl ConfigPreset {
    fn resolve(self) -> ProcessingConfig {
        match self {
            ConfigPreset::Default => ProcessingConfig::default_preset(),
            ConfigPreset::HighPerformance => ProcessingConfig::high_performance_preset(),
            ConfigPreset::Conservative => ProcessingConfig::conservative_preset(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    compliance_logging::init_logging(compliance_logging::LogConfig {
        app_name: "compliance",
        verbose: std::env::var("COMPLIANCE_VERBOSE").is_ok(),
        tui_mode: false,
    })
    .context("failed to initialize logging")?;

    let cli = Cli::parse();
    match cli.command {
        Command::Run { source, out, patterns } => run_pipeline(&source, &out, &patterns).await,
        Command::Config { preset } => run_config(preset),
        Command::Sla => run_sla().await,
        Command::Health => run_health(),
    }
}

async fn run_pipeline(source: &PathBuf, out: &PathBuf, patterns: &[String]) -> Result<()> {
    let source = source.canonicalize().with_context(|| format!("source directory {} does not exist", source.display()))?;

    let audit = Arc::new(InMemoryAuditRepository::default());
    let file_metadata_repo = Arc::new(InMemoryFileMetadataRepository::default());
    let review_repo = Arc::new(InMemoryReviewCaseRepository::default());
    let signer = Arc::new(Ed25519Signer::generate());

    let runtime = PipelineRuntime::new(audit.clone(), file_metadata_repo, review_repo, out.clone(), signer);

    let source_str = source.to_string_lossy().into_owned();
    let summary = runtime.run(&source_str, patterns).await?;

    println!("ingested {} file(s), processed {} bundle(s)\n", summary.files_ingested, summary.bundles_processed);

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Bundle", "Label", "Confidence", "Valid", "Review Cases", "Actions", "Exports"]);
    for bundle in &summary.bundles {
        table.add_row(vec![
            bundle.stem.clone(),
            bundle.classification_label.clone().unwrap_or_else(|| "-".to_string()),
            bundle.classification_confidence.map(|c| c.to_string()).unwrap_or_else(|| "-".to_string()),
            bundle.is_valid.to_string(),
            bundle.review_cases_opened.to_string(),
            bundle.compliance_actions.to_string(),
            bundle.exported.len().to_string(),
        ]);
    }
    println!("{table}");

    Ok(())
}

fn run_config(preset: ConfigPreset) -> Result<()> {
    let config = preset.resolve();
    let report = validate_config(config);

    println!("valid: {}", report.is_valid);
    if !report.errors.is_empty() {
        println!("errors:");
        for e in &report.errors {
            println!("  - {e}");
        }
    }
    if !report.warnings.is_empty() {
        println!("warnings:");
        for w in &report.warnings {
            println!("  - {w}");
        }
    }
    if let Some(config) = &report.validated_config {
        println!(
            "output_format: {}",
            match config.output_format {
                OutputFormat::Json => "json",
                OutputFormat::Xml => "xml",
                OutputFormat::Csv => "csv",
                OutputFormat::Txt => "txt",
                OutputFormat::Pdf => "pdf",
            }
        );
    }
    Ok(())
}

async fn run_sla() -> Result<()> {
    let source = Arc::new(InMemorySlaCaseSource::new());
    let today = Utc::now().date_naive();

    source.track(sample_case(today, 10));
    source.track(sample_case(today - chrono::Duration::days(8), 10));
    source.track(sample_case(today - chrono::Duration::days(15), 10));

    let tracker = SlaTracker::new(SlaConfig::default(), source, Arc::new(InMemoryAuditRepository::default()), EventBus::new());

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["File", "Deadline", "Remaining (business days)", "Escalation"]);

    for status in tracker.active_cases().await {
        table.add_row(vec![
            status.file_id.to_string(),
            status.deadline.to_string(),
            status.remaining_business_days.to_string(),
            format!("{:?}", status.escalation_level),
        ]);
    }
    println!("{table}");

    let at_risk = tracker.at_risk_cases().await.len();
    let breached = tracker.breached_cases().await.len();
    println!("at risk: {at_risk}, breached: {breached}");
    Ok(())
}

fn sample_case(intake_date: NaiveDate, days_plazo: i64) -> SlaCaseInput {
    SlaCaseInput {
        file_id: compliance_ids::FileId::new(),
        intake_date,
        days_plazo,
    }
}

fn run_health() -> Result<()> {
    let probes: Vec<Arc<dyn HealthProbe>> = vec![
        Arc::new(TempFilesystemProbe::default()),
        Arc::new(WorkerAvailabilityProbe::new(4)),
    ];
    let monitor = HealthMonitor::new(probes, Arc::new(RunningStats::new()), PerformanceSlo::default());
    let report = monitor.refresh();

    println!("overall: {:?} (checked at {})", report.overall, report.checked_at);
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Component", "Status", "Detail"]);
    for ComponentHealthRecord { name, status, detail } in report.components {
        table.add_row(vec![name, format!("{status:?}"), detail]);
    }
    println!("{table}");
    Ok(())
}
