use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use miette::IntoDiagnostic;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use kira_evidence::app::App;
use kira_evidence::config::{
    DEFAULT_MAPPING_FILE, DEFAULT_OUTPUT_DIR, DEFAULT_SCORE_THRESHOLD, FetchConfig, MappingLoader,
};
use kira_evidence::error::KiraError;
use kira_evidence::opentargets::OpenTargetsHttpClient;
use kira_evidence::output::{ConsoleOutput, JsonOutput, OutputMode};
use kira_evidence::retry::ThreadSleeper;

#[derive(Parser)]
#[command(name = "kira-ev")]
#[command(about = "Fetch disease-associated genes from the Open Targets Platform")]
#[command(version, author)]
struct Cli {
    /// Minimum overall association score
    #[arg(long, default_value_t = DEFAULT_SCORE_THRESHOLD)]
    score_threshold: f64,

    /// Dataset names to fetch (e.g. TCGA_BRCA TCGA_CHOL); all when omitted
    #[arg(long, num_args = 0..)]
    datasets: Vec<String>,

    /// Dataset to ontology id mapping JSON
    #[arg(long, default_value = DEFAULT_MAPPING_FILE)]
    mapping_file: Utf8PathBuf,

    /// Output directory for evidence tables and the run summary
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
    output_dir: Utf8PathBuf,

    /// Print the run summary as JSON instead of progress lines
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(kira) = report.downcast_ref::<KiraError>() {
            return ExitCode::from(map_exit_code(kira));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &KiraError) -> u8 {
    match error {
        KiraError::MissingMapping(_)
        | KiraError::MappingRead(_)
        | KiraError::MappingParse(_)
        | KiraError::InvalidOntologyId(_)
        | KiraError::EmptySelection
        | KiraError::InvalidSettings(_) => 2,
        _ => 1,
    }
}

/// `RUST_LOG` when set and valid, otherwise `info` so retry and progress
/// logs reach stderr.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .filter(|value| !value.trim().is_empty())
        .and_then(|value| EnvFilter::try_new(value).ok())
        .unwrap_or_else(|| EnvFilter::new(LevelFilter::INFO.to_string()))
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Console
    };

    let config = FetchConfig::from_env();
    config.validate()?;

    let mapping = MappingLoader::load(Some(cli.mapping_file.as_std_path()))?;
    let datasets = mapping.select(&cli.datasets)?;

    let client = OpenTargetsHttpClient::new(&config)?;
    let app = App::new(client, ThreadSleeper, &config, cli.output_dir);

    match output_mode {
        OutputMode::Console => {
            app.run(&datasets, cli.score_threshold, &ConsoleOutput)?;
        }
        OutputMode::Json => {
            let report = app.run(&datasets, cli.score_threshold, &JsonOutput)?;
            JsonOutput::print_summary(&report.summary).into_diagnostic()?;
        }
    }
    Ok(())
}
