//! Scrollgate CLI - offline tooling for scroll-gated A/B sessions
//!
//! Commands:
//! - replay: Replay a recorded session trace and export JSON + CSV results
//! - assign: Generate a session id and counterbalanced variant order
//! - csv: Convert an exported results document to its tabular form
//! - report: Print the human-readable summary of a results document

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use scrollgate::export::{
    render_report, results_from_json, results_to_csv, DirectorySink, Exporter,
};
use scrollgate::randomization::{generate_session_id, randomize_variant_order};
use scrollgate::trace::SessionTrace;
use scrollgate::{MetricsConfig, MetricsError, PRODUCER_NAME, SCROLLGATE_VERSION};

/// Scrollgate - behavioral metrics for scroll-gated button studies
#[derive(Parser)]
#[command(name = "scrollgate")]
#[command(version = SCROLLGATE_VERSION)]
#[command(about = "Replay and export scroll-gated A/B study sessions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded session trace and write JSON + CSV results
    Replay {
        /// Trace file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Directory receiving the exported files
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,

        /// Metrics configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the export filename prefix
        #[arg(long)]
        prefix: Option<String>,

        /// Also print the summary report to stdout
        #[arg(long)]
        report: bool,
    },

    /// Generate a session id and a randomized variant order
    Assign {
        /// Output format
        #[arg(long, default_value = "text")]
        format: AssignFormat,
    },

    /// Convert a results JSON document to CSV
    Csv {
        /// Results file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,
    },

    /// Print the summary report for a results JSON document
    Report {
        /// Results file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,
    },
}

#[derive(Clone, ValueEnum)]
enum AssignFormat {
    /// `<session id> <first> → <second>`
    Text,
    /// JSON object with sessionId and variantOrder
    Json,
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), ScrollgateCliError> {
    match cli.command {
        Commands::Replay {
            input,
            out_dir,
            config,
            prefix,
            report,
        } => cmd_replay(&input, &out_dir, config.as_deref(), prefix, report),
        Commands::Assign { format } => cmd_assign(format),
        Commands::Csv { input, output } => cmd_csv(&input, &output),
        Commands::Report { input } => cmd_report(&input),
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn read_input(input: &Path) -> Result<String, ScrollgateCliError> {
    if input.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            return Err(ScrollgateCliError::NoInput);
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn load_config(path: Option<&Path>) -> Result<MetricsConfig, ScrollgateCliError> {
    match path {
        Some(path) => Ok(MetricsConfig::from_json(&fs::read_to_string(path)?)?),
        None => Ok(MetricsConfig::default()),
    }
}

fn cmd_replay(
    input: &Path,
    out_dir: &Path,
    config_path: Option<&Path>,
    prefix: Option<String>,
    report: bool,
) -> Result<(), ScrollgateCliError> {
    let mut config = load_config(config_path)?;
    if let Some(prefix) = prefix {
        config.filename_prefix = prefix;
        config.validate()?;
    }

    let trace = SessionTrace::from_json(&read_input(input)?)?;
    let results = trace.replay(config.clone())?;

    let exported_at = now_ms();
    let mut exporter = Exporter::new(&config, DirectorySink::new(out_dir));
    let summary = exporter.export_all(&results, exported_at)?;
    exporter.release_due(exported_at + config.blob_release_delay_ms);

    let mut stdout = io::stdout().lock();
    if report {
        write!(stdout, "{}", render_report(&results))?;
    }
    let files = serde_json::json!({
        "producer": PRODUCER_NAME,
        "version": SCROLLGATE_VERSION,
        "sessionId": results.session_id,
        "json": out_dir.join(&summary.json_filename),
        "csv": out_dir.join(&summary.csv_filename),
    });
    writeln!(stdout, "{files}")?;
    Ok(())
}

fn cmd_assign(format: AssignFormat) -> Result<(), ScrollgateCliError> {
    let session_id = generate_session_id();
    let order = randomize_variant_order(&mut rand::rng());

    match format {
        AssignFormat::Text => println!("{session_id} {order}"),
        AssignFormat::Json => println!(
            "{}",
            serde_json::json!({ "sessionId": session_id, "variantOrder": order })
        ),
    }
    Ok(())
}

fn cmd_csv(input: &Path, output: &Path) -> Result<(), ScrollgateCliError> {
    let results = results_from_json(&read_input(input)?)?;
    let csv = results_to_csv(&results);

    if output.to_string_lossy() == "-" {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{csv}")?;
    } else {
        fs::write(output, csv)?;
    }
    Ok(())
}

fn cmd_report(input: &Path) -> Result<(), ScrollgateCliError> {
    let results = results_from_json(&read_input(input)?)?;
    print!("{}", render_report(&results));
    Ok(())
}

// Error types

#[derive(Debug)]
enum ScrollgateCliError {
    Io(io::Error),
    Metrics(MetricsError),
    NoInput,
}

impl From<io::Error> for ScrollgateCliError {
    fn from(e: io::Error) -> Self {
        ScrollgateCliError::Io(e)
    }
}

impl From<MetricsError> for ScrollgateCliError {
    fn from(e: MetricsError) -> Self {
        ScrollgateCliError::Metrics(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<ScrollgateCliError> for CliError {
    fn from(e: ScrollgateCliError) -> Self {
        match e {
            ScrollgateCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            ScrollgateCliError::NoInput => CliError {
                code: "NO_INPUT".to_string(),
                message: "stdin is a TTY and no input was piped".to_string(),
                hint: Some("Pipe a document in or pass --input <file>".to_string()),
            },
            ScrollgateCliError::Metrics(e) => {
                let (code, hint) = match &e {
                    MetricsError::JsonError(_) => {
                        ("JSON_ERROR", "Check JSON syntax and field names")
                    }
                    MetricsError::Io(_) => ("IO_ERROR", "Check file paths and permissions"),
                    MetricsError::TraceParse(_) => {
                        ("TRACE_ERROR", "Each run needs ordered events ending in 'complete'")
                    }
                    MetricsError::InvalidConfig(_) => {
                        ("CONFIG_ERROR", "Intervals must be positive and the prefix non-empty")
                    }
                    MetricsError::IncompleteSession(_) => {
                        ("INCOMPLETE_SESSION", "Record every study step before exporting")
                    }
                    MetricsError::UnknownArtifact(_) => ("EXPORT_ERROR", "Retry the export"),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
        }
    }
}
