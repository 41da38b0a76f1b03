//! CLI entry point for `ordermatch`.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};

use ordermatch::config::Config;
use ordermatch::eval::score::{score_outputs, ScoreReport, SLICE_NAMES};
use ordermatch::export::{csv as csv_export, json as json_export};
use ordermatch::input::read_corpus;
use ordermatch::matcher::{match_records, MatchSummary};
use ordermatch::model::mail::DatasetRow;
use ordermatch::parser::transcript::parse_transcript;

#[derive(Parser)]
#[command(
    name = "ordermatch",
    version,
    about = "Join a mailbox dump with an order transcript into an evaluation dataset"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DatasetFormat {
    Csv,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse an expected-output transcript into JSON records
    Parse {
        transcript: PathBuf,
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Split a mailbox dump, extract order numbers and join with the transcript
    Match {
        transcript: PathBuf,
        mailbox: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(short, long, value_enum, default_value = "csv")]
        format: DatasetFormat,
        /// Also write the parsed transcript records to this file
        #[arg(long)]
        records: Option<PathBuf>,
    },
    /// Print the JSON schema an extraction model must follow
    Schema,
    /// Score produced outputs (JSON object keyed by filename) against a dataset
    Score {
        /// Dataset JSON written by `match --format json`
        #[arg(long)]
        dataset: PathBuf,
        #[arg(long)]
        outputs: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Write the default configuration file
    InitConfig,
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = ordermatch::config::load_config();

    // Configure logging: stderr + optional log file
    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::Parse { transcript, output } => {
            cmd_parse(&transcript, output.as_deref(), &config)
        }
        Commands::Match {
            transcript,
            mailbox,
            output,
            format,
            records,
        } => cmd_match(
            &transcript,
            &mailbox,
            &output,
            format,
            records.as_deref(),
            &config,
        ),
        Commands::Schema => cmd_schema(),
        Commands::Score {
            dataset,
            outputs,
            json,
        } => cmd_score(&dataset, &outputs, json),
        Commands::InitConfig => cmd_init_config(&config),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    // Try to set up file logging
    let log_path = ordermatch::config::log_file_path(config);
    let log_target = log_path
        .parent()
        .zip(log_path.file_name())
        .filter(|(dir, _)| std::fs::create_dir_all(dir).is_ok());
    if let Some((log_dir, file_name)) = log_target {
        let file_appender = tracing_appender::rolling::never(log_dir, file_name);
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        // Fall back to stderr only
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

fn require_file(path: &Path) -> anyhow::Result<()> {
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }
    Ok(())
}

/// Parse a transcript and print or write the records.
fn cmd_parse(transcript: &Path, output: Option<&Path>, config: &Config) -> anyhow::Result<()> {
    require_file(transcript)?;
    let text = read_corpus(transcript)?;
    let records = parse_transcript(&text)
        .with_context(|| format!("Failed to parse {}", transcript.display()))?;

    match output {
        Some(path) => {
            json_export::write_records(&records, path, config.export.pretty_json)?;
            println!("  Wrote {} record(s) to {}", records.len(), path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&records)?),
    }
    Ok(())
}

/// Build the joined dataset and write it as CSV or JSON.
fn cmd_match(
    transcript: &Path,
    mailbox: &Path,
    output: &Path,
    format: DatasetFormat,
    records_out: Option<&Path>,
    config: &Config,
) -> anyhow::Result<()> {
    require_file(transcript)?;
    require_file(mailbox)?;

    let patterns = config
        .patterns
        .build()
        .context("Invalid order-number pattern in configuration")?;

    let transcript_text = read_corpus(transcript)?;
    let mailbox_text = read_corpus(mailbox)?;

    let start = Instant::now();

    let records = parse_transcript(&transcript_text)
        .with_context(|| format!("Failed to parse {}", transcript.display()))?;
    if let Some(path) = records_out {
        json_export::write_records(&records, path, config.export.pretty_json)?;
    }

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} Matching [{bar:40.cyan/blue}] {pos}/{len}")
            .expect("valid template")
            .progress_chars("#>-"),
    );

    let (messages, summary) = match_records(
        records,
        &mailbox_text,
        patterns,
        Some(&|current, total| {
            pb.set_length(total as u64);
            pb.set_position(current as u64);
        }),
    );

    pb.finish_and_clear();

    match format {
        DatasetFormat::Csv => {
            let rows: Vec<DatasetRow> = messages.iter().map(DatasetRow::from).collect();
            csv_export::export_dataset(&rows, output, &config.export.csv_options())?;
        }
        DatasetFormat::Json => {
            json_export::write_dataset(&messages, output, config.export.pretty_json)?;
        }
    }

    print_match_summary(
        transcript_text.len() as u64,
        mailbox_text.len() as u64,
        &summary,
        start.elapsed(),
        output,
    );
    Ok(())
}

fn cmd_schema() -> anyhow::Result<()> {
    let schema = ordermatch::eval::schema::order_schema();
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

/// Score produced outputs against a dataset.
fn cmd_score(dataset: &Path, outputs: &Path, json: bool) -> anyhow::Result<()> {
    require_file(dataset)?;
    require_file(outputs)?;

    let items = json_export::read_dataset(dataset)
        .with_context(|| format!("Failed to read dataset {}", dataset.display()))?;
    let produced: serde_json::Value = serde_json::from_str(&read_corpus(outputs)?)
        .with_context(|| format!("Failed to parse {}", outputs.display()))?;
    let Some(produced) = produced.as_object() else {
        anyhow::bail!("{} must contain a JSON object keyed by filename", outputs.display());
    };

    let report = score_outputs(&items, produced);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_score_table(&report);
    }
    Ok(())
}

fn cmd_init_config(config: &Config) -> anyhow::Result<()> {
    let path = ordermatch::config::save_config(config)?;
    println!("  Wrote configuration to {}", path.display());
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "ordermatch", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

/// Print join statistics in a human-readable table.
fn print_match_summary(
    transcript_size: u64,
    mailbox_size: u64,
    summary: &MatchSummary,
    elapsed: std::time::Duration,
    output: &Path,
) {
    use humansize::{format_size, BINARY};

    println!();
    println!("  {:<25} {}", "Transcript size", format_size(transcript_size, BINARY));
    println!("  {:<25} {}", "Mailbox size", format_size(mailbox_size, BINARY));
    println!("  {:<25} {}", "Records", summary.records);
    println!("  {:<25} {}", "Messages", summary.messages);
    println!(
        "  {:<25} {} ({:.1}%)",
        "Matched",
        summary.matched,
        if summary.messages == 0 {
            0.0
        } else {
            summary.matched as f64 / summary.messages as f64 * 100.0
        }
    );
    println!("  {:<25} {}", "Unmatched order numbers", summary.unmatched);
    println!("  {:<25} {}", "Without order number", summary.without_number);
    if summary.duplicate_keys > 0 {
        println!("  {:<25} {}", "Duplicate order numbers", summary.duplicate_keys);
    }
    println!("  {:<25} {:.2?}", "Time", elapsed);
    println!("  {:<25} {}", "Output file", output.display());
    println!();
}

/// Print per-item scores and the run averages.
fn print_score_table(report: &ScoreReport) {
    println!();
    println!(
        "  {:<4} {:<40} {:>6} {:>6} {:>6} {:>8} {:>6}",
        "#", "File", "exact", "buyer", "order", "address", "prods"
    );
    println!("  {}", "-".repeat(84));

    for (i, item) in report.items.iter().enumerate() {
        let name: String = item
            .filename
            .as_deref()
            .unwrap_or("-")
            .chars()
            .take(39)
            .collect();
        let cell = |metric: &str| {
            item.value(metric)
                .map_or_else(|| "-".to_string(), |v| format!("{v:.2}"))
        };
        println!(
            "  {:<4} {:<40} {:>6} {:>6} {:>6} {:>8} {:>6}",
            i + 1,
            name,
            cell("exact_match"),
            cell("buyer_info"),
            cell("order_info"),
            cell("address_info"),
            cell("products")
        );
    }

    println!();
    for name in std::iter::once("exact_match").chain(SLICE_NAMES) {
        if let Some(mean) = report.mean_of(name) {
            println!("  {:<25} {:.2}", name, mean);
        }
    }
    if let Some(avg) = &report.average {
        println!("  {:<25} {}", avg.name, avg.comment);
    }
    println!(
        "  {:<25} {}",
        "Generated",
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!();
}
