use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use forepage_core::{
    FileFetcher, ForepageConfig, HttpFetcher, Period, PeriodOutcome, RegisterFetcher, RowId,
    Selection, Session,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod formatter;

const CONFIG_FILE: &str = "forepage.toml";

#[derive(Parser)]
#[command(name = "forepage")]
#[command(about = "Generate document forepages from the submission register", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (TOML)
    #[arg(short, long, global = true, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Show the submissions of a period
    List(ScanArgs),
    /// Render forepages for a period and bundle them into a ZIP archive
    Generate(GenerateArgs),
}

#[derive(Args)]
struct ScanArgs {
    /// Register URL, or a local .xlsx file to use instead of downloading
    #[arg(long, value_name = "URL|FILE")]
    source: Option<String>,

    /// Folder the register is downloaded into
    #[arg(long, value_name = "DIR", default_value = ".")]
    folder: PathBuf,

    /// First day of the period (DD/MM/YYYY or YYYY-MM-DD)
    #[arg(long, value_name = "DATE", value_parser = parse_date)]
    from: Option<NaiveDate>,

    /// Last day of the period, inclusive
    #[arg(long, value_name = "DATE", value_parser = parse_date)]
    to: Option<NaiveDate>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "human")]
    format: OutputFormat,
}

#[derive(Args)]
struct GenerateArgs {
    #[command(flatten)]
    scan: ScanArgs,

    /// Leave a submission out, by row id (DOC#ROW) or doc number
    #[arg(long, value_name = "ID")]
    exclude: Vec<String>,

    /// Forepage template (.docx)
    #[arg(long, value_name = "FILE")]
    template: Option<PathBuf>,

    /// Where the archive is written (defaults to the register folder)
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Show what would be generated without rendering anything
    #[arg(long)]
    dry_run: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON output for scripting
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = load_config(cli.config.as_deref())?;
    if let Command::Generate(args) = &cli.command {
        if let Some(template) = &args.template {
            config.template.path = template.clone();
        }
    }
    config.validate().context("Invalid configuration")?;

    match cli.command {
        Command::List(args) => run_list(config, &args),
        Command::Generate(args) => run_generate(config, &args),
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<ForepageConfig> {
    if let Some(config_path) = path {
        return ForepageConfig::from_file(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()));
    }

    // Fall back to a config in the current directory, then to defaults
    let default_config_path = PathBuf::from(CONFIG_FILE);
    if default_config_path.exists() {
        ForepageConfig::from_file(&default_config_path).with_context(|| {
            format!(
                "Failed to load config from {}",
                default_config_path.display()
            )
        })
    } else {
        Ok(ForepageConfig::default())
    }
}

fn run_list(config: ForepageConfig, args: &ScanArgs) -> Result<()> {
    let mut session = Session::new(config);
    let period = open_period(&mut session, args)?;

    match args.format {
        OutputFormat::Human => formatter::print_rows_human(&session, period),
        OutputFormat::Json => formatter::print_rows_json(&session, period)?,
    }
    Ok(())
}

fn run_generate(config: ForepageConfig, args: &GenerateArgs) -> Result<()> {
    let mut session = Session::new(config);
    let period = open_period(&mut session, &args.scan)?;
    if session.shown().is_empty() {
        bail!("No submissions between {period}, pick another period");
    }

    for value in &args.exclude {
        for id in matching_rows(session.selection(), value)? {
            session
                .set_selected(&id, false)
                .with_context(|| format!("Failed to exclude {id}"))?;
        }
    }

    if args.dry_run {
        match args.scan.format {
            OutputFormat::Human => formatter::print_rows_human(&session, period),
            OutputFormat::Json => formatter::print_rows_json(&session, period)?,
        }
        return Ok(());
    }

    let archive = session.generate().context("Failed to generate forepages")?;

    let output = args.output.as_deref().unwrap_or(&args.scan.folder);
    fs::create_dir_all(output)
        .with_context(|| format!("Failed to create output folder {}", output.display()))?;
    let saved = archive
        .write_to(output)
        .with_context(|| format!("Failed to save archive in {}", output.display()))?;

    match args.scan.format {
        OutputFormat::Human => formatter::print_archive_human(&saved, &archive),
        OutputFormat::Json => formatter::print_archive_json(&saved, &archive)?,
    }
    Ok(())
}

/// Scan the register and confirm the requested (or suggested) period.
///
/// An empty period leaves nothing on display; callers decide whether that
/// is an error.
fn open_period(session: &mut Session, args: &ScanArgs) -> Result<Period> {
    let fetcher = fetcher_for(args.source.as_deref(), session.config());
    session
        .scan(&args.folder, fetcher.as_ref())
        .with_context(|| format!("Failed to load the register from {}", fetcher.describe()))?;

    let period = resolve_period(args.from, args.to, session.suggested_period())?;
    if let PeriodOutcome::Empty = session.confirm_period(period)? {
        tracing::info!(period = %period, "no submissions in period");
    }
    Ok(period)
}

fn fetcher_for(source: Option<&str>, config: &ForepageConfig) -> Box<dyn RegisterFetcher> {
    match source {
        Some(url) if url.starts_with("http://") || url.starts_with("https://") => {
            Box::new(HttpFetcher::new(url, config.source.timeout_secs))
        }
        Some(path) => Box::new(FileFetcher::new(path)),
        None => Box::new(HttpFetcher::from_config(&config.source)),
    }
}

/// Missing bounds are taken from the suggested period
fn resolve_period(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    suggested: Option<Period>,
) -> Result<Period> {
    let period = match (from, to, suggested) {
        (Some(start), Some(end), _) => Period::new(start, end),
        (start, end, Some(s)) => Period::new(start.unwrap_or(s.start), end.unwrap_or(s.end)),
        (_, _, None) => bail!("The register has no dated submissions to suggest a period from"),
    };
    if period.start > period.end {
        bail!(
            "Period starts after it ends: {} > {}",
            period.start.format("%d/%m/%Y"),
            period.end.format("%d/%m/%Y")
        );
    }
    Ok(period)
}

/// Ids on display matching `value`, either a full row id or a doc number.
///
/// Doc numbers may themselves contain `#`, so a value that parses as a row
/// id but is not on display is matched as a doc number instead.
fn matching_rows(selection: &Selection, value: &str) -> Result<Vec<RowId>> {
    if let Ok(id) = value.parse::<RowId>() {
        if selection.is_selected(&id).is_some() {
            return Ok(vec![id]);
        }
    }

    let ids: Vec<RowId> = selection
        .ids()
        .filter(|id| id.doc_number == value)
        .cloned()
        .collect();
    if ids.is_empty() {
        bail!("No submission '{value}' in the selected period");
    }
    Ok(ids)
}

/// `DD/MM/YYYY` or `YYYY-MM-DD`
fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y-%m-%d"))
        .map_err(|_| format!("invalid date '{value}', expected DD/MM/YYYY or YYYY-MM-DD"))
}
