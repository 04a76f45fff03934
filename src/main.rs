mod analyzers;
mod config;
mod coverage;
mod error;
mod git;
mod progress;
mod reporters;
mod tracker;
mod types;

use clap::Parser;
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use config::BlameConfig;
use error::{BlameError, Result};
use git::history::GitCli;
use progress::{fmt_dur, Progress};
use tracker::{AnalysisOptions, STEPS};

const DEFAULT_DAYS: u32 = 30;
const DEFAULT_WORKERS: usize = 4;
const DEFAULT_TOP: usize = 10;
const DEFAULT_FORMAT: &str = "terminal";
const DEFAULT_HTML_OUTPUT: &str = "blame_report.html";

#[derive(Parser, Debug)]
#[command(
    name = "blame-tracker",
    about = "🎯 Find recently changed lines that your tests do not cover",
    version,
    long_about = "Cross-references a Cobertura coverage report with recent git history.\n\n\
                  Every uncovered line that was added or modified inside the lookback\n\
                  window is a culprit; culprits are grouped into blocks with context\n\
                  and attributed to the commit that introduced them."
)]
struct Args {
    /// Cobertura XML coverage report.
    #[arg(value_name = "COVERAGE", required_unless_present = "generate_config")]
    coverage: Option<PathBuf>,

    /// Root of the git repository the report was produced from.
    #[arg(value_name = "REPO", required_unless_present = "generate_config")]
    repo: Option<PathBuf>,

    /// Lookback window in days [default: 30]
    #[arg(long)]
    days: Option<u32>,

    /// Worker threads used to diff commits [default: 4]
    #[arg(long, short = 'w')]
    workers: Option<usize>,

    /// Output file. JSON goes to stdout when unset; HTML defaults to blame_report.html
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Output format: terminal, json, html [default: terminal]
    #[arg(long, value_parser = ["terminal", "json", "html"])]
    format: Option<String>,

    /// Files listed in the terminal ranking [default: 10]
    #[arg(long)]
    top: Option<usize>,

    /// YAML config file. Defaults to REPO/.blame-tracker.yml when present.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print an annotated config template (or write it to PATH) and exit.
    #[arg(long, value_name = "PATH", num_args = 0..=1)]
    generate_config: Option<Option<PathBuf>>,

    /// Debug logging on stderr (RUST_LOG overrides).
    #[arg(long, short = 'v', conflicts_with = "quiet")]
    verbose: bool,

    /// No progress output.
    #[arg(long, short = 'q')]
    quiet: bool,
}

/// Effective settings after merging CLI flags, the config file and defaults.
#[derive(Debug, PartialEq)]
struct Settings {
    days: u32,
    workers: usize,
    format: String,
    output: Option<PathBuf>,
    top: usize,
}

impl Settings {
    /// CLI flags win over the config file, which wins over built-in defaults.
    fn resolve(args: &Args, cfg: BlameConfig) -> Result<Self> {
        let settings = Settings {
            days: args.days.or(cfg.days).unwrap_or(DEFAULT_DAYS),
            workers: args.workers.or(cfg.workers).unwrap_or(DEFAULT_WORKERS),
            format: args.format.clone().or(cfg.format).unwrap_or_else(|| DEFAULT_FORMAT.to_string()),
            output: args.output.clone().or_else(|| cfg.output.map(PathBuf::from)),
            top: args.top.or(cfg.top).unwrap_or(DEFAULT_TOP),
        };
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.days == 0 {
            return Err(BlameError::InvalidArgument("--days must be greater than 0".into()));
        }
        if self.workers == 0 {
            return Err(BlameError::InvalidArgument("--workers must be greater than 0".into()));
        }
        if self.top == 0 {
            return Err(BlameError::InvalidArgument("--top must be greater than 0".into()));
        }
        if !matches!(self.format.as_str(), "terminal" | "json" | "html") {
            return Err(BlameError::InvalidArgument(format!(
                "unknown format \"{}\" (expected terminal, json or html)",
                self.format
            )));
        }
        Ok(())
    }
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(args) {
        eprintln!("{} {e}", "Error:".red().bold());
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(args: Args) -> Result<()> {
    if let Some(target) = &args.generate_config {
        return config::print_template(target.as_deref());
    }

    let (Some(coverage_file), Some(repo_path)) = (args.coverage.clone(), args.repo.clone()) else {
        return Err(BlameError::InvalidArgument("COVERAGE and REPO are required".into()));
    };

    let cfg = load_settings_file(args.config.as_deref(), &repo_path)?;
    let settings = Settings::resolve(&args, cfg)?;
    debug!(?settings, "resolved settings");

    if !coverage_file.is_file() {
        return Err(BlameError::not_found("Coverage file", coverage_file));
    }
    let history = GitCli::open(&repo_path)?;

    let opts = AnalysisOptions {
        coverage_file,
        repo_path,
        lookback_days: settings.days,
        workers: settings.workers,
    };

    let started = Instant::now();
    let mut progress = Progress::new(STEPS, args.quiet);
    let summary = tracker::run_analysis(&opts, &history, &mut progress)?;
    drop(progress);

    if !args.quiet {
        eprintln!(
            "✔ {} culprit lines in {} files ({} commits) ⏱ {}",
            summary.total_culprit(),
            summary.results.len(),
            summary.stats.commits_scanned,
            fmt_dur(started.elapsed()),
        );
    }

    match settings.format.as_str() {
        "json" => reporters::json::report_json(&summary, settings.output.as_deref())?,
        "html" => {
            let path = settings.output.unwrap_or_else(|| PathBuf::from(DEFAULT_HTML_OUTPUT));
            reporters::html::report_html(&summary, &path)?;
        }
        _ => reporters::terminal::report_terminal(&summary, settings.top),
    }
    Ok(())
}

/// Explicit `--config` must load; otherwise a discovered file is used if any.
fn load_settings_file(explicit: Option<&Path>, repo: &Path) -> Result<BlameConfig> {
    match explicit {
        Some(path) => config::load_config(path),
        None => match config::discover_config(repo) {
            Some(path) => config::load_config(&path),
            None => Ok(BlameConfig::default()),
        },
    }
}
