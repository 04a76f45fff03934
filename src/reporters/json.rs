use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{BlameError, Result};
use crate::types::{AnalysisSummary, BlameGroup, FileBlameResult, RunStats};

/// Serialized shape of the report: the summary plus its derived totals.
#[derive(Serialize)]
struct JsonReport<'a> {
    timestamp: &'a str,
    lookback_days: u32,
    coverage_file: &'a str,
    repo_path: &'a str,
    stats: &'a RunStats,
    total_uncovered: usize,
    total_culprit: usize,
    culprit_percentage: f64,
    files: Vec<JsonFile<'a>>,
}

#[derive(Serialize)]
struct JsonFile<'a> {
    file_path: &'a str,
    total_uncovered_count: usize,
    culprit_count: usize,
    culprit_percentage: f64,
    blame_groups: &'a [BlameGroup],
}

impl<'a> JsonReport<'a> {
    fn new(summary: &'a AnalysisSummary) -> Self {
        JsonReport {
            timestamp: &summary.timestamp,
            lookback_days: summary.lookback_days,
            coverage_file: &summary.coverage_file,
            repo_path: &summary.repo_path,
            stats: &summary.stats,
            total_uncovered: summary.total_uncovered(),
            total_culprit: summary.total_culprit(),
            culprit_percentage: round1(summary.culprit_percentage()),
            files: summary.results.iter().map(JsonFile::new).collect(),
        }
    }
}

impl<'a> JsonFile<'a> {
    fn new(r: &'a FileBlameResult) -> Self {
        JsonFile {
            file_path: &r.file_path,
            total_uncovered_count: r.total_uncovered_count,
            culprit_count: r.culprit_count,
            culprit_percentage: round1(r.culprit_percentage()),
            blame_groups: &r.blame_groups,
        }
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Outputs the report as JSON. Writes to a file if given, otherwise stdout.
pub fn report_json(summary: &AnalysisSummary, output_file: Option<&Path>) -> Result<()> {
    let report = JsonReport::new(summary);
    if let Some(path) = output_file {
        let file = File::create(path)
            .map_err(|e| BlameError::Report(format!("Failed to open {} for writing: {e}", path.display())))?;
        write_report(BufWriter::new(file), &report)?;
        eprintln!("✓ JSON report written to {}", path.display());
    } else {
        let stdout = std::io::stdout();
        write_report(BufWriter::new(stdout.lock()), &report)?;
    }
    Ok(())
}

fn write_report<W: Write>(mut writer: W, report: &JsonReport<'_>) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, report)
        .map_err(|e| BlameError::Report(format!("JSON serialization failed: {e}")))?;
    writer.write_all(b"\n").map_err(BlameError::report)?;
    writer.flush().map_err(BlameError::report)
}
