use std::path::PathBuf;
use tracing::info;

use crate::analyzers::{change_miner, intersector};
use crate::coverage::cobertura;
use crate::error::Result;
use crate::git::history::HistorySource;
use crate::progress::Progress;
use crate::types::{AnalysisSummary, RunStats};

#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    pub coverage_file: PathBuf,
    pub repo_path: PathBuf,
    pub lookback_days: u32,
    pub workers: usize,
}

pub const STEPS: usize = 3;

/// Runs the whole pipeline: coverage loading and history mining side by side,
/// then the intersection, wrapped in an [`AnalysisSummary`].
pub fn run_analysis<H: HistorySource + ?Sized>(
    opts: &AnalysisOptions,
    history: &H,
    progress: &mut Progress,
) -> Result<AnalysisSummary> {
    progress.start(1, "Loading coverage report + mining git history");
    let (coverage, mined) = rayon::join(
        || cobertura::load_coverage(&opts.coverage_file, &opts.repo_path),
        || change_miner::mine_changes(history, opts.lookback_days, opts.workers),
    );
    let coverage = coverage?;
    let mined = mined?;
    progress.finish_step(
        1,
        "Loading coverage + mining history",
        &format!(
            "{} covered files, {} commits, {} changed files",
            coverage.len(),
            mined.commits_scanned,
            mined.changes.len()
        ),
    );

    progress.start(2, "Intersecting coverage with recent changes");
    let results = intersector::intersect(&coverage, &mined.changes, &opts.repo_path);
    progress.finish_step(2, "Intersecting coverage with changes", &format!("{} files with culprits", results.len()));

    progress.start(3, "Summarizing");
    let summary = AnalysisSummary {
        timestamp: chrono::Local::now().format("%Y-%m-%dT%H:%M:%S").to_string(),
        lookback_days: opts.lookback_days,
        coverage_file: opts.coverage_file.display().to_string(),
        repo_path: opts.repo_path.display().to_string(),
        stats: RunStats {
            coverage_files: coverage.len(),
            commits_scanned: mined.commits_scanned,
            commits_failed: mined.commits_failed,
            changed_files: mined.changes.len(),
        },
        results,
    };
    progress.finish_step(3, "Summarizing", &format!("{} culprit lines", summary.total_culprit()));
    progress.clear();

    info!(
        files = summary.results.len(),
        uncovered = summary.total_uncovered(),
        culprits = summary.total_culprit(),
        "analysis complete"
    );
    Ok(summary)
}
