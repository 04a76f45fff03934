use rayon::prelude::*;
use std::collections::hash_map::Entry;
use tracing::{debug, info, warn};

use crate::error::{BlameError, MiningError, Result};
use crate::git::diff_parser::parse_unified_diff;
use crate::git::history::HistorySource;
use crate::types::{ChangeMap, ChangeRecord, CommitInfo};

const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Debug, Default)]
pub struct MiningOutcome {
    pub changes: ChangeMap,
    pub commits_scanned: usize,
    pub commits_failed: usize,
}

/// Collects every line added by commits in the last `lookback_days`.
///
/// Commits are diffed on a pool of `workers` threads. Each produces its own
/// partial result; the results are merged on the calling thread, oldest
/// commit first, so the newest commit touching a file supplies its
/// provenance. A commit that fails to diff is logged and skipped.
pub fn mine_changes<H: HistorySource + ?Sized>(
    history: &H,
    lookback_days: u32,
    workers: usize,
) -> Result<MiningOutcome> {
    let cutoff = chrono::Utc::now().timestamp() - i64::from(lookback_days) * SECONDS_PER_DAY;
    let commits = history.commits_since(cutoff)?;
    info!(commits = commits.len(), lookback_days, "commits inside lookback window");

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build()
        .map_err(|e| BlameError::InvalidArgument(format!("cannot start {workers} workers: {e}")))?;

    let contributions: Vec<std::result::Result<Vec<ChangeRecord>, MiningError>> =
        pool.install(|| commits.par_iter().map(|c| mine_commit(history, c)).collect());

    let mut outcome = MiningOutcome { commits_scanned: commits.len(), ..MiningOutcome::default() };
    for (commit, contribution) in commits.iter().zip(contributions).rev() {
        match contribution {
            Ok(records) => merge_into(&mut outcome.changes, records),
            Err(e) => {
                outcome.commits_failed += 1;
                warn!(commit = %commit.short_hash, error = %e, "skipping commit");
            }
        }
    }

    debug!(files = outcome.changes.len(), failed = outcome.commits_failed, "mining finished");
    Ok(outcome)
}

/// Change records for every file `commit` added lines to.
pub fn mine_commit<H: HistorySource + ?Sized>(
    history: &H,
    commit: &CommitInfo,
) -> std::result::Result<Vec<ChangeRecord>, MiningError> {
    let diff = history.commit_diff(commit)?;
    Ok(parse_unified_diff(&diff)
        .into_iter()
        .filter(|(_, lines)| !lines.is_empty())
        .map(|(path, lines)| ChangeRecord::from_commit(path, lines, commit))
        .collect())
}

/// Unions `records` into `changes`, one entry per file.
pub fn merge_into(changes: &mut ChangeMap, records: impl IntoIterator<Item = ChangeRecord>) {
    for record in records {
        match changes.entry(record.file_path.clone()) {
            Entry::Occupied(mut e) => e.get_mut().merge(record),
            Entry::Vacant(e) => {
                e.insert(record);
            }
        }
    }
}
