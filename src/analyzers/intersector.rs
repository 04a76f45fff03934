use std::collections::BTreeSet;
use std::path::Path;
use tracing::debug;

use crate::analyzers::language::detect_language;
use crate::types::{by_culprits_desc, BlameGroup, ChangeMap, ChangeRecord, CoverageMap, FileBlameResult};

/// Lines of context shown on each side of a group. Culprits closer than
/// twice this distance to their predecessor share a group.
pub const CONTEXT_SPAN: usize = 5;

/// Finds uncovered lines that were recently changed, per file.
///
/// Only files with at least one culprit line produce a result. Results are
/// ordered by culprit count, descending; ties keep coverage-map order.
pub fn intersect(coverage: &CoverageMap, changes: &ChangeMap, repo_root: &Path) -> Vec<FileBlameResult> {
    let mut results = Vec::new();

    for (path, file_coverage) in coverage {
        let uncovered = file_coverage.uncovered_lines();
        if uncovered.is_empty() { continue; }

        // Exact key match only; the loader already normalized paths.
        let Some(change) = changes.get(path) else { continue };

        let culprits: BTreeSet<usize> = uncovered
            .intersection(&change.changed_lines)
            .copied()
            .collect();
        if culprits.is_empty() { continue; }

        let content = read_source_lines(&repo_root.join(path));
        let blame_groups = build_blame_groups(&culprits, &content, change, path);

        results.push(FileBlameResult {
            file_path: path.clone(),
            total_uncovered_count: uncovered.len(),
            culprit_count: culprits.len(),
            blame_groups,
        });
    }

    // `sort_by` is stable, so equal counts keep discovery order.
    results.sort_by(by_culprits_desc);
    results
}

/// Reads a source file as lines. A missing or unreadable file yields no lines.
pub fn read_source_lines(path: &Path) -> Vec<String> {
    match std::fs::read(path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).lines().map(String::from).collect(),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "source file unavailable, using empty content");
            Vec::new()
        }
    }
}

/// Splits sorted culprit lines into clusters. A line joins the open cluster
/// when it is within `2 * CONTEXT_SPAN` of the cluster's last line.
pub fn cluster_lines(sorted: &[usize]) -> Vec<Vec<usize>> {
    let mut clusters: Vec<Vec<usize>> = Vec::new();
    for &line in sorted {
        match clusters.last_mut() {
            Some(open) if open.last().is_some_and(|&last| line <= last + 2 * CONTEXT_SPAN) => {
                open.push(line);
            }
            _ => clusters.push(vec![line]),
        }
    }
    clusters
}

pub fn build_blame_groups(
    culprits: &BTreeSet<usize>,
    content: &[String],
    change: &ChangeRecord,
    path: &str,
) -> Vec<BlameGroup> {
    let sorted: Vec<usize> = culprits.iter().copied().collect();
    let language = detect_language(path);
    cluster_lines(&sorted)
        .into_iter()
        .map(|cluster| build_group(cluster, content, change, language))
        .collect()
}

fn build_group(cluster: Vec<usize>, content: &[String], change: &ChangeRecord, language: &str) -> BlameGroup {
    let start_line = cluster[0];
    let end_line = cluster[cluster.len() - 1];

    let context_start = start_line.saturating_sub(CONTEXT_SPAN).max(1);
    let context_end = content.len().min(end_line + CONTEXT_SPAN);

    BlameGroup {
        start_line,
        end_line,
        lines_before: (context_start..start_line).map(|n| line_at(content, n)).collect(),
        culprit_text: (start_line..=end_line).map(|n| line_at(content, n)).collect(),
        lines_after: (end_line + 1..=context_end).map(|n| line_at(content, n)).collect(),
        culprit_line_numbers: cluster,
        provenance: vec![change.clone()],
        language: language.to_string(),
    }
}

/// 1-based line lookup; out of range reads as an empty line.
fn line_at(content: &[String], line_number: usize) -> String {
    line_number
        .checked_sub(1)
        .and_then(|i| content.get(i))
        .cloned()
        .unwrap_or_default()
}
