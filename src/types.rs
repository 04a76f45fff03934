use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::{Hash, Hasher};

// ─── Coverage ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LineStatus {
    Covered,
    Uncovered,
    Partial,
}

impl std::fmt::Display for LineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LineStatus::Covered   => write!(f, "covered"),
            LineStatus::Uncovered => write!(f, "uncovered"),
            LineStatus::Partial   => write!(f, "partial"),
        }
    }
}

/// One instrumented line from a coverage report.
///
/// Equality and hashing look at `line_number` only, so a set of records
/// holds at most one entry per source position regardless of status.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct LineRecord {
    pub line_number: usize,
    pub status: LineStatus,
    pub hit_count: u64,
}

impl LineRecord {
    pub fn new(line_number: usize, status: LineStatus, hit_count: u64) -> Self {
        LineRecord { line_number, status, hit_count }
    }
}

impl PartialEq for LineRecord {
    fn eq(&self, other: &Self) -> bool {
        self.line_number == other.line_number
    }
}

impl Eq for LineRecord {}

impl Hash for LineRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.line_number.hash(state);
    }
}

/// All line records parsed for a single source file.
#[derive(Debug, Clone, Serialize)]
pub struct FileCoverageSet {
    pub file_path: String,
    pub lines: Vec<LineRecord>,
}

impl FileCoverageSet {
    pub fn new(file_path: impl Into<String>) -> Self {
        FileCoverageSet { file_path: file_path.into(), lines: Vec::new() }
    }

    pub fn push(&mut self, record: LineRecord) {
        self.lines.push(record);
    }

    pub fn uncovered_lines(&self) -> BTreeSet<usize> {
        self.lines_with(LineStatus::Uncovered)
    }

    pub fn covered_lines(&self) -> BTreeSet<usize> {
        self.lines_with(LineStatus::Covered)
    }

    pub fn partial_lines(&self) -> BTreeSet<usize> {
        self.lines_with(LineStatus::Partial)
    }

    pub fn line_numbers(&self) -> BTreeSet<usize> {
        self.lines.iter().map(|l| l.line_number).collect()
    }

    fn lines_with(&self, status: LineStatus) -> BTreeSet<usize> {
        self.lines
            .iter()
            .filter(|l| l.status == status)
            .map(|l| l.line_number)
            .collect()
    }
}

/// Normalized file path → coverage. Ordered so intersection output is stable.
pub type CoverageMap = BTreeMap<String, FileCoverageSet>;

// ─── Git ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CommitInfo {
    pub hash: String,
    pub short_hash: String,
    pub author: String,
    /// Committer time, unix seconds.
    pub timestamp: i64,
    pub parents: Vec<String>,
    pub subject: String,
}

impl CommitInfo {
    pub fn first_parent(&self) -> Option<&str> {
        self.parents.first().map(|p| p.as_str())
    }

    /// Commit time as a local ISO-8601 string.
    pub fn iso_date(&self) -> String {
        use chrono::TimeZone;
        chrono::Local
            .timestamp_opt(self.timestamp, 0)
            .single()
            .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S").to_string())
            .unwrap_or_default()
    }
}

/// Lines recently changed in one file, plus the provenance of the commit
/// that last extended the set.
///
/// Equality and hashing look at `file_path` only.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeRecord {
    pub file_path: String,
    pub changed_lines: BTreeSet<usize>,
    pub author: String,
    pub commit_id: String,
    pub commit_date: String,
    pub summary: String,
}

impl ChangeRecord {
    pub fn from_commit(file_path: String, changed_lines: BTreeSet<usize>, commit: &CommitInfo) -> Self {
        ChangeRecord {
            file_path,
            changed_lines,
            author: commit.author.clone(),
            commit_id: commit.short_hash.clone(),
            commit_date: commit.iso_date(),
            summary: commit.subject.clone(),
        }
    }

    /// Unions `other`'s lines into this record. Provenance is last-writer-wins:
    /// after the merge this record carries `other`'s commit fields.
    pub fn merge(&mut self, other: ChangeRecord) {
        self.changed_lines.extend(other.changed_lines);
        self.author = other.author;
        self.commit_id = other.commit_id;
        self.commit_date = other.commit_date;
        self.summary = other.summary;
    }
}

impl PartialEq for ChangeRecord {
    fn eq(&self, other: &Self) -> bool {
        self.file_path == other.file_path
    }
}

impl Eq for ChangeRecord {}

impl Hash for ChangeRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.file_path.hash(state);
    }
}

pub type ChangeMap = HashMap<String, ChangeRecord>;

// ─── Intersection Output ──────────────────────────────────────────────────────

/// A contiguous run of culprit lines with surrounding context.
///
/// When the source file is missing or shorter than the report claims,
/// `lines_before` and `culprit_text` hold `""` placeholders for the absent lines.
#[derive(Debug, Clone, Serialize)]
pub struct BlameGroup {
    pub start_line: usize,
    pub end_line: usize,
    pub lines_before: Vec<String>,
    /// Every file line from `start_line` to `end_line` inclusive.
    pub culprit_text: Vec<String>,
    pub lines_after: Vec<String>,
    /// The subset of `start_line..=end_line` that is actually a culprit.
    pub culprit_line_numbers: Vec<usize>,
    pub provenance: Vec<ChangeRecord>,
    pub language: String,
}

impl BlameGroup {
    /// Line number of the first entry in `lines_before` (or `start_line`).
    pub fn context_start(&self) -> usize {
        self.start_line - self.lines_before.len()
    }

    pub fn line_count(&self) -> usize {
        self.lines_before.len() + self.culprit_text.len() + self.lines_after.len()
    }

    /// Iterates `(line_number, text, is_culprit)` over the whole window.
    pub fn numbered_lines(&self) -> impl Iterator<Item = (usize, &str, bool)> + '_ {
        let start = self.context_start();
        self.lines_before
            .iter()
            .chain(self.culprit_text.iter())
            .chain(self.lines_after.iter())
            .enumerate()
            .map(move |(i, text)| {
                let n = start + i;
                (n, text.as_str(), self.culprit_line_numbers.binary_search(&n).is_ok())
            })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FileBlameResult {
    pub file_path: String,
    pub total_uncovered_count: usize,
    pub culprit_count: usize,
    pub blame_groups: Vec<BlameGroup>,
}

impl FileBlameResult {
    pub fn culprit_percentage(&self) -> f64 {
        percentage(self.culprit_count, self.total_uncovered_count)
    }
}

// ─── Analysis ─────────────────────────────────────────────────────────────────

/// Counters gathered while running the pipeline.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStats {
    pub coverage_files: usize,
    pub commits_scanned: usize,
    pub commits_failed: usize,
    pub changed_files: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisSummary {
    pub timestamp: String,
    pub lookback_days: u32,
    pub coverage_file: String,
    pub repo_path: String,
    pub stats: RunStats,
    /// Sorted by `culprit_count`, descending.
    pub results: Vec<FileBlameResult>,
}

impl AnalysisSummary {
    pub fn total_uncovered(&self) -> usize {
        self.results.iter().map(|r| r.total_uncovered_count).sum()
    }

    pub fn total_culprit(&self) -> usize {
        self.results.iter().map(|r| r.culprit_count).sum()
    }

    pub fn culprit_percentage(&self) -> f64 {
        percentage(self.total_culprit(), self.total_uncovered())
    }

    /// The `limit` results with the most culprit lines. Ties keep their order.
    pub fn top_culprits(&self, limit: usize) -> Vec<&FileBlameResult> {
        let mut top: Vec<&FileBlameResult> = self.results.iter().collect();
        top.sort_by(|a, b| by_culprits_desc(a, b));
        top.truncate(limit);
        top
    }
}

/// Descending by culprit count. Used with stable sorts only.
pub fn by_culprits_desc(a: &FileBlameResult, b: &FileBlameResult) -> Ordering {
    b.culprit_count.cmp(&a.culprit_count)
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 { 0.0 } else { (part as f64 / whole as f64) * 100.0 }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
