use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

use crate::error::{BlameError, MiningError, Result};
use crate::git::log_parser;
use crate::types::CommitInfo;

/// Object id of the empty tree, the diff base for root commits.
pub const EMPTY_TREE: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";

/// Context passed to `git diff -U`; large enough that every hunk spans its file.
pub const FULL_CONTEXT: u32 = 999_999;

/// Read-only access to repository history. Shared across mining workers.
pub trait HistorySource: Sync {
    /// Commits from the tip backwards, stopping at the first one older than `cutoff`.
    fn commits_since(&self, cutoff: i64) -> Result<Vec<CommitInfo>>;

    /// Unified diff of `commit` against its first parent (or the empty tree).
    fn commit_diff(&self, commit: &CommitInfo) -> std::result::Result<String, MiningError>;
}

/// [`HistorySource`] backed by the `git` executable. Every call spawns its own
/// process, so concurrent use from worker threads is safe.
#[derive(Debug, Clone)]
pub struct GitCli {
    root: PathBuf,
}

impl GitCli {
    /// Opens `path` as a git working copy. `path` must be the top of the
    /// working tree: diff paths are relative to it, and so are report paths.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(BlameError::not_found("Repository path", path));
        }
        let output = Command::new("git")
            .args(["rev-parse", "--show-toplevel"])
            .current_dir(path)
            .output()
            .map_err(|e| BlameError::Git(format!("Failed to run git: {e}")))?;
        if !output.status.success() {
            return Err(BlameError::InvalidRepository { path: path.to_path_buf() });
        }

        let toplevel = PathBuf::from(String::from_utf8_lossy(&output.stdout).trim());
        let same = match (toplevel.canonicalize(), path.canonicalize()) {
            (Ok(top), Ok(given)) => top == given,
            _ => false,
        };
        if !same {
            debug!(given = %path.display(), toplevel = %toplevel.display(), "not the working tree root");
            return Err(BlameError::InvalidRepository { path: path.to_path_buf() });
        }
        Ok(GitCli { root: path.to_path_buf() })
    }
}

impl HistorySource for GitCli {
    fn commits_since(&self, cutoff: i64) -> Result<Vec<CommitInfo>> {
        log_parser::parse_log_since(&self.root, cutoff)
    }

    fn commit_diff(&self, commit: &CommitInfo) -> std::result::Result<String, MiningError> {
        let base = commit.first_parent().unwrap_or(EMPTY_TREE);
        let unified = format!("--unified={FULL_CONTEXT}");

        let output = Command::new("git")
            .args([
                "-c", "core.quotepath=off",
                "diff",
                "--no-color",
                "--no-ext-diff",
                "--no-textconv",
                "--no-renames",
                "--src-prefix=a/",
                "--dst-prefix=b/",
                unified.as_str(),
                base,
                commit.hash.as_str(),
            ])
            .current_dir(&self.root)
            .output()
            .map_err(|source| MiningError::Spawn { commit: commit.short_hash.clone(), source })?;

        if !output.status.success() {
            return Err(MiningError::Diff {
                commit: commit.short_hash.clone(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        // Lossy decoding keeps line structure intact for non-UTF-8 sources.
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
