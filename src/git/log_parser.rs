use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::debug;

use crate::error::{BlameError, Result};
use crate::types::CommitInfo;

const COMMIT_MARKER: &str = "COMMIT\x1f";

/// Fields are separated by 0x1f so author names and subjects may contain anything.
const LOG_FORMAT: &str = "--format=COMMIT%x1f%H%x1f%h%x1f%an%x1f%ct%x1f%P%x1f%s";

/// Streams `git log` from HEAD backwards and returns every commit up to the
/// first one whose commit time is older than `cutoff` (unix seconds).
///
/// The walk stops at that first older commit, so history with out-of-order
/// commit times can yield a shorter window than the cutoff implies.
pub fn parse_log_since(cwd: &Path, cutoff: i64) -> Result<Vec<CommitInfo>> {
    let mut child = Command::new("git")
        .args(["-c", "log.showSignature=false", "log", "--no-color", LOG_FORMAT])
        .current_dir(cwd)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| BlameError::Git(format!("Failed to run git log: {e}")))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| BlameError::Git("git log produced no stdout".to_string()))?;

    let (commits, stopped_early) = take_until_cutoff(BufReader::new(stdout), cutoff)?;

    if stopped_early {
        // The rest of history is not needed.
        let _ = child.kill();
        let _ = child.wait();
        return Ok(commits);
    }

    let mut stderr = String::new();
    if let Some(mut err) = child.stderr.take() {
        let _ = err.read_to_string(&mut stderr);
    }
    let status = child
        .wait()
        .map_err(|e| BlameError::Git(format!("git log did not finish: {e}")))?;

    if !status.success() {
        if is_unborn_branch(&stderr) {
            debug!("repository has no commits yet");
            return Ok(Vec::new());
        }
        return Err(BlameError::Git(format!("git log failed: {}", stderr.trim())));
    }

    Ok(commits)
}

/// Reads commits from `git log` output until one is older than `cutoff`.
/// Returns the in-window commits and whether the cutoff was hit.
fn take_until_cutoff<R: BufRead>(reader: R, cutoff: i64) -> Result<(Vec<CommitInfo>, bool)> {
    let mut commits = Vec::new();
    for line in reader.split(b'\n') {
        let raw = line.map_err(|e| BlameError::Git(format!("Failed to read git log: {e}")))?;
        let text = String::from_utf8_lossy(&raw);
        let Some(commit) = parse_commit_line(&text) else { continue };
        if commit.timestamp < cutoff {
            return Ok((commits, true));
        }
        commits.push(commit);
    }
    Ok((commits, false))
}

/// Parses one `COMMIT␟hash␟short␟author␟time␟parents␟subject` line.
pub fn parse_commit_line(line: &str) -> Option<CommitInfo> {
    let rest = line.trim_end_matches(['\r', '\n']).strip_prefix(COMMIT_MARKER)?;
    let parts: Vec<&str> = rest.splitn(6, '\x1f').collect();
    if parts.len() < 6 { return None; }

    Some(CommitInfo {
        hash:       parts[0].to_string(),
        short_hash: parts[1].to_string(),
        author:     parts[2].to_string(),
        timestamp:  parts[3].parse().ok()?,
        parents:    parts[4].split_whitespace().map(String::from).collect(),
        subject:    parts[5].to_string(),
    })
}

fn is_unborn_branch(stderr: &str) -> bool {
    stderr.contains("does not have any commits yet")
        || stderr.contains("bad default revision 'HEAD'")
        || stderr.contains("ambiguous argument 'HEAD'")
}
