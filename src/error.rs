use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BlameError>;

/// Fatal errors. Anything that reaches `main` ends the run with exit code 1.
#[derive(Error, Debug)]
pub enum BlameError {
    #[error("{what} not found: {}", path.display())]
    NotFound { what: &'static str, path: PathBuf },

    #[error("Not the root of a git working tree: {}", path.display())]
    InvalidRepository { path: PathBuf },

    #[error("Malformed coverage report {}: {reason}", path.display())]
    MalformedInput { path: PathBuf, reason: String },

    #[error("git failed: {0}")]
    Git(String),

    #[error("Cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Report failed: {0}")]
    Report(String),
}

impl BlameError {
    pub fn not_found(what: &'static str, path: impl Into<PathBuf>) -> Self {
        Self::NotFound { what, path: path.into() }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    pub fn report<E: std::fmt::Display>(e: E) -> Self {
        Self::Report(e.to_string())
    }
}

/// Failure while mining one commit. Never escapes the change miner: the
/// commit's contribution is dropped and the run continues.
#[derive(Error, Debug)]
pub enum MiningError {
    #[error("cannot run git for {commit}: {source}")]
    Spawn {
        commit: String,
        #[source]
        source: std::io::Error,
    },

    #[error("git diff for {commit} failed: {reason}")]
    Diff { commit: String, reason: String },
}
