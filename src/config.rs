use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{BlameError, Result};

/// File name picked up from the repository root when `--config` is not given.
pub const REPO_CONFIG_NAME: &str = ".blame-tracker.yml";

/// All settings that can be placed in a .blame-tracker.yml config file.
/// Every field is optional. CLI flags always take precedence over values set here.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlameConfig {
    pub days: Option<u32>,
    pub workers: Option<usize>,
    pub format: Option<String>,
    pub output: Option<String>,
    pub top: Option<usize>,
}

impl BlameConfig {
    /// Validates semantic constraints that serde cannot enforce.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if let Some(fmt) = &self.format {
            match fmt.as_str() {
                "terminal" | "json" | "html" => {}
                other => {
                    return Err(format!(
                        "Invalid 'format' value: \"{other}\". \
                         Expected one of: \"terminal\", \"json\", \"html\""
                    ))
                }
            }
        }

        let counts: [(&str, Option<usize>); 3] = [
            ("days", self.days.map(|d| d as usize)),
            ("workers", self.workers),
            ("top", self.top),
        ];
        for (key, value) in counts {
            if value == Some(0) {
                return Err(format!("Invalid '{key}' value: 0. Must be 1 or greater"));
            }
        }

        Ok(())
    }
}

/// Reads, parses, and validates a YAML config file from `path`.
pub fn load_config(path: &Path) -> Result<BlameConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| BlameError::Config(format!("Cannot read config file '{}': {e}", path.display())))?;
    // An empty file is a valid, empty config.
    if content.trim().is_empty() {
        return Ok(BlameConfig::default());
    }
    let cfg: BlameConfig = serde_yaml::from_str(&content)
        .map_err(|e| BlameError::Config(format!("Invalid config file '{}': {e}", path.display())))?;
    cfg.validate()
        .map_err(|e| BlameError::Config(format!("Config file '{}': {e}", path.display())))?;
    Ok(cfg)
}

/// Finds the config file to use when none was given explicitly:
/// `<repo>/.blame-tracker.yml`, then `<config dir>/blame-tracker/config.yml`.
pub fn discover_config(repo: &Path) -> Option<PathBuf> {
    let user = dirs::config_dir().map(|d| d.join("blame-tracker").join("config.yml"));
    let found = std::iter::once(repo.join(REPO_CONFIG_NAME))
        .chain(user)
        .find(|p| p.is_file());
    if let Some(p) = &found {
        debug!(path = %p.display(), "using discovered config file");
    }
    found
}

/// Annotated YAML template, printed by `--generate-config`.
pub static TEMPLATE: &str = r#"# blame-tracker configuration file
# Generated by: blame-tracker --generate-config
#
# All settings are optional. Omit any field to use the built-in default.
# CLI flags always take precedence over values in this file.
# Save this file as .blame-tracker.yml in your repository root and it is
# picked up automatically, or pass it explicitly:
#
#   blame-tracker --config .blame-tracker.yml coverage.xml .

# ── Analysis scope ─────────────────────────────────────────────────────────────

# How many days of commit history count as "recent".
# days: 30

# Number of worker threads used to diff commits.
# workers: 4

# ── Output ─────────────────────────────────────────────────────────────────────

# Output format: terminal, json, html
# format: "terminal"

# Output file path. JSON goes to stdout when unset; HTML defaults to
# blame_report.html in the current directory.
# output: "blame_report.html"

# Number of files listed in the terminal ranking.
# top: 10
"#;

/// Prints the config template to stdout, or writes it to `output_path` if given.
pub fn print_template(output_path: Option<&Path>) -> Result<()> {
    match output_path {
        Some(path) => std::fs::write(path, TEMPLATE).map_err(|e| {
            BlameError::Config(format!("Cannot write config template to '{}': {e}", path.display()))
        }),
        None => {
            print!("{TEMPLATE}");
            Ok(())
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
