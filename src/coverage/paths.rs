use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

static DRIVE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z]:/").unwrap());

/// Rewrites coverage-report paths into the repo-relative, forward-slash form
/// that `git diff` prints, so the intersector can join on exact strings.
///
///   C:\work\repo\src\app.py  (root C:\work\repo) → src/app.py
///   /ci/build/other/app.py   (outside the root)  → app.py
///   .\src\app.py                                 → src/app.py
#[derive(Debug, Clone)]
pub struct PathNormalizer {
    /// Root prefixes, forward-slashed and ending in '/'.
    roots: Vec<String>,
}

impl PathNormalizer {
    pub fn new(repo_root: &Path) -> Self {
        let mut roots = Vec::new();
        let mut add = |p: &Path| {
            let prefix = root_prefix(&p.to_string_lossy());
            if !roots.contains(&prefix) {
                roots.push(prefix);
            }
        };
        add(repo_root);
        if let Ok(abs) = std::path::absolute(repo_root) {
            add(&abs);
        }
        if let Ok(canonical) = repo_root.canonicalize() {
            add(&canonical);
        }
        PathNormalizer { roots }
    }

    pub fn normalize(&self, raw: &str) -> String {
        let forward = raw.trim().replace('\\', "/");

        if !is_absolute(&forward) {
            return clean_segments(&forward);
        }

        for root in &self.roots {
            if let Some(rest) = strip_root(&forward, root) {
                return clean_segments(rest);
            }
        }

        forward
            .rsplit('/')
            .find(|s| !s.is_empty())
            .unwrap_or_default()
            .to_string()
    }
}

fn root_prefix(root: &str) -> String {
    let forward = root.trim().replace('\\', "/");
    let trimmed = forward.trim_end_matches('/');
    format!("{trimmed}/")
}

fn is_absolute(path: &str) -> bool {
    path.starts_with('/') || DRIVE_RE.is_match(path)
}

fn strip_root<'a>(path: &'a str, root: &str) -> Option<&'a str> {
    let head = path.get(..root.len())?;
    // Drive-letter paths come from case-insensitive filesystems.
    let matches = if DRIVE_RE.is_match(root) {
        head.eq_ignore_ascii_case(root)
    } else {
        head == root
    };
    if matches { path.get(root.len()..) } else { None }
}

/// Drops empty and `.` segments and resolves `..` where a parent exists.
fn clean_segments(path: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for seg in path.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                if matches!(out.last(), Some(last) if *last != "..") {
                    out.pop();
                } else {
                    out.push(seg);
                }
            }
            _ => out.push(seg),
        }
    }
    out.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn normalizer(root: &str) -> PathNormalizer {
        PathNormalizer { roots: vec![root_prefix(root)] }
    }

    #[test]
    fn test_relative_path_passes_through() {
        let n = normalizer("/repo");
        assert_eq!(n.normalize("src/app.py"), "src/app.py");
        assert_eq!(n.normalize("./src/app.py"), "src/app.py");
    }

    #[test]
    fn test_backslashes_become_forward_slashes() {
        let n = normalizer("/repo");
        assert_eq!(n.normalize(r"src\pkg\mod.py"), "src/pkg/mod.py");
    }

    #[test]
    fn test_absolute_unix_path_under_root() {
        let n = normalizer("/home/ci/repo/");
        assert_eq!(n.normalize("/home/ci/repo/src/app.py"), "src/app.py");
    }

    #[test]
    fn test_windows_path_under_root_is_case_insensitive() {
        let n = normalizer(r"C:\Work\Repo");
        assert_eq!(n.normalize(r"c:\work\repo\src\App.cs"), "src/App.cs");
    }

    #[test]
    fn test_absolute_path_outside_root_falls_back_to_file_name() {
        let n = normalizer("/home/ci/repo");
        assert_eq!(n.normalize("/opt/build/src/app.py"), "app.py");
        assert_eq!(n.normalize(r"D:\agent\_work\1\s\lib\util.py"), "util.py");
    }

    #[test]
    fn test_sibling_directory_with_shared_prefix_is_not_under_root() {
        let n = normalizer("/home/ci/repo");
        assert_eq!(n.normalize("/home/ci/repo-old/src/app.py"), "app.py");
    }

    #[test]
    fn test_dot_segments_are_cleaned() {
        let n = normalizer("/repo");
        assert_eq!(n.normalize("src/./pkg//a.py"), "src/pkg/a.py");
        assert_eq!(n.normalize("src/pkg/../a.py"), "src/a.py");
    }

    #[test]
    fn test_new_matches_real_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root: PathBuf = dir.path().to_path_buf();
        let n = PathNormalizer::new(&root);
        let abs = root.join("src").join("lib.rs");
        assert_eq!(n.normalize(&abs.to_string_lossy()), "src/lib.rs");
    }
}
