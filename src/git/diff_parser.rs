use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};

/// Post-image path → line numbers (in the new file) that were added.
pub type ChangedLines = BTreeMap<String, BTreeSet<usize>>;

static HUNK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@").unwrap());

/// Running state for the hunk being read.
struct Hunk {
    /// Line number the next new-file line will occupy.
    next_line: usize,
    old_left: usize,
    new_left: usize,
}

impl Hunk {
    fn from_header(line: &str) -> Option<Hunk> {
        let caps = HUNK_RE.captures(line)?;
        let count = |i: usize| caps.get(i).map_or(Some(1), |m| m.as_str().parse().ok());
        Some(Hunk {
            next_line: caps[3].parse().ok()?,
            old_left: count(2)?,
            new_left: count(4)?,
        })
    }
}

/// Extracts added line numbers per file from `git diff` output.
///
/// The counter starts at the post-image start of each hunk header. An added
/// line is recorded at the counter and advances it; a deleted line neither
/// records nor advances; a `\ No newline` marker is ignored; anything else is
/// context and only advances.
pub fn parse_unified_diff(diff: &str) -> ChangedLines {
    let mut changes = ChangedLines::new();
    let mut current_file: Option<String> = None;
    let mut hunk: Option<Hunk> = None;

    for line in diff.lines() {
        if line.starts_with("diff --git ") {
            current_file = None;
            hunk = None;
            continue;
        }

        if line.starts_with("@@ ") {
            if let Some(h) = Hunk::from_header(line) {
                hunk = Some(h);
                continue;
            }
        }

        // "+++"/"---" are headers unless the open hunk still expects that kind of body line.
        let expects_added   = hunk.as_ref().is_some_and(|h| h.new_left > 0);
        let expects_removed = hunk.as_ref().is_some_and(|h| h.old_left > 0);

        if let Some(rest) = line.strip_prefix("+++ ") {
            if !expects_added {
                current_file = post_image_path(rest);
                hunk = None;
                continue;
            }
        }
        if line.starts_with("--- ") && !expects_removed {
            hunk = None;
            continue;
        }

        let (Some(h), Some(file)) = (hunk.as_mut(), current_file.as_ref()) else {
            continue;
        };

        match line.as_bytes().first() {
            Some(b'+') => {
                changes.entry(file.clone()).or_default().insert(h.next_line);
                h.next_line += 1;
                h.new_left = h.new_left.saturating_sub(1);
            }
            Some(b'-') => {
                h.old_left = h.old_left.saturating_sub(1);
            }
            Some(b'\\') => {}
            _ => {
                h.next_line += 1;
                h.old_left = h.old_left.saturating_sub(1);
                h.new_left = h.new_left.saturating_sub(1);
            }
        }
    }

    changes
}

/// Path from a `+++` header: `b/src/app.rs` → `src/app.rs`, `/dev/null` → None.
fn post_image_path(raw: &str) -> Option<String> {
    let raw = raw.trim_end_matches(['\t', '\r']);
    let unquoted = if raw.starts_with('"') && raw.ends_with('"') && raw.len() >= 2 {
        unquote(&raw[1..raw.len() - 1])
    } else {
        raw.to_string()
    };
    if unquoted == "/dev/null" {
        return None;
    }
    let path = unquoted.strip_prefix("b/").unwrap_or(&unquoted);
    if path.is_empty() { None } else { Some(path.to_string()) }
}

/// Undoes git's C-style path quoting (`\"`, `\\`, `\t`, `\n`, octal bytes).
fn unquote(s: &str) -> String {
    let mut bytes: Vec<u8> = Vec::with_capacity(s.len());
    let mut iter = s.bytes().peekable();
    while let Some(b) = iter.next() {
        if b != b'\\' {
            bytes.push(b);
            continue;
        }
        match iter.next() {
            Some(b'n') => bytes.push(b'\n'),
            Some(b't') => bytes.push(b'\t'),
            Some(d @ b'0'..=b'7') => {
                let mut value = (d - b'0') as u32;
                for _ in 0..2 {
                    match iter.peek() {
                        Some(&o @ b'0'..=b'7') => {
                            value = value * 8 + (o - b'0') as u32;
                            iter.next();
                        }
                        _ => break,
                    }
                }
                bytes.push(value as u8);
            }
            Some(other) => bytes.push(other),
            None => bytes.push(b'\\'),
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(v: &[usize]) -> BTreeSet<usize> {
        v.iter().copied().collect()
    }

    #[test]
    fn test_added_line_after_three_context_lines() {
        let diff = "\
diff --git a/test.py b/test.py
index 1234567..abcdefg 100644
--- a/test.py
+++ b/test.py
@@ -5,6 +5,7 @@
 line 5
 line 6
 line 7
+line 8 (new)
 line 9
 line 10
 line 11
";
        let result = parse_unified_diff(diff);
        assert_eq!(result["test.py"], lines(&[8]));
    }

    #[test]
    fn test_deletion_does_not_advance_counter() {
        let diff = "\
diff --git a/test.py b/test.py
--- a/test.py
+++ b/test.py
@@ -15,5 +16,6 @@
 line 15
 line 16
-line 17 (deleted)
 line 18
+line 19 (new)
 line 20
";
        let result = parse_unified_diff(diff);
        assert_eq!(result["test.py"], lines(&[19]), "16,17 context; 18 post-delete context; 19 added");
    }

    #[test]
    fn test_multiple_hunks_reset_counter() {
        let diff = "\
diff --git a/a.rs b/a.rs
--- a/a.rs
+++ b/a.rs
@@ -1,2 +1,3 @@
+first
 one
 two
@@ -40,2 +41,3 @@
 forty
+inserted
 forty-one
";
        let result = parse_unified_diff(diff);
        assert_eq!(result["a.rs"], lines(&[1, 42]));
    }

    #[test]
    fn test_multiple_files() {
        let diff = "\
diff --git a/file1.py b/file1.py
index 1234567..abcdefg 100644
--- a/file1.py
+++ b/file1.py
@@ -1,3 +1,4 @@
+new line 1
 line 1
 line 2
 line 3
diff --git a/file2.py b/file2.py
index 2345678..bcdefgh 100644
--- a/file2.py
+++ b/file2.py
@@ -5,2 +5,3 @@
 line 5
+new line 6
 line 7
";
        let result = parse_unified_diff(diff);
        assert_eq!(result.len(), 2);
        assert_eq!(result["file1.py"], lines(&[1]));
        assert_eq!(result["file2.py"], lines(&[6]));
    }

    #[test]
    fn test_new_file_marks_every_line() {
        let diff = "\
diff --git a/newfile.py b/newfile.py
new file mode 100644
index 0000000..abcdefg
--- /dev/null
+++ b/newfile.py
@@ -0,0 +1,3 @@
+def hello():
+    print(\"hello\")
+    return True
";
        let result = parse_unified_diff(diff);
        assert_eq!(result["newfile.py"], lines(&[1, 2, 3]));
    }

    #[test]
    fn test_deleted_file_contributes_nothing() {
        let diff = "\
diff --git a/gone.py b/gone.py
deleted file mode 100644
--- a/gone.py
+++ /dev/null
@@ -1,2 +0,0 @@
-a
-b
";
        assert!(parse_unified_diff(diff).is_empty());
    }

    #[test]
    fn test_pure_deletion_hunk_leaves_file_out() {
        let diff = "\
diff --git a/x.py b/x.py
--- a/x.py
+++ b/x.py
@@ -1,3 +1,2 @@
 keep
-drop
 keep too
";
        assert!(parse_unified_diff(diff).is_empty(), "no added lines means no entry");
    }

    #[test]
    fn test_no_newline_marker_is_ignored() {
        let diff = "\
diff --git a/n.txt b/n.txt
--- a/n.txt
+++ b/n.txt
@@ -1,2 +1,3 @@
 one
-two
\\ No newline at end of file
+two
+three
\\ No newline at end of file
";
        let result = parse_unified_diff(diff);
        assert_eq!(result["n.txt"], lines(&[2, 3]));
    }

    #[test]
    fn test_body_lines_that_look_like_headers() {
        // Content "++ new comment" added and "-- old comment" removed.
        let diff = "\
diff --git a/c.c b/c.c
--- a/c.c
+++ b/c.c
@@ -1,2 +1,2 @@
 int x;
--- old comment
+++ new comment
";
        let result = parse_unified_diff(diff);
        assert_eq!(result["c.c"], lines(&[2]));
    }

    #[test]
    fn test_header_without_counts() {
        let diff = "\
diff --git a/one.txt b/one.txt
--- a/one.txt
+++ b/one.txt
@@ -1 +1 @@
-old
+new
";
        assert_eq!(parse_unified_diff(diff)["one.txt"], lines(&[1]));
    }

    #[test]
    fn test_hunk_header_with_section_heading() {
        let diff = "\
diff --git a/m.py b/m.py
--- a/m.py
+++ b/m.py
@@ -10,3 +10,4 @@ def handler(event):
     a = 1
+    b = 2
     return a

";
        assert_eq!(parse_unified_diff(diff)["m.py"], lines(&[11]));
    }

    #[test]
    fn test_binary_section_is_skipped() {
        let diff = "\
diff --git a/logo.png b/logo.png
new file mode 100644
index 0000000..1111111
Binary files /dev/null and b/logo.png differ
diff --git a/r.md b/r.md
--- a/r.md
+++ b/r.md
@@ -0,0 +1 @@
+hello
";
        let result = parse_unified_diff(diff);
        assert_eq!(result.keys().collect::<Vec<_>>(), vec!["r.md"]);
    }

    #[test]
    fn test_quoted_path_is_unquoted() {
        assert_eq!(post_image_path("\"b/dir/with \\\"quote\\\".py\""), Some("dir/with \"quote\".py".to_string()));
        assert_eq!(post_image_path("\"b/caf\\303\\251.py\""), Some("café.py".to_string()));
        assert_eq!(post_image_path("b/plain name.py\t"), Some("plain name.py".to_string()));
        assert_eq!(post_image_path("/dev/null"), None);
    }

    #[test]
    fn test_empty_diff() {
        assert!(parse_unified_diff("").is_empty());
    }
}
