use std::path::Path;
use roxmltree::{Document, Node, ParsingOptions};
use tracing::{debug, info};

use crate::coverage::paths::PathNormalizer;
use crate::error::{BlameError, Result};
use crate::types::{CoverageMap, FileCoverageSet, LineRecord, LineStatus};

/// Loads a Cobertura XML report into per-file line coverage.
///
/// Paths are normalized against `repo_root`; files that end up with no
/// parseable line entries are left out of the map.
pub fn load_coverage(report: &Path, repo_root: &Path) -> Result<CoverageMap> {
    if !report.exists() {
        return Err(BlameError::not_found("Coverage file", report));
    }
    let bytes = std::fs::read(report).map_err(|e| BlameError::io(report, e))?;
    let text = String::from_utf8(bytes).map_err(|e| BlameError::MalformedInput {
        path: report.to_path_buf(),
        reason: format!("not valid UTF-8: {e}"),
    })?;
    let coverage = parse_coverage(&text, &PathNormalizer::new(repo_root)).map_err(|reason| {
        BlameError::MalformedInput { path: report.to_path_buf(), reason }
    })?;
    info!(
        files = coverage.len(),
        lines = coverage.values().map(|f| f.line_numbers().len()).sum::<usize>(),
        covered = coverage.values().map(|f| f.covered_lines().len()).sum::<usize>(),
        partial = coverage.values().map(|f| f.partial_lines().len()).sum::<usize>(),
        "coverage report loaded"
    );
    Ok(coverage)
}

/// Parses report text. Errors only when the document is not well-formed.
pub fn parse_coverage(xml: &str, paths: &PathNormalizer) -> std::result::Result<CoverageMap, String> {
    let opts = ParsingOptions { allow_dtd: true, ..ParsingOptions::default() };
    let doc = Document::parse_with_options(xml, opts).map_err(|e| e.to_string())?;

    let mut coverage = CoverageMap::new();
    let mut skipped = 0usize;

    for class in doc.descendants().filter(|n| n.has_tag_name("class")) {
        let Some(filename) = class.attribute("filename").filter(|f| !f.trim().is_empty()) else {
            continue;
        };
        let path = paths.normalize(filename);

        let records: Vec<LineRecord> = class
            .children()
            .filter(|n| n.has_tag_name("lines"))
            .flat_map(|lines| lines.children().filter(|n| n.has_tag_name("line")))
            .filter_map(|line| {
                let rec = parse_line(line);
                if rec.is_none() { skipped += 1; }
                rec
            })
            .collect();

        if records.is_empty() { continue; }

        let entry = coverage
            .entry(path.clone())
            .or_insert_with(|| FileCoverageSet::new(path));
        for rec in records {
            entry.push(rec);
        }
    }

    if skipped > 0 {
        debug!(skipped, "skipped unparseable <line> entries");
    }
    Ok(coverage)
}

/// Classifies one `<line>` element. `None` when an attribute is unparseable.
fn parse_line(line: Node<'_, '_>) -> Option<LineRecord> {
    let number: usize = line.attribute("number")?.trim().parse().ok()?;
    if number == 0 { return None; }

    let hits: u64 = match line.attribute("hits") {
        Some(h) => h.trim().parse().ok()?,
        None => 0,
    };

    let branch_rate: Option<f64> = match line.attribute("branch-rate") {
        Some(r) => Some(r.trim().parse().ok()?),
        None => None,
    };

    let status = if hits > 0 {
        LineStatus::Covered
    } else if branch_rate.is_some_and(|r| r > 0.0) {
        LineStatus::Partial
    } else {
        LineStatus::Uncovered
    };

    Some(LineRecord::new(number, status, hits))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::path::PathBuf;

    fn parse(xml: &str) -> CoverageMap {
        let paths = PathNormalizer::new(&PathBuf::from("/repo"));
        parse_coverage(xml, &paths).expect("well-formed report should parse")
    }

    const REPORT: &str = r#"<?xml version="1.0" ?>
<!DOCTYPE coverage SYSTEM "http://cobertura.sourceforge.net/xml/coverage-04.dtd">
<coverage version="5.4" timestamp="1701619200">
  <packages>
    <package name="src">
      <classes>
        <class name="test" filename="src/test.py">
          <methods>
            <method name="f"><lines><line number="2" hits="9"/></lines></method>
          </methods>
          <lines>
            <line number="1" hits="1"/>
            <line number="2" hits="0"/>
            <line number="3" hits="0" branch-rate="0.5"/>
            <line number="4" hits="0" branch-rate="0.0"/>
            <line number="5" hits="3"/>
          </lines>
        </class>
      </classes>
    </package>
  </packages>
</coverage>"#;

    #[test]
    fn test_classifies_line_status() {
        let cov = parse(REPORT);
        let fc = &cov["src/test.py"];
        assert_eq!(fc.lines.len(), 5, "method-level lines must not be double counted");
        assert_eq!(fc.covered_lines(), BTreeSet::from([1, 5]));
        assert_eq!(fc.uncovered_lines(), BTreeSet::from([2, 4]));
        assert_eq!(fc.partial_lines(), BTreeSet::from([3]));
        assert_eq!(fc.lines[4].hit_count, 3);
    }

    #[test]
    fn test_unparseable_lines_are_skipped() {
        let xml = r#"<coverage><packages><package><classes>
            <class filename="a.py"><lines>
              <line number="x" hits="0"/>
              <line number="2" hits="many"/>
              <line number="3" hits="0" branch-rate="n/a"/>
              <line hits="0"/>
              <line number="0" hits="0"/>
              <line number="6"/>
            </lines></class>
        </classes></package></packages></coverage>"#;
        let cov = parse(xml);
        let fc = &cov["a.py"];
        assert_eq!(fc.line_numbers(), BTreeSet::from([6]), "only the valid entry survives");
        assert_eq!(fc.uncovered_lines(), BTreeSet::from([6]), "missing hits defaults to 0");
    }

    #[test]
    fn test_files_without_lines_are_omitted() {
        let xml = r#"<coverage>
            <class filename="empty.py"><lines/></class>
            <class filename="bad.py"><lines><line number="oops" hits="1"/></lines></class>
            <class name="nofile"><lines><line number="1" hits="1"/></lines></class>
            <class filename="ok.py"><lines><line number="1" hits="1"/></lines></class>
        </coverage>"#;
        let cov = parse(xml);
        assert_eq!(cov.keys().collect::<Vec<_>>(), vec!["ok.py"]);
    }

    #[test]
    fn test_classes_sharing_a_file_are_merged() {
        let xml = r#"<coverage>
            <class name="A" filename="src/A.java"><lines><line number="3" hits="0"/></lines></class>
            <class name="A$Inner" filename="src/A.java"><lines><line number="9" hits="0"/></lines></class>
        </coverage>"#;
        let cov = parse(xml);
        assert_eq!(cov.len(), 1);
        assert_eq!(cov["src/A.java"].uncovered_lines(), BTreeSet::from([3, 9]));
    }

    #[test]
    fn test_absolute_paths_are_normalized() {
        let xml = r#"<coverage>
            <class filename="/repo/src/app.py"><lines><line number="1" hits="0"/></lines></class>
            <class filename="C:\agent\src\util.py"><lines><line number="1" hits="0"/></lines></class>
        </coverage>"#;
        let cov = parse(xml);
        assert!(cov.contains_key("src/app.py"), "keys: {:?}", cov.keys().collect::<Vec<_>>());
        assert!(cov.contains_key("util.py"), "keys: {:?}", cov.keys().collect::<Vec<_>>());
    }

    #[test]
    fn test_malformed_document_is_an_error() {
        let paths = PathNormalizer::new(&PathBuf::from("/repo"));
        assert!(parse_coverage("<coverage><class filename=\"a.py\">", &paths).is_err());
        assert!(parse_coverage("not xml at all", &paths).is_err());
        assert!(parse_coverage("", &paths).is_err());
    }

    #[test]
    fn test_load_missing_report_is_not_found() {
        let err = load_coverage(Path::new("/definitely/not/here.xml"), Path::new("/repo")).unwrap_err();
        assert!(matches!(err, BlameError::NotFound { .. }), "got {err:?}");
    }

    #[test]
    fn test_load_malformed_report_is_malformed_input() {
        let dir = tempfile::tempdir().expect("tempdir");
        let report = dir.path().join("coverage.xml");
        std::fs::write(&report, "<coverage><unclosed></coverage>").unwrap();
        let err = load_coverage(&report, dir.path()).unwrap_err();
        assert!(matches!(err, BlameError::MalformedInput { .. }), "got {err:?}");
    }

    #[test]
    fn test_non_utf8_report_is_malformed_input() {
        let dir = tempfile::tempdir().expect("tempdir");
        let report = dir.path().join("coverage.xml");
        std::fs::write(&report, b"<coverage>\xff\xfe</coverage>").unwrap();
        let err = load_coverage(&report, dir.path()).unwrap_err();
        assert!(matches!(err, BlameError::MalformedInput { .. }), "got {err:?}");
        assert!(err.to_string().contains("UTF-8"), "got: {err}");
    }

    #[test]
    fn test_loading_twice_is_identical() {
        let dir = tempfile::tempdir().expect("tempdir");
        let report = dir.path().join("coverage.xml");
        std::fs::write(&report, REPORT).unwrap();

        let first = load_coverage(&report, dir.path()).unwrap();
        let second = load_coverage(&report, dir.path()).unwrap();
        assert_eq!(first.len(), second.len());
        for (path, fc) in &first {
            let other = &second[path];
            let a: Vec<_> = fc.lines.iter().map(|l| (l.line_number, l.status, l.hit_count)).collect();
            let b: Vec<_> = other.lines.iter().map(|l| (l.line_number, l.status, l.hit_count)).collect();
            assert_eq!(a, b, "records for {path} differ between loads");
        }
    }
}
