use std::fs;
use std::path::Path;

use crate::error::{BlameError, Result};
use crate::types::{AnalysisSummary, BlameGroup, FileBlameResult};

pub fn report_html(summary: &AnalysisSummary, output_file: &Path) -> Result<()> {
    let html = build_html(summary);
    fs::write(output_file, &html)
        .map_err(|e| BlameError::Report(format!("Failed to write {}: {e}", output_file.display())))?;
    eprintln!("✓ HTML report written to {}", output_file.display());
    Ok(())
}

fn build_html(summary: &AnalysisSummary) -> String {
    let table_rows: String = summary.results.iter().enumerate().map(|(i, r)| format!(
        "<tr><td class=\"num\">{}</td><td class=\"path\"><a href=\"#file-{}\">{}</a></td>\
         <td class=\"num\">{}</td><td class=\"num\"><strong>{}</strong></td>\
         <td class=\"num\">{:.1}%</td><td class=\"num\">{}</td></tr>",
        i + 1, i, esc(&r.file_path), r.total_uncovered_count, r.culprit_count,
        r.culprit_percentage(), r.blame_groups.len()
    )).collect();

    let file_sections: String = summary.results.iter().enumerate().map(|(i, r)| file_section(i, r)).collect();

    let results_body = if summary.results.is_empty() {
        "<div class=\"card\"><p class=\"empty\">No recently changed lines are missing coverage.</p></div>".to_string()
    } else {
        format!(
            "<div class=\"card\"><h2>Files Ranked by Culprit Lines</h2><table>\
             <thead><tr><th>#</th><th>File</th><th style=\"text-align:right\">Uncovered</th>\
             <th style=\"text-align:right\">Culprit</th><th style=\"text-align:right\">Culprit %</th>\
             <th style=\"text-align:right\">Groups</th></tr></thead>\
             <tbody>{table_rows}</tbody></table></div>{file_sections}"
        )
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8"><meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>blame-tracker report</title>
  <style>
    *,*::before,*::after{{box-sizing:border-box;margin:0;padding:0}}
    body{{font-family:-apple-system,BlinkMacSystemFont,'Segoe UI',Roboto,sans-serif;background:#0f172a;color:#e2e8f0;padding:2rem;font-size:14px;line-height:1.6}}
    h1{{font-size:1.75rem;font-weight:800}} h1 .mark{{color:#f97316}}
    h2{{font-size:1rem;font-weight:700;color:#94a3b8;text-transform:uppercase;letter-spacing:.06em;margin-bottom:1rem}}
    h3{{font-family:'JetBrains Mono','Fira Code',ui-monospace,monospace;font-size:.9rem;color:#7dd3fc;margin-bottom:.75rem}}
    .meta{{color:#64748b;margin:.4rem 0 2rem;font-size:.8rem}} .meta span{{margin-right:1.5rem}}
    .stats{{display:grid;grid-template-columns:repeat(auto-fit,minmax(160px,1fr));gap:1rem;margin-bottom:1.5rem}}
    .stat{{background:#1e293b;border:1px solid #334155;border-radius:.625rem;padding:1rem 1.25rem}}
    .stat-label{{font-size:.7rem;text-transform:uppercase;letter-spacing:.06em;color:#64748b}}
    .stat-value{{font-size:2rem;font-weight:800;margin-top:.2rem}}
    .stat-value.red{{color:#f87171}} .stat-value.orange{{color:#fb923c}} .stat-value.blue{{color:#60a5fa}} .stat-value.slate{{color:#94a3b8}}
    .card{{background:#1e293b;border:1px solid #334155;border-radius:.75rem;padding:1.5rem;margin-bottom:1.5rem}}
    table{{width:100%;border-collapse:collapse}}
    th{{text-align:left;padding:.5rem .75rem;border-bottom:2px solid #334155;font-size:.7rem;font-weight:700;text-transform:uppercase;letter-spacing:.06em;color:#64748b}}
    td{{padding:.5rem .75rem;border-bottom:1px solid #1a2744;vertical-align:middle}}
    tr:last-child td{{border-bottom:none}} tr:hover td{{background:#162032}}
    td.path{{font-family:'JetBrains Mono','Fira Code',ui-monospace,monospace;font-size:.78rem;word-break:break-all}}
    td.path a{{color:#7dd3fc;text-decoration:none}}
    td.num{{text-align:right;color:#94a3b8}}
    .group{{margin-bottom:1.25rem}}
    .provenance{{font-size:.78rem;color:#94a3b8;margin-bottom:.4rem}}
    .provenance code{{color:#fbbf24}}
    pre.code{{background:#0b1220;border:1px solid #1a2744;border-radius:.5rem;padding:.5rem 0;overflow-x:auto;font-family:'JetBrains Mono','Fira Code',ui-monospace,monospace;font-size:.78rem}}
    pre.code span.line{{display:block;padding:0 .75rem;white-space:pre}}
    pre.code span.ln{{display:inline-block;width:4em;color:#475569;user-select:none}}
    pre.code span.culprit{{background:rgba(239,68,68,.15);color:#fca5a5}}
    .empty{{color:#86efac}}
    .footer{{text-align:center;color:#334155;font-size:.75rem;margin-top:2rem}}
  </style>
</head>
<body>
  <h1><span class="mark">🎯</span> blame-tracker</h1>
  <p class="meta">
    <span>Coverage: <strong>{coverage}</strong></span>
    <span>Repo: <strong>{repo}</strong></span>
    <span>Lookback: <strong>{days} days</strong></span>
    <span>Generated: <strong>{timestamp}</strong></span>
  </p>
  <div class="stats">
    <div class="stat"><div class="stat-label">Culprit Lines</div><div class="stat-value red">{culprit}</div></div>
    <div class="stat"><div class="stat-label">Uncovered Lines</div><div class="stat-value orange">{uncovered}</div></div>
    <div class="stat"><div class="stat-label">Culprit Share</div><div class="stat-value blue">{pct:.1}%</div></div>
    <div class="stat"><div class="stat-label">Files</div><div class="stat-value slate">{files}</div></div>
    <div class="stat"><div class="stat-label">Commits Scanned</div><div class="stat-value slate">{commits}</div></div>
  </div>
  {results_body}
  <p class="footer">Generated by blame-tracker on {timestamp}</p>
</body>
</html>"#,
        coverage = esc(&summary.coverage_file),
        repo = esc(&summary.repo_path),
        days = summary.lookback_days,
        timestamp = esc(&summary.timestamp),
        culprit = summary.total_culprit(),
        uncovered = summary.total_uncovered(),
        pct = summary.culprit_percentage(),
        files = summary.results.len(),
        commits = summary.stats.commits_scanned,
        results_body = results_body,
    )
}

fn file_section(index: usize, r: &FileBlameResult) -> String {
    let groups: String = r.blame_groups.iter().map(group_block).collect();
    format!(
        "<div class=\"card\" id=\"file-{index}\"><h3>{}</h3>{groups}</div>",
        esc(&r.file_path)
    )
}

fn group_block(group: &BlameGroup) -> String {
    let provenance: String = group.provenance.iter().map(|p| format!(
        "<div class=\"provenance\"><code>{}</code> {} &middot; {} &middot; {}</div>",
        esc(&p.commit_id), esc(&p.author), esc(&p.commit_date), esc(&p.summary)
    )).collect();

    let lines: String = group.numbered_lines().map(|(n, text, culprit)| format!(
        "<span class=\"line{}\"><span class=\"ln\">{n}</span>{}</span>",
        if culprit { " culprit" } else { "" },
        esc(text)
    )).collect();

    format!(
        "<div class=\"group\">{provenance}<pre class=\"code\" data-language=\"{}\">{lines}</pre></div>",
        esc(&group.language)
    )
}

fn esc(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
