use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, Table};

use crate::types::{AnalysisSummary, BlameGroup, FileBlameResult};

pub fn report_terminal(summary: &AnalysisSummary, top: usize) {
    eprintln!();
    println!(
        "{} last {} days ({} commits, {} covered files)",
        "🎯 blame-tracker".red().bold(),
        summary.lookback_days.to_string().bright_black(),
        summary.stats.commits_scanned.to_string().bright_black(),
        summary.stats.coverage_files.to_string().bright_black(),
    );
    println!();

    if summary.results.is_empty() {
        println!("{}", "  No recently changed lines are missing coverage.".green());
        println!();
        print_totals(summary);
        return;
    }

    let ranked = summary.top_culprits(top);
    println!("{table}", table = build_table(&ranked));

    // ── First blame group of each listed file ───────────────────────────────
    for r in &ranked {
        if let Some(group) = r.blame_groups.first() {
            println!();
            print_group(r, group);
        }
    }

    println!();
    print_totals(summary);
}

fn build_table(ranked: &[&FileBlameResult]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["RANK", "FILE", "UNCOVERED", "CULPRIT", "CULPRIT %", "GROUPS"]);

    for (i, r) in ranked.iter().enumerate() {
        table.add_row(vec![
            Cell::new(format!("{:3}", i + 1)),
            Cell::new(truncate_path(&r.file_path, 50)),
            Cell::new(r.total_uncovered_count.to_string()),
            Cell::new(r.culprit_count.to_string()).add_attribute(Attribute::Bold),
            pct_cell(r.culprit_percentage()),
            Cell::new(r.blame_groups.len().to_string()),
        ]);
    }
    table
}

fn print_group(r: &FileBlameResult, group: &BlameGroup) {
    println!(
        "{} {}",
        format!("{}:{}-{}", r.file_path, group.start_line, group.end_line).cyan().bold(),
        format!("(group 1 of {}, {} lines shown)", r.blame_groups.len(), group.line_count()).bright_black(),
    );
    if let Some(p) = group.provenance.first() {
        println!(
            "  {} {} {} {}",
            p.commit_id.yellow(),
            p.author.white(),
            p.commit_date.bright_black(),
            p.summary.bright_black(),
        );
    }
    for (n, text, culprit) in group.numbered_lines() {
        if culprit {
            println!("  {} {} {}", format!("{n:>5}").red(), "▶".red(), text.red());
        } else {
            println!("  {}   {}", format!("{n:>5}").bright_black(), text.bright_black());
        }
    }
}

fn print_totals(summary: &AnalysisSummary) {
    println!("{}", "Summary".cyan().bold());
    println!("    {:<22} {}", "Uncovered lines:", summary.total_uncovered());
    println!("    {:<22} {}", "Culprit lines:", summary.total_culprit().to_string().red().bold());
    println!("    {:<22} {:.1}%", "Culprit share:", summary.culprit_percentage());
    println!("    {:<22} {}", "Files with culprits:", summary.results.len());
    if summary.stats.commits_failed > 0 {
        println!(
            "    {}",
            format!("{} commit(s) could not be diffed and were skipped", summary.stats.commits_failed).yellow()
        );
    }
    println!();
}

// ─── Cell builders ────────────────────────────────────────────────────────────

/// Culprit share: plain text, colored by severity so comfy-table measures
/// the visible width.
fn pct_cell(pct: f64) -> Cell {
    let text = format!("{pct:5.1}%");
    match pct {
        p if p >= 75.0 => Cell::new(text).fg(Color::Red).add_attribute(Attribute::Bold),
        p if p >= 50.0 => Cell::new(text).fg(Color::Yellow),
        p if p >= 25.0 => Cell::new(text),
        _ => Cell::new(text).fg(Color::Green),
    }
}

fn truncate_path(s: &str, max: usize) -> String {
    let count = s.chars().count();
    if count <= max { return s.to_string(); }
    let tail: String = s.chars().skip(count - (max - 1)).collect();
    format!("…{tail}")
}
