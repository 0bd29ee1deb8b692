//! CLI output formatting.
//!
//! Output is figure-centric: every photo is shown by its figure number and id,
//! with the file it became or the reason it was left out as indented context.
//!
//! # Output Format
//!
//! ## Plan
//!
//! ```text
//! Figures
//! 001 fachada (1600x1200)
//!     Description: Fachada principal
//! 002 corredor (skipped)
//!     Reason: Decode failed: ...
//!
//! pdf: 2 pages, 2 rows
//!     Page 001
//!         Row 001: 001 003
//!     Page 002
//!         Row 002: 004 (overflows)
//! docx: 2 rows
//!     Row 001: 001 003
//!     Row 002: 004
//! ```
//!
//! ## Generate
//!
//! ```text
//! pdf → out/relatorio_fotografico_Escola.pdf (2 pages)
//! docx → out/relatorio_fotografico_Escola.docx
//! Skipped 002 corredor
//!
//! Generated 2 documents, 3 figures, 1 skipped
//! ```
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout.

use crate::generate::{GeneratedReport, PreparedReport, SkippedPhoto};
use crate::layout::{ReportPlan, Row};
use crate::types::DocumentFormat;
use std::path::PathBuf;

/// Format a 1-based figure or row number as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate_desc(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max).collect();
        format!("{cut}...")
    }
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

fn row_line(number: usize, row: &Row) -> String {
    let figures: Vec<String> = row.figures().map(|c| format_index(c.number)).collect();
    let mut line = format!("Row {}: {}", format_index(number), figures.join(" "));
    if row.overflows {
        line.push_str(" (overflows)");
    }
    line
}

fn skipped_lines(skipped: &SkippedPhoto, lines: &mut Vec<String>) {
    lines.push(format!("{} {} (skipped)", format_index(skipped.number), skipped.id));
    lines.push(format!("{}Reason: {}", indent(1), skipped.reason));
}

// ============================================================================
// Plan
// ============================================================================

pub fn format_plan_output(
    prepared: &PreparedReport,
    plans: &[(DocumentFormat, ReportPlan)],
) -> Vec<String> {
    let mut lines = vec!["Figures".to_string()];

    let mut skipped = prepared.skipped.iter().peekable();
    for figure in &prepared.figures {
        while let Some(s) = skipped.next_if(|s| s.number < figure.number) {
            skipped_lines(s, &mut lines);
        }
        lines.push(format!(
            "{} {} ({}x{})",
            format_index(figure.number),
            figure.id,
            figure.image.width,
            figure.image.height
        ));
        if !figure.description.trim().is_empty() {
            lines.push(format!(
                "{}Description: {}",
                indent(1),
                truncate_desc(figure.description.trim(), 60)
            ));
        }
    }
    for s in skipped {
        skipped_lines(s, &mut lines);
    }

    for (format, plan) in plans {
        lines.push(String::new());
        let rows = plan.rows().count();
        match format {
            DocumentFormat::Pdf => {
                lines.push(format!(
                    "{format}: {}, {}",
                    plural(plan.pages.len(), "page"),
                    plural(rows, "row")
                ));
                let mut row_number = 0;
                for (i, page) in plan.pages.iter().enumerate() {
                    lines.push(format!("{}Page {}", indent(1), format_index(i + 1)));
                    for row in &page.rows {
                        row_number += 1;
                        lines.push(format!("{}{}", indent(2), row_line(row_number, row)));
                    }
                }
            }
            DocumentFormat::Docx => {
                lines.push(format!("{format}: {}", plural(rows, "row")));
                for (i, row) in plan.rows().enumerate() {
                    lines.push(format!("{}{}", indent(1), row_line(i + 1, row)));
                }
            }
        }
    }

    lines
}

pub fn print_plan_output(prepared: &PreparedReport, plans: &[(DocumentFormat, ReportPlan)]) {
    for line in format_plan_output(prepared, plans) {
        println!("{}", line);
    }
}

// ============================================================================
// Generate
// ============================================================================

pub fn format_generate_output(report: &GeneratedReport, paths: &[PathBuf]) -> Vec<String> {
    let mut lines = Vec::new();

    for (artifact, path) in report.artifacts.iter().zip(paths) {
        let mut line = format!("{} → {}", artifact.format, path.display());
        if let Some(pages) = artifact.pages {
            line.push_str(&format!(" ({})", plural(pages, "page")));
        }
        lines.push(line);
    }
    for s in &report.skipped {
        lines.push(format!("Skipped {} {}", format_index(s.number), s.id));
    }

    lines.push(String::new());
    let mut summary = format!(
        "Generated {}, {}",
        plural(report.artifacts.len(), "document"),
        plural(report.figures, "figure")
    );
    if !report.skipped.is_empty() {
        summary.push_str(&format!(", {} skipped", report.skipped.len()));
    }
    lines.push(summary);

    lines
}

pub fn print_generate_output(report: &GeneratedReport, paths: &[PathBuf]) {
    for line in format_generate_output(report, paths) {
        println!("{}", line);
    }
}
