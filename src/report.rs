//! Console rendering of a [`ComparisonReport`].

use std::fmt::Write as _;

use crossterm::style::Stylize;

use crate::compare::{Cell, ComparisonEntry, ComparisonReport};

/// Renders the report as text, one block per query.
///
/// Colors are ANSI escapes from crossterm: green for a backend that answered,
/// red for one that failed, dim for one that was skipped.
pub fn render(report: &ComparisonReport, color: bool) -> String {
    let mut out = String::new();
    for entry in &report.entries {
        render_entry(&mut out, entry, color);
        out.push('\n');
    }

    let failures = report.failure_count();
    if failures > 0 {
        let summary = format!("{failures} backend queries failed");
        let _ = writeln!(out, "{}", paint(&summary, color, Tone::Failure));
    }
    out
}

fn render_entry(out: &mut String, entry: &ComparisonEntry, color: bool) {
    let heading = if color {
        entry.description.as_str().bold().to_string()
    } else {
        entry.description.clone()
    };
    let _ = writeln!(out, "{heading}");

    let width = entry
        .cells
        .iter()
        .map(|c| c.backend().display_name().len())
        .max()
        .unwrap_or(0);

    for cell in &entry.cells {
        let name = format!("{:width$}", cell.backend().display_name());
        let line = match cell {
            Cell::Ran(outcome) => {
                let timing = format!(
                    "time = {:.4}s, rows = {}",
                    outcome.elapsed_seconds(),
                    outcome.rows().len()
                );
                match &outcome.error {
                    None => paint(&timing, color, Tone::Success),
                    Some(error) => format!(
                        "{} {}",
                        paint(&timing, color, Tone::Failure),
                        paint(&format!("({error})"), color, Tone::Failure)
                    ),
                }
            }
            Cell::Skipped(_) => paint("skipped (not connected)", color, Tone::Muted),
        };
        let _ = writeln!(out, "  {name}  {line}");
    }

    match entry.rows_agree() {
        Some(true) => {
            let _ = writeln!(out, "  {}", paint("results match", color, Tone::Success));
        }
        Some(false) => {
            let _ = writeln!(out, "  {}", paint("results differ", color, Tone::Warning));
        }
        None => {}
    }
}

#[derive(Clone, Copy)]
enum Tone {
    Success,
    Failure,
    Warning,
    Muted,
}

fn paint(text: &str, color: bool, tone: Tone) -> String {
    if !color {
        return text.to_string();
    }
    match tone {
        Tone::Success => text.green().to_string(),
        Tone::Failure => text.red().to_string(),
        Tone::Warning => text.yellow().to_string(),
        Tone::Muted => text.dim().to_string(),
    }
}
