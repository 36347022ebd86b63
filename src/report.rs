//! Result aggregation and rendering.
//!
//! Whatever the format, the process exit code comes from [`exit_code`]: zero
//! iff every result passed (and therefore zero for an empty run).

use serde::Serialize;
use unicode_width::UnicodeWidthStr;

use crate::format::OutputFormat;
use crate::runner::ScenarioResult;

const PASS: &str = "✅ PASS";
const FAIL: &str = "❌ FAIL";

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const BOLD_GREEN: &str = "\x1b[1;32m";
const BOLD_RED: &str = "\x1b[1;31m";
const BOLD: &str = "\x1b[1m";
const CYAN: &str = "\x1b[36m";
const DIM: &str = "\x1b[90m";
const RESET: &str = "\x1b[0m";

/// Pass/fail counts for a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

impl RunSummary {
    #[must_use]
    pub fn from_results(results: &[ScenarioResult]) -> Self {
        let passed = results.iter().filter(|r| r.passed).count();
        Self {
            total: results.len(),
            passed,
            failed: results.len() - passed,
        }
    }

    #[must_use]
    pub const fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

/// Process exit code for a run: 0 iff every scenario passed.
#[must_use]
pub fn exit_code(results: &[ScenarioResult]) -> u8 {
    u8::from(!RunSummary::from_results(results).all_passed())
}

/// Render `results` in the requested format.
///
/// # Errors
/// Returns the serialization error if JSON encoding fails.
pub fn render(
    results: &[ScenarioResult],
    format: OutputFormat,
    color: bool,
) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(results),
        OutputFormat::Table => Ok(render_table(results, color)),
    }
}

#[derive(Clone, Copy)]
enum Align {
    Left,
    Right,
}

fn pad(text: &str, width: usize, align: Align) -> String {
    let fill = " ".repeat(width.saturating_sub(text.width()));
    match align {
        Align::Left => format!("{text}{fill}"),
        Align::Right => format!("{fill}{text}"),
    }
}

fn paint(text: &str, style: &str, color: bool) -> String {
    if color {
        format!("{style}{text}{RESET}")
    } else {
        text.to_owned()
    }
}

/// Tabular summary followed by the pass/fail line and, on failure, the list of
/// failed scenarios with their reasons.
#[must_use]
pub fn render_table(results: &[ScenarioResult], color: bool) -> String {
    const HEADERS: [&str; 4] = ["Scenario", "Status", "Duration", "Description"];

    let rows: Vec<[String; 4]> = results
        .iter()
        .map(|r| {
            [
                r.name.clone(),
                (if r.passed { PASS } else { FAIL }).to_owned(),
                format!("{:.1}s", r.duration_seconds),
                r.description.clone(),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(UnicodeWidthStr::width);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.width());
        }
    }
    let aligns = [Align::Left, Align::Left, Align::Right, Align::Left];

    let mut lines = Vec::new();
    lines.push(paint("Evaluation Results", BOLD, color));
    let header: Vec<String> = HEADERS
        .iter()
        .zip(widths)
        .zip(aligns)
        .map(|((h, w), a)| pad(h, w, a))
        .collect();
    lines.push(paint(header.join("  ").trim_end(), BOLD, color));
    let rule: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
    lines.push(rule.join("  "));

    for (row, result) in rows.iter().zip(results) {
        let status_style = if result.passed { GREEN } else { RED };
        let cells = [
            paint(&pad(&row[0], widths[0], aligns[0]), CYAN, color),
            paint(&pad(&row[1], widths[1], aligns[1]), status_style, color),
            pad(&row[2], widths[2], aligns[2]),
            paint(&row[3], DIM, color),
        ];
        lines.push(cells.join("  ").trim_end().to_owned());
    }

    let summary = RunSummary::from_results(results);
    lines.push(String::new());
    if summary.all_passed() {
        lines.push(paint(
            &format!("✅ All {} scenario(s) passed!", summary.total),
            BOLD_GREEN,
            color,
        ));
    } else {
        lines.push(paint(
            &format!("❌ {} of {} scenario(s) failed", summary.failed, summary.total),
            BOLD_RED,
            color,
        ));
        lines.push(String::new());
        lines.push(paint("Failed scenarios:", BOLD, color));
        for result in results.iter().filter(|r| !r.passed) {
            lines.push(format!("  • {}: {}", result.name, result.failure_reason()));
            if !result.validation_output.is_empty() {
                for line in result.validation_output.trim_end().lines() {
                    lines.push(format!("    {line}"));
                }
            }
        }
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}
