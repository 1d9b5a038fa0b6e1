//! Human-readable and JSON renderings of the analysis results.
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── duplicados.json   # DuplicateReport + DateSummary
//! └── duplicados.txt    # the text printed by `analyze`
//! ```

use crate::models::{DateSummary, DuplicateReport};
use crate::outputs::json::write_pretty;
use crate::utils::shorten;
use serde::Serialize;
use std::error::Error;
use std::fmt::Write;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Locations listed per group in the text report.
const MAX_LISTED_OCCURRENCES: usize = 5;
/// Title characters shown in the text report.
const TITLE_PREVIEW_CHARS: usize = 80;

#[derive(Debug, Serialize)]
struct ReportFile<'a> {
    records: usize,
    dates: Option<&'a DateSummary>,
    duplicates: &'a DuplicateReport,
}

/// Render the date statistics and duplicate report as plain text.
pub fn render_text(records: usize, dates: Option<&DateSummary>, report: &DuplicateReport) -> String {
    let mut out = String::new();

    writeln!(out, "Records: {records}").unwrap();

    match dates {
        Some(dates) => {
            writeln!(out, "Oldest date: {}", dates.oldest).unwrap();
            writeln!(out, "Newest date: {}", dates.newest).unwrap();
            writeln!(out, "\nRecords per day:").unwrap();
            for (day, count) in &dates.per_day {
                writeln!(out, "  {day}: {count}").unwrap();
            }
        }
        None => writeln!(out, "No record carries a date").unwrap(),
    }

    writeln!(out, "\nDuplicate analysis:").unwrap();
    writeln!(out, "  Total titles: {}", report.total_titles).unwrap();
    writeln!(out, "  Unique titles: {}", report.unique_titles).unwrap();
    writeln!(out, "  Duplicates: {}", report.duplicates).unwrap();

    if report.groups.is_empty() {
        writeln!(out, "\nNo duplicate titles found").unwrap();
        return out;
    }

    writeln!(out, "\nDuplicate titles:").unwrap();
    for (i, group) in report.groups.iter().enumerate() {
        writeln!(
            out,
            "\n  {}. Title: '{}'",
            i + 1,
            shorten(&group.title, TITLE_PREVIEW_CHARS)
        )
        .unwrap();
        writeln!(out, "     Count: {}", group.count).unwrap();
        writeln!(out, "     Locations:").unwrap();
        for occurrence in group.occurrences.iter().take(MAX_LISTED_OCCURRENCES) {
            writeln!(out, "       - {occurrence}").unwrap();
        }
        if group.occurrences.len() > MAX_LISTED_OCCURRENCES {
            writeln!(
                out,
                "       - ... and {} more",
                group.occurrences.len() - MAX_LISTED_OCCURRENCES
            )
            .unwrap();
        }
    }
    out
}

/// Write `duplicados.json` and `duplicados.txt` into `dir`.
#[instrument(level = "info", skip_all, fields(dir = %dir.display()))]
pub async fn write_report(
    dir: &Path,
    records: usize,
    dates: Option<&DateSummary>,
    report: &DuplicateReport,
) -> Result<(), Box<dyn Error>> {
    let json_path = dir.join("duplicados.json");
    write_pretty(
        &json_path,
        &ReportFile {
            records,
            dates,
            duplicates: report,
        },
    )
    .await?;

    let text_path = dir.join("duplicados.txt");
    fs::write(&text_path, render_text(records, dates, report)).await?;

    info!(json = %json_path.display(), text = %text_path.display(), groups = report.groups.len(), "Wrote duplicate report");
    Ok(())
}
