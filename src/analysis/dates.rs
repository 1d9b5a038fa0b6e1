//! Publication date statistics.

use crate::models::{DateSummary, Record};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use itertools::Itertools;
use std::collections::BTreeMap;

/// A record date, parsed when possible.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RecordDate {
    Parsed(NaiveDateTime),
    Raw(String),
}

impl RecordDate {
    fn day(&self) -> String {
        match self {
            RecordDate::Parsed(dt) => dt.format("%Y-%m-%d").to_string(),
            RecordDate::Raw(s) => s.chars().take(10).collect(),
        }
    }
}

fn display(dt: &NaiveDateTime) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Parse RFC 3339 (`Z` or an offset), a naive `YYYY-MM-DDTHH:MM:SS`, or a
/// plain `YYYY-MM-DD`. Offset timestamps keep their own wall-clock time, so
/// they count under the calendar day they were written with.
fn parse_date(raw: &str) -> RecordDate {
    let trimmed = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return RecordDate::Parsed(dt.naive_local());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return RecordDate::Parsed(dt);
        }
    }
    if let Some(dt) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return RecordDate::Parsed(dt);
    }
    RecordDate::Raw(raw.to_string())
}

/// Oldest and newest publication date plus per-day counts.
///
/// Returns `None` when no record carries a date. Dates that cannot be parsed
/// are bucketed under their first ten characters; they only decide the
/// oldest/newest pick when no date parses at all.
pub fn date_summary(records: &[Record]) -> Option<DateSummary> {
    let dates: Vec<RecordDate> = records
        .iter()
        .filter_map(|r| r.date.as_deref())
        .map(parse_date)
        .collect();

    if dates.is_empty() {
        return None;
    }

    let parsed = dates.iter().filter_map(|d| match d {
        RecordDate::Parsed(dt) => Some(dt),
        RecordDate::Raw(_) => None,
    });
    let (oldest, newest) = match parsed.minmax().into_option() {
        Some((min, max)) => (display(min), display(max)),
        None => {
            let raw = dates.iter().filter_map(|d| match d {
                RecordDate::Raw(s) => Some(s),
                RecordDate::Parsed(_) => None,
            });
            let (min, max) = raw.minmax().into_option()?;
            (min.clone(), max.clone())
        }
    };

    let per_day: BTreeMap<String, usize> = dates.iter().map(RecordDate::day).counts().into_iter().collect();

    Some(DateSummary {
        oldest,
        newest,
        per_day,
    })
}
