//! Title-based duplicate detection.
//!
//! Titles are compared exactly: case-sensitive, no trimming. Records without
//! a title are left out of every count.

use crate::models::{DuplicateGroup, DuplicateReport, Occurrence, Record};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Group `records` by title and return the titles seen more than once.
///
/// Groups are ordered by count, highest first; equal counts keep the order in
/// which each title was first encountered. Occurrence positions are 1-based
/// indexes into `records`.
pub fn analyze(records: &[Record]) -> Vec<DuplicateGroup> {
    let mut slot_of: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<DuplicateGroup> = Vec::new();

    for (index, record) in records.iter().enumerate() {
        let Some(title) = record.title.as_deref() else {
            continue;
        };

        let slot = *slot_of.entry(title).or_insert_with(|| {
            groups.push(DuplicateGroup {
                title: title.to_string(),
                count: 0,
                occurrences: Vec::new(),
            });
            groups.len() - 1
        });

        let group = &mut groups[slot];
        group.count += 1;
        group.occurrences.push(Occurrence {
            position: index + 1,
            date: record.date.clone(),
            source: record.program.clone().or_else(|| record.source.clone()),
        });
    }

    groups.retain(|g| g.count > 1);
    // stable: ties stay in first-encounter order
    groups.sort_by(|a, b| b.count.cmp(&a.count));
    groups
}

/// Run [`analyze`] and add the summary counts.
pub fn summarize(records: &[Record]) -> DuplicateReport {
    let titles: Vec<&str> = records.iter().filter_map(|r| r.title.as_deref()).collect();
    let total_titles = titles.len();
    let unique_titles = titles.iter().collect::<HashSet<_>>().len();
    let groups = analyze(records);

    debug!(
        total_titles,
        unique_titles,
        groups = groups.len(),
        "Duplicate analysis complete"
    );
    DuplicateReport {
        total_titles,
        unique_titles,
        duplicates: total_titles - unique_titles,
        groups,
    }
}
