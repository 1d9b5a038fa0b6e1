//! Compare pagination parameter conventions against the live endpoint.
//!
//! The endpoint's paging contract is undocumented. A scan sends the first
//! request of a query once per candidate parameter set and records what came
//! back, so the conventions the server honours can be read off the results:
//! a set whose first record differs from the plain `limit` request at the
//! same size is moving through the result set.
//!
//! Requests are sent one at a time. A failed request is recorded and the scan
//! moves on to the next set.

use crate::api::HttpGet;
use crate::config::ApiConfig;
use crate::fetcher::parse_page;
use crate::models::{Query, MISSING};
use crate::utils::{shorten, truncate_for_log};
use std::fmt::{self, Write as _};
use tracing::{info, instrument, warn};

/// Page sizes scanned when none are given.
pub const DEFAULT_SIZES: [u32; 4] = [10, 25, 50, 100];

/// Paging parameters appended to the keyword/date filters for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSet(pub Vec<(String, String)>);

impl ParamSet {
    fn of(pairs: &[(&str, u32)]) -> Self {
        Self(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

impl fmt::Display for ParamSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<String> = self.0.iter().map(|(k, v)| format!("{k}={v}")).collect();
        write!(f, "{}", joined.join("&"))
    }
}

/// Candidate parameter sets for one page size.
///
/// The first set is the plain `limit` request the others are compared with.
pub fn candidate_sets(size: u32) -> Vec<ParamSet> {
    vec![
        ParamSet::of(&[("limit", size)]),
        ParamSet::of(&[("limit", size), ("page", 1)]),
        ParamSet::of(&[("limit", size), ("page", 2)]),
        ParamSet::of(&[("limit", size), ("offset", 0)]),
        ParamSet::of(&[("limit", size), ("offset", size)]),
        ParamSet::of(&[("limit", size), ("skip", 0)]),
        ParamSet::of(&[("limit", size), ("skip", size)]),
        ParamSet::of(&[("limit", size), ("start", 0)]),
        ParamSet::of(&[("pageSize", size)]),
        ParamSet::of(&[("pageSize", size), ("page", 1)]),
        ParamSet::of(&[("pageSize", size), ("page", 2)]),
        ParamSet::of(&[("size", size)]),
        ParamSet::of(&[("size", size), ("page", 1)]),
    ]
}

/// What one request returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// A parseable page.
    Page {
        count: usize,
        total: Option<u64>,
        first_id: Option<String>,
        first_title: Option<String>,
    },
    /// A non-2xx status.
    Status { status: u16, body: String },
    /// A 2xx body that is not a page.
    Malformed(String),
    /// The request did not complete.
    Transport(String),
}

/// One scanned parameter set and its outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    pub page_size: u32,
    pub params: ParamSet,
    pub outcome: ScanOutcome,
}

impl ScanResult {
    pub fn count(&self) -> Option<usize> {
        match &self.outcome {
            ScanOutcome::Page { count, .. } => Some(*count),
            _ => None,
        }
    }

    fn first_id(&self) -> Option<&str> {
        match &self.outcome {
            ScanOutcome::Page { first_id, .. } => first_id.as_deref(),
            _ => None,
        }
    }
}

/// Sets whose first record differs from the plain `limit` request of the
/// same page size.
pub fn shifting_sets(results: &[ScanResult]) -> Vec<&ScanResult> {
    results
        .iter()
        .filter(|r| {
            let Some(first) = r.first_id() else {
                return false;
            };
            results
                .iter()
                .find(|b| b.page_size == r.page_size)
                .and_then(ScanResult::first_id)
                .is_some_and(|baseline| baseline != first)
        })
        .collect()
}

/// Sends one request per candidate parameter set through an [`HttpGet`].
#[derive(Debug)]
pub struct ParamScanner<C> {
    config: ApiConfig,
    client: C,
}

impl<C: HttpGet> ParamScanner<C> {
    pub fn new(config: ApiConfig, client: C) -> Self {
        Self { config, client }
    }

    async fn scan_one(&self, query: &Query, set: &ParamSet) -> ScanOutcome {
        let mut params = query.filter_params();
        params.extend(set.0.iter().cloned());

        let response = match self
            .client
            .get(&self.config.endpoint, &self.config.headers(), &params)
            .await
        {
            Ok(response) => response,
            Err(e) => return ScanOutcome::Transport(e.to_string()),
        };
        if !response.is_success() {
            return ScanOutcome::Status {
                status: response.status,
                body: truncate_for_log(&response.body, 200),
            };
        }

        match parse_page(
            &response.body,
            &self.config.items_field,
            &self.config.total_field,
        ) {
            Ok(page) => {
                let first = page.items.first();
                ScanOutcome::Page {
                    count: page.items.len(),
                    total: page.total,
                    first_id: first.and_then(|r| r.id.clone()),
                    first_title: first.and_then(|r| r.title.clone()),
                }
            }
            Err(message) => ScanOutcome::Malformed(message),
        }
    }

    /// Scan every candidate set at each of `sizes`, in order.
    #[instrument(level = "info", skip_all, fields(query = %query))]
    pub async fn scan(&self, query: &Query, sizes: &[u32]) -> Vec<ScanResult> {
        let mut results = Vec::new();

        for &page_size in sizes {
            for params in candidate_sets(page_size) {
                let outcome = self.scan_one(query, &params).await;
                match &outcome {
                    ScanOutcome::Page { count, total, .. } => {
                        info!(page_size, params = %params, count, total = ?total, "Scanned")
                    }
                    ScanOutcome::Status { status, .. } => {
                        warn!(page_size, params = %params, status, "Scan request rejected")
                    }
                    ScanOutcome::Malformed(message) | ScanOutcome::Transport(message) => {
                        warn!(page_size, params = %params, error = %message, "Scan request failed")
                    }
                }
                results.push(ScanResult {
                    page_size,
                    params,
                    outcome,
                });
            }
        }

        info!(
            requests = results.len(),
            with_records = results.iter().filter(|r| r.count().is_some_and(|c| c > 0)).count(),
            shifting = shifting_sets(&results).len(),
            "Scan complete"
        );
        results
    }
}

/// Render scan results as a plain-text table.
pub fn render_scan(results: &[ScanResult]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "PAGINATION PARAMETER SCAN");
    let _ = writeln!(out, "{}", "=".repeat(60));

    let mut current_size = None;
    for result in results {
        if current_size != Some(result.page_size) {
            current_size = Some(result.page_size);
            let _ = writeln!(out, "\nPage size {}", result.page_size);
        }
        let line = match &result.outcome {
            ScanOutcome::Page {
                count,
                total,
                first_title,
                ..
            } => format!(
                "{count} records | total {} | first: {}",
                total.map_or_else(|| MISSING.to_string(), |t| t.to_string()),
                shorten(first_title.as_deref().unwrap_or(MISSING), 50)
            ),
            ScanOutcome::Status { status, body } if body.is_empty() => format!("HTTP {status}"),
            ScanOutcome::Status { status, body } => format!("HTTP {status}: {}", shorten(body, 40)),
            ScanOutcome::Malformed(message) => format!("malformed: {}", shorten(message, 60)),
            ScanOutcome::Transport(message) => format!("error: {}", shorten(message, 60)),
        };
        let _ = writeln!(out, "  {:<28} -> {line}", result.params.to_string());
    }

    let shifting = shifting_sets(results);
    let _ = writeln!(out, "\nSets returning a different first record than `limit` alone:");
    if shifting.is_empty() {
        let _ = writeln!(out, "  none");
    }
    for result in shifting {
        let _ = writeln!(out, "  {}", result.params);
    }
    out
}
