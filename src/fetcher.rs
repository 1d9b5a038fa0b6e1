//! Fetch every page of a result set from an endpoint whose pagination
//! contract is not known.
//!
//! # Termination
//!
//! The API has been seen to report a `total` larger than what a single call
//! returns, and the page indicator has never been confirmed to work. No single
//! signal is trusted. After each page, in this order:
//!
//! 1. zero items returned: stop
//! 2. fewer items than the page size: stop (last page)
//! 3. accumulated count reached the reported total: stop
//!
//! Otherwise the page counter is incremented and the same query is sent again
//! with the page indicator. A configurable page cap bounds the loop.
//!
//! # Errors
//!
//! Failures are not retried. A [`FetchFailure`] carries the error together
//! with the records accumulated before the failing page.

use crate::api::{HttpGet, HttpResponse};
use crate::config::ApiConfig;
use crate::models::{AccumulatedResult, Query, Record, ResultPage};
use crate::utils::truncate_for_log;
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Error)]
pub enum FetchError {
    /// Network failure or a non-2xx status.
    #[error("transport error on page {page} for query {query}: {message}")]
    Transport {
        page: u32,
        query: String,
        message: String,
    },
    /// Body is not JSON or lacks the items array.
    #[error("malformed response on page {page} for query {query}: {message}")]
    MalformedResponse {
        page: u32,
        query: String,
        message: String,
    },
}

impl FetchError {
    pub fn page(&self) -> u32 {
        match self {
            FetchError::Transport { page, .. } | FetchError::MalformedResponse { page, .. } => {
                *page
            }
        }
    }
}

/// A failed fetch, with everything gathered before the failure.
#[derive(Debug)]
pub struct FetchFailure {
    pub error: FetchError,
    pub partial: Vec<Record>,
    /// Total from the first page, when that page arrived.
    pub reported_total: Option<u64>,
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} records fetched before the failure)",
            self.error,
            self.partial.len()
        )
    }
}

impl std::error::Error for FetchFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Why the pagination loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EmptyPage,
    ShortPage,
    ReachedTotal,
    PageCap,
}

impl StopReason {
    fn as_str(self) -> &'static str {
        match self {
            StopReason::EmptyPage => "empty page",
            StopReason::ShortPage => "short page",
            StopReason::ReachedTotal => "reached reported total",
            StopReason::PageCap => "page cap",
        }
    }
}

/// Decide whether to stop after a page, checking the signals in order.
pub fn stop_reason(
    page_len: usize,
    page_size: u32,
    accumulated: usize,
    reported_total: Option<u64>,
) -> Option<StopReason> {
    if page_len == 0 {
        return Some(StopReason::EmptyPage);
    }
    if page_len < page_size as usize {
        return Some(StopReason::ShortPage);
    }
    if let Some(total) = reported_total {
        if accumulated as u64 >= total {
            return Some(StopReason::ReachedTotal);
        }
    }
    None
}

/// Parse one response body into a [`ResultPage`].
///
/// Accepts an object holding `items_field` (array) and optionally
/// `total_field` (non-negative integer), or a bare array. Array elements that
/// are not objects are skipped with a warning.
pub fn parse_page(body: &str, items_field: &str, total_field: &str) -> Result<ResultPage, String> {
    let value: Value = serde_json::from_str(body).map_err(|e| {
        format!(
            "invalid JSON ({e}); body starts with {:?}",
            truncate_for_log(body, 200)
        )
    })?;

    let (items, total) = match value {
        Value::Array(items) => (items, None),
        Value::Object(mut map) => {
            let items = match map.remove(items_field) {
                Some(Value::Array(items)) => items,
                Some(other) => {
                    return Err(format!(
                        "field {items_field:?} is {}, expected an array",
                        json_kind(&other)
                    ));
                }
                None => {
                    let keys: Vec<&str> = map.keys().map(String::as_str).collect();
                    return Err(format!(
                        "missing array field {items_field:?}; keys present: {keys:?}"
                    ));
                }
            };
            let total = map.get(total_field).and_then(Value::as_u64);
            (items, total)
        }
        other => {
            return Err(format!(
                "expected a JSON object or array, got {}",
                json_kind(&other)
            ));
        }
    };

    let raw_len = items.len();
    let items: Vec<Record> = items.into_iter().filter_map(Record::from_value).collect();
    if items.len() != raw_len {
        warn!(
            skipped = raw_len - items.len(),
            "Skipped non-object entries in items array"
        );
    }

    Ok(ResultPage { items, total })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Pulls every page of a query through an [`HttpGet`] implementation.
#[derive(Debug)]
pub struct PageFetcher<C> {
    config: ApiConfig,
    client: C,
}

impl<C: HttpGet> PageFetcher<C> {
    pub fn new(config: ApiConfig, client: C) -> Self {
        Self { config, client }
    }

    /// Request a single page. `page` is 1-based; the indicator is only sent
    /// for pages after the first.
    #[instrument(level = "debug", skip(self, query))]
    async fn fetch_page(&self, query: &Query, page: u32) -> Result<ResultPage, FetchError> {
        let mut params = query.base_params(&self.config.limit_param);
        if page > 1 {
            params.push((self.config.page_param.clone(), page.to_string()));
        }

        let response: HttpResponse = self
            .client
            .get(&self.config.endpoint, &self.config.headers(), &params)
            .await
            .map_err(|e| FetchError::Transport {
                page,
                query: query.to_string(),
                message: e.to_string(),
            })?;

        if !response.is_success() {
            return Err(FetchError::Transport {
                page,
                query: query.to_string(),
                message: format!(
                    "HTTP status {}: {}",
                    response.status,
                    truncate_for_log(&response.body, 200)
                ),
            });
        }

        parse_page(
            &response.body,
            &self.config.items_field,
            &self.config.total_field,
        )
        .map_err(|message| FetchError::MalformedResponse {
            page,
            query: query.to_string(),
            message,
        })
    }

    /// Fetch every page of `query`, preserving server order.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchFailure`] on the first transport or parse error. Its
    /// `partial` field holds the records of the pages fetched before it.
    #[instrument(level = "info", skip_all, fields(query = %query))]
    pub async fn fetch_all(&self, query: &Query) -> Result<AccumulatedResult, FetchFailure> {
        let page_size = query.page_size();
        let mut records: Vec<Record> = Vec::new();
        let mut reported_total: Option<u64> = None;
        let mut page: u32 = 1;

        loop {
            let result = match self.fetch_page(query, page).await {
                Ok(result) => result,
                Err(error) => {
                    warn!(page, accumulated = records.len(), error = %error, "Fetch failed");
                    return Err(FetchFailure {
                        error,
                        partial: records,
                        reported_total,
                    });
                }
            };

            if page == 1 {
                reported_total = result.total;
                if let Some(total) = reported_total {
                    info!(total, "Server reported total");
                }
            } else if result.total.is_some() && result.total != reported_total {
                debug!(page, total = ?result.total, first = ?reported_total, "Reported total changed between pages");
            }

            let page_len = result.items.len();
            records.extend(result.items);
            info!(page, count = page_len, accumulated = records.len(), "Fetched page");

            let reason = stop_reason(page_len, page_size, records.len(), reported_total)
                .or_else(|| (page >= self.config.max_pages).then_some(StopReason::PageCap));

            if let Some(reason) = reason {
                let truncated = reason == StopReason::PageCap;
                if truncated {
                    warn!(
                        max_pages = self.config.max_pages,
                        accumulated = records.len(),
                        "Stopped at page cap; more data may be available"
                    );
                } else {
                    info!(pages = page, total = records.len(), reason = reason.as_str(), "Pagination finished");
                }
                return Ok(AccumulatedResult {
                    records,
                    pages_fetched: page,
                    reported_total,
                    truncated,
                });
            }

            page += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::TransportError;
    use crate::api::scripted::{ok, ScriptedClient};
    use chrono::NaiveDate;
    use serde_json::json;

    fn items(range: std::ops::Range<usize>) -> Vec<Value> {
        range
            .map(|i| json!({ "id": i, "titulo": format!("Nota {i}") }))
            .collect()
    }

    fn query(page_size: u32) -> Query {
        Query::new(
            ["aduanas", "ley"],
            NaiveDate::from_ymd_opt(2025, 10, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 10, 22).unwrap(),
            page_size,
        )
        .unwrap()
    }

    fn fetcher(client: &ScriptedClient) -> PageFetcher<&ScriptedClient> {
        PageFetcher::new(ApiConfig::default(), client)
    }

    #[test]
    fn test_stop_reason_order() {
        assert_eq!(stop_reason(0, 10, 0, Some(5)), Some(StopReason::EmptyPage));
        assert_eq!(stop_reason(3, 10, 3, Some(3)), Some(StopReason::ShortPage));
        assert_eq!(stop_reason(10, 10, 20, Some(20)), Some(StopReason::ReachedTotal));
        assert_eq!(stop_reason(10, 10, 20, Some(21)), None);
        assert_eq!(stop_reason(10, 10, 20, None), None);
    }

    #[test]
    fn test_parse_page_object_with_total() {
        let body = json!({ "success": true, "total": 750, "notas": items(0..2) }).to_string();
        let page = parse_page(&body, "notas", "total").unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total, Some(750));
    }

    #[test]
    fn test_parse_page_bare_array() {
        let body = Value::Array(items(0..3)).to_string();
        let page = parse_page(&body, "notas", "total").unwrap();
        assert_eq!(page.items.len(), 3);
        assert_eq!(page.total, None);
    }

    #[test]
    fn test_parse_page_ignores_non_numeric_total() {
        let body = json!({ "total": "many", "notas": [] }).to_string();
        assert_eq!(parse_page(&body, "notas", "total").unwrap().total, None);
    }

    #[test]
    fn test_parse_page_missing_items_field() {
        let body = json!({ "data": [] }).to_string();
        let err = parse_page(&body, "notas", "total").unwrap_err();
        assert!(err.contains("notas"));
        assert!(err.contains("data"));
    }

    #[test]
    fn test_parse_page_invalid_json() {
        assert!(parse_page("<html>oops</html>", "notas", "total").is_err());
    }

    #[tokio::test]
    async fn test_short_first_page_issues_one_request() {
        let client = ScriptedClient::new(vec![ok(json!({ "notas": items(0..3) }))]);

        let result = fetcher(&client).fetch_all(&query(500)).await.unwrap();

        assert_eq!(client.request_count(), 1);
        assert_eq!(result.len(), 3);
        assert_eq!(result.pages_fetched, 1);
        assert_eq!(result.reported_total, None);
        assert!(!result.truncated);
    }

    #[tokio::test]
    async fn test_two_pages_until_reported_total() {
        let client = ScriptedClient::new(vec![
            ok(json!({ "total": 750, "notas": items(0..500) })),
            ok(json!({ "total": 750, "notas": items(500..750) })),
        ]);

        let result = fetcher(&client).fetch_all(&query(500)).await.unwrap();

        assert_eq!(client.request_count(), 2);
        assert_eq!(result.len(), 750);
        assert_eq!(result.reported_total, Some(750));
        let ids: Vec<String> = result.records.iter().filter_map(|r| r.id.clone()).collect();
        let expected: Vec<String> = (0..750).map(|i| i.to_string()).collect();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn test_full_pages_stop_when_total_reached() {
        let client = ScriptedClient::new(vec![
            ok(json!({ "total": 4, "notas": items(0..2) })),
            ok(json!({ "total": 4, "notas": items(2..4) })),
        ]);

        let result = fetcher(&client).fetch_all(&query(2)).await.unwrap();

        assert_eq!(client.request_count(), 2);
        assert_eq!(result.len(), 4);
        assert_eq!(result.pages_fetched, 2);
        assert!(!result.truncated);
    }

    #[tokio::test]
    async fn test_page_indicator_only_after_first_request() {
        let client = ScriptedClient::new(vec![
            ok(json!({ "notas": items(0..2) })),
            ok(json!({ "notas": items(2..4) })),
            ok(json!({ "notas": [] })),
        ]);

        let result = fetcher(&client).fetch_all(&query(2)).await.unwrap();

        assert_eq!(client.request_count(), 3);
        assert_eq!(result.len(), 4);
        assert_eq!(client.param(0, "page"), None);
        assert_eq!(client.param(1, "page").as_deref(), Some("2"));
        assert_eq!(client.param(2, "page").as_deref(), Some("3"));
        assert_eq!(client.param(0, "limit").as_deref(), Some("2"));
        assert_eq!(client.param(2, "fechaFin").as_deref(), Some("2025-10-22"));
    }

    #[tokio::test]
    async fn test_full_pages_without_total_stop_on_empty_page() {
        let client = ScriptedClient::new(vec![
            ok(json!({ "notas": items(0..5) })),
            ok(json!({ "notas": items(5..10) })),
            ok(json!({ "notas": [] })),
        ]);

        let result = fetcher(&client).fetch_all(&query(5)).await.unwrap();

        assert_eq!(client.request_count(), 3);
        assert_eq!(result.len(), 10);
        assert_eq!(result.pages_fetched, 3);
    }

    #[tokio::test]
    async fn test_page_cap_marks_result_truncated() {
        let client = ScriptedClient::new(vec![
            ok(json!({ "notas": items(0..2) })),
            ok(json!({ "notas": items(2..4) })),
            ok(json!({ "notas": items(4..6) })),
        ]);
        let config = ApiConfig {
            max_pages: 2,
            ..ApiConfig::default()
        };

        let result = PageFetcher::new(config, &client)
            .fetch_all(&query(2))
            .await
            .unwrap();

        assert_eq!(client.request_count(), 2);
        assert_eq!(result.len(), 4);
        assert!(result.truncated);
    }

    #[tokio::test]
    async fn test_fetch_is_repeatable_with_fixed_responses() {
        let script = || {
            ScriptedClient::new(vec![
                ok(json!({ "total": 3, "notas": items(0..2) })),
                ok(json!({ "total": 3, "notas": items(2..3) })),
            ])
        };
        let (first, second) = (script(), script());

        let a = fetcher(&first).fetch_all(&query(2)).await.unwrap();
        let b = fetcher(&second).fetch_all(&query(2)).await.unwrap();

        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_error_status_keeps_partial_results() {
        let client = ScriptedClient::new(vec![
            ok(json!({ "notas": items(0..2) })),
            Ok(HttpResponse {
                status: 500,
                body: "boom".to_string(),
            }),
        ]);

        let failure = fetcher(&client).fetch_all(&query(2)).await.unwrap_err();

        assert!(matches!(failure.error, FetchError::Transport { page: 2, .. }));
        assert_eq!(failure.partial.len(), 2);
        assert_eq!(failure.reported_total, None);
        assert!(failure.to_string().contains("500"));
    }

    #[tokio::test]
    async fn test_failure_keeps_first_page_total() {
        let client = ScriptedClient::new(vec![
            ok(json!({ "total": 9, "notas": items(0..3) })),
            Err(TransportError("timed out".to_string())),
        ]);

        let failure = fetcher(&client).fetch_all(&query(3)).await.unwrap_err();

        assert_eq!(failure.error.page(), 2);
        assert_eq!(failure.partial.len(), 3);
        assert_eq!(failure.reported_total, Some(9));
    }

    #[tokio::test]
    async fn test_transport_failure_on_first_page() {
        let client = ScriptedClient::new(vec![Err(TransportError("connection reset".to_string()))]);

        let failure = fetcher(&client).fetch_all(&query(10)).await.unwrap_err();

        assert_eq!(failure.error.page(), 1);
        assert!(failure.partial.is_empty());
        assert!(failure.error.to_string().contains("aduanas, ley"));
    }

    #[tokio::test]
    async fn test_malformed_body_is_reported() {
        let client = ScriptedClient::new(vec![ok(json!({ "error": "bad token" }))]);

        let failure = fetcher(&client).fetch_all(&query(10)).await.unwrap_err();

        assert!(matches!(
            failure.error,
            FetchError::MalformedResponse { page: 1, .. }
        ));
    }

    #[tokio::test]
    async fn test_fetch_all_against_http_server() {
        use crate::api::ReqwestClient;
        use httpmock::prelude::*;
        use std::time::Duration;

        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/notas-api/notas")
                    .header("Authorization", "Bearer t0k3n")
                    .query_param("palabras", "aduanas, ley")
                    .query_param("fechaInicio", "2025-10-01")
                    .query_param("limit", "500");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({ "success": true, "total": 3, "notas": items(0..3) }));
            })
            .await;

        let config = ApiConfig {
            endpoint: server.url("/notas-api/notas"),
            token: Some("t0k3n".to_string()),
            ..ApiConfig::default()
        };
        let client = ReqwestClient::new(Duration::from_secs(5)).unwrap();

        let result = PageFetcher::new(config, client)
            .fetch_all(&query(500))
            .await
            .unwrap();

        mock.assert_hits_async(1).await;
        assert_eq!(result.len(), 3);
        assert_eq!(result.records[0].title.as_deref(), Some("Nota 0"));
    }
}
