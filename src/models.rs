//! Data models for queries, news records and analysis results.
//!
//! This module defines the core data structures used throughout the application:
//! - [`Query`]: The immutable search parameters of one download
//! - [`Record`]: One news item, with its aliased fields resolved at parse time
//! - [`ResultPage`]: The records returned by a single API response
//! - [`AccumulatedResult`]: Every record gathered across pages for one query
//! - Analysis types: [`DuplicateGroup`], [`Occurrence`], [`DuplicateReport`], [`DateSummary`]

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Marker rendered in place of a missing date or source.
pub const MISSING: &str = "missing";

/// Reasons a [`Query`] cannot be built.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("start date {start} is after end date {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
    #[error("page size must be greater than zero")]
    ZeroPageSize,
    #[error("at least one keyword is required")]
    NoKeywords,
}

/// The search parameters defining a fetch.
///
/// Dates are inclusive on both ends. Once built a query never changes; the
/// page indicator is owned by the fetch loop, not by the query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    keywords: Vec<String>,
    start_date: NaiveDate,
    end_date: NaiveDate,
    page_size: u32,
}

impl Query {
    /// Build a query, rejecting an inverted date range, a zero page size and
    /// a keyword list that is empty after trimming.
    pub fn new<I, S>(
        keywords: I,
        start_date: NaiveDate,
        end_date: NaiveDate,
        page_size: u32,
    ) -> Result<Self, QueryError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords: Vec<String> = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();

        if keywords.is_empty() {
            return Err(QueryError::NoKeywords);
        }
        if start_date > end_date {
            return Err(QueryError::InvalidRange {
                start: start_date,
                end: end_date,
            });
        }
        if page_size == 0 {
            return Err(QueryError::ZeroPageSize);
        }

        Ok(Self {
            keywords,
            start_date,
            end_date,
            page_size,
        })
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Keywords as the API expects them: a single comma-joined string.
    pub fn joined_keywords(&self) -> String {
        self.keywords.join(", ")
    }

    /// Keyword and date parameters, without any paging parameter.
    pub fn filter_params(&self) -> Vec<(String, String)> {
        vec![
            ("palabras".to_string(), self.joined_keywords()),
            (
                "fechaInicio".to_string(),
                self.start_date.format("%Y-%m-%d").to_string(),
            ),
            (
                "fechaFin".to_string(),
                self.end_date.format("%Y-%m-%d").to_string(),
            ),
        ]
    }

    /// Query parameters shared by every page request, in a stable order.
    ///
    /// `limit_param` names the page size parameter; the page indicator is
    /// appended by the fetcher.
    pub fn base_params(&self, limit_param: &str) -> Vec<(String, String)> {
        let mut params = self.filter_params();
        params.push((limit_param.to_string(), self.page_size.to_string()));
        params
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}..{} (page size {})",
            self.joined_keywords(),
            self.start_date,
            self.end_date,
            self.page_size
        )
    }
}

/// One news item returned by the API.
///
/// The raw JSON object is kept as-is and is what gets serialized back out.
/// The fields the application reads are resolved once, when the record is
/// built, using these aliases in order:
///
/// | Field | Keys |
/// |-------|------|
/// | `title` | `titulo`, `title` |
/// | `date` | `fecha`, `date` |
/// | `source` | `fuente`, `source` |
/// | `program` | `nombre_programa` |
/// | `content` | `contenido`, `content` |
/// | `summary` | `resumen`, `summary` |
/// | `id` | `id` (string or number) |
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    raw: Map<String, Value>,
    pub title: Option<String>,
    pub date: Option<String>,
    pub source: Option<String>,
    pub program: Option<String>,
    pub content: Option<String>,
    pub summary: Option<String>,
    pub id: Option<String>,
}

impl Record {
    /// Build a record from one element of the items array.
    ///
    /// Returns `None` when the element is not a JSON object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(raw) => Some(Self::from_map(raw)),
            _ => None,
        }
    }

    pub fn from_map(raw: Map<String, Value>) -> Self {
        let text = |keys: &[&str]| -> Option<String> {
            keys.iter()
                .find_map(|k| raw.get(*k).and_then(Value::as_str).map(str::to_string))
        };

        let id = match raw.get("id") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };

        Self {
            title: text(&["titulo", "title"]),
            date: text(&["fecha", "date"]),
            source: text(&["fuente", "source"]),
            program: text(&["nombre_programa"]),
            content: text(&["contenido", "content"]),
            summary: text(&["resumen", "summary"]),
            id,
            raw,
        }
    }
}

impl Serialize for Record {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Map::<String, Value>::deserialize(deserializer).map(Self::from_map)
    }
}

/// The records of one API response.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultPage {
    pub items: Vec<Record>,
    /// Total reported by the server, when the response carries one.
    pub total: Option<u64>,
}

/// Every record fetched for one query, in server order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccumulatedResult {
    pub records: Vec<Record>,
    /// Number of requests issued.
    pub pages_fetched: u32,
    /// Total reported by the first page, if any.
    pub reported_total: Option<u64>,
    /// Set when the loop stopped at the page cap instead of an end-of-data signal.
    pub truncated: bool,
}

impl AccumulatedResult {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Where one copy of a duplicated title appeared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    /// 1-based position in the analysed sequence.
    pub position: usize,
    pub date: Option<String>,
    pub source: Option<String>,
}

impl fmt::Display for Occurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Position {} - {} - {}",
            self.position,
            self.date.as_deref().unwrap_or(MISSING),
            self.source.as_deref().unwrap_or(MISSING)
        )
    }
}

/// A title shared by more than one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub title: String,
    pub count: usize,
    pub occurrences: Vec<Occurrence>,
}

/// Summary counts plus the duplicate groups of one analysis run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateReport {
    /// Records that carry a title.
    pub total_titles: usize,
    pub unique_titles: usize,
    /// `total_titles - unique_titles`.
    pub duplicates: usize,
    pub groups: Vec<DuplicateGroup>,
}

/// Publication date spread of a set of records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateSummary {
    pub oldest: String,
    pub newest: String,
    /// Record count keyed by `YYYY-MM-DD`, ascending.
    pub per_day: BTreeMap<String, usize>,
}
