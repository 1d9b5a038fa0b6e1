//! The combined download file and loading saved results back.
//!
//! # Output Structure
//!
//! ```text
//! documentos_noticias_20251022_090503/
//! └── todas_las_noticias.json
//! ```
//!
//! ```json
//! {
//!   "total": 750,
//!   "fecha_descarga": "2025-10-22T09:05:03.123456-06:00",
//!   "parametros_busqueda": { "palabras": "...", "fechaInicio": "...", "fechaFin": "...", "limit": 500 },
//!   "paginas_descargadas": 2,
//!   "total_reportado": 750,
//!   "truncado": false,
//!   "noticias": [ ... ]
//! }
//! ```

use crate::models::{AccumulatedResult, Query, Record, MISSING};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument};

pub const COMBINED_FILENAME: &str = "todas_las_noticias.json";

/// Search parameters as recorded in the combined file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParams {
    pub palabras: String,
    #[serde(rename = "fechaInicio")]
    pub fecha_inicio: String,
    #[serde(rename = "fechaFin")]
    pub fecha_fin: String,
    pub limit: u32,
}

impl From<&Query> for SearchParams {
    fn from(query: &Query) -> Self {
        Self {
            palabras: query.joined_keywords(),
            fecha_inicio: query.start_date().format("%Y-%m-%d").to_string(),
            fecha_fin: query.end_date().format("%Y-%m-%d").to_string(),
            limit: query.page_size(),
        }
    }
}

/// Shape of `todas_las_noticias.json`.
#[derive(Debug, Serialize)]
pub struct DownloadFile<'a> {
    pub total: usize,
    pub fecha_descarga: String,
    pub parametros_busqueda: SearchParams,
    pub paginas_descargadas: u32,
    pub total_reportado: Option<u64>,
    pub truncado: bool,
    pub noticias: &'a [Record],
}

impl<'a> DownloadFile<'a> {
    pub fn new(query: &Query, result: &'a AccumulatedResult, downloaded_at: DateTime<Local>) -> Self {
        Self {
            total: result.len(),
            fecha_descarga: downloaded_at.to_rfc3339(),
            parametros_busqueda: SearchParams::from(query),
            paginas_descargadas: result.pages_fetched,
            total_reportado: result.reported_total,
            truncado: result.truncated,
            noticias: &result.records,
        }
    }
}

/// Serialize `value` as pretty JSON into `path`.
pub async fn write_pretty<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).await?;
    Ok(())
}

/// Write the combined file into `dir` and return its path.
#[instrument(level = "info", skip_all, fields(dir = %dir.display(), count = result.len()))]
pub async fn write_combined(
    dir: &Path,
    query: &Query,
    result: &AccumulatedResult,
    downloaded_at: DateTime<Local>,
) -> Result<PathBuf, Box<dyn Error>> {
    let path = dir.join(COMBINED_FILENAME);
    write_pretty(&path, &DownloadFile::new(query, result, downloaded_at)).await?;
    info!(path = %path.display(), "Wrote combined JSON file");
    Ok(path)
}

/// Informational fields of a raw API response (`notas` documents).
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct ResponseEnvelope {
    pub success: Option<bool>,
    pub total: Option<u64>,
    pub limit: Option<u64>,
    pub filtros: Option<ResponseFilters>,
    pub metadata: Option<Value>,
}

/// The filters the server says it applied.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct ResponseFilters {
    #[serde(rename = "fechaInicio")]
    pub fecha_inicio: Option<String>,
    #[serde(rename = "fechaFin")]
    pub fecha_fin: Option<String>,
    #[serde(rename = "palabrasBuscadas", default)]
    pub palabras_buscadas: Vec<String>,
}

impl ResponseEnvelope {
    /// Read the envelope of a raw API response.
    ///
    /// Returns `None` for combined download files, bare arrays, and envelopes
    /// whose fields have unexpected types.
    pub fn from_document(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        if !map.contains_key("notas") || map.contains_key("noticias") {
            return None;
        }
        match ResponseEnvelope::deserialize(value) {
            Ok(envelope) => Some(envelope),
            Err(e) => {
                debug!(error = %e, "Ignoring unreadable response envelope");
                None
            }
        }
    }

    pub fn log(&self) {
        info!(
            success = ?self.success,
            reported_total = ?self.total,
            limit = ?self.limit,
            "Raw API response"
        );
        if let Some(filters) = &self.filtros {
            info!(
                start = filters.fecha_inicio.as_deref().unwrap_or(MISSING),
                end = filters.fecha_fin.as_deref().unwrap_or(MISSING),
                keywords = %filters.palabras_buscadas.join(", "),
                "Server filters"
            );
        }
        if let Some(metadata) = &self.metadata {
            info!(%metadata, "Server metadata");
        }
    }
}

/// Extract records from a saved document.
///
/// Accepts the combined download file (`noticias`), a raw API response
/// (`notas`), or a bare array of records.
pub fn records_from_document(value: Value) -> Result<Vec<Record>, String> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match ["noticias", "notas"]
            .iter()
            .find_map(|k| match map.remove(*k) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            }) {
            Some(items) => items,
            None => {
                let keys: Vec<&str> = map.keys().map(String::as_str).collect();
                return Err(format!(
                    "no \"noticias\" or \"notas\" array found; keys present: {keys:?}"
                ));
            }
        },
        _ => return Err("expected a JSON object or array".to_string()),
    };
    Ok(items.into_iter().filter_map(Record::from_value).collect())
}

/// Load records from a saved JSON file.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn load_records(path: &Path) -> Result<Vec<Record>, Box<dyn Error>> {
    let text = fs::read_to_string(path).await?;
    let value: Value = serde_json::from_str(&text)?;
    if let Some(envelope) = ResponseEnvelope::from_document(&value) {
        envelope.log();
    }
    let records = records_from_document(value)?;
    info!(count = records.len(), "Loaded saved records");
    Ok(records)
}
