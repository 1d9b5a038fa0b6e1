//! One directory per record.
//!
//! # Output Structure
//!
//! ```text
//! documentos_noticias_20251022_090503/
//! ├── 0001_Nueva_ley_de_aduanas/
//! │   ├── noticia_completa.json   # the raw record
//! │   ├── contenido.txt           # only when the record has content
//! │   ├── resumen.txt             # only when the record has a summary
//! │   └── metadatos.json
//! └── noticia_0002/                # record without a title
//! ```

use crate::models::Record;
use crate::outputs::json::write_pretty;
use crate::utils::record_folder_name;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Progress is logged every this many records.
const PROGRESS_EVERY: usize = 50;

/// Contents of `metadatos.json`.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct RecordMetadata {
    pub fecha_creacion: String,
    pub id_noticia: String,
    pub fuente: String,
    pub fecha_publicacion: String,
    pub numero_noticia: usize,
}

impl RecordMetadata {
    pub fn new(index: usize, record: &Record, created_at: DateTime<Local>) -> Self {
        let number = index + 1;
        Self {
            fecha_creacion: created_at.to_rfc3339(),
            id_noticia: record
                .id
                .clone()
                .unwrap_or_else(|| format!("noticia_{number}")),
            fuente: record
                .source
                .clone()
                .unwrap_or_else(|| "Desconocida".to_string()),
            fecha_publicacion: record
                .date
                .clone()
                .unwrap_or_else(|| "No disponible".to_string()),
            numero_noticia: number,
        }
    }
}

/// Write the directory for the record at zero-based `index` under `dir`.
pub async fn write_record(
    dir: &Path,
    index: usize,
    record: &Record,
    created_at: DateTime<Local>,
) -> Result<(), Box<dyn Error>> {
    let folder = dir.join(record_folder_name(index, record));
    fs::create_dir_all(&folder).await?;

    write_pretty(&folder.join("noticia_completa.json"), record).await?;
    if let Some(content) = &record.content {
        fs::write(folder.join("contenido.txt"), content).await?;
    }
    if let Some(summary) = &record.summary {
        fs::write(folder.join("resumen.txt"), summary).await?;
    }
    write_pretty(
        &folder.join("metadatos.json"),
        &RecordMetadata::new(index, record, created_at),
    )
    .await?;
    Ok(())
}

/// Write every record's directory under `dir`, in order.
#[instrument(level = "info", skip_all, fields(dir = %dir.display(), count = records.len()))]
pub async fn write_all(dir: &Path, records: &[Record]) -> Result<(), Box<dyn Error>> {
    let created_at = Local::now();
    for (index, record) in records.iter().enumerate() {
        write_record(dir, index, record, created_at).await?;
        if (index + 1) % PROGRESS_EVERY == 0 {
            info!(written = index + 1, total = records.len(), "Saving records");
        }
    }
    info!(total = records.len(), "Wrote per-record directories");
    Ok(())
}
