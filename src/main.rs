//! # notas_harvest
//!
//! Downloads every result of a keyword/date-range query from the "notas"
//! news API, saves the results to disk, and reports duplicate titles.
//!
//! ## Usage
//!
//! ```sh
//! NOTAS_API_TOKEN=... notas_harvest download -k "aduanas, ley" -s 2025-10-01 -e 2025-10-22
//! notas_harvest analyze ./documentos_noticias_20251022_090503/todas_las_noticias.json
//! notas_harvest param-scan -k aduanas -s 2025-10-19 -e 2025-10-20
//! ```
//!
//! ## Architecture
//!
//! 1. **Fetching**: [`fetcher::PageFetcher`] pulls pages one request at a time
//!    until the server stops returning new records
//! 2. **Output**: the combined JSON file and, optionally, one directory per record
//! 3. **Analysis**: duplicate titles and publication date spread, printed and
//!    written next to the download
//! 4. **Parameter scan**: [`param_scan::ParamScanner`] tries candidate paging
//!    parameters one request each

use chrono::{DateTime, Local};
use clap::Parser;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod analysis;
mod api;
mod cli;
mod config;
mod fetcher;
mod models;
mod outputs;
mod param_scan;
mod utils;

use analysis::{dates::date_summary, duplicates::summarize};
use api::ReqwestClient;
use cli::{AnalyzeArgs, ApiArgs, Cli, Command, DownloadArgs, ParamScanArgs};
use config::{ApiConfig, Overrides};
use fetcher::PageFetcher;
use models::{AccumulatedResult, Query, Record};
use outputs::{json, records, report};
use param_scan::ParamScanner;
use utils::{ensure_writable_dir, shorten, timestamped_dir_name};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    let args = Cli::parse();

    let outcome = match args.command {
        Command::Download(download) => run_download(download).await,
        Command::Analyze(analyze) => run_analyze(analyze).await,
        Command::ParamScan(scan) => run_param_scan(scan).await,
    };

    let elapsed = start_time.elapsed();
    match &outcome {
        Ok(()) => info!(?elapsed, "Execution complete"),
        Err(e) => error!(?elapsed, error = %e, "Execution failed"),
    }
    outcome
}

async fn run_download(args: DownloadArgs) -> Result<(), Box<dyn Error>> {
    let query = Query::new(&args.keywords, args.start_date, args.end_date, args.page_size)?;
    let config = load_config(args.api)?;
    info!(%query, endpoint = %config.endpoint, "Starting download");

    // Fail before any request if the output cannot be written. The run
    // directory itself is only created once there is something to put in it.
    if let Err(e) = ensure_writable_dir(&args.output_dir).await {
        error!(path = %args.output_dir.display(), error = %e, "Output directory is not writable");
        return Err(e);
    }
    let downloaded_at = Local::now();
    let run_dir = args.output_dir.join(timestamped_dir_name(downloaded_at));

    let client = ReqwestClient::new(Duration::from_secs(config.timeout_secs))?;
    let fetcher = PageFetcher::new(config, client);

    let result = match fetcher.fetch_all(&query).await {
        Ok(result) => result,
        Err(failure) => {
            // Keep what was already downloaded before giving up.
            if !failure.partial.is_empty() {
                let partial = AccumulatedResult {
                    pages_fetched: failure.error.page() - 1,
                    records: failure.partial,
                    reported_total: failure.reported_total,
                    truncated: true,
                };
                match save_partial(&run_dir, &query, &partial, downloaded_at).await {
                    Ok(path) => warn!(path = %path.display(), count = partial.len(), "Saved partial results"),
                    Err(e) => error!(error = %e, "Failed to save partial results"),
                }
            }
            return Err(failure.error.into());
        }
    };

    if result.is_empty() {
        warn!("Query returned no records; nothing to save");
        return Ok(());
    }
    if let Some(total) = result.reported_total {
        if (result.len() as u64) < total {
            warn!(fetched = result.len(), reported_total = total, "Fetched fewer records than the server reported");
        }
    }

    ensure_writable_dir(&run_dir).await?;
    let combined = json::write_combined(&run_dir, &query, &result, downloaded_at).await?;
    if args.per_record {
        records::write_all(&run_dir, &result.records).await?;
    }
    log_preview(&result.records);

    if !args.no_report {
        let dates = date_summary(&result.records);
        let duplicates = summarize(&result.records);
        report::write_report(&run_dir, result.len(), dates.as_ref(), &duplicates).await?;
        info!(
            total_titles = duplicates.total_titles,
            unique_titles = duplicates.unique_titles,
            duplicates = duplicates.duplicates,
            "Duplicate analysis"
        );
    }

    info!(
        path = %combined.display(),
        dir = %run_dir.display(),
        count = result.len(),
        pages = result.pages_fetched,
        "Download complete"
    );
    Ok(())
}

fn load_config(api: ApiArgs) -> Result<ApiConfig, Box<dyn Error>> {
    let config = ApiConfig::load(
        api.config.as_deref(),
        Overrides {
            endpoint: api.endpoint,
            token: api.token,
            max_pages: api.max_pages,
        },
    )?;
    if config.token.is_none() {
        warn!("No API token configured; requests are sent without Authorization");
    }
    Ok(config)
}

async fn save_partial(
    run_dir: &Path,
    query: &Query,
    partial: &AccumulatedResult,
    downloaded_at: DateTime<Local>,
) -> Result<PathBuf, Box<dyn Error>> {
    ensure_writable_dir(run_dir).await?;
    json::write_combined(run_dir, query, partial, downloaded_at).await
}

async fn run_analyze(args: AnalyzeArgs) -> Result<(), Box<dyn Error>> {
    let records = json::load_records(&args.input).await?;
    let dates = date_summary(&records);
    let duplicates = summarize(&records);

    print!("{}", report::render_text(records.len(), dates.as_ref(), &duplicates));

    if let Some(dir) = args.output_dir {
        ensure_writable_dir(&dir).await?;
        report::write_report(&dir, records.len(), dates.as_ref(), &duplicates).await?;
    }
    Ok(())
}

async fn run_param_scan(args: ParamScanArgs) -> Result<(), Box<dyn Error>> {
    let largest = args.sizes.iter().copied().max().unwrap_or(param_scan::DEFAULT_SIZES[0]);
    let query = Query::new(&args.keywords, args.start_date, args.end_date, largest)?;
    let config = load_config(args.api)?;
    info!(%query, endpoint = %config.endpoint, sizes = ?args.sizes, "Starting parameter scan");

    let client = ReqwestClient::new(Duration::from_secs(config.timeout_secs))?;
    let results = ParamScanner::new(config, client).scan(&query, &args.sizes).await;

    print!("{}", param_scan::render_scan(&results));
    Ok(())
}

fn log_preview(records: &[Record]) {
    for (i, record) in records.iter().take(3).enumerate() {
        info!(
            n = i + 1,
            title = %shorten(record.title.as_deref().unwrap_or("(untitled)"), 60),
            date = record.date.as_deref().unwrap_or(models::MISSING),
            "First records"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    #[tokio::test]
    async fn test_run_dir_created_only_when_saving() {
        let tmp = tempfile::tempdir().unwrap();
        ensure_writable_dir(tmp.path()).await.unwrap();
        let run_dir = tmp.path().join(timestamped_dir_name(Local::now()));
        assert!(!run_dir.exists());

        let query = Query::new(
            ["aduanas"],
            NaiveDate::from_ymd_opt(2025, 10, 19).unwrap(),
            NaiveDate::from_ymd_opt(2025, 10, 20).unwrap(),
            2,
        )
        .unwrap();
        let partial = AccumulatedResult {
            records: vec![Record::from_value(json!({ "titulo": "A" })).unwrap()],
            pages_fetched: 1,
            reported_total: Some(5),
            truncated: true,
        };

        let path = save_partial(&run_dir, &query, &partial, Local::now()).await.unwrap();

        assert!(run_dir.is_dir());
        let saved: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(saved["total_reportado"], 5);
        assert_eq!(saved["truncado"], true);
    }

    #[tokio::test]
    async fn test_unwritable_base_dir_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("not_a_dir");
        std::fs::write(&file, "x").unwrap();

        assert!(ensure_writable_dir(&file).await.is_err());
    }
}
