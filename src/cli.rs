//! Command-line interface definitions for notas_harvest.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Connection settings can also come from environment variables or a YAML
//! file (see [`crate::config`]).

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for notas_harvest.
///
/// # Examples
///
/// ```sh
/// # Download a date range, one combined JSON file
/// notas_harvest download -k "aduanas, ley, comercio exterior" -s 2025-10-01 -e 2025-10-22
///
/// # Also write one directory per record
/// notas_harvest download -k turismo -s 2025-10-19 -e 2025-10-20 --per-record -o ./out
///
/// # See which paging parameters the server honours
/// notas_harvest param-scan -k aduanas -s 2025-10-19 -e 2025-10-20 --sizes 10,50
///
/// # Re-run the duplicate analysis on a saved file
/// notas_harvest analyze ./out/documentos_noticias_20251022_090503/todas_las_noticias.json
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch every page of a query and save the results
    Download(DownloadArgs),
    /// Report duplicate titles and date spread of a saved JSON file
    Analyze(AnalyzeArgs),
    /// Send the first request once per candidate paging parameter set
    ParamScan(ParamScanArgs),
}

#[derive(Args, Debug)]
pub struct DownloadArgs {
    /// Comma-separated search keywords
    #[arg(short, long, value_delimiter = ',', required = true)]
    pub keywords: Vec<String>,

    /// Inclusive start date (YYYY-MM-DD)
    #[arg(short, long)]
    pub start_date: NaiveDate,

    /// Inclusive end date (YYYY-MM-DD)
    #[arg(short, long)]
    pub end_date: NaiveDate,

    /// Records requested per page
    #[arg(short, long, default_value_t = 500)]
    pub page_size: u32,

    /// Base directory for the timestamped output directory
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Also write one directory per record
    #[arg(long)]
    pub per_record: bool,

    /// Skip the duplicate report
    #[arg(long)]
    pub no_report: bool,

    #[command(flatten)]
    pub api: ApiArgs,
}

/// Connection settings shared by commands that talk to the API.
#[derive(Args, Debug)]
pub struct ApiArgs {
    /// Optional path to a YAML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Results endpoint URL
    #[arg(long, env = "NOTAS_API_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Bearer token for the API
    #[arg(long, env = "NOTAS_API_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Maximum number of requests per download
    #[arg(long)]
    pub max_pages: Option<u32>,
}

#[derive(Args, Debug)]
pub struct ParamScanArgs {
    /// Comma-separated search keywords
    #[arg(short, long, value_delimiter = ',', required = true)]
    pub keywords: Vec<String>,

    /// Inclusive start date (YYYY-MM-DD)
    #[arg(short, long)]
    pub start_date: NaiveDate,

    /// Inclusive end date (YYYY-MM-DD)
    #[arg(short, long)]
    pub end_date: NaiveDate,

    /// Comma-separated page sizes to try
    #[arg(long, value_delimiter = ',', default_value = "10,25,50,100")]
    pub sizes: Vec<u32>,

    #[command(flatten)]
    pub api: ApiArgs,
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Saved JSON file: a combined download file, a raw API response, or an array of records
    pub input: PathBuf,

    /// Directory to also write duplicados.json and duplicados.txt into
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_parsing() {
        let cli = Cli::parse_from([
            "notas_harvest",
            "download",
            "--keywords",
            "aduanas, ley,comercio exterior",
            "--start-date",
            "2025-10-01",
            "--end-date",
            "2025-10-22",
        ]);

        let Command::Download(args) = cli.command else {
            panic!("expected download");
        };
        assert_eq!(args.keywords, vec!["aduanas", " ley", "comercio exterior"]);
        assert_eq!(args.start_date, NaiveDate::from_ymd_opt(2025, 10, 1).unwrap());
        assert_eq!(args.page_size, 500);
        assert_eq!(args.output_dir, PathBuf::from("."));
        assert!(!args.per_record);
    }

    #[test]
    fn test_download_short_flags() {
        let cli = Cli::parse_from([
            "notas_harvest",
            "download",
            "-k",
            "turismo",
            "-s",
            "2025-10-19",
            "-e",
            "2025-10-20",
            "-p",
            "50",
            "-o",
            "/tmp/out",
            "--per-record",
            "--max-pages",
            "3",
        ]);

        let Command::Download(args) = cli.command else {
            panic!("expected download");
        };
        assert_eq!(args.page_size, 50);
        assert_eq!(args.output_dir, PathBuf::from("/tmp/out"));
        assert!(args.per_record);
        assert_eq!(args.api.max_pages, Some(3));
    }

    #[test]
    fn test_download_rejects_bad_date() {
        let result = Cli::try_parse_from([
            "notas_harvest",
            "download",
            "-k",
            "x",
            "-s",
            "19/10/2025",
            "-e",
            "2025-10-20",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_analyze_parsing() {
        let cli = Cli::parse_from(["notas_harvest", "analyze", "saved.json", "-o", "reports"]);

        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        assert_eq!(args.input, PathBuf::from("saved.json"));
        assert_eq!(args.output_dir, Some(PathBuf::from("reports")));
    }

    #[test]
    fn test_param_scan_parsing() {
        let cli = Cli::parse_from([
            "notas_harvest",
            "param-scan",
            "-k",
            "aduanas",
            "-s",
            "2025-10-19",
            "-e",
            "2025-10-20",
            "--sizes",
            "10,50",
        ]);

        let Command::ParamScan(args) = cli.command else {
            panic!("expected param-scan");
        };
        assert_eq!(args.sizes, vec![10, 50]);
        assert_eq!(args.keywords, vec!["aduanas"]);
    }

    #[test]
    fn test_param_scan_default_sizes() {
        let cli = Cli::parse_from([
            "notas_harvest",
            "param-scan",
            "-k",
            "aduanas",
            "-s",
            "2025-10-19",
            "-e",
            "2025-10-20",
        ]);

        let Command::ParamScan(args) = cli.command else {
            panic!("expected param-scan");
        };
        assert_eq!(args.sizes, vec![10, 25, 50, 100]);
    }
}
