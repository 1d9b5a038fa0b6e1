//! Output generation: the combined JSON file, per-record directories and the
//! duplicate report.
//!
//! # Submodules
//!
//! - [`json`]: Writes the combined download file and loads saved files back
//! - [`records`]: One directory per record with its raw JSON, text fields and metadata
//! - [`report`]: Duplicate report and date statistics as text and JSON
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! └── documentos_noticias_20251022_090503/
//!     ├── todas_las_noticias.json
//!     ├── duplicados.json
//!     ├── duplicados.txt
//!     ├── 0001_Some_title/          # with --per-record
//!     └── ...
//! ```

pub mod json;
pub mod records;
pub mod report;
