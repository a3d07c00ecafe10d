//! # claim-report
//!
//! Generate one PDF inspection report per insurance claim from a tabular
//! claims export, an optional photo tree and an HTML template.
//!
//! ## Pipeline Overview
//!
//! ```text
//! claims table (CSV / TSV / spreadsheet)
//!  │
//!  ├─ 1. Load     ordered records, blanks normalised to null
//!  ├─ 2. Enrich   report id, header/footer/front photos, room groups,
//!  │              placeholder reserves, itemised scope of work
//!  ├─ 3. Render   tera template → HTML → wkhtmltopdf → PDF
//!  └─ 4. Output   paths of written reports + per-claim failures
//! ```
//!
//! A claim that cannot be rendered (missing address, broken template,
//! engine crash) is logged and recorded in [`BatchOutput::failures`]; the
//! rest of the batch carries on.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use claim_report::{process_claims, ReportConfig};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // wkhtmltopdf is located via WKHTMLTOPDF_PATH, well-known paths, then PATH
//!     let config = ReportConfig::builder().templates_dir("templates").build()?;
//!     let output = process_claims("claims.csv", "reports", Some(Path::new("photos")), &config).await?;
//!     for path in output.paths() {
//!         println!("{}", path.display());
//!     }
//!     eprintln!("{} failed", output.stats.failed);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `claim-report` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! claim-report = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod claim;
pub mod config;
pub mod engine;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{process_claims, process_claims_sync};
pub use claim::{ClaimRecord, EnrichedClaim, RoomPhotoGroup};
pub use config::{PdfOptions, ReportConfig, ReportConfigBuilder};
pub use engine::{EngineError, PdfEngine, WkhtmltopdfEngine};
pub use error::{ClaimError, ReportError};
pub use output::{BatchOutput, BatchStats, ClaimFailure, GeneratedReport};
pub use pipeline::enrich::{
    ClaimEnricher, FixedReserves, RandomReportId, RandomReserves, ReportIdGenerator,
    ReserveFigures, ReserveGenerator, SequentialReportId,
};
pub use pipeline::load::load_claims;
pub use pipeline::photos::{PhotoIndex, RoomCategory, SpecialImageKeywords};
pub use pipeline::render::{format_date, report_file_name, ReportRenderer};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use stream::{process_stream, ClaimStream};
