//! Error types for the claim-report library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ReportError`] — **Fatal**: the batch cannot proceed at all (input
//!   table missing or unreadable, no PDF engine installed, output directory
//!   not writable). Returned as `Err(ReportError)` from the top-level
//!   `process_*` functions before any report is written.
//!
//! * [`ClaimError`] — **Non-fatal**: a single claim failed (required field
//!   missing, template broken, PDF engine crashed) but every other claim is
//!   still attempted. Stored inside [`crate::output::ClaimFailure`] so
//!   callers can inspect partial success rather than losing the whole batch
//!   to one bad row.
//!
//! Template failures and engine failures are separate variants so an
//! operator can tell "fix the template" from "fix the environment".

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the claim-report library.
///
/// Claim-level failures use [`ClaimError`] and are stored in
/// [`crate::output::BatchOutput`] rather than propagated here.
#[derive(Debug, Error)]
pub enum ReportError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    NotFound { path: PathBuf },

    /// The table is empty, malformed, or in an unsupported encoding.
    #[error("Failed to load data file '{path}': {detail}")]
    DataFormat { path: PathBuf, detail: String },

    // ── Environment errors ────────────────────────────────────────────────
    /// No usable PDF engine could be resolved.
    #[error(
        "Could not configure the PDF generator: {0}\n\n\
Install wkhtmltopdf (https://wkhtmltopdf.org/downloads.html), or\n\
set WKHTMLTOPDF_PATH=/path/to/wkhtmltopdf to use an existing copy.\n"
    )]
    Configuration(String),

    /// The output directory could not be created.
    #[error("Failed to create output directory '{path}': {source}")]
    OutputDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Batch outcome ─────────────────────────────────────────────────────
    /// Some claims succeeded but at least one failed.
    ///
    /// Returned by [`crate::output::BatchOutput::into_result`] when the
    /// caller wants to treat any claim failure as an error.
    #[error("{failed}/{total} claims failed during report generation")]
    PartialFailure {
        success: usize,
        failed: usize,
        total: usize,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single claim.
///
/// Stored alongside [`crate::output::ClaimFailure`] when a claim fails.
/// The batch always continues with the next claim.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum ClaimError {
    /// A field needed for the output filename is absent, null or blank.
    #[error("Required field '{field}' is missing")]
    MissingField { field: String },

    /// The named template does not exist or cannot be read.
    #[error("Template '{path}' could not be read: {detail}")]
    TemplateMissing { path: PathBuf, detail: String },

    /// The template failed to parse.
    #[error("Template syntax error in '{template}': {detail}")]
    TemplateSyntax { template: String, detail: String },

    /// The template parsed but failed while rendering this claim.
    #[error("Template error while rendering '{template}': {detail}")]
    TemplateRender { template: String, detail: String },

    /// The PDF engine failed to produce the file.
    #[error("Failed to generate PDF '{path}': {detail}")]
    Render { path: PathBuf, detail: String },

    /// The finished PDF could not be moved into the output directory.
    #[error("Failed to write output file '{path}': {detail}")]
    OutputWriteFailed { path: PathBuf, detail: String },

    /// The worker running this claim panicked or was cancelled.
    #[error("Claim worker aborted: {0}")]
    Aborted(String),
}

impl ClaimError {
    /// `true` for failures that point at the template rather than the
    /// input row or the machine.
    pub fn is_template_error(&self) -> bool {
        matches!(
            self,
            ClaimError::TemplateMissing { .. }
                | ClaimError::TemplateSyntax { .. }
                | ClaimError::TemplateRender { .. }
        )
    }
}

/// Render a tera error together with its source chain.
///
/// tera's top-level message is often just "Failed to render 'x'"; the
/// useful part lives in the sources.
pub(crate) fn tera_error_chain(err: &tera::Error) -> String {
    use std::error::Error as _;

    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        msg.push_str(": ");
        msg.push_str(&inner.to_string());
        source = inner.source();
    }
    msg
}
