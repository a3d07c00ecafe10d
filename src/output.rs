//! Batch result types.
//!
//! A batch never fails because one claim did: [`BatchOutput`] carries the
//! produced reports and the per-claim failures side by side, in processing
//! order, and callers decide what counts as success.

use crate::error::{ClaimError, ReportError};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A report that was written to disk.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedReport {
    /// 1-based position of the claim in the input table.
    pub index: usize,
    /// Value of the `CLAIM #` column, if the row had one.
    pub claim_id: Option<String>,
    pub report_id: String,
    pub path: PathBuf,
}

/// A claim that produced no report.
#[derive(Debug, Clone, Serialize)]
pub struct ClaimFailure {
    /// 1-based position of the claim in the input table.
    pub index: usize,
    pub claim_id: Option<String>,
    pub error: ClaimError,
}

impl std::fmt::Display for ClaimFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.claim_id {
            Some(id) => write!(f, "claim {} ({}): {}", self.index, id, self.error),
            None => write!(f, "claim {}: {}", self.index, self.error),
        }
    }
}

/// Counters for a finished batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchStats {
    /// Rows loaded from the input table.
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Rows never attempted because the batch was cancelled.
    pub skipped: usize,
    pub duration_ms: u64,
}

/// Everything a batch produced.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchOutput {
    /// Written reports, in input order.
    pub reports: Vec<GeneratedReport>,
    /// Failed claims, in input order.
    pub failures: Vec<ClaimFailure>,
    pub stats: BatchStats,
}

impl BatchOutput {
    /// Paths of the written reports, in input order.
    pub fn paths(&self) -> Vec<&Path> {
        self.reports.iter().map(|r| r.path.as_path()).collect()
    }

    /// `true` when every loaded claim produced a report.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.stats.skipped == 0
    }

    /// Treat any failed claim as an error.
    pub fn into_result(self) -> Result<BatchOutput, ReportError> {
        if self.failures.is_empty() {
            Ok(self)
        } else {
            Err(ReportError::PartialFailure {
                success: self.reports.len(),
                failed: self.failures.len(),
                total: self.stats.total,
            })
        }
    }
}
