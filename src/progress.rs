//! Progress-callback trait for per-claim batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::ReportConfigBuilder::progress_callback`] to receive
//! events as the batch works through the claims table. Callers can forward
//! them to a terminal progress bar, a channel or a job record without the
//! library knowing how the host application communicates.
//!
//! # Example
//!
//! ```rust
//! use claim_report::{BatchProgressCallback, ReportConfig};
//! use std::path::Path;
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     written: AtomicUsize,
//! }
//!
//! impl BatchProgressCallback for CountingCallback {
//!     fn on_claim_complete(&self, index: usize, total: usize, path: &Path) {
//!         self.written.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{}/{} → {}", index, total, path.display());
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { written: AtomicUsize::new(0) });
//!
//! let config = ReportConfig::builder()
//!     .progress_callback(counter as Arc<dyn BatchProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::path::Path;
use std::sync::Arc;

/// Called by the batch orchestrator as it processes each claim.
///
/// Claims are processed one at a time, but from tokio worker threads, so
/// implementations must be `Send + Sync`. All methods have default no-op
/// implementations so callers only override what they care about.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once after the claims table is loaded.
    fn on_batch_start(&self, total_claims: usize) {
        let _ = total_claims;
    }

    /// Called before a claim is enriched. `index` is 1-based.
    fn on_claim_start(&self, index: usize, total_claims: usize) {
        let _ = (index, total_claims);
    }

    /// Called when a claim's report has been written.
    fn on_claim_complete(&self, index: usize, total_claims: usize, path: &Path) {
        let _ = (index, total_claims, path);
    }

    /// Called when a claim fails.
    ///
    /// # Arguments
    /// * `error` — human-readable error description
    fn on_claim_error(&self, index: usize, total_claims: usize, error: &str) {
        let _ = (index, total_claims, error);
    }

    /// Called once after every claim was attempted, or the batch was
    /// cancelled.
    fn on_batch_complete(&self, total_claims: usize, success_count: usize) {
        let _ = (total_claims, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ReportConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;
