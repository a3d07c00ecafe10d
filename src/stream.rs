//! Streaming API: emit each claim's outcome as soon as it is known.
//!
//! Unlike the eager [`crate::batch::process_claims`], which returns only
//! after every claim was attempted, [`process_stream`] yields one
//! `Result<GeneratedReport, ClaimFailure>` per claim. Claims are still
//! processed one at a time, so items arrive in input order.
//!
//! Fatal errors (no engine, unreadable table, output directory) are still
//! reported up front, before the stream is returned. The stream ends early
//! once the configured cancellation flag is set.

use crate::config::ReportConfig;
use crate::error::ReportError;
use crate::output::{ClaimFailure, GeneratedReport};
use futures::future;
use futures::stream::{self, StreamExt};
use std::path::Path;
use std::pin::Pin;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of per-claim outcomes.
pub type ClaimStream = Pin<Box<dyn Stream<Item = Result<GeneratedReport, ClaimFailure>> + Send>>;

/// Generate reports for `data_file`, streaming each claim's outcome.
///
/// Progress callbacks are not invoked; the stream itself is the progress
/// channel.
///
/// # Returns
/// - `Ok(ClaimStream)` — a stream of `Result<GeneratedReport, ClaimFailure>`
/// - `Err(ReportError)` — fatal error (no engine, input missing, etc.)
///
/// # Example
/// ```rust,no_run
/// use claim_report::{process_stream, ReportConfig};
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ReportConfig::default();
/// let mut reports = process_stream("claims.csv", "reports", None, &config).await?;
/// while let Some(outcome) = reports.next().await {
///     match outcome {
///         Ok(r) => println!("{} → {}", r.index, r.path.display()),
///         Err(f) => eprintln!("{f}"),
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub async fn process_stream(
    data_file: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    photo_root: Option<&Path>,
    config: &ReportConfig,
) -> Result<ClaimStream, ReportError> {
    let (worker, claims) =
        crate::batch::prepare(data_file.as_ref(), output_dir.as_ref(), photo_root, config).await?;
    info!("Streaming {} claims", claims.len());

    let cancel = config.cancel.clone();
    let s = stream::iter(claims.into_iter().enumerate())
        .take_while(move |_| {
            let cancelled = cancel
                .as_ref()
                .map(|flag| flag.load(Ordering::SeqCst))
                .unwrap_or(false);
            future::ready(!cancelled)
        })
        .then(move |(offset, claim)| {
            let worker = Arc::clone(&worker);
            async move { worker.run(offset + 1, claim).await }
        });

    Ok(Box::pin(s))
}
