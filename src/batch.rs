//! Eager (whole-batch) entry points.
//!
//! [`process_claims`] loads the claims table, produces one PDF per claim and
//! returns once every claim was attempted. Use
//! [`crate::stream::process_stream`] instead to receive each claim's outcome
//! as soon as it is known.

use crate::claim::ClaimRecord;
use crate::config::ReportConfig;
use crate::engine::{PdfEngine, WkhtmltopdfEngine};
use crate::error::{ClaimError, ReportError};
use crate::output::{BatchOutput, BatchStats, ClaimFailure, GeneratedReport};
use crate::pipeline::enrich::ClaimEnricher;
use crate::pipeline::load;
use crate::pipeline::render::ReportRenderer;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Generate one inspection report per claim in `data_file`.
///
/// # Arguments
/// * `data_file`  — CSV/TSV or spreadsheet with a header row
/// * `output_dir` — created with parents if missing
/// * `photo_root` — optional tree of claim photos; a missing directory only
///   logs a warning
/// * `config`     — templates, settings, engine and strategies
///
/// # Returns
/// `Ok(BatchOutput)` even if some claims failed (check
/// `output.failures`, or call [`BatchOutput::into_result`]).
///
/// # Errors
/// Returns `Err(ReportError)` only for fatal errors, before any report is
/// written:
/// - no PDF engine available
/// - input file missing, unreadable or empty
/// - output directory cannot be created
pub async fn process_claims(
    data_file: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    photo_root: Option<&Path>,
    config: &ReportConfig,
) -> Result<BatchOutput, ReportError> {
    let start = Instant::now();
    let (worker, claims) =
        prepare(data_file.as_ref(), output_dir.as_ref(), photo_root, config).await?;
    let total = claims.len();

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total);
    }

    let mut output = BatchOutput::default();
    for (offset, claim) in claims.into_iter().enumerate() {
        if config.is_cancelled() {
            let skipped = total - offset;
            warn!("Batch cancelled; skipping {} remaining claims", skipped);
            output.stats.skipped = skipped;
            break;
        }

        let index = offset + 1;
        if let Some(ref cb) = config.progress_callback {
            cb.on_claim_start(index, total);
        }

        match worker.run(index, claim).await {
            Ok(report) => {
                if let Some(ref cb) = config.progress_callback {
                    cb.on_claim_complete(index, total, &report.path);
                }
                output.reports.push(report);
            }
            Err(failure) => {
                if let Some(ref cb) = config.progress_callback {
                    cb.on_claim_error(index, total, &failure.error.to_string());
                }
                output.failures.push(failure);
            }
        }
    }

    output.stats = BatchStats {
        total,
        succeeded: output.reports.len(),
        failed: output.failures.len(),
        skipped: output.stats.skipped,
        duration_ms: start.elapsed().as_millis() as u64,
    };

    info!(
        "Batch complete: {}/{} reports generated, {} failed, {} skipped in {}ms",
        output.stats.succeeded,
        total,
        output.stats.failed,
        output.stats.skipped,
        output.stats.duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(total, output.stats.succeeded);
    }

    Ok(output)
}

/// Synchronous wrapper around [`process_claims`].
///
/// Creates a temporary tokio runtime internally; do not call from inside an
/// async context.
pub fn process_claims_sync(
    data_file: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    photo_root: Option<&Path>,
    config: &ReportConfig,
) -> Result<BatchOutput, ReportError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ReportError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(process_claims(data_file, output_dir, photo_root, config))
}

// ── Shared with the streaming API ────────────────────────────────────────

/// Enriches and renders single claims against a fixed output directory.
#[derive(Debug)]
pub(crate) struct ClaimWorker {
    enricher: ClaimEnricher,
    renderer: ReportRenderer,
    output_dir: PathBuf,
    photo_root: Option<PathBuf>,
}

impl ClaimWorker {
    /// Enrich and render one claim on the blocking pool.
    ///
    /// Failures are logged here with the claim's 1-based `index` and
    /// returned; they never abort the caller.
    pub(crate) async fn run(
        self: &Arc<Self>,
        index: usize,
        claim: ClaimRecord,
    ) -> Result<GeneratedReport, ClaimFailure> {
        let worker = Arc::clone(self);
        let joined = tokio::task::spawn_blocking(move || {
            let enriched = worker.enricher.enrich(claim, worker.photo_root.as_deref());
            let rendered = worker.renderer.render(&enriched, &worker.output_dir);
            (enriched.claim_id(), enriched.report_id, rendered)
        })
        .await;

        let (claim_id, report_id, rendered) = match joined {
            Ok(parts) => parts,
            Err(e) => (
                None,
                String::new(),
                Err(ClaimError::Aborted(format!("claim task failed: {}", e))),
            ),
        };

        match rendered {
            Ok(path) => Ok(GeneratedReport {
                index,
                claim_id,
                report_id,
                path,
            }),
            Err(err) => {
                error!(
                    "Error processing claim {} ({}): {}",
                    index,
                    claim_id.as_deref().unwrap_or("no claim number"),
                    err
                );
                Err(ClaimFailure {
                    index,
                    claim_id,
                    error: err,
                })
            }
        }
    }
}

/// Resolve the engine, load the table and create the output directory, in
/// that order. Every error here is fatal.
pub(crate) async fn prepare(
    data_file: &Path,
    output_dir: &Path,
    photo_root: Option<&Path>,
    config: &ReportConfig,
) -> Result<(Arc<ClaimWorker>, Vec<ClaimRecord>), ReportError> {
    info!("Starting batch: {}", data_file.display());

    let engine = resolve_engine(config)?;
    info!("Using PDF engine: {}", engine.name());

    let path = data_file.to_path_buf();
    let claims = tokio::task::spawn_blocking(move || load::load_claims(&path))
        .await
        .map_err(|e| ReportError::Internal(format!("Load task panicked: {}", e)))??;

    tokio::fs::create_dir_all(output_dir)
        .await
        .map_err(|source| ReportError::OutputDirFailed {
            path: output_dir.to_path_buf(),
            source,
        })?;

    let worker = ClaimWorker {
        enricher: ClaimEnricher::from_config(config),
        renderer: ReportRenderer::new(config, engine),
        output_dir: output_dir.to_path_buf(),
        photo_root: photo_root.map(Path::to_path_buf),
    };
    Ok((Arc::new(worker), claims))
}

/// Resolve the PDF engine, from most-specific to least-specific.
///
/// 1. **Pre-built engine** (`config.engine`): used as-is. Tests inject an
///    in-process fake here.
/// 2. **Explicit binary** (`config.wkhtmltopdf_path`): must exist.
/// 3. **Auto-detection**: `WKHTMLTOPDF_PATH`, well-known install paths,
///    then `PATH`.
pub(crate) fn resolve_engine(config: &ReportConfig) -> Result<Arc<dyn PdfEngine>, ReportError> {
    if let Some(ref engine) = config.engine {
        return Ok(Arc::clone(engine));
    }

    if let Some(ref path) = config.wkhtmltopdf_path {
        return Ok(Arc::new(WkhtmltopdfEngine::new(path)?));
    }

    Ok(Arc::new(WkhtmltopdfEngine::locate()?))
}
