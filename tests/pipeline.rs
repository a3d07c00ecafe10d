//! Integration tests for the full claim → PDF pipeline.
//!
//! These run the real loader, photo locator, enricher and tera renderer but
//! swap wkhtmltopdf for an in-process engine that records the HTML it was
//! given and writes a stub PDF. No external binary is needed.

use claim_report::{
    process_claims, process_claims_sync, process_stream, BatchProgressCallback, ClaimError,
    EngineError, FixedReserves, PdfEngine, PdfOptions, ReportConfig, ReportError,
    SequentialReportId,
};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Test helpers ─────────────────────────────────────────────────────────────

#[derive(Default)]
struct RecordingEngine {
    html: Mutex<Vec<String>>,
}

impl RecordingEngine {
    fn pages(&self) -> Vec<String> {
        self.html.lock().unwrap().clone()
    }
}

impl PdfEngine for RecordingEngine {
    fn name(&self) -> &str {
        "recording"
    }

    fn html_to_pdf(&self, html: &str, output: &Path, _: &PdfOptions) -> Result<(), EngineError> {
        self.html.lock().unwrap().push(html.to_string());
        std::fs::write(output, b"%PDF-1.4\n%stub\n")?;
        Ok(())
    }
}

const THREE_CLAIMS: &str = "\
CLAIM #,INSURED/POLICYHOLDER,ADDRESS,DATE OF LOSS,SCOPE OF WORK
A-100,Jane Doe,\"12 Elm St, Springfield\",2024-03-05,\"Replace roof\nPaint walls\n\n\"
A-101,Bob Smith,,2024-02-17,Replace fence
A-102,Carla Ruiz,\"41 Pine Rd, Ogdenville\",,
";

struct Fixture {
    _dir: tempfile::TempDir,
    root: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = std::path::absolute(dir.path()).unwrap();
        std::fs::create_dir_all(root.join("templates")).unwrap();
        Self { _dir: dir, root }
    }

    fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }

    fn data(&self) -> PathBuf {
        self.write("claims.csv", THREE_CLAIMS)
    }

    fn out(&self) -> PathBuf {
        self.root.join("out")
    }

    fn template(&self, body: &str) {
        self.write("templates/inspection_template.html", body);
    }

    fn config(&self, engine: Arc<RecordingEngine>) -> ReportConfig {
        ReportConfig::builder()
            .templates_dir(self.root.join("templates"))
            .engine(engine)
            .report_ids(Arc::new(SequentialReportId::starting_at(1)))
            .reserves(Arc::new(FixedReserves::default()))
            .build()
            .unwrap()
    }
}

fn shipped_templates() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("templates")
}

fn pdf_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

// ── Batch behaviour ──────────────────────────────────────────────────────────

#[tokio::test]
async fn failed_claim_does_not_stop_the_batch() {
    let fx = Fixture::new();
    fx.template("<p>{{ claim.report_id }}</p>");
    let engine = Arc::new(RecordingEngine::default());

    let output = process_claims(fx.data(), fx.out(), None, &fx.config(engine.clone()))
        .await
        .expect("batch should not fail on a single bad claim");

    assert_eq!(output.paths().len(), 2);
    assert_eq!(output.failures.len(), 1);
    let failure = &output.failures[0];
    assert_eq!(failure.index, 2);
    assert_eq!(failure.claim_id.as_deref(), Some("A-101"));
    assert_eq!(
        failure.error,
        ClaimError::MissingField {
            field: "ADDRESS".into()
        }
    );

    assert_eq!(output.stats.total, 3);
    assert_eq!(output.stats.succeeded, 2);
    assert_eq!(output.stats.failed, 1);
    assert_eq!(output.stats.skipped, 0);

    assert_eq!(
        pdf_files(&fx.out()),
        vec![
            "FIRST INSPECTION REPORT - CLAIM# A-100 - JANE - 12_Elm_St_Springfield.pdf",
            "FIRST INSPECTION REPORT - CLAIM# A-102 - CARLA - 41_Pine_Rd_Ogdenville.pdf",
        ]
    );
    for path in output.paths() {
        assert!(std::fs::read(path).unwrap().starts_with(b"%PDF"));
    }
    assert!(output.into_result().is_err());
}

#[tokio::test]
async fn reports_follow_input_order() {
    let fx = Fixture::new();
    fx.template("{{ claim['CLAIM #'] }}");
    let engine = Arc::new(RecordingEngine::default());

    let output = process_claims(fx.data(), fx.out(), None, &fx.config(engine.clone()))
        .await
        .unwrap();

    let indices: Vec<usize> = output.reports.iter().map(|r| r.index).collect();
    assert_eq!(indices, vec![1, 3]);
    assert!(output.reports[0].report_id.ends_with("-000001"));
    // The failed claim was still enriched, so it used id 000002.
    assert!(output.reports[1].report_id.ends_with("-000003"));
    assert_eq!(engine.pages(), vec!["A-100".to_string(), "A-102".to_string()]);
}

#[tokio::test]
async fn shipped_template_renders_enriched_claim() {
    let fx = Fixture::new();
    fx.write("photos/branding/header.png", "img");
    fx.write("photos/branding/footer.png", "img");
    fx.write("photos/exterior/front_view.jpg", "img");
    fx.write("photos/Kitchen/img_01.jpg", "img");
    fx.write("photos/Kitchen/img_02.jpg", "img");
    let engine = Arc::new(RecordingEngine::default());
    let config = ReportConfig::builder()
        .templates_dir(shipped_templates())
        .engine(engine.clone())
        .reserves(Arc::new(FixedReserves::default()))
        .build()
        .unwrap();

    let output = process_claims(fx.data(), fx.out(), Some(fx.root.join("photos").as_path()), &config)
        .await
        .unwrap();
    assert_eq!(output.stats.succeeded, 2, "failures: {:?}", output.failures);

    let pages = engine.pages();
    let jane = &pages[0];
    assert!(jane.contains("March 05, 2024"));
    assert!(jane.contains("<li>Replace roof</li>"));
    assert!(jane.contains("<li>Paint walls</li>"));
    assert!(jane.contains("25,000.00"));
    assert!(jane.contains("3,500.00"));
    assert!(jane.contains("Kitchen"));
    assert!(jane.contains("header.png"));
    assert!(jane.contains("front_view.jpg"));
    assert!(jane.contains("img_02.jpg"));
    assert!(jane.contains("Inspection Pro"));

    let carla = &pages[1];
    assert!(carla.contains("N/A"), "blank date should render as N/A");
    assert!(!carla.contains("<li>"), "empty scope renders no items");
}

#[tokio::test]
async fn missing_photo_root_still_renders() {
    let fx = Fixture::new();
    fx.template("{{ claim.photos | length }}|{% if claim.front_photo %}front{% else %}none{% endif %}");
    let engine = Arc::new(RecordingEngine::default());

    let output = process_claims(
        fx.data(),
        fx.out(),
        Some(fx.root.join("no-photos-here").as_path()),
        &fx.config(engine.clone()),
    )
    .await
    .unwrap();

    assert_eq!(output.stats.succeeded, 2);
    assert_eq!(engine.pages()[0], "0|none");
}

#[tokio::test]
async fn broken_template_fails_each_claim() {
    let fx = Fixture::new();
    fx.template("{% for x in claim.photos %}unterminated");
    let engine = Arc::new(RecordingEngine::default());

    let output = process_claims(fx.data(), fx.out(), None, &fx.config(engine.clone()))
        .await
        .unwrap();

    assert!(output.reports.is_empty());
    assert_eq!(output.failures.len(), 3);
    // Claim 2 fails on its file name before the template is read.
    assert!(matches!(output.failures[0].error, ClaimError::TemplateSyntax { .. }));
    assert!(matches!(output.failures[1].error, ClaimError::MissingField { .. }));
    assert!(matches!(output.failures[2].error, ClaimError::TemplateSyntax { .. }));
    assert!(engine.pages().is_empty());
    assert!(pdf_files(&fx.out()).is_empty());
}

#[tokio::test]
async fn missing_template_is_a_claim_error() {
    let fx = Fixture::new();
    let engine = Arc::new(RecordingEngine::default());

    let output = process_claims(fx.data(), fx.out(), None, &fx.config(engine))
        .await
        .unwrap();

    assert!(output
        .failures
        .iter()
        .filter(|f| f.index != 2)
        .all(|f| matches!(f.error, ClaimError::TemplateMissing { .. })));
}

// ── Fatal errors ─────────────────────────────────────────────────────────────

#[test]
fn engine_is_resolved_before_loading() {
    let fx = Fixture::new();
    let config = ReportConfig::builder()
        .wkhtmltopdf_path(fx.root.join("no-such-wkhtmltopdf"))
        .build()
        .unwrap();

    let err = process_claims_sync(fx.root.join("missing.csv"), fx.out(), None, &config)
        .unwrap_err();
    assert!(matches!(err, ReportError::Configuration(_)), "got {err}");
    assert!(!fx.out().exists());
}

#[test]
fn header_only_table_is_a_data_error() {
    let fx = Fixture::new();
    let data = fx.write("empty.csv", "CLAIM #,INSURED/POLICYHOLDER,ADDRESS\n");
    let config = fx.config(Arc::new(RecordingEngine::default()));

    let err = process_claims_sync(&data, fx.out(), None, &config).unwrap_err();
    assert!(matches!(err, ReportError::DataFormat { .. }), "got {err}");
}

// ── Progress & cancellation ──────────────────────────────────────────────────

#[derive(Default)]
struct EventLog {
    events: Mutex<Vec<String>>,
}

impl EventLog {
    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl BatchProgressCallback for EventLog {
    fn on_batch_start(&self, total_claims: usize) {
        self.push(format!("batch_start {total_claims}"));
    }

    fn on_claim_start(&self, index: usize, total_claims: usize) {
        self.push(format!("start {index}/{total_claims}"));
    }

    fn on_claim_complete(&self, index: usize, total_claims: usize, path: &Path) {
        let name = path.file_name().unwrap().to_string_lossy();
        assert!(path.exists(), "{} reported before it was written", path.display());
        self.push(format!("done {index}/{total_claims} {name}"));
    }

    fn on_claim_error(&self, index: usize, total_claims: usize, error: &str) {
        assert!(error.contains("ADDRESS"), "unexpected error text: {error}");
        self.push(format!("error {index}/{total_claims}"));
    }

    fn on_batch_complete(&self, total_claims: usize, success_count: usize) {
        self.push(format!("batch_complete {total_claims} {success_count}"));
    }
}

#[tokio::test]
async fn progress_events_follow_the_batch() {
    let fx = Fixture::new();
    fx.template("ok");
    let log = Arc::new(EventLog::default());
    let config = ReportConfig::builder()
        .templates_dir(fx.root.join("templates"))
        .engine(Arc::new(RecordingEngine::default()))
        .progress_callback(log.clone())
        .build()
        .unwrap();

    process_claims(fx.data(), fx.out(), None, &config)
        .await
        .unwrap();

    assert_eq!(
        log.events(),
        vec![
            "batch_start 3".to_string(),
            "start 1/3".to_string(),
            "done 1/3 FIRST INSPECTION REPORT - CLAIM# A-100 - JANE - 12_Elm_St_Springfield.pdf"
                .to_string(),
            "start 2/3".to_string(),
            "error 2/3".to_string(),
            "start 3/3".to_string(),
            "done 3/3 FIRST INSPECTION REPORT - CLAIM# A-102 - CARLA - 41_Pine_Rd_Ogdenville.pdf"
                .to_string(),
            "batch_complete 3 2".to_string(),
        ]
    );
}

#[derive(Default)]
struct CancelAfterFirst {
    flag: Arc<AtomicBool>,
    started: AtomicUsize,
    completed: AtomicUsize,
    finished_with: AtomicUsize,
}

impl BatchProgressCallback for CancelAfterFirst {
    fn on_batch_start(&self, total_claims: usize) {
        self.started.store(total_claims, Ordering::SeqCst);
    }

    fn on_claim_complete(&self, _index: usize, _total: usize, _path: &Path) {
        self.completed.fetch_add(1, Ordering::SeqCst);
        self.flag.store(true, Ordering::SeqCst);
    }

    fn on_batch_complete(&self, _total: usize, success_count: usize) {
        self.finished_with.store(success_count, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn cancellation_skips_remaining_claims() {
    let fx = Fixture::new();
    fx.template("ok");
    let flag = Arc::new(AtomicBool::new(false));
    let progress = Arc::new(CancelAfterFirst {
        flag: flag.clone(),
        ..Default::default()
    });
    let config = ReportConfig::builder()
        .templates_dir(fx.root.join("templates"))
        .engine(Arc::new(RecordingEngine::default()))
        .progress_callback(progress.clone())
        .cancel_flag(flag)
        .build()
        .unwrap();

    let output = process_claims(fx.data(), fx.out(), None, &config)
        .await
        .unwrap();

    assert_eq!(output.stats.succeeded, 1);
    assert_eq!(output.stats.skipped, 2);
    assert!(!output.is_complete());
    assert_eq!(progress.started.load(Ordering::SeqCst), 3);
    assert_eq!(progress.completed.load(Ordering::SeqCst), 1);
    assert_eq!(progress.finished_with.load(Ordering::SeqCst), 1);
}

// ── Streaming ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn stream_yields_each_claim_in_order() {
    let fx = Fixture::new();
    fx.template("<p>{{ claim.report_id }}</p>");
    let config = fx.config(Arc::new(RecordingEngine::default()));

    let outcomes: Vec<_> = process_stream(fx.data(), fx.out(), None, &config)
        .await
        .unwrap()
        .collect()
        .await;

    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes[0].as_ref().unwrap().index, 1);
    let failure = outcomes[1].as_ref().unwrap_err();
    assert_eq!(failure.index, 2);
    assert!(outcomes[2].as_ref().unwrap().path.exists());
}

#[tokio::test]
async fn stream_stops_when_cancelled() {
    let fx = Fixture::new();
    fx.template("ok");
    let flag = Arc::new(AtomicBool::new(false));
    let config = ReportConfig::builder()
        .templates_dir(fx.root.join("templates"))
        .engine(Arc::new(RecordingEngine::default()))
        .cancel_flag(flag.clone())
        .build()
        .unwrap();

    let mut stream = process_stream(fx.data(), fx.out(), None, &config)
        .await
        .unwrap();
    assert!(stream.next().await.unwrap().is_ok());
    flag.store(true, Ordering::SeqCst);
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn stream_reports_fatal_errors_up_front() {
    let fx = Fixture::new();
    let config = fx.config(Arc::new(RecordingEngine::default()));
    let result = process_stream(fx.root.join("missing.csv"), fx.out(), None, &config).await;
    assert!(matches!(result, Err(ReportError::NotFound { .. })));
}
