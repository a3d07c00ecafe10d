//! CLI binary for claim-report.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ReportConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use claim_report::{
    process_claims, BatchOutput, BatchProgressCallback, FixedReserves, ProgressCallback,
    ReportConfig, SequentialReportId, WkhtmltopdfEngine,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar plus one log line per claim.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner until `on_batch_start` tells us how many claims there are.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Loading claims…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} claims  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Rendering");
        self.bar.reset_eta();
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_claims: usize) {
        self.activate_bar(total_claims);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Generating reports for {total_claims} claims…"))
        ));
    }

    fn on_claim_start(&self, index: usize, _total: usize) {
        self.bar.set_message(format!("claim {index}"));
    }

    fn on_claim_complete(&self, index: usize, total: usize, path: &Path) {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.bar.println(format!(
            "  {} Claim {:>3}/{:<3}  {}",
            green("✓"),
            index,
            total,
            dim(&name),
        ));
        self.bar.inc(1);
    }

    fn on_claim_error(&self, index: usize, total: usize, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);

        // Truncate very long error messages to keep output tidy.
        let msg = match error.char_indices().nth(79) {
            Some((cut, _)) => format!("{}\u{2026}", &error[..cut]),
            None => error.to_string(),
        };

        self.bar.println(format!(
            "  {} Claim {:>3}/{:<3}  {}",
            red("✗"),
            index,
            total,
            red(&msg),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_claims: usize, success_count: usize) {
        let failed = self.errors.load(Ordering::SeqCst);
        self.bar.finish_and_clear();

        if failed == 0 && success_count == total_claims {
            eprintln!(
                "{} {} reports generated successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} reports generated  ({} failed)",
                if success_count == 0 {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_claims,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # One PDF per row of claims.csv, written to ./reports
  claim-report claims.csv -o reports

  # With claim photos and a custom template directory
  claim-report claims.xlsx -o reports --photos photos --templates my_templates

  # Reproducible output for review
  claim-report claims.csv -o reports --sequential-ids --fixed-reserves

  # Fail the run if any claim could not be rendered; JSON summary on stdout
  claim-report claims.csv -o reports --strict --json > summary.json

INPUT:
  .csv (comma) and .tsv/.tab (tab) files are read as UTF-8 text; anything
  else (.xlsx, .xls, .ods) is read as a spreadsheet, first sheet only. The
  first row is the header. Columns used by the report file name:
    CLAIM #, INSURED/POLICYHOLDER, ADDRESS

TEMPLATE BINDINGS:
  claim   every input column plus report_id, header_image, footer_image,
          front_photo, photos, indemnity_amount, expense_reserve,
          total_reserve and SCOPE OF WORK (a list of lines)
  config  the settings map (--settings)
  now     generation time, YYYY-MM-DD HH:MM
  filter  format_date(fmt="%B %d, %Y")

ENVIRONMENT VARIABLES:
  WKHTMLTOPDF_PATH   Path to the wkhtmltopdf binary (skips auto-detection)
  RUST_LOG           Log filter, e.g. RUST_LOG=claim_report=debug
"#;

/// Generate first-inspection PDF reports from a claims table.
#[derive(Parser, Debug)]
#[command(
    name = "claim-report",
    version,
    about = "Generate first-inspection PDF reports from a claims table",
    long_about = "Reads a claims table (CSV, TSV or spreadsheet), attaches photos found \
under an optional photo directory, renders each claim through an HTML template and \
converts it to PDF with wkhtmltopdf. One report per claim; failed claims are listed \
at the end and never stop the batch.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Claims table (.csv, .tsv, .xlsx, .xls, .ods).
    data_file: PathBuf,

    /// Directory for the generated PDFs (created if missing).
    #[arg(short, long, env = "CLAIM_REPORT_OUTPUT")]
    output: PathBuf,

    /// Root of the claim photo tree.
    #[arg(long, env = "CLAIM_REPORT_PHOTOS")]
    photos: Option<PathBuf>,

    /// Directory holding the report template.
    /// Default: TEMPLATES_DIR from --settings, else ./templates.
    #[arg(long, env = "CLAIM_REPORT_TEMPLATES")]
    templates: Option<PathBuf>,

    /// Template file name inside the templates directory.
    #[arg(long, env = "CLAIM_REPORT_TEMPLATE", default_value = "inspection_template.html")]
    template: String,

    /// JSON object passed to the template as `config`.
    #[arg(long, env = "CLAIM_REPORT_SETTINGS")]
    settings: Option<PathBuf>,

    /// wkhtmltopdf binary (default: WKHTMLTOPDF_PATH, well-known paths, PATH).
    #[arg(long)]
    wkhtmltopdf: Option<PathBuf>,

    /// Number report ids 000001, 000002, … instead of random suffixes.
    #[arg(long, env = "CLAIM_REPORT_SEQUENTIAL_IDS")]
    sequential_ids: bool,

    /// Use the fixed default reserve figures instead of random ones.
    #[arg(long, env = "CLAIM_REPORT_FIXED_RESERVES")]
    fixed_reserves: bool,

    /// Exit with an error if any claim failed.
    #[arg(long, env = "CLAIM_REPORT_STRICT")]
    strict: bool,

    /// Print the batch result (BatchOutput) as JSON on stdout.
    #[arg(long, env = "CLAIM_REPORT_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "CLAIM_REPORT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "CLAIM_REPORT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "CLAIM_REPORT_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new_dynamic() as Arc<dyn BatchProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    let output = process_claims(&cli.data_file, &cli.output, cli.photos.as_deref(), &config)
        .await
        .context("Report generation failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&output, show_progress);
    }

    if cli.strict {
        output
            .into_result()
            .context("Some claims could not be rendered")?;
    }

    Ok(())
}

/// Paths on stdout (one per line) so the output can be piped; failures on
/// stderr.
fn print_summary(output: &BatchOutput, progress_shown: bool) {
    for path in output.paths() {
        println!("{}", path.display());
    }

    if !progress_shown {
        eprintln!(
            "Generated {}/{} reports in {}ms",
            output.stats.succeeded, output.stats.total, output.stats.duration_ms
        );
    }
    if output.stats.skipped > 0 {
        eprintln!("  {} claims skipped", output.stats.skipped);
    }
    for failure in &output.failures {
        eprintln!("  {} {}", red("✗"), failure);
    }
}

/// Map CLI args to `ReportConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ReportConfig> {
    let mut builder = ReportConfig::builder().template_name(&cli.template);

    let mut settings_templates_dir = None;
    if let Some(ref path) = cli.settings {
        let settings = ReportConfig::load_settings(path)
            .with_context(|| format!("Failed to load settings from {:?}", path))?;
        settings_templates_dir = settings
            .get("TEMPLATES_DIR")
            .and_then(|v| v.as_str())
            .map(PathBuf::from);
        builder = builder.settings(settings);
    }

    if let Some(dir) = cli.templates.clone().or(settings_templates_dir) {
        builder = builder.templates_dir(dir);
    }

    if let Some(ref path) = cli.wkhtmltopdf {
        // Resolve here so a bad path fails before the claims are read.
        let engine = WkhtmltopdfEngine::new(path).context("Invalid --wkhtmltopdf")?;
        builder = builder.engine(Arc::new(engine));
    }

    if cli.sequential_ids {
        builder = builder.report_ids(Arc::new(SequentialReportId::starting_at(1)));
    }
    if cli.fixed_reserves {
        builder = builder.reserves(Arc::new(FixedReserves::default()));
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
