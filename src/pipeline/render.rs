//! Report rendering: enriched claim → HTML (tera) → PDF (engine).
//!
//! The template is read and parsed on every call to
//! [`ReportRenderer::render`]. Batches are small and a template edited
//! mid-run takes effect for the next claim; more importantly a broken
//! template fails each claim with a [`ClaimError`] instead of aborting the
//! batch up front.
//!
//! The PDF is first written to a temp file inside the output directory and
//! then renamed onto its final name, so a crashed engine never leaves a
//! truncated report behind.

use crate::claim::{value_text, EnrichedClaim, ADDRESS, CLAIM_NUMBER, POLICYHOLDER};
use crate::config::{PdfOptions, ReportConfig};
use crate::engine::PdfEngine;
use crate::error::{tera_error_chain, ClaimError};
use chrono::format::{Item, StrftimeItems};
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tera::{Context, Tera};
use tracing::{debug, info};

/// Pattern used by `format_date` when the template gives none.
pub const DEFAULT_DATE_FORMAT: &str = "%B %d, %Y";

/// Format of the `now` binding.
pub const NOW_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Every report file name starts with this.
pub const REPORT_PREFIX: &str = "FIRST INSPECTION REPORT";

static RE_PATH_SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[/\\]").unwrap());

// ── Template helpers ─────────────────────────────────────────────────────

/// Reformat an ISO `YYYY-MM-DD` date with a strftime `pattern`.
///
/// Null becomes `"N/A"`. Anything that does not parse as a date, or a
/// pattern chrono cannot format, yields the value's text unchanged.
///
/// ```rust
/// use claim_report::pipeline::render::format_date;
/// use serde_json::json;
///
/// assert_eq!(format_date(&json!("2024-03-05"), None), "March 05, 2024");
/// assert_eq!(format_date(&json!(null), None), "N/A");
/// assert_eq!(format_date(&json!("not-a-date"), None), "not-a-date");
/// ```
pub fn format_date(value: &Value, pattern: Option<&str>) -> String {
    let text = match value {
        Value::Null => return "N/A".to_string(),
        Value::String(s) => s.clone(),
        other => value_text(other).unwrap_or_default(),
    };

    let pattern = pattern.unwrap_or(DEFAULT_DATE_FORMAT);
    if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
        return text;
    }

    let parsed = NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
        .map(|date| date.and_time(NaiveTime::MIN))
        .or_else(|_| NaiveDateTime::parse_from_str(text.trim(), "%Y-%m-%d %H:%M:%S"));
    let Ok(parsed) = parsed else {
        return text;
    };

    // chrono reports fields it cannot supply (e.g. `%z`) as a fmt error.
    let mut out = String::new();
    match write!(out, "{}", parsed.format(pattern)) {
        Ok(()) => out,
        Err(_) => text,
    }
}

/// tera adapter for [`format_date`]: `{{ value | format_date(fmt="%d %b %Y") }}`.
fn format_date_filter(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let pattern = match args.get("fmt") {
        None => None,
        Some(Value::String(s)) => Some(s.as_str()),
        Some(other) => {
            return Err(tera::Error::msg(format!(
                "format_date: `fmt` must be a string, got {other}"
            )))
        }
    };
    Ok(Value::String(format_date(value, pattern)))
}

// ── File naming ──────────────────────────────────────────────────────────

/// Output file name for `claim`.
///
/// `FIRST INSPECTION REPORT - CLAIM# {claim} - {FIRST NAME} - {address}.pdf`
/// where the first name is the policyholder's first whitespace token in
/// upper case and the address has commas removed and spaces turned into
/// underscores. Path separators inside any segment become `-`.
pub fn report_file_name(claim: &EnrichedClaim) -> Result<String, ClaimError> {
    let claim_number = required(claim, CLAIM_NUMBER)?;
    let holder = required(claim, POLICYHOLDER)?;
    let address = required(claim, ADDRESS)?;

    let first_name = holder
        .split_whitespace()
        .next()
        .map(str::to_uppercase)
        .ok_or_else(|| missing(POLICYHOLDER))?;
    let address = address.replace(',', "").replace(' ', "_");

    Ok(format!(
        "{REPORT_PREFIX} - CLAIM# {} - {} - {}.pdf",
        sanitise_segment(&claim_number),
        sanitise_segment(&first_name),
        sanitise_segment(&address),
    ))
}

fn required(claim: &EnrichedClaim, field: &str) -> Result<String, ClaimError> {
    claim.text(field).ok_or_else(|| missing(field))
}

fn missing(field: &str) -> ClaimError {
    ClaimError::MissingField {
        field: field.to_string(),
    }
}

fn sanitise_segment(segment: &str) -> String {
    RE_PATH_SEPARATORS.replace_all(segment, "-").into_owned()
}

// ── Renderer ─────────────────────────────────────────────────────────────

/// Turns enriched claims into PDF files.
#[derive(Clone)]
pub struct ReportRenderer {
    templates_dir: PathBuf,
    template_name: String,
    settings: Map<String, Value>,
    pdf_options: PdfOptions,
    engine: Arc<dyn PdfEngine>,
}

impl std::fmt::Debug for ReportRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportRenderer")
            .field("templates_dir", &self.templates_dir)
            .field("template_name", &self.template_name)
            .field("pdf_options", &self.pdf_options)
            .field("engine", &self.engine.name())
            .finish_non_exhaustive()
    }
}

impl ReportRenderer {
    pub fn new(config: &ReportConfig, engine: Arc<dyn PdfEngine>) -> Self {
        Self {
            templates_dir: config.templates_dir.clone(),
            template_name: config.template_name.clone(),
            settings: config.settings.clone(),
            pdf_options: config.pdf_options.clone(),
            engine,
        }
    }

    pub fn template_path(&self) -> PathBuf {
        self.templates_dir.join(&self.template_name)
    }

    /// Render `claim` to HTML with `now` set to the current local time.
    pub fn render_html(&self, claim: &EnrichedClaim) -> Result<String, ClaimError> {
        self.render_html_at(claim, Local::now().naive_local())
    }

    /// Render `claim` to HTML with an explicit `now`.
    pub fn render_html_at(
        &self,
        claim: &EnrichedClaim,
        now: NaiveDateTime,
    ) -> Result<String, ClaimError> {
        let path = self.template_path();
        let source = std::fs::read_to_string(&path).map_err(|e| ClaimError::TemplateMissing {
            path: path.clone(),
            detail: e.to_string(),
        })?;

        let mut tera = Tera::default();
        // Escape every template, whatever its file extension.
        tera.autoescape_on(vec![""]);
        tera.register_filter("format_date", format_date_filter);
        tera.add_raw_template(&self.template_name, &source)
            .map_err(|e| ClaimError::TemplateSyntax {
                template: self.template_name.clone(),
                detail: tera_error_chain(&e),
            })?;

        let mut context = Context::new();
        context.insert("claim", claim);
        context.insert("config", &self.settings);
        context.insert("now", &now.format(NOW_FORMAT).to_string());

        tera.render(&self.template_name, &context)
            .map_err(|e| ClaimError::TemplateRender {
                template: self.template_name.clone(),
                detail: tera_error_chain(&e),
            })
    }

    /// Render `claim` into a PDF inside `output_dir`, returning its path.
    ///
    /// An existing file of the same name is replaced.
    pub fn render(&self, claim: &EnrichedClaim, output_dir: &Path) -> Result<PathBuf, ClaimError> {
        let file_name = report_file_name(claim)?;
        let target = output_dir.join(&file_name);
        let html = self.render_html(claim)?;

        let staging = tempfile::Builder::new()
            .prefix(".claim-report-")
            .suffix(".pdf")
            .tempfile_in(output_dir)
            .map_err(|e| ClaimError::OutputWriteFailed {
                path: target.clone(),
                detail: e.to_string(),
            })?
            .into_temp_path();

        debug!(
            "Converting {} bytes of HTML with {} into {}",
            html.len(),
            self.engine.name(),
            staging.display()
        );
        self.engine
            .html_to_pdf(&html, &staging, &self.pdf_options)
            .map_err(|e| ClaimError::Render {
                path: target.clone(),
                detail: e.to_string(),
            })?;

        staging
            .persist(&target)
            .map_err(|e| ClaimError::OutputWriteFailed {
                path: target.clone(),
                detail: e.error.to_string(),
            })?;

        info!("Generated report: {}", target.display());
        Ok(target)
    }
}
