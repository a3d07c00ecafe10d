//! Configuration types for claim report generation.
//!
//! All batch behaviour is controlled through [`ReportConfig`], built via its
//! [`ReportConfigBuilder`]. Keeping every knob in one struct makes it easy to
//! share a config between the eager and streaming entry points and to log
//! exactly what a run used.
//!
//! The `settings` map is opaque to the pipeline: it is handed to the template
//! as the `config` binding and nothing else reads it.

use crate::engine::PdfEngine;
use crate::error::ReportError;
use crate::pipeline::enrich::{ReportIdGenerator, ReserveGenerator};
use crate::pipeline::photos::{RoomCategory, SpecialImageKeywords};
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Template rendered when none is configured.
pub const DEFAULT_TEMPLATE: &str = "inspection_template.html";

/// Configuration for a report batch.
///
/// Built via [`ReportConfig::builder()`] or using [`ReportConfig::default()`].
///
/// # Example
/// ```rust
/// use claim_report::ReportConfig;
///
/// let config = ReportConfig::builder()
///     .templates_dir("templates")
///     .template_name("inspection_template.html")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ReportConfig {
    /// Directory holding the report template. Default: `templates`.
    pub templates_dir: PathBuf,

    /// File name of the template inside `templates_dir`.
    /// Default: [`DEFAULT_TEMPLATE`].
    pub template_name: String,

    /// Display settings passed through to the template as `config`.
    pub settings: Map<String, Value>,

    /// wkhtmltopdf layout flags.
    pub pdf_options: PdfOptions,

    /// Room categories in report order. Default: [`RoomCategory::defaults`].
    pub room_categories: Vec<RoomCategory>,

    /// Keywords for header, footer and front-of-property images.
    pub special_images: SpecialImageKeywords,

    /// Pre-constructed PDF engine. Takes precedence over `wkhtmltopdf_path`.
    pub engine: Option<Arc<dyn PdfEngine>>,

    /// Explicit wkhtmltopdf binary. If None along with `engine`, the binary
    /// is located via `WKHTMLTOPDF_PATH`, well-known paths, then `PATH`.
    pub wkhtmltopdf_path: Option<PathBuf>,

    /// Report id strategy. If None, random suffixes are used.
    pub report_ids: Option<Arc<dyn ReportIdGenerator>>,

    /// Reserve figure strategy. If None, random placeholder figures are used.
    pub reserves: Option<Arc<dyn ReserveGenerator>>,

    /// Receives per-claim progress events.
    pub progress_callback: Option<ProgressCallback>,

    /// Checked between claims; once set, remaining claims are skipped.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            templates_dir: PathBuf::from("templates"),
            template_name: DEFAULT_TEMPLATE.to_string(),
            settings: default_settings(),
            pdf_options: PdfOptions::default(),
            room_categories: RoomCategory::defaults(),
            special_images: SpecialImageKeywords::default(),
            engine: None,
            wkhtmltopdf_path: None,
            report_ids: None,
            reserves: None,
            progress_callback: None,
            cancel: None,
        }
    }
}

impl fmt::Debug for ReportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportConfig")
            .field("templates_dir", &self.templates_dir)
            .field("template_name", &self.template_name)
            .field("settings", &self.settings)
            .field("pdf_options", &self.pdf_options)
            .field("room_categories", &self.room_categories)
            .field("special_images", &self.special_images)
            .field("engine", &self.engine.as_ref().map(|e| e.name().to_string()))
            .field("wkhtmltopdf_path", &self.wkhtmltopdf_path)
            .field("report_ids", &self.report_ids.as_ref().map(|_| "<dyn ReportIdGenerator>"))
            .field("reserves", &self.reserves.as_ref().map(|_| "<dyn ReserveGenerator>"))
            .field("progress_callback", &self.progress_callback.is_some())
            .field("cancel", &self.cancel.is_some())
            .finish()
    }
}

impl ReportConfig {
    /// Create a new builder for `ReportConfig`.
    pub fn builder() -> ReportConfigBuilder {
        ReportConfigBuilder {
            config: Self::default(),
        }
    }

    /// `true` once the caller has requested cancellation.
    pub fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|flag| flag.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    /// Read a settings map from a JSON object file.
    pub fn load_settings(path: &Path) -> Result<Map<String, Value>, ReportError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ReportError::InvalidConfig(format!("cannot read settings '{}': {e}", path.display()))
        })?;
        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(ReportError::InvalidConfig(format!(
                "settings '{}' must be a JSON object",
                path.display()
            ))),
            Err(e) => Err(ReportError::InvalidConfig(format!(
                "settings '{}' is not valid JSON: {e}",
                path.display()
            ))),
        }
    }
}

/// Display settings shipped with the stock template.
pub fn default_settings() -> Map<String, Value> {
    let value = json!({
        "APP_NAME": "Inspection Pro",
        "VERSION": env!("CARGO_PKG_VERSION"),
        "DEFAULT_INDEMNITY": "25,000.00",
        "DEFAULT_EXPENSE_RESERVE": "3,500.00",
        "DEFAULT_TOTAL_RESERVE": "10,000.00",
        "COMPANY_INFO": {
            "name": "Your Company",
            "logo": "company_logo.png",
            "contact": {
                "email": "reports@yourcompany.com",
                "phone": "(123) 456-7890"
            }
        },
        "REPORT_SETTINGS": {
            "default_margins": "15mm",
            "header_height": "20mm",
            "footer_height": "10mm"
        }
    });
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Builder for [`ReportConfig`].
#[derive(Debug)]
pub struct ReportConfigBuilder {
    config: ReportConfig,
}

impl ReportConfigBuilder {
    pub fn templates_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.templates_dir = dir.into();
        self
    }

    pub fn template_name(mut self, name: impl Into<String>) -> Self {
        self.config.template_name = name.into();
        self
    }

    /// Replace the settings map wholesale.
    pub fn settings(mut self, settings: Map<String, Value>) -> Self {
        self.config.settings = settings;
        self
    }

    /// Set one settings key, keeping the rest.
    pub fn setting(mut self, key: impl Into<String>, value: Value) -> Self {
        self.config.settings.insert(key.into(), value);
        self
    }

    pub fn pdf_options(mut self, options: PdfOptions) -> Self {
        self.config.pdf_options = options;
        self
    }

    pub fn room_categories(mut self, rooms: Vec<RoomCategory>) -> Self {
        self.config.room_categories = rooms;
        self
    }

    pub fn special_images(mut self, keywords: SpecialImageKeywords) -> Self {
        self.config.special_images = keywords;
        self
    }

    pub fn engine(mut self, engine: Arc<dyn PdfEngine>) -> Self {
        self.config.engine = Some(engine);
        self
    }

    pub fn wkhtmltopdf_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.wkhtmltopdf_path = Some(path.into());
        self
    }

    pub fn report_ids(mut self, ids: Arc<dyn ReportIdGenerator>) -> Self {
        self.config.report_ids = Some(ids);
        self
    }

    pub fn reserves(mut self, reserves: Arc<dyn ReserveGenerator>) -> Self {
        self.config.reserves = Some(reserves);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    pub fn cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.config.cancel = Some(flag);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ReportConfig, ReportError> {
        let c = &self.config;
        if c.template_name.trim().is_empty() {
            return Err(ReportError::InvalidConfig(
                "Template name must not be empty".into(),
            ));
        }
        if Path::new(&c.template_name).components().count() != 1 {
            return Err(ReportError::InvalidConfig(format!(
                "Template name must be a bare file name, got '{}'",
                c.template_name
            )));
        }
        if let Some(room) = c
            .room_categories
            .iter()
            .find(|r| r.name.trim().is_empty() || r.keywords.iter().all(|k| k.is_empty()))
        {
            return Err(ReportError::InvalidConfig(format!(
                "Room category {:?} needs a name and at least one keyword",
                room.name
            )));
        }
        Ok(self.config)
    }
}

// ── PDF layout ───────────────────────────────────────────────────────────

/// Layout flags passed to wkhtmltopdf.
///
/// Defaults give room for the running header image (3 cm top margin), embed
/// images by absolute path (`enable-local-file-access`), and keep sizes
/// print-accurate (`disable-smart-shrinking`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfOptions {
    pub margin_top: String,
    pub margin_bottom: String,
    pub margin_left: Option<String>,
    pub margin_right: Option<String>,
    pub page_size: Option<String>,
    pub encoding: String,
    pub header_spacing: Option<u32>,
    pub footer_spacing: Option<u32>,
    pub enable_local_file_access: bool,
    pub disable_smart_shrinking: bool,
    pub quiet: bool,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            margin_top: "3cm".into(),
            margin_bottom: "2cm".into(),
            margin_left: None,
            margin_right: None,
            page_size: None,
            encoding: "UTF-8".into(),
            header_spacing: Some(5),
            footer_spacing: Some(5),
            enable_local_file_access: true,
            disable_smart_shrinking: true,
            quiet: true,
        }
    }
}

impl PdfOptions {
    /// Render as wkhtmltopdf command-line flags.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        let mut flag = |name: &str, value: Option<String>| {
            args.push(format!("--{name}"));
            if let Some(v) = value {
                args.push(v);
            }
        };

        flag("margin-top", Some(self.margin_top.clone()));
        flag("margin-bottom", Some(self.margin_bottom.clone()));
        if let Some(ref m) = self.margin_left {
            flag("margin-left", Some(m.clone()));
        }
        if let Some(ref m) = self.margin_right {
            flag("margin-right", Some(m.clone()));
        }
        if let Some(ref size) = self.page_size {
            flag("page-size", Some(size.clone()));
        }
        flag("encoding", Some(self.encoding.clone()));
        if let Some(n) = self.header_spacing {
            flag("header-spacing", Some(n.to_string()));
        }
        if let Some(n) = self.footer_spacing {
            flag("footer-spacing", Some(n.to_string()));
        }
        if self.enable_local_file_access {
            flag("enable-local-file-access", None);
        }
        if self.disable_smart_shrinking {
            flag("disable-smart-shrinking", None);
        }
        if self.quiet {
            flag("quiet", None);
        }
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_builds() {
        let config = ReportConfig::builder().build().unwrap();
        assert_eq!(config.template_name, DEFAULT_TEMPLATE);
        assert_eq!(config.templates_dir, PathBuf::from("templates"));
        assert_eq!(config.room_categories.len(), 5);
        assert!(!config.is_cancelled());
    }

    #[test]
    fn template_name_must_be_bare() {
        let err = ReportConfig::builder()
            .template_name("../secret.html")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("bare file name"));

        assert!(ReportConfig::builder().template_name("  ").build().is_err());
    }

    #[test]
    fn rooms_need_keywords() {
        let err = ReportConfig::builder()
            .room_categories(vec![RoomCategory::new("GARAGE", &[])])
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("GARAGE"));
    }

    #[test]
    fn cancel_flag_is_observed() {
        let flag = Arc::new(AtomicBool::new(false));
        let config = ReportConfig::builder()
            .cancel_flag(Arc::clone(&flag))
            .build()
            .unwrap();
        assert!(!config.is_cancelled());
        flag.store(true, Ordering::SeqCst);
        assert!(config.is_cancelled());
    }

    #[test]
    fn default_settings_carry_company_info() {
        let settings = default_settings();
        assert_eq!(settings["APP_NAME"], json!("Inspection Pro"));
        assert_eq!(
            settings["COMPANY_INFO"]["contact"]["phone"],
            json!("(123) 456-7890")
        );
    }

    #[test]
    fn settings_file_must_be_an_object() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.json");
        std::fs::write(&good, r#"{"APP_NAME": "Adjuster Desk"}"#).unwrap();
        let map = ReportConfig::load_settings(&good).unwrap();
        assert_eq!(map["APP_NAME"], json!("Adjuster Desk"));

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "[1, 2]").unwrap();
        assert!(ReportConfig::load_settings(&bad).is_err());
    }

    #[test]
    fn pdf_options_render_wkhtmltopdf_flags() {
        let args = PdfOptions::default().to_args();
        assert_eq!(
            args,
            vec![
                "--margin-top",
                "3cm",
                "--margin-bottom",
                "2cm",
                "--encoding",
                "UTF-8",
                "--header-spacing",
                "5",
                "--footer-spacing",
                "5",
                "--enable-local-file-access",
                "--disable-smart-shrinking",
                "--quiet",
            ]
        );
    }
}
