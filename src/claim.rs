//! Claim data model: raw rows from the input table and their render-ready
//! enriched form.
//!
//! A [`ClaimRecord`] has no fixed schema; it carries whatever columns the
//! input file has, in column order. Only a handful of column names matter to
//! the pipeline itself; they are exported as constants below.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

/// One input row: column name → scalar value, in source column order.
///
/// Blank cells are always [`Value::Null`] by the time a record leaves
/// [`crate::pipeline::load`].
pub type ClaimRecord = serde_json::Map<String, Value>;

/// Column holding the claim identifier.
pub const CLAIM_NUMBER: &str = "CLAIM #";
/// Column holding the policyholder's full name.
pub const POLICYHOLDER: &str = "INSURED/POLICYHOLDER";
/// Column holding the property address.
pub const ADDRESS: &str = "ADDRESS";
/// Free-text column itemised into a list during enrichment.
pub const SCOPE_OF_WORK: &str = "SCOPE OF WORK";

/// Up to four photos for one room category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomPhotoGroup {
    /// Category name, e.g. `KITCHEN`.
    pub room: String,
    /// Absolute image paths in lexicographic order.
    pub images: Vec<PathBuf>,
}

/// A claim ready to be rendered.
///
/// Serialises as a single flat mapping: every input column followed by the
/// enrichment fields, which win over input columns of the same name. This is
/// the `claim` binding seen by the report template.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichedClaim {
    /// Input columns, minus `SCOPE OF WORK` when it was itemised.
    #[serde(flatten)]
    pub fields: ClaimRecord,

    /// `FIR-<YYYYMMDD>-<6 hex>`.
    pub report_id: String,

    pub header_image: Option<PathBuf>,
    pub footer_image: Option<PathBuf>,
    pub front_photo: Option<PathBuf>,

    /// Room groups in category order; never contains an empty group.
    pub photos: Vec<RoomPhotoGroup>,

    /// Placeholder reserve figures, e.g. `"25,000.00"`.
    pub indemnity_amount: String,
    pub expense_reserve: String,
    pub total_reserve: String,

    /// Itemised scope lines; `None` when the input had no such column.
    #[serde(rename = "SCOPE OF WORK", skip_serializing_if = "Option::is_none")]
    pub scope_of_work: Option<Vec<String>>,
}

impl EnrichedClaim {
    /// Look up an input column.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Non-blank text of an input column, if any.
    pub fn text(&self, name: &str) -> Option<String> {
        self.field(name).and_then(value_text)
    }

    /// The claim identifier, for log lines and batch results.
    pub fn claim_id(&self) -> Option<String> {
        self.text(CLAIM_NUMBER)
    }
}

/// Display text of a scalar cell value.
///
/// Returns `None` for null and for strings that are empty after trimming.
/// Integral floats (spreadsheet numbers such as `100.0`) print without a
/// fractional part.
pub fn value_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => {
                format!("{}", f as i64)
            }
            _ => n.to_string(),
        },
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    };
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}
