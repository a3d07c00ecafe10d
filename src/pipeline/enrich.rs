//! Claim enrichment: turn a raw row into a render-ready [`EnrichedClaim`].
//!
//! Enrichment never fails. A missing photo root yields a photo-less claim,
//! and everything else is either copied or synthesised.
//!
//! Two inputs are strategies rather than hard-coded behaviour so tests and
//! stricter deployments can swap them out:
//!
//! * [`ReportIdGenerator`] — random 6-hex suffix by default, or a
//!   per-process counter via [`SequentialReportId`].
//! * [`ReserveGenerator`] — placeholder reserve figures, random by default,
//!   fixed via [`FixedReserves`]. They are not derived from claim content.

use crate::claim::{value_text, ClaimRecord, EnrichedClaim, SCOPE_OF_WORK};
use crate::config::ReportConfig;
use crate::pipeline::photos::{PhotoIndex, RoomCategory, SpecialImageKeywords};
use chrono::NaiveDate;
use rand::Rng;
use serde_json::Value;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

// ── Report ids ───────────────────────────────────────────────────────────

/// Produces the `report_id` stamped on each report.
pub trait ReportIdGenerator: Send + Sync {
    /// Return a fresh id of the form `FIR-<YYYYMMDD>-<6 hex>`.
    fn next_id(&self, today: NaiveDate) -> String;
}

/// Random suffix taken from a v4 UUID.
///
/// Uniqueness is probabilistic: 24 bits per day, ample for batches of a
/// few hundred claims.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomReportId;

impl ReportIdGenerator for RandomReportId {
    fn next_id(&self, today: NaiveDate) -> String {
        let hex = uuid::Uuid::new_v4().simple().to_string();
        format_report_id(today, &hex[..6].to_uppercase())
    }
}

/// Monotonic counter, unique within one process.
#[derive(Debug, Default)]
pub struct SequentialReportId {
    next: AtomicU64,
}

impl SequentialReportId {
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }
}

impl ReportIdGenerator for SequentialReportId {
    fn next_id(&self, today: NaiveDate) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed) & 0xFF_FFFF;
        format_report_id(today, &format!("{n:06X}"))
    }
}

fn format_report_id(today: NaiveDate, suffix: &str) -> String {
    format!("FIR-{}-{}", today.format("%Y%m%d"), suffix)
}

// ── Reserve figures ──────────────────────────────────────────────────────

/// Whole-dollar reserve amounts for one claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReserveFigures {
    pub indemnity: u64,
    pub expense: u64,
    pub total: u64,
}

/// Supplies placeholder reserve figures.
pub trait ReserveGenerator: Send + Sync {
    fn draw(&self) -> ReserveFigures;
}

/// Uniform draws from fixed half-open ranges.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomReserves;

impl RandomReserves {
    pub const INDEMNITY: std::ops::Range<u64> = 20_000..30_000;
    pub const EXPENSE: std::ops::Range<u64> = 3_000..6_000;
    pub const TOTAL: std::ops::Range<u64> = 8_000..12_000;
}

impl ReserveGenerator for RandomReserves {
    fn draw(&self) -> ReserveFigures {
        let mut rng = rand::thread_rng();
        ReserveFigures {
            indemnity: rng.gen_range(Self::INDEMNITY),
            expense: rng.gen_range(Self::EXPENSE),
            total: rng.gen_range(Self::TOTAL),
        }
    }
}

/// The same figures for every claim.
#[derive(Debug, Clone, Copy)]
pub struct FixedReserves(pub ReserveFigures);

impl Default for FixedReserves {
    fn default() -> Self {
        Self(ReserveFigures {
            indemnity: 25_000,
            expense: 3_500,
            total: 10_000,
        })
    }
}

impl ReserveGenerator for FixedReserves {
    fn draw(&self) -> ReserveFigures {
        self.0
    }
}

/// `25000` → `"25,000.00"`.
pub fn format_currency(amount: u64) -> String {
    let digits = amount.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped.push_str(".00");
    grouped
}

// ── Scope of work ────────────────────────────────────────────────────────

/// Split free text into trimmed, non-empty lines.
pub fn itemise_scope(value: &Value) -> Vec<String> {
    let Some(text) = value_text(value) else {
        return Vec::new();
    };
    text.split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

// ── Enricher ─────────────────────────────────────────────────────────────

/// Builds [`EnrichedClaim`]s.
#[derive(Clone)]
pub struct ClaimEnricher {
    ids: Arc<dyn ReportIdGenerator>,
    reserves: Arc<dyn ReserveGenerator>,
    rooms: Vec<RoomCategory>,
    special: SpecialImageKeywords,
}

impl Default for ClaimEnricher {
    fn default() -> Self {
        Self {
            ids: Arc::new(RandomReportId),
            reserves: Arc::new(RandomReserves),
            rooms: RoomCategory::defaults(),
            special: SpecialImageKeywords::default(),
        }
    }
}

impl std::fmt::Debug for ClaimEnricher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaimEnricher")
            .field("rooms", &self.rooms)
            .field("special", &self.special)
            .finish_non_exhaustive()
    }
}

impl ClaimEnricher {
    /// Enricher using the strategies and keyword sets in `config`.
    pub fn from_config(config: &ReportConfig) -> Self {
        Self {
            ids: config
                .report_ids
                .clone()
                .unwrap_or_else(|| Arc::new(RandomReportId)),
            reserves: config
                .reserves
                .clone()
                .unwrap_or_else(|| Arc::new(RandomReserves)),
            rooms: config.room_categories.clone(),
            special: config.special_images.clone(),
        }
    }

    pub fn with_report_ids(mut self, ids: Arc<dyn ReportIdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_reserves(mut self, reserves: Arc<dyn ReserveGenerator>) -> Self {
        self.reserves = reserves;
        self
    }

    /// Enrich `claim`, dating its report id today (local time).
    pub fn enrich(&self, claim: ClaimRecord, photo_root: Option<&Path>) -> EnrichedClaim {
        self.enrich_on(claim, photo_root, chrono::Local::now().date_naive())
    }

    /// Enrich `claim` with an explicit report date.
    pub fn enrich_on(
        &self,
        mut claim: ClaimRecord,
        photo_root: Option<&Path>,
        today: NaiveDate,
    ) -> EnrichedClaim {
        let report_id = self.ids.next_id(today);

        let scope_of_work = claim
            .shift_remove(SCOPE_OF_WORK)
            .map(|raw| itemise_scope(&raw));

        let mut enriched = EnrichedClaim {
            fields: claim,
            report_id,
            header_image: None,
            footer_image: None,
            front_photo: None,
            photos: Vec::new(),
            indemnity_amount: String::new(),
            expense_reserve: String::new(),
            total_reserve: String::new(),
            scope_of_work,
        };

        match photo_root {
            Some(root) if root.is_dir() => self.attach_photos(&mut enriched, root),
            Some(root) => warn!("Photos directory not found: {}", root.display()),
            None => {}
        }

        let figures = self.reserves.draw();
        enriched.indemnity_amount = format_currency(figures.indemnity);
        enriched.expense_reserve = format_currency(figures.expense);
        enriched.total_reserve = format_currency(figures.total);

        enriched
    }

    fn attach_photos(&self, claim: &mut EnrichedClaim, root: &Path) {
        let index = PhotoIndex::scan(root);

        claim.header_image = index.find_special(&self.special.header);
        claim.footer_image = index.find_special(&self.special.footer);
        claim.front_photo = index.find_special(&self.special.front);

        let claimed: Vec<_> = [&claim.header_image, &claim.footer_image, &claim.front_photo]
            .into_iter()
            .flatten()
            .cloned()
            .collect();
        claim.photos = index.organize_rooms(&self.rooms, &claimed);

        debug!(
            "Report {}: {} room groups, header={}, footer={}, front={}",
            claim.report_id,
            claim.photos.len(),
            claim.header_image.is_some(),
            claim.footer_image.is_some(),
            claim.front_photo.is_some()
        );
    }
}
