//! Pipeline stages for claim report generation.
//!
//! Each submodule implements exactly one transformation step, so each can
//! be tested on its own and swapped (e.g. another PDF engine) without
//! touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! load ──▶ enrich ──▶ render
//! (table)   (ids, photos, reserves)   (tera → PDF engine)
//!             ▲
//!           photos
//! ```
//!
//! 1. [`load`]   — read the claims table (CSV/TSV or spreadsheet) into
//!    ordered records with normalised blanks
//! 2. [`photos`] — index a photo tree; pick header/footer/front images and
//!    group the rest by room
//! 3. [`enrich`] — attach report id, photos, reserve figures and itemised
//!    scope to each record
//! 4. [`render`] — render the HTML template and hand it to the PDF engine

pub mod enrich;
pub mod load;
pub mod photos;
pub mod render;
