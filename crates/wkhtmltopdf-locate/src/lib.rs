//! # wkhtmltopdf-locate
//!
//! Find a usable [wkhtmltopdf](https://wkhtmltopdf.org/) binary so that
//! callers can construct their PDF engine once, at startup, and fail fast
//! when the machine has no engine installed.
//!
//! ## How it works
//!
//! [`locate_wkhtmltopdf`] probes, in order (first match wins):
//!
//! 1. `WKHTMLTOPDF_PATH` — path to an existing binary; skips all probing.
//! 2. The well-known install locations in [`WELL_KNOWN_PATHS`].
//! 3. Every directory on `PATH`.
//!
//! The result is cached for the lifetime of the process. Use
//! [`locate_with`] to bypass the cache, or to pin an explicit path.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use wkhtmltopdf_locate::{engine_version, locate_wkhtmltopdf};
//!
//! let bin = locate_wkhtmltopdf().expect("wkhtmltopdf not installed");
//! println!("{} ({})", bin.display(), engine_version(&bin).unwrap_or_default());
//! ```

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

use thiserror::Error;

// ── Public constants ─────────────────────────────────────────────────────────

/// Environment variable pointing at an explicit wkhtmltopdf binary.
pub const ENV_OVERRIDE: &str = "WKHTMLTOPDF_PATH";

/// Install locations probed before falling back to `PATH`, in order.
pub const WELL_KNOWN_PATHS: &[&str] = &[
    r"C:\Program Files\wkhtmltopdf\bin\wkhtmltopdf.exe",
    "/usr/local/bin/wkhtmltopdf",
    "/usr/bin/wkhtmltopdf",
];

#[cfg(windows)]
const BINARY_NAME: &str = "wkhtmltopdf.exe";
#[cfg(not(windows))]
const BINARY_NAME: &str = "wkhtmltopdf";

// ── Error type ───────────────────────────────────────────────────────────────

/// Errors returned while locating or probing the engine.
#[derive(Error, Debug)]
pub enum LocateError {
    /// No candidate location held a binary.
    #[error("wkhtmltopdf not found (probed {} locations plus PATH)", probed.len())]
    NotFound { probed: Vec<PathBuf> },

    /// A binary exists but could not be executed.
    #[error("Failed to run wkhtmltopdf at '{path}': {reason}")]
    Probe { path: PathBuf, reason: String },
}

// ── Thread-safe singleton path cache ─────────────────────────────────────────

static RESOLVED_PATH: OnceLock<PathBuf> = OnceLock::new();

// ── Public API ───────────────────────────────────────────────────────────────

/// Locate wkhtmltopdf, caching the answer for the rest of the process.
///
/// Safe to call from multiple threads; the probe may run more than once
/// under a race but every caller observes the same cached path afterwards.
pub fn locate_wkhtmltopdf() -> Result<PathBuf, LocateError> {
    if let Some(path) = RESOLVED_PATH.get() {
        return Ok(path.clone());
    }

    let path = locate_with(None)?;
    let _ = RESOLVED_PATH.set(path.clone());
    Ok(path)
}

/// Locate wkhtmltopdf without touching the process-wide cache.
///
/// An `explicit` path is authoritative: if it does not exist, no other
/// location is tried.
pub fn locate_with(explicit: Option<&Path>) -> Result<PathBuf, LocateError> {
    if let Some(path) = explicit {
        return if path.is_file() {
            Ok(path.to_path_buf())
        } else {
            Err(LocateError::NotFound {
                probed: vec![path.to_path_buf()],
            })
        };
    }

    let mut candidates = Vec::with_capacity(WELL_KNOWN_PATHS.len() + 1);
    // An override that points nowhere still falls through to the defaults.
    if let Some(env_path) = std::env::var_os(ENV_OVERRIDE) {
        if !env_path.is_empty() {
            candidates.push(PathBuf::from(env_path));
        }
    }
    candidates.extend(WELL_KNOWN_PATHS.iter().map(PathBuf::from));

    let path_var = std::env::var_os("PATH");
    search_candidates(&candidates, path_var.as_deref())
}

/// Return the first existing file among `candidates`, then among the
/// directories listed in `path_var` (a `PATH`-style string).
pub fn search_candidates(
    candidates: &[PathBuf],
    path_var: Option<&OsStr>,
) -> Result<PathBuf, LocateError> {
    if let Some(hit) = candidates.iter().find(|p| p.is_file()) {
        return Ok(hit.clone());
    }

    let mut probed = candidates.to_vec();
    if let Some(dirs) = path_var {
        for dir in std::env::split_paths(dirs) {
            let candidate = dir.join(BINARY_NAME);
            if candidate.is_file() {
                return Ok(candidate);
            }
            probed.push(candidate);
        }
    }

    Err(LocateError::NotFound { probed })
}

/// Run `<path> --version` and return its trimmed stdout.
///
/// Confirms the binary actually starts (right architecture, shared
/// libraries present) rather than merely existing on disk.
pub fn engine_version(path: &Path) -> Result<String, LocateError> {
    let output = Command::new(path)
        .arg("--version")
        .output()
        .map_err(|e| LocateError::Probe {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(LocateError::Probe {
            path: path.to_path_buf(),
            reason: format!(
                "exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
