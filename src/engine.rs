//! HTML-to-PDF engines.
//!
//! The pipeline only needs one capability from an engine: write the PDF
//! for a rendered HTML string to a path. [`PdfEngine`] captures that, so
//! the real [`WkhtmltopdfEngine`] can be swapped for an in-process fake in
//! tests, or for another converter entirely.
//!
//! An engine is an explicitly constructed, immutable value. The binary is
//! resolved once, when the engine is built; per-claim calls never probe
//! the filesystem for it again.

use crate::config::PdfOptions;
use crate::error::ReportError;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;
use tracing::debug;
use wkhtmltopdf_locate::{engine_version, locate_with, locate_wkhtmltopdf};

/// Failure inside an engine invocation.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine process could not be started.
    #[error("could not start '{binary}': {source}")]
    Spawn {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The engine ran but reported failure.
    #[error("engine exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    /// The engine exited cleanly but left no usable file.
    #[error("engine produced no output at '{0}'")]
    NoOutput(PathBuf),

    #[error("I/O error talking to the engine: {0}")]
    Io(#[from] std::io::Error),
}

/// Converts rendered HTML into a PDF file.
///
/// Implementations must be `Send + Sync`: the batch runs each conversion on
/// tokio's blocking pool.
pub trait PdfEngine: Send + Sync {
    /// Short human-readable name for logs.
    fn name(&self) -> &str;

    /// Write the PDF rendering of `html` to `output`.
    fn html_to_pdf(&self, html: &str, output: &Path, options: &PdfOptions)
        -> Result<(), EngineError>;
}

/// Drives a `wkhtmltopdf` binary, feeding HTML on stdin.
#[derive(Debug, Clone)]
pub struct WkhtmltopdfEngine {
    binary: PathBuf,
}

impl WkhtmltopdfEngine {
    /// Use the binary at `path`, which must exist.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, ReportError> {
        let binary = locate_with(Some(path.as_ref()))
            .map_err(|e| ReportError::Configuration(e.to_string()))?;
        Ok(Self { binary })
    }

    /// Locate wkhtmltopdf via `WKHTMLTOPDF_PATH`, well-known install
    /// paths, then `PATH`.
    pub fn locate() -> Result<Self, ReportError> {
        let binary = locate_wkhtmltopdf().map_err(|e| ReportError::Configuration(e.to_string()))?;
        debug!("Using wkhtmltopdf at {}", binary.display());
        Ok(Self { binary })
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Run `wkhtmltopdf --version` to confirm the binary starts.
    pub fn verify(&self) -> Result<String, ReportError> {
        engine_version(&self.binary).map_err(|e| ReportError::Configuration(e.to_string()))
    }

    fn command(&self, output: &Path, options: &PdfOptions) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(options.to_args())
            .arg("-")
            .arg(output)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd
    }
}

impl PdfEngine for WkhtmltopdfEngine {
    fn name(&self) -> &str {
        "wkhtmltopdf"
    }

    fn html_to_pdf(
        &self,
        html: &str,
        output: &Path,
        options: &PdfOptions,
    ) -> Result<(), EngineError> {
        let mut cmd = self.command(output, options);
        debug!("Running {:?}", cmd);

        let mut child = cmd.spawn().map_err(|source| EngineError::Spawn {
            binary: self.binary.clone(),
            source,
        })?;

        // Feed stdin from a separate thread so a chatty stderr cannot
        // deadlock against a full stdin pipe.
        let writer = child.stdin.take().map(|mut stdin| {
            let html = html.to_owned();
            std::thread::spawn(move || stdin.write_all(html.as_bytes()))
        });

        let result = child.wait_with_output()?;
        let written = writer.map(|handle| handle.join());

        if !result.status.success() {
            return Err(EngineError::Failed {
                status: result.status.to_string(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        match written {
            Some(Ok(write_result)) => write_result?,
            Some(Err(_)) => {
                return Err(EngineError::Io(std::io::Error::other(
                    "stdin writer thread panicked",
                )))
            }
            None => {}
        }

        match std::fs::metadata(output) {
            Ok(meta) if meta.len() > 0 => Ok(()),
            _ => Err(EngineError::NoOutput(output.to_path_buf())),
        }
    }
}
