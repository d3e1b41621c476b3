// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Error taxonomy for scanopt. Each pipeline stage has its own error type; the
// top-level `ScanoptError` wraps them for callers that deal with several
// stages at once.

use std::path::PathBuf;

use thiserror::Error;

/// Failures of the external scan utility or of persisting its output.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The utility could not be started at all (missing binary, no exec bit).
    #[error("failed to launch {utility}: {source}")]
    Launch {
        utility: String,
        #[source]
        source: std::io::Error,
    },

    /// The utility exited non-zero. `message` is its diagnostic text, shown
    /// to the operator verbatim.
    #[error("{message}")]
    Failed { code: Option<i32>, message: String },

    /// Exit status 0, but nothing arrived on standard output.
    #[error("scanner returned no image data")]
    NoImageData,

    #[error("scanner did not finish within {0:?}")]
    Timeout(std::time::Duration),

    #[error("scan cancelled")]
    Cancelled,

    #[error("failed to write raw scan to {}: {source}", path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures of the raster quantizer.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("failed to decode raw scan {}: {reason}", path.display())]
    DecodeFailed { path: PathBuf, reason: String },

    #[error("failed to write image {}: {reason}", path.display())]
    WriteFailed { path: PathBuf, reason: String },
}

/// Failures of the document renderer.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Covers both an unembeddable source image and an unwritable target.
    #[error("failed to write document {}: {reason}", path.display())]
    WriteFailed { path: PathBuf, reason: String },

    /// A rendered document could not be read back.
    #[error("failed to inspect document {}: {reason}", path.display())]
    InspectFailed { path: PathBuf, reason: String },
}

/// Top-level error type for all scanopt operations.
#[derive(Debug, Error)]
pub enum ScanoptError {
    // -- Pipeline stages --
    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error(transparent)]
    Render(#[from] RenderError),

    // -- Request / configuration --
    #[error("invalid scan request: {0}")]
    InvalidRequest(String),

    #[error("settings error: {0}")]
    Settings(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ScanoptError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_failure_displays_diagnostic_verbatim() {
        let err = ScanoptError::from(DeviceError::Failed {
            code: Some(1),
            message: "device busy".into(),
        });
        assert_eq!(err.to_string(), "device busy");
    }

    #[test]
    fn image_error_names_the_path() {
        let err = ImageError::DecodeFailed {
            path: PathBuf::from("/tmp/t/tempScan.pnm"),
            reason: "unexpected end of file".into(),
        };
        let text = err.to_string();
        assert!(text.contains("/tmp/t/tempScan.pnm"));
        assert!(text.contains("unexpected end of file"));
    }
}
