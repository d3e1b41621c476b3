// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the scanopt pipeline.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ScanoptError;

/// File stem of the intermediate raw scan inside the working directory.
pub const INTERMEDIATE_STEM: &str = "tempScan";

/// Extension of the raw raster format requested from the scan utility.
pub const RAW_EXTENSION: &str = "pnm";

/// Unique identifier for a single pipeline run (used in log spans).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Scan resolutions offered by the flatbed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Resolution {
    Dpi75,
    Dpi100,
    #[default]
    Dpi200,
    Dpi300,
}

impl Resolution {
    pub const ALL: [Resolution; 4] = [Self::Dpi75, Self::Dpi100, Self::Dpi200, Self::Dpi300];

    /// Dots per inch.
    pub fn dpi(&self) -> u32 {
        match self {
            Self::Dpi75 => 75,
            Self::Dpi100 => 100,
            Self::Dpi200 => 200,
            Self::Dpi300 => 300,
        }
    }

    pub fn from_dpi(dpi: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.dpi() == dpi)
    }
}

impl TryFrom<u32> for Resolution {
    type Error = String;

    fn try_from(dpi: u32) -> Result<Self, Self::Error> {
        Self::from_dpi(dpi).ok_or_else(|| format!("unsupported resolution: {dpi} dpi"))
    }
}

impl From<Resolution> for u32 {
    fn from(resolution: Resolution) -> u32 {
        resolution.dpi()
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dpi())
    }
}

impl std::str::FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let dpi: u32 = s
            .trim()
            .parse()
            .map_err(|_| format!("not a resolution: {s:?}"))?;
        Self::try_from(dpi)
    }
}

/// Standard paper sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaperSize {
    A4,
    A5,
    Letter,
    Legal,
    Custom { width_mm: u32, height_mm: u32 },
}

impl PaperSize {
    /// Dimensions in millimetres (width, height), portrait.
    pub fn dimensions_mm(&self) -> (u32, u32) {
        match self {
            Self::A4 => (210, 297),
            Self::A5 => (148, 210),
            Self::Letter => (216, 279),
            Self::Legal => (216, 356),
            Self::Custom {
                width_mm,
                height_mm,
            } => (*width_mm, *height_mm),
        }
    }
}

/// One request to scan a single page, as supplied by the operator.
///
/// Immutable once constructed; [`ScanRequest::new`] rejects file names that
/// could escape the working directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanRequest {
    working_directory: PathBuf,
    base_file_name: String,
    resolution: Resolution,
}

impl ScanRequest {
    pub fn new(
        working_directory: impl Into<PathBuf>,
        base_file_name: impl Into<String>,
        resolution: Resolution,
    ) -> Result<Self, ScanoptError> {
        let base_file_name = base_file_name.into();
        validate_base_name(&base_file_name)?;
        Ok(Self {
            working_directory: working_directory.into(),
            base_file_name,
            resolution,
        })
    }

    pub fn working_directory(&self) -> &Path {
        &self.working_directory
    }

    pub fn base_file_name(&self) -> &str {
        &self.base_file_name
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// `<wd>/tempScan.pnm`
    pub fn raw_path(&self) -> PathBuf {
        self.working_directory
            .join(format!("{INTERMEDIATE_STEM}.{RAW_EXTENSION}"))
    }

    /// `<wd>/<base>.png`
    pub fn png_path(&self) -> PathBuf {
        self.working_directory
            .join(format!("{}.png", self.base_file_name))
    }

    /// `<wd>/<base>.pdf`
    pub fn pdf_path(&self) -> PathBuf {
        self.working_directory
            .join(format!("{}.pdf", self.base_file_name))
    }
}

fn validate_base_name(name: &str) -> Result<(), ScanoptError> {
    if name.trim().is_empty() {
        return Err(ScanoptError::InvalidRequest("file name is empty".into()));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(ScanoptError::InvalidRequest(format!(
            "file name {name:?} must not contain path separators"
        )));
    }
    if name == "." || name == ".." || name.contains('\0') {
        return Err(ScanoptError::InvalidRequest(format!(
            "file name {name:?} is not a valid file name"
        )));
    }
    Ok(())
}

/// Outcome of one pipeline run, handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub success: bool,
    /// Present iff `success` is false.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error_message: Option<String>,
}

impl PipelineResult {
    pub fn succeeded() -> Self {
        Self {
            success: true,
            error_message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_message: Some(message.into()),
        }
    }
}
