// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline state machine.
//
//   Idle -> Scanning -> Quantizing -> Rendering -> Done
//
// Any stage may instead move to Failed, which is terminal.

use std::time::Duration;

use scanopt_core::error::{DeviceError, ScanoptError};

/// Why a run ended in [`PipelineState::Failed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The request was rejected before the scanner was touched.
    Precondition(String),
    Device(String),
    Timeout(Duration),
    Cancelled,
    Quantize(String),
    Render(String),
}

impl FailureReason {
    pub fn from_error(err: &ScanoptError) -> Self {
        match err {
            ScanoptError::Device(DeviceError::Timeout(limit)) => Self::Timeout(*limit),
            ScanoptError::Device(DeviceError::Cancelled) => Self::Cancelled,
            ScanoptError::Device(device) => Self::Device(device.to_string()),
            ScanoptError::Image(image) => Self::Quantize(image.to_string()),
            ScanoptError::Render(render) => Self::Render(render.to_string()),
            other => Self::Precondition(other.to_string()),
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Precondition(msg)
            | Self::Device(msg)
            | Self::Quantize(msg)
            | Self::Render(msg) => f.write_str(msg),
            Self::Timeout(limit) => write!(f, "scanner did not finish within {limit:?}"),
            Self::Cancelled => f.write_str("scan cancelled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Scanning,
    Quantizing,
    Rendering,
    Done,
    Failed(FailureReason),
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed(_))
    }

    /// Short label for progress displays.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Scanning => "scanning",
            Self::Quantizing => "optimizing",
            Self::Rendering => "writing PDF",
            Self::Done => "done",
            Self::Failed(_) => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanopt_core::error::ImageError;

    #[test]
    fn timeout_keeps_its_own_reason() {
        let err = ScanoptError::Device(DeviceError::Timeout(Duration::from_secs(120)));
        let reason = FailureReason::from_error(&err);
        assert_eq!(reason, FailureReason::Timeout(Duration::from_secs(120)));
        assert_eq!(reason.to_string(), err.to_string());
    }

    #[test]
    fn stage_errors_keep_their_message() {
        let err = ScanoptError::Image(ImageError::DecodeFailed {
            path: "/tmp/t/tempScan.pnm".into(),
            reason: "bad header".into(),
        });
        let reason = FailureReason::from_error(&err);
        assert!(matches!(reason, FailureReason::Quantize(_)));
        assert_eq!(reason.to_string(), err.to_string());
    }

    #[test]
    fn only_done_and_failed_are_terminal() {
        assert!(PipelineState::Done.is_terminal());
        assert!(PipelineState::Failed(FailureReason::Cancelled).is_terminal());
        assert!(!PipelineState::Rendering.is_terminal());
        assert!(!PipelineState::Idle.is_terminal());
    }
}
