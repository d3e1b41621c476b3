// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanner configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default external scan utility (SANE's command-line frontend).
pub const DEFAULT_UTILITY: &str = "scanimage";

/// Settings that stay constant across scans, passed explicitly into the
/// pipeline instead of living in process-wide state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Program executed by the device invoker.
    pub utility: String,
    /// Scanner device identifier. `None` lets the utility pick its default.
    pub device_name: Option<String>,
    /// Upper bound on the wait for the scan utility, in seconds.
    pub timeout_secs: u64,
    /// Retain `tempScan.pnm` after the run (useful when debugging a driver).
    pub keep_intermediate: bool,
    /// Page size for the rendered document.
    pub paper_size: crate::PaperSize,
}

impl ScannerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            utility: DEFAULT_UTILITY.into(),
            device_name: None,
            timeout_secs: 120,
            keep_intermediate: false,
            paper_size: crate::PaperSize::A4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: ScannerConfig =
            serde_json::from_str(r#"{"device_name":"epson2:libusb:001:004"}"#).expect("parse");
        assert_eq!(config.device_name.as_deref(), Some("epson2:libusb:001:004"));
        assert_eq!(config.utility, "scanimage");
        assert_eq!(config.timeout(), Duration::from_secs(120));
        assert!(!config.keep_intermediate);
    }
}
