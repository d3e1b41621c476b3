// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the person standing at the scanner.
//
// Every technical error is mapped to plain English with a clear suggestion.
// The raw diagnostic text is still shown alongside; this only adds guidance.

use crate::error::{DeviceError, ImageError, RenderError, ScanoptError};

/// Severity of an error from the operator's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Scanner busy or a driver hiccup; scanning again may work.
    Transient,
    /// The operator must do something (power on, close lid, pick a folder).
    ActionRequired,
    /// Scanning again will not help without changing the setup.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the operator should try (shown as body text).
    pub suggestion: String,
    /// Whether pressing "scan" again is worth a try.
    pub retriable: bool,
    pub severity: Severity,
}

/// Convert a `ScanoptError` into a `HumanError`.
pub fn humanize_error(err: &ScanoptError) -> HumanError {
    match err {
        ScanoptError::Device(device) => humanize_device_error(device),

        ScanoptError::Image(ImageError::DecodeFailed { .. }) => HumanError {
            message: "The scanner sent an image we couldn't read.".into(),
            suggestion: "The scan may have been interrupted. Try scanning again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        ScanoptError::Image(ImageError::WriteFailed { .. })
        | ScanoptError::Render(RenderError::WriteFailed { .. })
        | ScanoptError::Render(RenderError::InspectFailed { .. }) => HumanError {
            message: "The scan couldn't be saved.".into(),
            suggestion: "Check that the working folder exists, that you may write to it, and that the disk isn't full.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        ScanoptError::InvalidRequest(detail) => HumanError {
            message: "The scan settings aren't valid.".into(),
            suggestion: format!("Check the folder and file name, then try again. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        ScanoptError::Settings(_) => HumanError {
            message: "The saved settings couldn't be read.".into(),
            suggestion: "Defaults were used instead. Adjust the settings and they will be saved again.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        ScanoptError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::NotFound {
                HumanError {
                    message: "The working folder couldn't be found.".into(),
                    suggestion: "It may have been moved or deleted. Choose the folder again.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else if io_err.kind() == std::io::ErrorKind::PermissionDenied {
                HumanError {
                    message: "You don't have permission to write to the working folder.".into(),
                    suggestion: "Choose a folder in your home directory instead.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "There was a problem reading or writing a file.".into(),
                    suggestion: "Try again. If this keeps happening, the disk may be full.".into(),
                    retriable: true,
                    severity: Severity::Transient,
                }
            }
        }
    }
}

fn humanize_device_error(err: &DeviceError) -> HumanError {
    match err {
        DeviceError::Launch { utility, .. } => HumanError {
            message: "The scanning program couldn't be started.".into(),
            suggestion: format!("Make sure `{utility}` (part of SANE) is installed and on the PATH."),
            retriable: false,
            severity: Severity::Permanent,
        },
        DeviceError::Failed { message, .. } => humanize_scanner_diagnostic(message),
        DeviceError::NoImageData => HumanError {
            message: "The scanner finished but sent no picture.".into(),
            suggestion: "Check that a document is on the glass and try again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },
        DeviceError::Timeout(limit) => HumanError {
            message: "The scanner didn't respond in time.".into(),
            suggestion: format!(
                "The scanner stopped answering after {} seconds. Turn it off and on again, then retry.",
                limit.as_secs()
            ),
            retriable: true,
            severity: Severity::Transient,
        },
        DeviceError::Cancelled => HumanError {
            message: "The scan was cancelled.".into(),
            suggestion: "Start the scan again when you're ready.".into(),
            retriable: true,
            severity: Severity::Transient,
        },
        DeviceError::WriteFailed { .. } => HumanError {
            message: "The scan couldn't be saved.".into(),
            suggestion: "Check that the working folder exists and that the disk isn't full.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },
    }
}

/// Parse scanner diagnostic text into a human-readable message.
fn humanize_scanner_diagnostic(detail: &str) -> HumanError {
    let lower = detail.to_ascii_lowercase();

    if lower.contains("device busy") || lower.contains("device is busy") {
        HumanError {
            message: "The scanner is busy.".into(),
            suggestion: "Another program may be using it. Wait a moment, then scan again.".into(),
            retriable: true,
            severity: Severity::Transient,
        }
    } else if lower.contains("no scanners") || lower.contains("invalid argument") {
        HumanError {
            message: "No scanner was found.".into(),
            suggestion: "Make sure the scanner is plugged in and switched on.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        }
    } else if lower.contains("access to resource has been denied")
        || lower.contains("permission denied")
    {
        HumanError {
            message: "This user isn't allowed to use the scanner.".into(),
            suggestion: "Ask an administrator to add you to the scanner group.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        }
    } else if lower.contains("cover open") || lower.contains("cover is open") {
        HumanError {
            message: "The scanner lid is open.".into(),
            suggestion: "Close the lid, then scan again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        }
    } else if lower.contains("jammed") {
        HumanError {
            message: "Paper is stuck in the scanner.".into(),
            suggestion: "Remove the stuck paper, then scan again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        }
    } else {
        HumanError {
            message: "The scanner reported a problem.".into(),
            suggestion: format!("Try again. If this keeps happening, turn the scanner off and on again. (Detail: {detail})"),
            retriable: true,
            severity: Severity::Transient,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device_failure(message: &str) -> ScanoptError {
        ScanoptError::Device(DeviceError::Failed {
            code: Some(1),
            message: message.into(),
        })
    }

    #[test]
    fn busy_scanner_is_transient() {
        let human = humanize_error(&device_failure("scanimage: open of device failed: device busy"));
        assert_eq!(human.severity, Severity::Transient);
        assert!(human.retriable);
    }

    #[test]
    fn missing_scanner_is_action_required() {
        let human = humanize_error(&device_failure("scanimage: no SANE devices found\nno scanners were identified"));
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(!human.retriable);
    }

    #[test]
    fn timeout_is_transient() {
        let human = humanize_error(&ScanoptError::Device(DeviceError::Timeout(
            std::time::Duration::from_secs(120),
        )));
        assert_eq!(human.severity, Severity::Transient);
        assert!(human.suggestion.contains("120"));
    }

    #[test]
    fn missing_utility_is_permanent() {
        let err = ScanoptError::Device(DeviceError::Launch {
            utility: "scanimage".into(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        });
        assert_eq!(humanize_error(&err).severity, Severity::Permanent);
    }

    #[test]
    fn unwritable_output_is_action_required() {
        let err = ScanoptError::Render(RenderError::WriteFailed {
            path: "/ro/scan.pdf".into(),
            reason: "read-only file system".into(),
        });
        assert_eq!(humanize_error(&err).severity, Severity::ActionRequired);
    }
}
