// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Argument vector for the scan utility.
//
// The option set follows SANE's `scanimage`: full-color flatbed scan,
// uncompressed PNM on stdout, brightness and contrast pushed to the maximum
// so the quantizer has the widest possible separation between ink and paper.

use scanopt_core::{RAW_EXTENSION, ScanRequest, ScannerConfig};

/// Fixed device overrides, in the order they are passed.
pub const FIXED_OPTIONS: [&str; 3] = ["--mode=Color", "--source=Flatbed", "--resolution"];
pub const BRIGHTNESS: &str = "--brightness=1000";
pub const CONTRAST: &str = "--contrast=1000";
pub const COMPRESSION: &str = "--compression=None";

/// A program plus its arguments, ready to be spawned without a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanCommand {
    program: String,
    args: Vec<String>,
}

impl ScanCommand {
    /// Assemble the command for one scan. Configuration values become single
    /// arguments; a device name containing spaces stays one argument.
    pub fn build(config: &ScannerConfig, request: &ScanRequest) -> Self {
        let mut args = Vec::with_capacity(10);

        if let Some(device) = config.device_name.as_deref().filter(|d| !d.is_empty()) {
            args.push(format!("--device-name={device}"));
        }
        args.push(format!("--format={RAW_EXTENSION}"));
        args.extend(FIXED_OPTIONS.iter().map(|opt| opt.to_string()));
        args.push(request.resolution().dpi().to_string());
        args.push(BRIGHTNESS.into());
        args.push(CONTRAST.into());
        args.push(COMPRESSION.into());

        Self {
            program: config.utility.clone(),
            args,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl std::fmt::Display for ScanCommand {
    /// Human-readable form for logs only; never handed to a shell.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg:?}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanopt_core::Resolution;

    fn request(resolution: Resolution) -> ScanRequest {
        ScanRequest::new("/tmp/t", "scan", resolution).expect("valid request")
    }

    #[test]
    fn builds_full_argument_vector() {
        let config = ScannerConfig {
            device_name: Some("epson2:libusb:001:004".into()),
            ..Default::default()
        };
        let cmd = ScanCommand::build(&config, &request(Resolution::Dpi200));

        assert_eq!(cmd.program(), "scanimage");
        assert_eq!(
            cmd.args(),
            [
                "--device-name=epson2:libusb:001:004",
                "--format=pnm",
                "--mode=Color",
                "--source=Flatbed",
                "--resolution",
                "200",
                "--brightness=1000",
                "--contrast=1000",
                "--compression=None",
            ]
        );
    }

    #[test]
    fn omits_device_when_unset() {
        let cmd = ScanCommand::build(&ScannerConfig::default(), &request(Resolution::Dpi75));
        assert_eq!(cmd.args()[0], "--format=pnm");
        assert!(cmd.args().iter().all(|a| !a.starts_with("--device-name")));
        assert!(cmd.args().contains(&"75".to_string()));
    }

    #[test]
    fn shell_metacharacters_stay_inside_one_argument() {
        let config = ScannerConfig {
            device_name: Some("x; rm -rf ~".into()),
            ..Default::default()
        };
        let cmd = ScanCommand::build(&config, &request(Resolution::Dpi300));
        assert_eq!(cmd.args()[0], "--device-name=x; rm -rf ~");
        assert_eq!(cmd.args().len(), 9);
    }
}
