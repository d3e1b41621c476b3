// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// scanopt — scan one page from a flatbed and write an optimized PNG and a
// single-page A4 PDF.
//
// Entry point. Initialises logging, merges saved settings with command-line
// overrides, runs the pipeline once and remembers the settings for next time.

mod settings;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use scanopt_core::human_errors::humanize_error;
use scanopt_core::{PipelineResult, Resolution, ScanRequest};
use scanopt_pipeline::Pipeline;

use settings::{DEFAULT_FILE_NAME, Settings};

#[derive(Debug, Parser)]
#[command(name = "scanopt", version, about = "Scan a page and save it as an optimized PNG and PDF")]
struct Cli {
    /// Directory receiving the PNG and PDF [saved setting, default: $HOME]
    #[arg(long, value_name = "DIR")]
    workdir: Option<PathBuf>,

    /// Base file name of the outputs, without extension [default: scan]
    #[arg(long)]
    name: Option<String>,

    /// Scan resolution in dpi: 75, 100, 200 or 300 [default: 200]
    #[arg(long, value_name = "DPI")]
    resolution: Option<Resolution>,

    /// Scanner device identifier passed to the scan utility
    #[arg(long)]
    device: Option<String>,

    /// Scan utility to execute [default: scanimage]
    #[arg(long, value_name = "PROGRAM")]
    utility: Option<String>,

    /// Give up on the scanner after this many seconds [default: 120]
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,

    /// Keep the raw tempScan.pnm next to the outputs
    #[arg(long)]
    keep_intermediate: bool,

    /// Print the result as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Settings file [default: $HOME/.scan_and_optimize]
    #[arg(long, value_name = "PATH", env = "SCANOPT_SETTINGS")]
    settings: Option<PathBuf>,

    /// Do not write the settings file after the run
    #[arg(long)]
    no_save: bool,
}

impl Cli {
    fn apply_to(&self, settings: &mut Settings) {
        if let Some(dir) = &self.workdir {
            settings.working_directory = dir.clone();
        }
        if let Some(name) = &self.name {
            settings.file_name = name.clone();
        }
        if let Some(resolution) = self.resolution {
            settings.resolution = resolution;
        }
        if let Some(device) = &self.device {
            settings.device = Some(device.clone());
        }
        if let Some(utility) = &self.utility {
            settings.utility = utility.clone();
        }
        if let Some(timeout) = self.timeout {
            settings.timeout_secs = timeout;
        }
    }
}

/// Put back the previously saved file name after the request rejected the
/// current one, falling back to the default if that one is invalid too.
fn forget_rejected_file_name(settings: &mut Settings, previous: String) {
    let previous_is_valid =
        ScanRequest::new(&settings.working_directory, previous.as_str(), settings.resolution).is_ok();
    settings.file_name = if previous_is_valid {
        previous
    } else {
        DEFAULT_FILE_NAME.to_string()
    };
    tracing::warn!(file_name = %settings.file_name, "Rejected file name not saved");
}

fn main() -> ExitCode {
    // Logs go to stderr so `--json` output stays parseable.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::info!("scanopt starting");

    let settings_path = cli.settings.clone().unwrap_or_else(Settings::default_path);
    let mut settings = Settings::load(&settings_path);
    let saved_file_name = settings.file_name.clone();
    cli.apply_to(&mut settings);

    let mut config = settings.scanner_config();
    config.keep_intermediate = cli.keep_intermediate;

    let request = ScanRequest::new(
        &settings.working_directory,
        settings.file_name.as_str(),
        settings.resolution,
    );
    let request_valid = request.is_ok();
    let outcome = request.and_then(|request| {
        Pipeline::for_request(&config, &request)
            .execute(&request, |state| tracing::debug!(state = state.label(), "progress"))
            .map(|()| request)
    });

    let result = match &outcome {
        Ok(_) => PipelineResult::succeeded(),
        Err(err) => PipelineResult::failed(err.to_string()),
    };

    if cli.json {
        match serde_json::to_string(&result) {
            Ok(json) => println!("{json}"),
            Err(err) => tracing::error!(%err, "Could not serialise result"),
        }
    } else {
        match &outcome {
            Ok(request) => println!(
                "Saved {} and {}",
                request.png_path().display(),
                request.pdf_path().display()
            ),
            Err(err) => {
                let human = humanize_error(err);
                eprintln!("Scan failed: {err}");
                eprintln!("{} {}", human.message, human.suggestion);
            }
        }
    }

    if !cli.no_save {
        if !request_valid {
            forget_rejected_file_name(&mut settings, saved_file_name);
        }
        if let Err(err) = settings.save(&settings_path) {
            tracing::warn!(%err, "Settings were not saved");
        }
    }

    if result.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_saved_settings() {
        let cli = Cli::parse_from([
            "scanopt",
            "--workdir",
            "/srv/scans",
            "--name",
            "receipt",
            "--resolution",
            "75",
            "--device",
            "test:0",
            "--timeout",
            "30",
        ]);
        let mut settings = Settings::defaults(std::path::Path::new("/home/operator"));
        cli.apply_to(&mut settings);

        assert_eq!(settings.working_directory, PathBuf::from("/srv/scans"));
        assert_eq!(settings.file_name, "receipt");
        assert_eq!(settings.resolution, Resolution::Dpi75);
        assert_eq!(settings.device.as_deref(), Some("test:0"));
        assert_eq!(settings.timeout_secs, 30);
        assert_eq!(settings.utility, "scanimage");
    }

    #[test]
    fn rejected_file_name_is_not_remembered() {
        let cli = Cli::parse_from(["scanopt", "--name", "../escape", "--resolution", "300"]);
        let mut settings = Settings::defaults(std::path::Path::new("/home/operator"));
        settings.file_name = "invoice".into();
        let previous = settings.file_name.clone();
        cli.apply_to(&mut settings);
        assert!(
            ScanRequest::new(&settings.working_directory, settings.file_name.as_str(), settings.resolution)
                .is_err()
        );

        forget_rejected_file_name(&mut settings, previous);

        assert_eq!(settings.file_name, "invoice");
        assert_eq!(settings.resolution, Resolution::Dpi300);
    }

    #[test]
    fn invalid_saved_file_name_falls_back_to_default() {
        let mut settings = Settings::defaults(std::path::Path::new("/home/operator"));
        settings.file_name = "a/b".into();
        forget_rejected_file_name(&mut settings, "..".into());
        assert_eq!(settings.file_name, "scan");
    }

    #[test]
    fn unsupported_resolution_is_rejected() {
        assert!(Cli::try_parse_from(["scanopt", "--resolution", "600"]).is_err());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        assert!(Cli::try_parse_from(["scanopt", "--timeout", "0"]).is_err());
    }

    #[test]
    fn no_flags_leave_settings_untouched() {
        let cli = Cli::parse_from(["scanopt"]);
        let mut settings = Settings::defaults(std::path::Path::new("/home/operator"));
        let before = settings.clone();
        cli.apply_to(&mut settings);
        assert_eq!(settings, before);
        assert!(!cli.keep_intermediate && !cli.json && !cli.no_save);
    }
}
