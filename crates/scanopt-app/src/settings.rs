// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Operator settings persisted between runs as a flat `key=value` file in the
// home directory.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, SecondsFormat};
use scanopt_core::config::DEFAULT_UTILITY;
use scanopt_core::error::{Result, ScanoptError};
use scanopt_core::{Resolution, ScannerConfig};
use tracing::{debug, info, warn};

/// File name of the settings file inside `$HOME`.
pub const SETTINGS_FILE_NAME: &str = ".scan_and_optimize";

/// Default base name for scan outputs.
pub const DEFAULT_FILE_NAME: &str = "scan";

const KEY_RESOLUTION: &str = "resolution";
const KEY_WORKDIR: &str = "scanworkdir";
const KEY_FILE_NAME: &str = "scanfilename";
const KEY_DEVICE: &str = "device";
const KEY_UTILITY: &str = "utility";
const KEY_TIMEOUT: &str = "timeout";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub resolution: Resolution,
    pub working_directory: PathBuf,
    pub file_name: String,
    pub device: Option<String>,
    pub utility: String,
    pub timeout_secs: u64,
    /// Keys this tool does not use (e.g. `colormode` written by older
    /// frontends), kept in file order so a save does not drop them.
    pub extra: Vec<(String, String)>,
}

impl Settings {
    /// Defaults with the working directory set to `home`.
    pub fn defaults(home: &Path) -> Self {
        let config = ScannerConfig::default();
        Self {
            resolution: Resolution::default(),
            working_directory: home.to_path_buf(),
            file_name: DEFAULT_FILE_NAME.into(),
            device: None,
            utility: DEFAULT_UTILITY.into(),
            timeout_secs: config.timeout_secs,
            extra: Vec::new(),
        }
    }

    /// `$HOME/.scan_and_optimize`.
    pub fn default_path() -> PathBuf {
        home_dir().join(SETTINGS_FILE_NAME)
    }

    /// Load settings from `path`. A missing or unreadable file yields the
    /// defaults; a scan must never be blocked by a broken settings file.
    pub fn load(path: &Path) -> Self {
        let home = home_dir();
        match std::fs::read_to_string(path) {
            Ok(text) => {
                debug!(path = %path.display(), "Loaded settings");
                Self::parse(&text, &home)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No settings file; using defaults");
                Self::defaults(&home)
            }
            Err(err) => {
                warn!(path = %path.display(), %err, "Could not read settings; using defaults");
                Self::defaults(&home)
            }
        }
    }

    /// Parse the `key=value` format on top of the defaults.
    pub fn parse(text: &str, home: &Path) -> Self {
        let mut settings = Self::defaults(home);

        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                warn!(line = index + 1, content = line, "Ignoring settings line without '='");
                continue;
            };
            settings.apply(key.trim(), value.trim(), index + 1);
        }

        settings
    }

    fn apply(&mut self, key: &str, value: &str, line: usize) {
        match key {
            KEY_RESOLUTION => match value.parse() {
                Ok(resolution) => self.resolution = resolution,
                Err(reason) => warn!(line, %reason, "Invalid resolution; keeping default"),
            },
            KEY_WORKDIR if !value.is_empty() => self.working_directory = PathBuf::from(value),
            KEY_FILE_NAME if !value.is_empty() => self.file_name = value.to_string(),
            KEY_DEVICE => self.device = (!value.is_empty()).then(|| value.to_string()),
            KEY_UTILITY if !value.is_empty() => self.utility = value.to_string(),
            KEY_TIMEOUT => match value.parse::<u64>() {
                Ok(secs) if secs > 0 => self.timeout_secs = secs,
                _ => warn!(line, value, "Invalid timeout; keeping default"),
            },
            KEY_WORKDIR | KEY_FILE_NAME | KEY_UTILITY => {
                warn!(line, key, "Empty value; keeping default")
            }
            _ => {
                debug!(line, key, "Preserving unknown settings key");
                self.extra.push((key.to_string(), value.to_string()));
            }
        }
    }

    /// Serialise with a `# last change` header stamped `now`.
    pub fn render(&self, now: DateTime<Local>) -> String {
        let mut out = format!(
            "# last change: {}\n",
            now.to_rfc3339_opts(SecondsFormat::Secs, false)
        );
        let mut line = |key: &str, value: &str| {
            out.push_str(key);
            out.push('=');
            out.push_str(value);
            out.push('\n');
        };
        line(KEY_RESOLUTION, &self.resolution.to_string());
        line(KEY_WORKDIR, &self.working_directory.display().to_string());
        line(KEY_FILE_NAME, &self.file_name);
        line(KEY_DEVICE, self.device.as_deref().unwrap_or(""));
        line(KEY_UTILITY, &self.utility);
        line(KEY_TIMEOUT, &self.timeout_secs.to_string());
        for (key, value) in &self.extra {
            line(key, value);
        }
        out
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.render(Local::now())).map_err(|err| {
            ScanoptError::Settings(format!("cannot write {}: {err}", path.display()))
        })?;
        info!(path = %path.display(), "Settings saved");
        Ok(())
    }

    /// Scanner configuration derived from these settings.
    pub fn scanner_config(&self) -> ScannerConfig {
        ScannerConfig {
            utility: self.utility.clone(),
            device_name: self.device.clone(),
            timeout_secs: self.timeout_secs,
            ..ScannerConfig::default()
        }
    }
}

fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/tmp"))
}
