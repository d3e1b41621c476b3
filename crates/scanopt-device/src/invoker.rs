// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Device invoker — spawns the scan utility, waits for it with an upper bound,
// and stores its standard output as the intermediate raw scan.
//
// Standard output carries image bytes and standard error carries diagnostics;
// the two pipes are read separately and never merged.

use std::path::PathBuf;
use std::process::{Output, Stdio};
use std::time::Duration;

use scanopt_core::error::DeviceError;
use scanopt_core::{ScanRequest, ScannerConfig};
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

use crate::cancel::CancelToken;
use crate::command::ScanCommand;

/// Runs one scan at a time against the configured utility.
#[derive(Debug, Clone)]
pub struct DeviceInvoker {
    config: ScannerConfig,
    timeout: Duration,
}

impl DeviceInvoker {
    pub fn new(config: ScannerConfig) -> Self {
        let timeout = config.timeout();
        Self { config, timeout }
    }

    /// Override the wait limit taken from the configuration.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Scan one page and write it to `request.raw_path()`.
    ///
    /// Blocks the calling thread until the utility exits, the timeout
    /// elapses, or `cancel` fires. Must not be called from inside an async
    /// runtime; use `spawn_blocking` there.
    #[instrument(skip_all, fields(dpi = request.resolution().dpi(), utility = %self.config.utility))]
    pub fn invoke(
        &self,
        request: &ScanRequest,
        cancel: &CancelToken,
    ) -> Result<PathBuf, DeviceError> {
        if cancel.is_cancelled() {
            return Err(DeviceError::Cancelled);
        }

        let command = ScanCommand::build(&self.config, request);
        info!(%command, "Starting scan");

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|source| DeviceError::Launch {
                utility: self.config.utility.clone(),
                source,
            })?;
        let output = runtime.block_on(run_to_completion(&command, self.timeout, cancel))?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            let message = diagnostic_text(&output, command.program());
            warn!(code = ?output.status.code(), %message, "Scan utility failed");
            return Err(DeviceError::Failed {
                code: output.status.code(),
                message,
            });
        }
        if !stderr.trim().is_empty() {
            debug!(stderr = %stderr.trim(), "Scan utility wrote diagnostics");
        }
        if output.stdout.is_empty() {
            return Err(DeviceError::NoImageData);
        }

        let raw_path = request.raw_path();
        std::fs::write(&raw_path, &output.stdout).map_err(|source| DeviceError::WriteFailed {
            path: raw_path.clone(),
            source,
        })?;

        info!(
            bytes = output.stdout.len(),
            path = %raw_path.display(),
            "Raw scan written"
        );
        Ok(raw_path)
    }
}

/// Spawn `command` and collect both pipes, racing the exit against the
/// timeout and the cancellation token. The child is killed when it loses.
async fn run_to_completion(
    command: &ScanCommand,
    timeout: Duration,
    cancel: &CancelToken,
) -> Result<Output, DeviceError> {
    let child = Command::new(command.program())
        .args(command.args())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| DeviceError::Launch {
            utility: command.program().to_string(),
            source,
        })?;
    debug!(pid = ?child.id(), "Scan utility spawned");

    tokio::select! {
        waited = tokio::time::timeout(timeout, child.wait_with_output()) => match waited {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(err)) => Err(DeviceError::Failed {
                code: None,
                message: format!("lost contact with {}: {err}", command.program()),
            }),
            Err(_) => {
                warn!(?timeout, "Scan utility timed out; killing it");
                Err(DeviceError::Timeout(timeout))
            }
        },
        _ = cancel.cancelled() => {
            info!("Scan cancelled; killing scan utility");
            Err(DeviceError::Cancelled)
        }
    }
}

/// Text shown to the operator for a failed run: stderr, else stdout if it is
/// text rather than partial image data, else the bare exit status.
fn diagnostic_text(output: &Output, program: &str) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        return stderr.trim().to_string();
    }
    if let Ok(stdout) = std::str::from_utf8(&output.stdout) {
        if !stdout.trim().is_empty() {
            return stdout.trim().to_string();
        }
    }
    match output.status.code() {
        Some(code) => format!("{program} exited with status {code}"),
        None => format!("{program} was terminated by a signal"),
    }
}

// -- Tests --------------------------------------------------------------------

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use std::sync::Mutex;
    use std::time::Instant;

    use scanopt_core::Resolution;

    /// Serialises writing and executing stub scripts; a script still open
    /// for writing in a forked sibling cannot be exec'd (ETXTBSY).
    static SPAWN_LOCK: Mutex<()> = Mutex::new(());

    fn stub_utility(dir: &Path, body: &str) -> String {
        let path = dir.join("fake-scanimage");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write stub");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("chmod stub");
        path.display().to_string()
    }

    fn invoker_for(utility: String) -> DeviceInvoker {
        DeviceInvoker::new(ScannerConfig {
            utility,
            device_name: Some("test:device".into()),
            ..Default::default()
        })
    }

    fn request_in(dir: &Path) -> ScanRequest {
        ScanRequest::new(dir, "scan", Resolution::Dpi200).expect("valid request")
    }

    #[test]
    fn success_writes_stdout_verbatim() {
        let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = tempfile::tempdir().expect("tempdir");
        let utility = stub_utility(
            dir.path(),
            "printf 'P6\\n1 1\\n255\\nabc'\necho 'scanning...' >&2",
        );

        let raw = invoker_for(utility)
            .invoke(&request_in(dir.path()), &CancelToken::new())
            .expect("scan");

        assert_eq!(raw, dir.path().join("tempScan.pnm"));
        // stderr chatter must not end up in the image bytes.
        assert_eq!(std::fs::read(&raw).expect("read raw"), b"P6\n1 1\n255\nabc");
    }

    #[test]
    fn passes_argument_vector_unchanged() {
        let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = tempfile::tempdir().expect("tempdir");
        let args_file = dir.path().join("args.txt");
        let utility = stub_utility(
            dir.path(),
            &format!("printf '%s\\n' \"$@\" > '{}'\nprintf 'x'", args_file.display()),
        );

        invoker_for(utility)
            .invoke(&request_in(dir.path()), &CancelToken::new())
            .expect("scan");

        let recorded = std::fs::read_to_string(&args_file).expect("read args");
        let recorded: Vec<&str> = recorded.lines().collect();
        assert_eq!(
            recorded,
            [
                "--device-name=test:device",
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
    fn failure_reports_stderr() {
        let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = tempfile::tempdir().expect("tempdir");
        let utility = stub_utility(dir.path(), "echo 'device busy' >&2\nexit 1");

        let err = invoker_for(utility)
            .invoke(&request_in(dir.path()), &CancelToken::new())
            .expect_err("must fail");

        match err {
            DeviceError::Failed { code, message } => {
                assert_eq!(code, Some(1));
                assert_eq!(message, "device busy");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!dir.path().join("tempScan.pnm").exists());
    }

    #[test]
    fn failure_falls_back_to_stdout_then_status() {
        let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = tempfile::tempdir().expect("tempdir");

        let utility = stub_utility(dir.path(), "echo 'no scanners were identified'\nexit 3");
        let err = invoker_for(utility)
            .invoke(&request_in(dir.path()), &CancelToken::new())
            .expect_err("must fail");
        assert_eq!(err.to_string(), "no scanners were identified");

        let utility = stub_utility(dir.path(), "exit 4");
        let err = invoker_for(utility.clone())
            .invoke(&request_in(dir.path()), &CancelToken::new())
            .expect_err("must fail");
        assert_eq!(err.to_string(), format!("{utility} exited with status 4"));
    }

    #[test]
    fn binary_stdout_is_not_shown_as_diagnostic() {
        let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = tempfile::tempdir().expect("tempdir");
        let utility = stub_utility(dir.path(), "printf 'P6\\n2 1\\n255\\n\\377\\376\\375\\200'\nexit 2");

        let err = invoker_for(utility.clone())
            .invoke(&request_in(dir.path()), &CancelToken::new())
            .expect_err("must fail");
        assert_eq!(err.to_string(), format!("{utility} exited with status 2"));
    }

    #[test]
    fn empty_output_is_no_image_data() {
        let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = tempfile::tempdir().expect("tempdir");
        let utility = stub_utility(dir.path(), "exit 0");

        let err = invoker_for(utility)
            .invoke(&request_in(dir.path()), &CancelToken::new())
            .expect_err("must fail");
        assert!(matches!(err, DeviceError::NoImageData));
    }

    #[test]
    fn missing_utility_is_launch_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let utility = dir.path().join("does-not-exist").display().to_string();

        let err = invoker_for(utility)
            .invoke(&request_in(dir.path()), &CancelToken::new())
            .expect_err("must fail");
        assert!(matches!(err, DeviceError::Launch { .. }));
    }

    #[test]
    fn hung_utility_times_out() {
        let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = tempfile::tempdir().expect("tempdir");
        let utility = stub_utility(dir.path(), "exec sleep 30");

        let started = Instant::now();
        let err = invoker_for(utility)
            .with_timeout(Duration::from_millis(200))
            .invoke(&request_in(dir.path()), &CancelToken::new())
            .expect_err("must time out");

        assert!(matches!(err, DeviceError::Timeout(_)));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn cancel_stops_a_running_scan() {
        let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = tempfile::tempdir().expect("tempdir");
        let utility = stub_utility(dir.path(), "exec sleep 30");

        let cancel = CancelToken::new();
        let remote = cancel.clone();
        let canceller = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(100));
            remote.cancel();
        });

        let started = Instant::now();
        let err = invoker_for(utility)
            .invoke(&request_in(dir.path()), &cancel)
            .expect_err("must be cancelled");
        canceller.join().expect("join canceller");

        assert!(matches!(err, DeviceError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn pre_cancelled_token_never_spawns() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = invoker_for("/nonexistent/scanimage".into())
            .invoke(&request_in(dir.path()), &cancel)
            .expect_err("must be cancelled");
        assert!(matches!(err, DeviceError::Cancelled));
    }
}
