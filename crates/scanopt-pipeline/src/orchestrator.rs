// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline orchestrator — runs scan, quantization and rendering strictly in
// sequence on the calling thread. The first failing stage ends the run; no
// stage is retried.
//
// One run owns `tempScan.pnm` in the working directory. Two runs against the
// same directory at once would clobber each other; callers must not do that.

use std::path::{Path, PathBuf};

use scanopt_core::error::{Result, ScanoptError};
use scanopt_core::{PipelineResult, RunId, ScanRequest, ScannerConfig};
use scanopt_device::{CancelToken, DeviceInvoker};
use scanopt_document::PdfWriter;
use tracing::{debug, error, info, info_span, warn};

use crate::stages::{PaletteQuantizer, Quantizer, Renderer, Scanner};
use crate::state::{FailureReason, PipelineState};

/// Removes the intermediate raw scan when dropped, on every exit path.
struct IntermediateGuard {
    path: PathBuf,
    keep: bool,
}

impl Drop for IntermediateGuard {
    fn drop(&mut self) {
        if self.keep {
            debug!(path = %self.path.display(), "Keeping intermediate scan");
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Removed intermediate scan"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => warn!(path = %self.path.display(), %err, "Could not remove intermediate scan"),
        }
    }
}

/// One page, three stages.
pub struct Pipeline<S, Q, R> {
    scanner: S,
    quantizer: Q,
    renderer: R,
    keep_intermediate: bool,
    cancel: CancelToken,
}

impl Pipeline<DeviceInvoker, PaletteQuantizer, PdfWriter> {
    /// The production pipeline for `config`. The document is titled after
    /// the request's base file name.
    pub fn for_request(config: &ScannerConfig, request: &ScanRequest) -> Self {
        let mut writer = PdfWriter::new(config.paper_size);
        writer.set_title(request.base_file_name());
        Pipeline::new(DeviceInvoker::new(config.clone()), PaletteQuantizer, writer)
            .keep_intermediate(config.keep_intermediate)
    }
}

impl<S: Scanner, Q: Quantizer, R: Renderer> Pipeline<S, Q, R> {
    pub fn new(scanner: S, quantizer: Q, renderer: R) -> Self {
        Self {
            scanner,
            quantizer,
            renderer,
            keep_intermediate: false,
            cancel: CancelToken::new(),
        }
    }

    /// Leave `tempScan.pnm` on disk after the run.
    pub fn keep_intermediate(mut self, keep: bool) -> Self {
        self.keep_intermediate = keep;
        self
    }

    /// Use `cancel` to abort a running scan from another thread.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run the pipeline and fold the outcome into a [`PipelineResult`].
    pub fn run(&self, request: &ScanRequest) -> PipelineResult {
        self.run_with_observer(request, |_| {})
    }

    /// Like [`Pipeline::run`], reporting every state transition to `observe`.
    pub fn run_with_observer(
        &self,
        request: &ScanRequest,
        observe: impl FnMut(&PipelineState),
    ) -> PipelineResult {
        match self.execute(request, observe) {
            Ok(()) => PipelineResult::succeeded(),
            Err(err) => PipelineResult::failed(err.to_string()),
        }
    }

    /// Run the pipeline, returning the typed error of the failing stage.
    pub fn execute(
        &self,
        request: &ScanRequest,
        mut observe: impl FnMut(&PipelineState),
    ) -> Result<()> {
        let run_id = RunId::new();
        let span = info_span!("pipeline", %run_id, name = request.base_file_name());
        let _enter = span.enter();

        let mut transition = |state: PipelineState| {
            debug!(state = state.label(), "Pipeline state");
            observe(&state);
        };
        transition(PipelineState::Idle);

        let outcome = self.run_stages(request, &mut transition);
        match &outcome {
            Ok(()) => {
                info!(
                    png = %request.png_path().display(),
                    pdf = %request.pdf_path().display(),
                    "Scan complete"
                );
                transition(PipelineState::Done);
            }
            Err(err) => {
                error!(%err, "Scan failed");
                transition(PipelineState::Failed(FailureReason::from_error(err)));
            }
        }
        outcome
    }

    fn run_stages(
        &self,
        request: &ScanRequest,
        transition: &mut impl FnMut(PipelineState),
    ) -> Result<()> {
        check_working_directory(request.working_directory())?;

        let _intermediate = IntermediateGuard {
            path: request.raw_path(),
            keep: self.keep_intermediate,
        };

        transition(PipelineState::Scanning);
        let raw_path = self.scanner.scan(request, &self.cancel)?;

        transition(PipelineState::Quantizing);
        let png_path = request.png_path();
        self.quantizer.quantize(&raw_path, &png_path)?;

        transition(PipelineState::Rendering);
        self.renderer.render(&png_path, &request.pdf_path())?;

        Ok(())
    }
}

fn check_working_directory(dir: &Path) -> Result<()> {
    let metadata = std::fs::metadata(dir).map_err(|err| {
        ScanoptError::InvalidRequest(format!(
            "working directory {} is not accessible: {err}",
            dir.display()
        ))
    })?;
    if !metadata.is_dir() {
        return Err(ScanoptError::InvalidRequest(format!(
            "working directory {} is not a directory",
            dir.display()
        )));
    }
    if metadata.permissions().readonly() {
        return Err(ScanoptError::InvalidRequest(format!(
            "working directory {} is read-only",
            dir.display()
        )));
    }
    Ok(())
}

/// Scan, quantize and render one page with the production stages.
///
/// Synchronous and blocking; call it off any interactive thread.
pub fn run_pipeline(request: &ScanRequest, config: &ScannerConfig) -> PipelineResult {
    Pipeline::for_request(config, request).run(request)
}

/// [`run_pipeline`] with a caller-held cancellation token.
pub fn run_pipeline_with_cancel(
    request: &ScanRequest,
    config: &ScannerConfig,
    cancel: CancelToken,
) -> PipelineResult {
    Pipeline::for_request(config, request)
        .with_cancel(cancel)
        .run(request)
}

// -- Tests --------------------------------------------------------------------


#[cfg(all(test, unix))]
mod end_to_end {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::sync::Mutex;

    use scanopt_core::Resolution;
    use scanopt_document::PdfInspector;

    /// See the device crate: a stub still open for writing cannot be exec'd.
    static SPAWN_LOCK: Mutex<()> = Mutex::new(());

    const FIXTURE_PPM: &[u8] = b"P6\n2 2\n255\n\x0a\x0a\x0a\xfa\xfa\xfa\x32\xc8\x32\x82\x05\x05";

    fn stub_config(dir: &Path, body: &str) -> ScannerConfig {
        let path = dir.join("fake-scanimage");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write stub");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("chmod stub");
        ScannerConfig {
            utility: path.display().to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn stub_scan_produces_png_and_a4_pdf() {
        let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = tempfile::tempdir().expect("tempdir");
        let fixture = dir.path().join("fixture.ppm");
        std::fs::write(&fixture, FIXTURE_PPM).expect("write fixture");
        let config = stub_config(dir.path(), &format!("cat '{}'", fixture.display()));
        let request = ScanRequest::new(dir.path(), "page", Resolution::Dpi200).expect("request");

        let result = run_pipeline(&request, &config);

        assert_eq!(result, PipelineResult::succeeded());
        let png = image::open(request.png_path()).expect("open png").to_rgb8();
        let pixels: Vec<[u8; 3]> = png.pixels().map(|p| p.0).collect();
        assert_eq!(pixels, [[0, 0, 0], [255, 255, 255], [102, 255, 102], [255, 0, 0]]);

        let pdf = PdfInspector::open(request.pdf_path()).expect("open pdf");
        assert_eq!(pdf.page_count(), 1);
        let (w, h) = pdf.page_size_mm(1).expect("media box");
        assert!((w - 210.0).abs() < 0.5, "width {w}");
        assert!((h - 297.0).abs() < 0.5, "height {h}");
        let placed = pdf.image_placement(1).expect("image placement");
        let width_mm = placed.width_pt * 25.4 / 72.0;
        let top_mm = placed.top_pt() * 25.4 / 72.0;
        assert!((width_mm - 210.0).abs() < 0.5, "image width {width_mm} mm");
        assert!(placed.x_pt.abs() < 0.01, "{placed:?}");
        assert!((top_mm - 297.0).abs() < 0.5, "image top {top_mm} mm");

        assert!(!request.raw_path().exists());
    }

    #[test]
    fn busy_device_reports_diagnostic_and_writes_nothing() {
        let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = tempfile::tempdir().expect("tempdir");
        let config = stub_config(dir.path(), "echo 'device busy' >&2\nexit 1");
        let request = ScanRequest::new(dir.path(), "page", Resolution::Dpi200).expect("request");

        let result = run_pipeline(&request, &config);

        assert_eq!(result, PipelineResult::failed("device busy"));
        assert!(!request.png_path().exists());
        assert!(!request.pdf_path().exists());
        assert!(!request.raw_path().exists());
    }

    #[test]
    fn cancelled_before_start_reports_cancellation() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = stub_config(dir.path(), "exit 0");
        let request = ScanRequest::new(dir.path(), "page", Resolution::Dpi200).expect("request");
        let cancel = CancelToken::new();
        cancel.cancel();

        let result = run_pipeline_with_cancel(&request, &config, cancel);

        assert_eq!(result, PipelineResult::failed("scan cancelled"));
    }
}
