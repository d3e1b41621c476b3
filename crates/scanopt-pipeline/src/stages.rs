// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stage seams. The orchestrator only sees these traits, so each stage can be
// replaced by a stub in tests.

use std::path::{Path, PathBuf};

use scanopt_core::ScanRequest;
use scanopt_core::error::{DeviceError, ImageError, RenderError};
use scanopt_device::{CancelToken, DeviceInvoker};
use scanopt_document::{PdfWriter, RasterQuantizer};

/// Produces the raw scan for a request and returns its path.
pub trait Scanner {
    fn scan(&self, request: &ScanRequest, cancel: &CancelToken) -> Result<PathBuf, DeviceError>;
}

/// Turns a raw scan into the quantized PNG.
pub trait Quantizer {
    fn quantize(&self, raw_path: &Path, png_path: &Path) -> Result<(), ImageError>;
}

/// Embeds the PNG into the printable document.
pub trait Renderer {
    fn render(&self, png_path: &Path, pdf_path: &Path) -> Result<(), RenderError>;
}

impl Scanner for DeviceInvoker {
    fn scan(&self, request: &ScanRequest, cancel: &CancelToken) -> Result<PathBuf, DeviceError> {
        self.invoke(request, cancel)
    }
}

/// The production quantizer: palette quantization, then PNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct PaletteQuantizer;

impl Quantizer for PaletteQuantizer {
    fn quantize(&self, raw_path: &Path, png_path: &Path) -> Result<(), ImageError> {
        RasterQuantizer::open(raw_path)?.quantize().save_png(png_path)
    }
}

impl Renderer for PdfWriter {
    fn render(&self, png_path: &Path, pdf_path: &Path) -> Result<(), RenderError> {
        PdfWriter::render(self, png_path, pdf_path)
    }
}
