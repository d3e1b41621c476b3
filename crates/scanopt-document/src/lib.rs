// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// scanopt-document — Raster quantization and document rendering.
//
// Provides the palette quantizer (three brightness bands per channel with a
// black/white pass for achromatic pixels), PNG output, single-page A4 PDF
// generation, and a small PDF inspector used to verify rendered output.

pub mod image;
pub mod pdf;

// Re-export the primary structs so callers can use `scanopt_document::PdfWriter` etc.
pub use crate::image::quantize::{GREY_THRESHOLD, RasterQuantizer, quantize, quantize_image, quantize_pixel};
pub use crate::pdf::inspect::{ImagePlacement, PdfInspector};
pub use crate::pdf::writer::PdfWriter;
