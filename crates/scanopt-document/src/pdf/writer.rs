// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer — embed a quantized scan into a single-page document using
// `printpdf` 0.8.
//
// printpdf 0.8 uses a data-oriented API: documents are built by constructing
// `PdfPage` structs containing `Vec<Op>` operation lists, then serialised via
// `PdfDocument::save()`. Nothing flows onto a second page on its own, so an
// oversized image is clipped at the page edge rather than split.

use std::path::Path;

use image::DynamicImage;
use printpdf::{
    Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Pt, RawImage, RawImageData,
    RawImageFormat, XObjectTransform,
};
use scanopt_core::PaperSize;
use scanopt_core::error::RenderError;
use tracing::{debug, info, instrument, warn};

/// Nominal resolution handed to printpdf; one pixel maps to one point before
/// scaling, so the scale factor alone decides the printed size.
const PLACEMENT_DPI: f32 = 72.0;

/// Where and how large the image lands on the page, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub translate_x: f32,
    pub translate_y: f32,
    pub scale: f32,
    pub width_pt: f32,
    pub height_pt: f32,
}

/// Compute the placement of a `width_px` x `height_px` raster on a page of
/// `page_w` x `page_h`: zero margins, anchored at the top-left corner, scaled
/// to the full page width with the height following the aspect ratio.
pub fn full_width_placement(width_px: u32, height_px: u32, page_w: Mm, page_h: Mm) -> Placement {
    let page_w_pt = page_w.into_pt().0;
    let page_h_pt = page_h.into_pt().0;

    let scale = page_w_pt / width_px.max(1) as f32;
    let width_pt = width_px as f32 * scale;
    let height_pt = height_px as f32 * scale;

    // PDF y grows upwards; the image's bottom edge sits `height_pt` below the
    // top of the page.
    Placement {
        translate_x: 0.0,
        translate_y: page_h_pt - height_pt,
        scale,
        width_pt,
        height_pt,
    }
}

/// Creates the single-page scan document.
pub struct PdfWriter {
    /// Paper size for the page (portrait).
    paper_size: PaperSize,
    /// Title metadata embedded in the PDF /Info dictionary.
    title: Option<String>,
}

impl PdfWriter {
    /// Create a new writer targeting the given paper size.
    pub fn new(paper_size: PaperSize) -> Self {
        Self {
            paper_size,
            title: None,
        }
    }

    /// Create a new writer defaulting to A4.
    pub fn a4() -> Self {
        Self::new(PaperSize::A4)
    }

    /// Set a title for the PDF metadata.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
    }

    /// Paper dimensions in printpdf's Mm units.
    fn page_dimensions(&self) -> (Mm, Mm) {
        let (w_mm, h_mm) = self.paper_size.dimensions_mm();
        (Mm(w_mm as f32), Mm(h_mm as f32))
    }

    // -- Image to PDF ---------------------------------------------------------

    /// Build a single-page PDF containing `image` at full page width.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn create_from_image(&self, image: &DynamicImage) -> Vec<u8> {
        let (page_w, page_h) = self.page_dimensions();
        let title = self.title.as_deref().unwrap_or("Scan");

        info!(paper = ?self.paper_size, title, "Creating scan PDF");

        let rgb_image = image.to_rgb8();
        let (img_width, img_height) = rgb_image.dimensions();
        let raw = RawImage {
            pixels: RawImageData::U8(rgb_image.into_raw()),
            width: img_width as usize,
            height: img_height as usize,
            data_format: RawImageFormat::RGB8,
            tag: Vec::new(),
        };

        let mut doc = PdfDocument::new(title);
        let xobject_id = doc.add_image(&raw);

        let placement = full_width_placement(img_width, img_height, page_w, page_h);
        let ops = vec![Op::UseXobject {
            id: xobject_id,
            transform: XObjectTransform {
                translate_x: Some(Pt(placement.translate_x)),
                translate_y: Some(Pt(placement.translate_y)),
                scale_x: Some(placement.scale),
                scale_y: Some(placement.scale),
                dpi: Some(PLACEMENT_DPI),
                rotate: None,
            },
        }];

        doc.with_pages(vec![PdfPage::new(page_w, page_h, ops)]);

        debug!(
            rendered_w_pt = placement.width_pt,
            rendered_h_pt = placement.height_pt,
            scale = placement.scale,
            "Image placed on page"
        );
        if placement.translate_y < 0.0 {
            warn!(
                overflow_pt = -placement.translate_y,
                "Scan is taller than the page; the bottom edge is clipped"
            );
        }

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        doc.save(&PdfSaveOptions::default(), &mut warnings)
    }

    // -- File output ----------------------------------------------------------

    /// Embed the PNG at `png_path` into a new document written to `pdf_path`.
    ///
    /// A source that cannot be read or decoded (missing, zero bytes, not an
    /// image) is reported as [`RenderError::WriteFailed`], the same as an
    /// unwritable target.
    #[instrument(skip_all, fields(png = %png_path.as_ref().display(), pdf = %pdf_path.as_ref().display()))]
    pub fn render(
        &self,
        png_path: impl AsRef<Path>,
        pdf_path: impl AsRef<Path>,
    ) -> Result<(), RenderError> {
        let png_path = png_path.as_ref();
        let pdf_path = pdf_path.as_ref();
        let write_failed = |reason: String| RenderError::WriteFailed {
            path: pdf_path.to_path_buf(),
            reason,
        };

        let image_bytes = std::fs::read(png_path).map_err(|err| {
            write_failed(format!("cannot read {}: {err}", png_path.display()))
        })?;
        let image = ::image::load_from_memory(&image_bytes).map_err(|err| {
            write_failed(format!("cannot embed {}: {err}", png_path.display()))
        })?;
        if image.width() == 0 || image.height() == 0 {
            return Err(write_failed(format!(
                "cannot embed {}: image has no pixels",
                png_path.display()
            )));
        }

        let bytes = self.create_from_image(&image);
        std::fs::write(pdf_path, &bytes).map_err(|err| write_failed(err.to_string()))?;
        info!(bytes = bytes.len(), "Wrote scan PDF to {}", pdf_path.display());
        Ok(())
    }
}

/// Render `png_path` onto an A4 page saved at `pdf_path`.
pub fn render(png_path: impl AsRef<Path>, pdf_path: impl AsRef<Path>) -> Result<(), RenderError> {
    PdfWriter::a4().render(png_path, pdf_path)
}

// -- Tests --------------------------------------------------------------------
