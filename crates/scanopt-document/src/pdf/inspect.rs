// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF inspector — reload a rendered document with `lopdf` and report its page
// count, page sizes and where the scan image was drawn.

use std::path::{Path, PathBuf};

use lopdf::content::Content;
use lopdf::{Document, Object, ObjectId};
use scanopt_core::error::RenderError;
use tracing::{debug, instrument};

const MM_PER_PT: f32 = 25.4 / 72.0;

const IDENTITY: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// Rectangle an image XObject covers on the page, in points from the
/// bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImagePlacement {
    pub x_pt: f32,
    pub y_pt: f32,
    pub width_pt: f32,
    pub height_pt: f32,
}

impl ImagePlacement {
    /// Y coordinate of the image's top edge.
    pub fn top_pt(&self) -> f32 {
        self.y_pt + self.height_pt
    }
}

/// Read-only view of an existing PDF file.
pub struct PdfInspector {
    document: Document,
    source_path: PathBuf,
}

impl PdfInspector {
    /// Open a PDF from the filesystem.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RenderError> {
        let path = path.as_ref();
        let document = Document::load(path).map_err(|err| RenderError::InspectFailed {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded");

        Ok(Self {
            document,
            source_path: path.to_path_buf(),
        })
    }

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// Width and height of page `page_number` (1-indexed) in millimetres,
    /// taken from its MediaBox. Inherited boxes are followed up the page tree.
    pub fn page_size_mm(&self, page_number: u32) -> Result<(f32, f32), RenderError> {
        let [x0, y0, x1, y1] = self.media_box(self.page_id(page_number)?)?;
        Ok(((x1 - x0).abs() * MM_PER_PT, (y1 - y0).abs() * MM_PER_PT))
    }

    /// Placement of the first XObject painted on page `page_number`.
    ///
    /// Replays the content stream's `q`/`Q`/`cm` operators up to the first
    /// `Do`; an image XObject fills the unit square of the transform in force
    /// at that point. Rotated or skewed placements are not expected and are
    /// reported by their axis-aligned components only.
    pub fn image_placement(&self, page_number: u32) -> Result<ImagePlacement, RenderError> {
        let page_id = self.page_id(page_number)?;
        let bytes = self
            .document
            .get_page_content(page_id)
            .map_err(|err| self.inspect_failed(format!("page content: {err}")))?;
        let content = Content::decode(&bytes)
            .map_err(|err| self.inspect_failed(format!("page content: {err}")))?;

        let mut stack = Vec::new();
        let mut ctm = IDENTITY;
        for op in &content.operations {
            match op.operator.as_str() {
                "q" => stack.push(ctm),
                "Q" => ctm = stack.pop().unwrap_or(IDENTITY),
                "cm" => {
                    let m: Vec<f32> = op
                        .operands
                        .iter()
                        .map(Object::as_float)
                        .collect::<Result<_, _>>()
                        .map_err(|err| self.inspect_failed(format!("bad cm operand: {err}")))?;
                    let m: [f32; 6] = m.try_into().map_err(|m: Vec<f32>| {
                        self.inspect_failed(format!("cm has {} operands", m.len()))
                    })?;
                    ctm = concat(&m, &ctm);
                }
                "Do" => {
                    debug!(?ctm, "Image transform");
                    return Ok(ImagePlacement {
                        x_pt: ctm[4],
                        y_pt: ctm[5],
                        width_pt: ctm[0],
                        height_pt: ctm[3],
                    });
                }
                _ => {}
            }
        }
        Err(self.inspect_failed(format!("page {page_number} draws no XObject")))
    }

    fn page_id(&self, page_number: u32) -> Result<ObjectId, RenderError> {
        self.document
            .get_pages()
            .get(&page_number)
            .copied()
            .ok_or_else(|| self.inspect_failed(format!("page {page_number} not found")))
    }

    fn media_box(&self, page_id: ObjectId) -> Result<[f32; 4], RenderError> {
        let mut current = page_id;
        loop {
            let dict = self
                .document
                .get_dictionary(current)
                .map_err(|err| self.inspect_failed(err.to_string()))?;

            if let Ok(entry) = dict.get(b"MediaBox") {
                let array = match entry {
                    Object::Reference(id) => self.document.get_object(*id),
                    other => Ok(other),
                }
                .and_then(Object::as_array)
                .map_err(|err| self.inspect_failed(format!("bad MediaBox: {err}")))?;

                let values: Vec<f32> = array
                    .iter()
                    .map(Object::as_float)
                    .collect::<Result<_, _>>()
                    .map_err(|err| self.inspect_failed(format!("bad MediaBox: {err}")))?;
                return match values.as_slice() {
                    [x0, y0, x1, y1] => Ok([*x0, *y0, *x1, *y1]),
                    _ => Err(self.inspect_failed(format!(
                        "MediaBox has {} entries",
                        values.len()
                    ))),
                };
            }

            current = dict
                .get(b"Parent")
                .and_then(Object::as_reference)
                .map_err(|_| self.inspect_failed("page has no MediaBox".into()))?;
        }
    }

    fn inspect_failed(&self, reason: String) -> RenderError {
        RenderError::InspectFailed {
            path: self.source_path.clone(),
            reason,
        }
    }
}

/// `m` x `ctm` in PDF's row-vector convention: the new transform applies
/// `m` first, then the existing one.
fn concat(m: &[f32; 6], ctm: &[f32; 6]) -> [f32; 6] {
    [
        m[0] * ctm[0] + m[1] * ctm[2],
        m[0] * ctm[1] + m[1] * ctm[3],
        m[2] * ctm[0] + m[3] * ctm[2],
        m[2] * ctm[1] + m[3] * ctm[3],
        m[4] * ctm[0] + m[5] * ctm[2] + ctm[4],
        m[4] * ctm[1] + m[5] * ctm[3] + ctm[5],
    ]
}
