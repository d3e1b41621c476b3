// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — creating the single-page scan document and inspecting it.

pub mod inspect;
pub mod writer;

pub use inspect::{ImagePlacement, PdfInspector};
pub use writer::PdfWriter;
