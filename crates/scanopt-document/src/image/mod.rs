// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module — raw scan decoding, palette quantization and PNG output.

pub mod quantize;

pub use quantize::RasterQuantizer;
