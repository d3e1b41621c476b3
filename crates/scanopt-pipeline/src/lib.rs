// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// scanopt Pipeline — sequences scan, quantization and rendering for one page,
// stopping at the first failure.

pub mod orchestrator;
pub mod stages;
pub mod state;

pub use orchestrator::{Pipeline, run_pipeline, run_pipeline_with_cancel};
pub use stages::{PaletteQuantizer, Quantizer, Renderer, Scanner};
pub use state::{FailureReason, PipelineState};

pub use scanopt_device::CancelToken;
