// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// scanopt Device — runs the external scan utility and captures the raw
// raster it prints on standard output.  The utility is always executed
// directly with an argument vector; nothing passes through a shell.

pub mod cancel;
pub mod command;
pub mod invoker;

pub use cancel::CancelToken;
pub use command::ScanCommand;
pub use invoker::DeviceInvoker;
