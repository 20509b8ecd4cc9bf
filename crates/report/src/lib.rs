// Copyright 2025 Benchgate Contributors
// SPDX-License-Identifier: Apache-2.0

//! Reports and persistence for the benchmark gate.
//!
//! # Quick Start
//!
//! ```
//! use benchgate_core::{evaluate, BaselineDocument, BenchmarkResult, GatePolicy, RunResults};
//! use benchgate_report::{render_report, DecisionLog};
//!
//! let run = RunResults::from_results([
//!     BenchmarkResult::new("matmul", [("tflops", 125.0)], "nightly-1").unwrap(),
//! ]);
//! let outcome = evaluate(&run, &BaselineDocument::new(), true, &GatePolicy::default());
//!
//! let markdown = render_report(&outcome);
//! assert!(markdown.contains("| matmul |"));
//! let log = DecisionLog::from_outcome(&outcome).to_json().unwrap();
//! assert!(log.contains("\"seed\""));
//! ```
//!
//! # Modules
//!
//! - [`markdown`] - Markdown report and results summary
//! - [`decision_log`] - Machine-readable decision log
//! - [`io`] - Reading and writing baselines and reports

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod decision_log;
pub mod io;
pub mod markdown;

pub use decision_log::{DecisionLog, DecisionLogEntry};
pub use markdown::{render_report, render_results_summary};
