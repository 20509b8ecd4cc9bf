// Copyright 2025 Benchgate Contributors
// SPDX-License-Identifier: Apache-2.0

//! Core of the benchmark regression gate.
//!
//! The gate ingests a run's benchmark results, compares each benchmark's
//! primary metric with a persisted baseline, classifies the change into a
//! zone and decides both the build verdict and which baseline entries move
//! forward. Baselines only ratchet: trusted runs raise an entry when the
//! benchmark improved, and nothing ever lowers one automatically.
//!
//! Everything here is synchronous and in-memory. The baseline document is
//! passed in as a value and a new document is returned as a value; storing
//! it is the caller's business.
//!
//! # Quick Start
//!
//! ```
//! use benchgate_core::{evaluate, BaselineDocument, BaselineEntry, BenchmarkResult, GatePolicy,
//!     MetricMap, RunResults, Verdict};
//!
//! let baseline = BaselineDocument::from_entries([BaselineEntry::new(
//!     "matmul",
//!     MetricMap::from([("tflops".to_string(), 100.0)]),
//!     "nightly-41",
//! )]);
//! let run = RunResults::from_results([
//!     BenchmarkResult::new("matmul", [("tflops", 125.0)], "nightly-42").unwrap(),
//! ]);
//!
//! let outcome = evaluate(&run, &baseline, true, &GatePolicy::default());
//! assert_eq!(outcome.verdict, Verdict::Pass);
//! assert_eq!(
//!     outcome.persistable_baseline().unwrap().get("matmul").unwrap().metric("tflops"),
//!     Some(125.0)
//! );
//! ```
//!
//! # Modules
//!
//! - [`record`] - results, baseline entries and documents
//! - [`policy`] - thresholds and primary-metric conventions
//! - [`classify`] - the regression classifier
//! - [`merge`] - the selective, ratcheting baseline merge
//! - [`gate`] - the top-level evaluator
//! - [`error`] - error taxonomy

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod classify;
pub mod error;
pub mod gate;
pub mod merge;
pub mod policy;
pub mod record;

pub use classify::{classify, ClassificationRecord, Zone};
pub use error::{Error, MalformedResultError, MergeConflictError, Result};
pub use gate::{evaluate, BaselineUpdate, GateOutcome, GatePolicy, Verdict, ZoneCounts};
pub use merge::{merge, Action, Decision, DecisionReason, MergeOutcome};
pub use policy::{Direction, MetricPolicy, MetricRule, ResolvedMetric, Thresholds};
pub use record::{
    BaselineDocument, BaselineEntry, BenchmarkResult, MetricMap, RunResults, UnavailableBenchmark,
};
