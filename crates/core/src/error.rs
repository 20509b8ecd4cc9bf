// Copyright 2025 Benchgate Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error taxonomy for the regression gate.
//!
//! Errors fall into two severities:
//!
//! - **Record-level** ([`MalformedResultError`], [`Error::UnresolvedMetric`]):
//!   the affected benchmark is reported as unavailable and the rest of the run
//!   continues.
//! - **Document-level** ([`MergeConflictError`], [`Error::InvalidBaseline`]):
//!   the baseline document would become inconsistent, so the whole gate fails
//!   with an explicit reason.
//!
//! A missing baseline entry and a zero baseline value are valid states and
//! never surface as errors.

use thiserror::Error;

/// A raw result record could not be turned into a `BenchmarkResult`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MalformedResultError {
    /// The record has no usable benchmark name.
    #[error("result record has no benchmark name")]
    MissingName,

    /// The record carries no numeric metric at all.
    #[error("benchmark '{name}' has no numeric metrics")]
    NoMetrics {
        /// Benchmark name.
        name: String,
    },

    /// A metric value is NaN or infinite.
    #[error("benchmark '{name}' metric '{metric}' is not finite ({value})")]
    NonFinite {
        /// Benchmark name.
        name: String,
        /// Metric name.
        metric: String,
        /// Rendered offending value.
        value: String,
    },

    /// The record is not shaped like a result at all.
    #[error("invalid result record: {0}")]
    InvalidShape(String),
}

impl MalformedResultError {
    /// Benchmark name, when the record got far enough to have one.
    pub fn benchmark_name(&self) -> Option<&str> {
        match self {
            Self::NoMetrics { name } | Self::NonFinite { name, .. } => Some(name),
            Self::MissingName | Self::InvalidShape(_) => None,
        }
    }
}

/// The classification set and the baseline document disagree about a benchmark.
///
/// Fatal for the whole run: a partial merge would leave the baseline
/// internally inconsistent.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MergeConflictError {
    /// The same benchmark name appears more than once.
    #[error("benchmark '{name}' appears more than once in the run")]
    DuplicateBenchmark {
        /// Benchmark name.
        name: String,
    },

    /// Classified as new, but the baseline already holds an entry.
    #[error("benchmark '{name}' is classified as new but already has a baseline entry")]
    SeedOverExisting {
        /// Benchmark name.
        name: String,
    },

    /// Classified against a baseline entry the document does not contain.
    #[error("benchmark '{name}' was compared against a baseline entry that does not exist")]
    MissingBaselineEntry {
        /// Benchmark name.
        name: String,
    },

    /// The baseline entry does not carry the metric being compared.
    #[error("baseline entry '{name}' has no metric '{metric}' (available: {available})")]
    MetricShapeMismatch {
        /// Benchmark name.
        name: String,
        /// Metric the classification refers to.
        metric: String,
        /// Comma-separated metrics present in the baseline entry.
        available: String,
    },

    /// The classification recorded a baseline value the document does not hold.
    #[error("benchmark '{name}' metric '{metric}' was compared against {recorded}, but the baseline holds {stored}")]
    StaleComparison {
        /// Benchmark name.
        name: String,
        /// Metric name.
        metric: String,
        /// Value the classification saw.
        recorded: f64,
        /// Value currently stored in the baseline.
        stored: f64,
    },
}

impl MergeConflictError {
    /// Benchmark the conflict is about.
    pub fn benchmark_name(&self) -> &str {
        match self {
            Self::DuplicateBenchmark { name }
            | Self::SeedOverExisting { name }
            | Self::MissingBaselineEntry { name }
            | Self::MetricShapeMismatch { name, .. }
            | Self::StaleComparison { name, .. } => name,
        }
    }
}

/// Errors produced by the core crate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Malformed result record (record-level).
    #[error(transparent)]
    Malformed(#[from] MalformedResultError),

    /// No primary metric could be resolved for a benchmark (record-level).
    #[error("benchmark '{name}': {reason}")]
    UnresolvedMetric {
        /// Benchmark name.
        name: String,
        /// Why resolution failed.
        reason: String,
    },

    /// Baseline and classifications disagree (document-level).
    #[error("merge conflict: {0}")]
    MergeConflict(#[from] MergeConflictError),

    /// The baseline document itself is inconsistent (document-level).
    #[error("invalid baseline document: {0}")]
    InvalidBaseline(String),

    /// Invalid gate configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Create an unresolved-metric error.
    pub fn unresolved(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnresolvedMetric {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid-baseline error.
    pub fn invalid_baseline(msg: impl Into<String>) -> Self {
        Self::InvalidBaseline(msg.into())
    }

    /// Create an invalid-configuration error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Whether this error only affects a single benchmark.
    pub fn is_record_level(&self) -> bool {
        matches!(self, Self::Malformed(_) | Self::UnresolvedMetric { .. })
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;
