// Copyright 2025 Benchgate Contributors
// SPDX-License-Identifier: Apache-2.0

//! Regression classifier.
//!
//! Classification is a pure function of one result, its optional baseline
//! entry, the primary metric convention and the thresholds. Classifying one
//! benchmark never observes another.

use crate::error::{Error, MergeConflictError, Result};
use crate::policy::{Direction, ResolvedMetric, Thresholds};
use crate::record::{BaselineEntry, BenchmarkResult, MetricMap};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification bucket for a benchmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    /// Got worse beyond the regression threshold.
    Regression,
    /// Within the noise band.
    Neutral,
    /// Got better beyond the improvement threshold.
    Improvement,
    /// No baseline to compare against.
    New,
}

impl Zone {
    /// Stable string form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Regression => "regression",
            Self::Neutral => "neutral",
            Self::Improvement => "improvement",
            Self::New => "new",
        }
    }

    /// Only regressions fail the build.
    pub fn fails_build(self) -> bool {
        self == Self::Regression
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-benchmark classification outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationRecord {
    /// Benchmark name.
    pub name: String,
    /// Primary metric compared.
    pub metric: String,
    /// Direction of improvement for `metric`.
    pub direction: Direction,
    /// Assigned zone.
    pub zone: Zone,
    /// Change in percent, sign-normalized so positive means better.
    /// `None` for new benchmarks and zero-baseline comparisons.
    pub delta_pct: Option<f64>,
    /// Baseline value of `metric`, if a baseline existed.
    pub old_value: Option<f64>,
    /// New value of `metric`.
    pub new_value: f64,
    /// Run that produced the new value.
    pub run_id: String,
    /// Full metric snapshot of the new result, stored on seed or ratchet.
    pub new_metrics: MetricMap,
}

/// Sign-normalized percentage change from `old` to `new`.
///
/// Positive means better in `direction`. Returns `None` when `old` is zero.
pub fn normalized_delta_pct(old: f64, new: f64, direction: Direction) -> Option<f64> {
    if old == 0.0 {
        return None;
    }
    // Multiply before dividing so whole-percent changes stay exact.
    let raw = (new - old) * 100.0 / old.abs();
    Some(match direction {
        Direction::HigherIsBetter => raw,
        Direction::LowerIsBetter => -raw,
    })
}

/// Zone for a normalized delta. Boundaries belong to `Neutral`.
pub fn zone_for_delta(delta_pct: f64, thresholds: &Thresholds) -> Zone {
    if delta_pct < -thresholds.regression_pct {
        Zone::Regression
    } else if delta_pct > thresholds.improvement_pct {
        Zone::Improvement
    } else {
        Zone::Neutral
    }
}

/// Classify one result against its baseline entry.
///
/// A zero baseline has no percentage delta. A new value of zero is Neutral
/// with a delta of 0; any other new value is Improvement with no delta,
/// whatever the direction. That holds for lower-is-better metrics too, so a
/// latency that went from 0 to 5 ms is an Improvement and a trusted run
/// ratchets the baseline to it.
///
/// # Errors
///
/// - Record-level [`Error::UnresolvedMetric`] if `new` lacks the primary metric.
/// - [`MergeConflictError::MetricShapeMismatch`] if the baseline entry lacks it.
pub fn classify(
    new: &BenchmarkResult,
    baseline: Option<&BaselineEntry>,
    primary: &ResolvedMetric,
    thresholds: &Thresholds,
) -> Result<ClassificationRecord> {
    let new_value = new.metric(&primary.metric).ok_or_else(|| {
        Error::unresolved(
            &new.name,
            format!("primary metric '{}' is missing from the result", primary.metric),
        )
    })?;

    let (zone, delta_pct, old_value) = match baseline {
        None => (Zone::New, None, None),
        Some(entry) => {
            let old = entry.metric(&primary.metric).ok_or_else(|| {
                MergeConflictError::MetricShapeMismatch {
                    name: new.name.clone(),
                    metric: primary.metric.clone(),
                    available: entry.metric_names(),
                }
            })?;
            match normalized_delta_pct(old, new_value, primary.direction) {
                Some(delta) => (zone_for_delta(delta, thresholds), Some(delta), Some(old)),
                None if new_value == 0.0 => (Zone::Neutral, Some(0.0), Some(old)),
                None => (Zone::Improvement, None, Some(old)),
            }
        }
    };

    Ok(ClassificationRecord {
        name: new.name.clone(),
        metric: primary.metric.clone(),
        direction: primary.direction,
        zone,
        delta_pct,
        old_value,
        new_value,
        run_id: new.run_id.clone(),
        new_metrics: new.metrics.clone(),
    })
}
