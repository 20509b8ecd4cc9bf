// Copyright 2025 Benchgate Contributors
// SPDX-License-Identifier: Apache-2.0

//! Per-benchmark comparison policy.
//!
//! Benchmarks report open metric sets, so the gate needs a convention for
//! which metric to compare and in which direction "better" lies. The
//! convention is resolved per benchmark from a [`MetricPolicy`]: an explicit
//! rule, then policy-wide defaults, then inference from the result itself.

use crate::error::{Error, Result};
use crate::record::BenchmarkResult;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which way a metric improves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Throughput-like metrics (TFLOPS, GB/s).
    HigherIsBetter,
    /// Latency-like metrics (ms, us).
    LowerIsBetter,
}

impl Direction {
    /// Infer a direction from a metric name and an optional unit.
    pub fn infer(metric: &str, unit: Option<&str>) -> Self {
        const LOWER_HINTS: [&str; 4] = ["latency", "time", "duration", "elapsed"];
        const LOWER_SUFFIXES: [&str; 4] = ["_ms", "_us", "_ns", "_s"];
        const LOWER_UNITS: [&str; 7] = ["ms", "us", "ns", "s", "sec", "seconds", "cycles"];

        let metric = metric.to_ascii_lowercase();
        if LOWER_HINTS.iter().any(|h| metric.contains(h))
            || LOWER_SUFFIXES.iter().any(|s| metric.ends_with(s))
        {
            return Self::LowerIsBetter;
        }

        match unit.map(|u| u.trim().to_ascii_lowercase()) {
            Some(u) if LOWER_UNITS.contains(&u.as_str()) => Self::LowerIsBetter,
            _ => Self::HigherIsBetter,
        }
    }

    /// Stable string form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HigherIsBetter => "higher_is_better",
            Self::LowerIsBetter => "lower_is_better",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Zone thresholds in percent.
///
/// A normalized delta strictly below `-regression_pct` is a regression, one
/// strictly above `improvement_pct` is an improvement, everything in between
/// (boundaries included) is neutral.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Percentage drop that counts as a regression.
    #[serde(default = "default_threshold_pct")]
    pub regression_pct: f64,
    /// Percentage gain that counts as an improvement.
    #[serde(default = "default_threshold_pct")]
    pub improvement_pct: f64,
}

/// Default zone half-width in percent.
pub const DEFAULT_THRESHOLD_PCT: f64 = 5.0;

fn default_threshold_pct() -> f64 {
    DEFAULT_THRESHOLD_PCT
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::symmetric(DEFAULT_THRESHOLD_PCT)
    }
}

impl Thresholds {
    /// Same threshold on both sides of zero.
    pub fn symmetric(pct: f64) -> Self {
        Self {
            regression_pct: pct,
            improvement_pct: pct,
        }
    }

    /// Check that both thresholds are finite and non-negative.
    pub fn validate(&self) -> Result<()> {
        for (label, value) in [
            ("regression_pct", self.regression_pct),
            ("improvement_pct", self.improvement_pct),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::invalid_config(format!(
                    "{} must be a finite, non-negative percentage (got {})",
                    label, value
                )));
            }
        }
        Ok(())
    }
}

/// Comparison convention for benchmarks matching a pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricRule {
    /// Exact benchmark name, or a prefix followed by `*`.
    pub benchmark: String,
    /// Primary metric to compare.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric: Option<String>,
    /// Direction of improvement for the primary metric.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
}

impl MetricRule {
    /// Rule for one exact benchmark name.
    pub fn exact(benchmark: impl Into<String>, metric: impl Into<String>, direction: Direction) -> Self {
        Self {
            benchmark: benchmark.into(),
            metric: Some(metric.into()),
            direction: Some(direction),
        }
    }

    /// Match specificity: `None` if the rule does not apply, otherwise a
    /// rank where larger is more specific.
    fn specificity(&self, name: &str) -> Option<usize> {
        match self.benchmark.strip_suffix('*') {
            Some(prefix) if name.starts_with(prefix) => Some(prefix.len()),
            Some(_) => None,
            None if self.benchmark == name => Some(usize::MAX),
            None => None,
        }
    }
}

/// Policy used to pick the primary metric and direction per benchmark.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricPolicy {
    /// Metric to compare when no rule names one and the result carries it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_metric: Option<String>,
    /// Direction to use when no rule names one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_direction: Option<Direction>,
    /// Per-benchmark rules.
    #[serde(default)]
    pub rules: Vec<MetricRule>,
}

/// The metric a benchmark is judged on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMetric {
    /// Metric name.
    pub metric: String,
    /// Which way it improves.
    pub direction: Direction,
}

impl MetricPolicy {
    /// Add a rule.
    pub fn with_rule(mut self, rule: MetricRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Most specific rule for `name`. Ties go to the earliest rule.
    pub fn rule_for(&self, name: &str) -> Option<&MetricRule> {
        let mut best: Option<(usize, &MetricRule)> = None;
        for rule in &self.rules {
            if let Some(rank) = rule.specificity(name) {
                if best.map_or(true, |(r, _)| rank > r) {
                    best = Some((rank, rule));
                }
            }
        }
        best.map(|(_, rule)| rule)
    }

    /// Resolve the primary metric and direction for a result.
    pub fn resolve(&self, result: &BenchmarkResult) -> Result<ResolvedMetric> {
        let rule = self.rule_for(&result.name);

        let metric = match rule.and_then(|r| r.metric.as_deref()) {
            Some(metric) if result.metrics.contains_key(metric) => metric.to_string(),
            Some(metric) => {
                return Err(Error::unresolved(
                    &result.name,
                    format!("configured primary metric '{}' is missing from the result", metric),
                ))
            }
            None => self.fallback_metric(result)?,
        };

        let direction = rule
            .and_then(|r| r.direction)
            .or(self.default_direction)
            .unwrap_or_else(|| Direction::infer(&metric, result.unit.as_deref()));

        Ok(ResolvedMetric { metric, direction })
    }

    fn fallback_metric(&self, result: &BenchmarkResult) -> Result<String> {
        if let Some(default) = self
            .default_metric
            .as_deref()
            .filter(|m| result.metrics.contains_key(*m))
        {
            return Ok(default.to_string());
        }

        let mut names = result.metrics.keys();
        match (names.next(), names.next()) {
            (Some(only), None) => Ok(only.clone()),
            _ => Err(Error::unresolved(
                &result.name,
                format!(
                    "ambiguous primary metric among [{}]; configure a rule or default_metric",
                    result.metrics.keys().cloned().collect::<Vec<_>>().join(", ")
                ),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(name: &str, metrics: &[(&str, f64)]) -> BenchmarkResult {
        BenchmarkResult::new(name, metrics.iter().map(|(k, v)| (*k, *v)), "run-1").unwrap()
    }

    #[test]
    fn test_direction_inference() {
        assert_eq!(Direction::infer("tflops", None), Direction::HigherIsBetter);
        assert_eq!(Direction::infer("gbps", Some("GBps")), Direction::HigherIsBetter);
        assert_eq!(Direction::infer("latency_ms", None), Direction::LowerIsBetter);
        assert_eq!(Direction::infer("p50_us", None), Direction::LowerIsBetter);
        assert_eq!(Direction::infer("CuTile", Some("ms")), Direction::LowerIsBetter);
        assert_eq!(Direction::infer("CuTile", Some("TFLOPS")), Direction::HigherIsBetter);
    }

    #[test]
    fn test_thresholds_validate() {
        assert!(Thresholds::default().validate().is_ok());
        assert!(Thresholds::symmetric(-1.0).validate().is_err());
        assert!(Thresholds::symmetric(f64::NAN).validate().is_err());
        let asymmetric = Thresholds {
            regression_pct: 2.0,
            improvement_pct: 10.0,
        };
        assert!(asymmetric.validate().is_ok());
    }

    #[test]
    fn test_single_metric_is_primary() {
        let policy = MetricPolicy::default();
        let resolved = policy.resolve(&result("matmul", &[("tflops", 100.0)])).unwrap();
        assert_eq!(resolved.metric, "tflops");
        assert_eq!(resolved.direction, Direction::HigherIsBetter);
    }

    #[test]
    fn test_multiple_metrics_without_convention_is_ambiguous() {
        let policy = MetricPolicy::default();
        let err = policy
            .resolve(&result("attention", &[("tflops", 1.0), ("latency_ms", 2.0)]))
            .unwrap_err();
        assert!(err.is_record_level());
        assert!(err.to_string().contains("ambiguous"));
    }

    #[test]
    fn test_default_metric_used_when_present() {
        let policy = MetricPolicy {
            default_metric: Some("CuTile".to_string()),
            ..MetricPolicy::default()
        };
        let resolved = policy
            .resolve(&result("softmax[N=1024]", &[("CuTile", 1.0), ("PyTorch", 2.0)]))
            .unwrap();
        assert_eq!(resolved.metric, "CuTile");
    }

    #[test]
    fn test_exact_rule_beats_prefix_rule() {
        let policy = MetricPolicy::default()
            .with_rule(MetricRule {
                benchmark: "attn*".to_string(),
                metric: Some("tflops".to_string()),
                direction: None,
            })
            .with_rule(MetricRule::exact("attn-decode", "latency_ms", Direction::LowerIsBetter));

        let metrics = [("tflops", 1.0), ("latency_ms", 2.0)];
        let decode = policy.resolve(&result("attn-decode", &metrics)).unwrap();
        assert_eq!(decode.metric, "latency_ms");
        assert_eq!(decode.direction, Direction::LowerIsBetter);

        let prefill = policy.resolve(&result("attn-prefill", &metrics)).unwrap();
        assert_eq!(prefill.metric, "tflops");
        assert_eq!(prefill.direction, Direction::HigherIsBetter);
    }

    #[test]
    fn test_longest_prefix_wins_regardless_of_order() {
        let policy = MetricPolicy::default()
            .with_rule(MetricRule {
                benchmark: "mm-fp8*".to_string(),
                metric: Some("b".to_string()),
                direction: None,
            })
            .with_rule(MetricRule {
                benchmark: "mm*".to_string(),
                metric: Some("a".to_string()),
                direction: None,
            });
        let rule = policy.rule_for("mm-fp8-large").unwrap();
        assert_eq!(rule.metric.as_deref(), Some("b"));
        assert!(policy.rule_for("conv").is_none());
    }

    #[test]
    fn test_rule_metric_missing_is_record_level() {
        let policy = MetricPolicy::default().with_rule(MetricRule::exact(
            "matmul",
            "tflops",
            Direction::HigherIsBetter,
        ));
        let err = policy.resolve(&result("matmul", &[("gbps", 1.0)])).unwrap_err();
        assert!(err.is_record_level());
    }

    #[test]
    fn test_default_direction_overrides_inference() {
        let policy = MetricPolicy {
            default_direction: Some(Direction::LowerIsBetter),
            ..MetricPolicy::default()
        };
        let resolved = policy.resolve(&result("matmul", &[("tflops", 1.0)])).unwrap();
        assert_eq!(resolved.direction, Direction::LowerIsBetter);
    }
}
