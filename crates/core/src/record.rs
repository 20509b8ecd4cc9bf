// Copyright 2025 Benchgate Contributors
// SPDX-License-Identifier: Apache-2.0

//! Metric record model.
//!
//! [`BenchmarkResult`] is one measured outcome of one benchmark in one run,
//! [`BaselineEntry`] is the stored high-water mark for a benchmark, and
//! [`BaselineDocument`] is the full historical reference state keyed by name.
//!
//! Metric sets are open maps: each benchmark reports whatever metrics it
//! measures. Maps are ordered so that every document renders identically
//! across invocations.

use crate::error::{Error, MalformedResultError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// Metric name to measured value.
pub type MetricMap = BTreeMap<String, f64>;

/// Current baseline document schema version.
pub const BASELINE_SCHEMA_VERSION: u32 = 1;

/// One measured outcome for one named benchmark in one run.
///
/// Constructed through [`BenchmarkResult::new`] or
/// [`BenchmarkResult::from_value`], both of which reject empty names,
/// empty metric sets and non-finite values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkResult {
    /// Benchmark identifier, unique within a run and stable across runs.
    pub name: String,
    /// Measured metrics.
    pub metrics: MetricMap,
    /// Provenance of the run that produced this result.
    pub run_id: String,
    /// Unit reported by the benchmark, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl BenchmarkResult {
    /// Create a validated result.
    pub fn new<K, I>(
        name: impl Into<String>,
        metrics: I,
        run_id: impl Into<String>,
    ) -> std::result::Result<Self, MalformedResultError>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, f64)>,
    {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(MalformedResultError::MissingName);
        }

        let metrics: MetricMap = metrics.into_iter().map(|(k, v)| (k.into(), v)).collect();
        validate_metrics(&name, &metrics)?;

        Ok(Self {
            name,
            metrics,
            run_id: run_id.into(),
            unit: None,
        })
    }

    /// Attach a unit.
    pub fn with_unit(mut self, unit: Option<String>) -> Self {
        self.unit = unit.filter(|u| !u.trim().is_empty());
        self
    }

    /// Parse a raw JSON record of the shape
    /// `{"name": .., "metrics": {..}, "run_id"?: .., "unit"?: ..}`.
    ///
    /// Metric values may be numbers or numeric strings. Other values are
    /// skipped; a record left without any numeric metric is rejected.
    pub fn from_value(
        value: &Value,
        default_run_id: &str,
    ) -> std::result::Result<Self, MalformedResultError> {
        let obj = value.as_object().ok_or_else(|| {
            MalformedResultError::InvalidShape(format!("expected an object, found {}", kind(value)))
        })?;

        let name = obj
            .get("name")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or(MalformedResultError::MissingName)?;

        let run_id = obj
            .get("run_id")
            .and_then(Value::as_str)
            .filter(|r| !r.trim().is_empty())
            .unwrap_or(default_run_id);

        let unit = obj.get("unit").and_then(Value::as_str).map(str::to_string);

        let raw_metrics = match obj.get("metrics") {
            Some(Value::Object(map)) => map,
            Some(other) => {
                return Err(MalformedResultError::InvalidShape(format!(
                    "benchmark '{}' metrics must be an object, found {}",
                    name,
                    kind(other)
                )))
            }
            None => {
                return Err(MalformedResultError::NoMetrics {
                    name: name.to_string(),
                })
            }
        };

        let mut metrics = MetricMap::new();
        for (key, raw) in raw_metrics {
            match parse_metric_value(raw) {
                Some(v) => {
                    metrics.insert(key.clone(), v);
                }
                None => debug!(benchmark = %name, metric = %key, "Skipping non-numeric metric value"),
            }
        }

        Ok(Self::new(name, metrics, run_id)?.with_unit(unit))
    }

    /// Look up a metric value.
    pub fn metric(&self, metric: &str) -> Option<f64> {
        self.metrics.get(metric).copied()
    }
}

/// Parse a raw metric value: a JSON number or a numeric string.
///
/// The returned value may be non-finite (`"NaN"`, `"inf"`); validation
/// rejects those with a dedicated error rather than skipping them.
pub fn parse_metric_value(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn validate_metrics(name: &str, metrics: &MetricMap) -> std::result::Result<(), MalformedResultError> {
    if metrics.is_empty() {
        return Err(MalformedResultError::NoMetrics {
            name: name.to_string(),
        });
    }
    if let Some((metric, value)) = metrics.iter().find(|(_, v)| !v.is_finite()) {
        return Err(MalformedResultError::NonFinite {
            name: name.to_string(),
            metric: metric.clone(),
            value: value.to_string(),
        });
    }
    Ok(())
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A benchmark that produced no usable result in this run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnavailableBenchmark {
    /// Benchmark name, or a positional label when the name was unreadable.
    pub label: String,
    /// Human-readable reason.
    pub reason: String,
}

impl UnavailableBenchmark {
    /// Create a new unavailable marker.
    pub fn new(label: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            reason: reason.into(),
        }
    }

    /// Build from a parse error, falling back to `fallback_label` when the
    /// record had no readable name.
    pub fn from_error(err: &MalformedResultError, fallback_label: &str) -> Self {
        let label = err.benchmark_name().unwrap_or(fallback_label);
        Self::new(label, err.to_string())
    }
}

/// Everything ingested for one run: parsed results plus the records that
/// could not be parsed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunResults {
    /// Successfully parsed results.
    pub results: Vec<BenchmarkResult>,
    /// Records degraded to "unavailable".
    pub unavailable: Vec<UnavailableBenchmark>,
}

impl RunResults {
    /// Create an empty run.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a run from already-parsed results.
    pub fn from_results(results: impl IntoIterator<Item = BenchmarkResult>) -> Self {
        Self {
            results: results.into_iter().collect(),
            unavailable: Vec::new(),
        }
    }

    /// Record the outcome of parsing one record.
    pub fn push_parsed(
        &mut self,
        parsed: std::result::Result<BenchmarkResult, MalformedResultError>,
        fallback_label: &str,
    ) {
        match parsed {
            Ok(result) => self.results.push(result),
            Err(err) => self.mark_unavailable(UnavailableBenchmark::from_error(&err, fallback_label)),
        }
    }

    /// Record an unavailable benchmark.
    pub fn mark_unavailable(&mut self, unavailable: UnavailableBenchmark) {
        debug!(label = %unavailable.label, reason = %unavailable.reason, "Benchmark unavailable");
        self.unavailable.push(unavailable);
    }

    /// Append another run's records.
    pub fn extend(&mut self, other: RunResults) {
        self.results.extend(other.results);
        self.unavailable.extend(other.unavailable);
    }

    /// Total number of records, parsed or not.
    pub fn len(&self) -> usize {
        self.results.len() + self.unavailable.len()
    }

    /// Whether the run holds no records at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The persisted high-water mark for one benchmark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineEntry {
    /// Benchmark name; matches `BenchmarkResult::name`.
    pub name: String,
    /// Reference values regressions are measured against.
    pub metrics: MetricMap,
    /// Run that last ratcheted or seeded this entry.
    pub last_updated_run_id: String,
}

impl BaselineEntry {
    /// Create a new entry.
    pub fn new(
        name: impl Into<String>,
        metrics: MetricMap,
        last_updated_run_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            metrics,
            last_updated_run_id: last_updated_run_id.into(),
        }
    }

    /// Look up a metric value.
    pub fn metric(&self, metric: &str) -> Option<f64> {
        self.metrics.get(metric).copied()
    }

    /// Comma-separated metric names, for diagnostics.
    pub fn metric_names(&self) -> String {
        self.metrics.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

/// Full historical reference state, keyed by benchmark name.
///
/// Treated as an immutable value: a run reads one document and produces a
/// new one, it never mutates the input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineDocument {
    /// Schema version for forward compatibility.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    /// When the document was last persisted. Stamped by the writer, never
    /// by the merge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Entries keyed by benchmark name.
    #[serde(default)]
    pub entries: BTreeMap<String, BaselineEntry>,
}

fn default_schema_version() -> u32 {
    BASELINE_SCHEMA_VERSION
}

impl Default for BaselineDocument {
    fn default() -> Self {
        Self {
            schema_version: BASELINE_SCHEMA_VERSION,
            updated_at: None,
            entries: BTreeMap::new(),
        }
    }
}

impl BaselineDocument {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a document from entries.
    pub fn from_entries(entries: impl IntoIterator<Item = BaselineEntry>) -> Self {
        Self {
            entries: entries.into_iter().map(|e| (e.name.clone(), e)).collect(),
            ..Self::default()
        }
    }

    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let doc: Self = serde_json::from_str(json)
            .map_err(|e| Error::invalid_baseline(format!("unreadable JSON: {}", e)))?;
        doc.validate()?;
        Ok(doc)
    }

    /// Render as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::invalid_baseline(format!("cannot serialize: {}", e)))
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<()> {
        if self.schema_version > BASELINE_SCHEMA_VERSION {
            return Err(Error::invalid_baseline(format!(
                "unsupported schema version {} (max {})",
                self.schema_version, BASELINE_SCHEMA_VERSION
            )));
        }
        for (key, entry) in &self.entries {
            if key != &entry.name {
                return Err(Error::invalid_baseline(format!(
                    "entry keyed '{}' is named '{}'",
                    key, entry.name
                )));
            }
            validate_metrics(&entry.name, &entry.metrics)
                .map_err(|e| Error::invalid_baseline(e.to_string()))?;
        }
        Ok(())
    }

    /// Look up an entry.
    pub fn get(&self, name: &str) -> Option<&BaselineEntry> {
        self.entries.get(name)
    }

    /// Whether an entry exists for `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Insert or replace an entry.
    pub fn upsert(&mut self, entry: BaselineEntry) {
        self.entries.insert(entry.name.clone(), entry);
    }

    /// Benchmark names in lexicographic order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the document has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return a copy stamped with a persistence time.
    pub fn stamped(mut self, at: DateTime<Utc>) -> Self {
        self.updated_at = Some(at);
        self
    }
}
