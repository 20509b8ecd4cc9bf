// Copyright 2025 Benchgate Contributors
// SPDX-License-Identifier: Apache-2.0

//! Machine-readable decision log.
//!
//! One document per run, meant to be diffed across runs when auditing how a
//! baseline drifted. Contains no wall-clock fields.

use benchgate_core::{
    Action, DecisionReason, Direction, GateOutcome, UnavailableBenchmark, Verdict, Zone,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Decision log format version.
pub const DECISION_LOG_SCHEMA_VERSION: u32 = 1;

/// Per-benchmark audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionLogEntry {
    /// Benchmark name.
    pub name: String,
    /// Primary metric compared.
    pub metric: String,
    /// Direction of improvement.
    pub direction: Direction,
    /// Assigned zone.
    pub zone: Zone,
    /// `None` when the merge did not run.
    pub action: Option<Action>,
    /// Why the action was taken.
    pub reason: Option<DecisionReason>,
    /// Baseline value, if one existed.
    pub old_value: Option<f64>,
    /// Value measured by this run.
    pub new_value: f64,
    /// Sign-normalized change in percent.
    pub delta_pct: Option<f64>,
}

/// The decision log for one gate evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionLog {
    /// Log format version.
    pub schema_version: u32,
    /// Whether the run was trusted.
    pub trusted: bool,
    /// Build verdict.
    pub verdict: Verdict,
    /// Document-level failure, if any.
    pub failure: Option<String>,
    /// Whether the gate produced a baseline that may be persisted. Writing it
    /// is up to the caller.
    pub baseline_persistable: bool,
    /// Distinct run ids seen, sorted.
    pub run_ids: Vec<String>,
    /// One entry per classified benchmark, sorted by name.
    pub entries: Vec<DecisionLogEntry>,
    /// Benchmarks without a usable result.
    pub unavailable: Vec<UnavailableBenchmark>,
    /// Baseline entries the run did not exercise.
    pub not_run: Vec<String>,
}

impl DecisionLog {
    /// Build the log from a gate outcome.
    pub fn from_outcome(outcome: &GateOutcome) -> Self {
        let decisions = outcome.decisions().unwrap_or_default();

        let entries = outcome
            .classifications
            .iter()
            .map(|record| {
                let decision = decisions
                    .binary_search_by(|d| d.name.cmp(&record.name))
                    .ok()
                    .map(|i| &decisions[i]);
                DecisionLogEntry {
                    name: record.name.clone(),
                    metric: record.metric.clone(),
                    direction: record.direction,
                    zone: record.zone,
                    action: decision.map(|d| d.action),
                    reason: decision.map(|d| d.reason),
                    old_value: record.old_value,
                    new_value: record.new_value,
                    delta_pct: record.delta_pct,
                }
            })
            .collect();

        let run_ids: BTreeSet<&str> = outcome
            .classifications
            .iter()
            .map(|r| r.run_id.as_str())
            .collect();

        Self {
            schema_version: DECISION_LOG_SCHEMA_VERSION,
            trusted: outcome.trusted,
            verdict: outcome.verdict,
            failure: outcome.failure.clone(),
            baseline_persistable: outcome.persistable_baseline().is_some(),
            run_ids: run_ids.into_iter().map(str::to_string).collect(),
            entries,
            unavailable: outcome.unavailable.clone(),
            not_run: outcome.not_run.clone(),
        }
    }

    /// Pretty JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use benchgate_core::{
        evaluate, BaselineDocument, BaselineEntry, BenchmarkResult, GatePolicy, MetricMap, RunResults,
    };

    fn outcome(trusted: bool) -> GateOutcome {
        let baseline = BaselineDocument::from_entries([BaselineEntry::new(
            "matmul",
            MetricMap::from([("tflops".to_string(), 100.0)]),
            "nightly-1",
        )]);
        let mut run = RunResults::from_results([
            BenchmarkResult::new("softmax", [("gbps", 90.0)], "nightly-2").unwrap(),
            BenchmarkResult::new("matmul", [("tflops", 125.0)], "nightly-2").unwrap(),
        ]);
        run.mark_unavailable(UnavailableBenchmark::new("rope", "FAILED"));
        evaluate(&run, &baseline, trusted, &GatePolicy::default())
    }

    #[test]
    fn test_log_entries_follow_decisions() {
        let log = DecisionLog::from_outcome(&outcome(true));
        assert_eq!(log.verdict, Verdict::Pass);
        assert!(log.baseline_persistable);
        assert_eq!(log.run_ids, vec!["nightly-2".to_string()]);

        let matmul = &log.entries[0];
        assert_eq!(matmul.name, "matmul");
        assert_eq!(matmul.action, Some(Action::Ratchet));
        assert_eq!(matmul.reason, Some(DecisionReason::Improved));
        assert_eq!(matmul.delta_pct, Some(25.0));

        let softmax = &log.entries[1];
        assert_eq!(softmax.zone, Zone::New);
        assert_eq!(softmax.action, Some(Action::Seed));
        assert_eq!(log.unavailable[0].label, "rope");
    }

    #[test]
    fn test_untrusted_log_holds_everything() {
        let log = DecisionLog::from_outcome(&outcome(false));
        assert!(!log.baseline_persistable);
        assert!(log
            .entries
            .iter()
            .all(|e| e.action == Some(Action::Hold) && e.reason == Some(DecisionReason::Untrusted)));
    }

    #[test]
    fn test_json_is_stable_and_parses_back() {
        let first = DecisionLog::from_outcome(&outcome(true)).to_json().unwrap();
        let second = DecisionLog::from_outcome(&outcome(true)).to_json().unwrap();
        assert_eq!(first, second);

        let value: serde_json::Value = serde_json::from_str(&first).unwrap();
        assert_eq!(value["verdict"], "pass");
        assert_eq!(value["baseline_persistable"], true);
        assert_eq!(value["entries"][0]["action"], "ratchet");
        assert_eq!(value["entries"][0]["direction"], "higher_is_better");

        let parsed: DecisionLog = serde_json::from_str(&first).unwrap();
        assert_eq!(parsed, DecisionLog::from_outcome(&outcome(true)));
    }
}
