// Copyright 2025 Benchgate Contributors
// SPDX-License-Identifier: Apache-2.0

//! Gate evaluator.
//!
//! Classifies every benchmark of a run against the baseline, runs the
//! selective merge and derives the build verdict. The verdict is a pure
//! function of the classification set: any regression fails the build,
//! nothing else does. Document-level errors fail the build with an explicit
//! reason and produce no baseline update.

use crate::classify::{classify, ClassificationRecord, Zone};
use crate::error::{Error, MergeConflictError};
use crate::merge::{merge, Decision};
use crate::policy::{MetricPolicy, Thresholds};
use crate::record::{BaselineDocument, BenchmarkResult, RunResults, UnavailableBenchmark};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, info, warn};

/// Build verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// No regression and no document-level failure.
    Pass,
    /// At least one regression, or the gate could not complete.
    Fail,
}

impl Verdict {
    /// Stable string form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
        }
    }

    /// Whether the build passes.
    pub fn is_pass(self) -> bool {
        self == Self::Pass
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Thresholds and metric conventions for one gate evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GatePolicy {
    /// Zone thresholds.
    #[serde(default)]
    pub thresholds: Thresholds,
    /// Primary metric conventions.
    #[serde(default)]
    pub metrics: MetricPolicy,
}

/// Baseline produced by the merge.
#[derive(Debug, Clone, PartialEq)]
pub struct BaselineUpdate {
    /// For trusted runs, the merged document. For untrusted runs, the
    /// document a trusted run would persist, for diffing only.
    pub baseline: BaselineDocument,
    /// Decisions actually taken under this run's trust level.
    pub decisions: Vec<Decision>,
    /// Whether the caller may persist `baseline`.
    pub persist: bool,
}

/// Zone tallies for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneCounts {
    /// Regressions.
    pub regressions: usize,
    /// Improvements.
    pub improvements: usize,
    /// Neutral changes.
    pub neutral: usize,
    /// First-seen benchmarks.
    pub new: usize,
    /// Benchmarks without a usable result.
    pub unavailable: usize,
}

/// Everything a gate evaluation produces.
#[derive(Debug, Clone, PartialEq)]
pub struct GateOutcome {
    /// Build verdict.
    pub verdict: Verdict,
    /// Whether the run was trusted.
    pub trusted: bool,
    /// Thresholds the run was judged with.
    pub thresholds: Thresholds,
    /// Classifications sorted by name.
    pub classifications: Vec<ClassificationRecord>,
    /// Benchmarks degraded to unavailable, sorted by label.
    pub unavailable: Vec<UnavailableBenchmark>,
    /// Baseline entries the run did not exercise, sorted.
    pub not_run: Vec<String>,
    /// Merge result; `None` after a document-level failure.
    pub update: Option<BaselineUpdate>,
    /// Document-level failure reason.
    pub failure: Option<String>,
}

impl GateOutcome {
    /// Tally zones.
    pub fn counts(&self) -> ZoneCounts {
        let mut counts = ZoneCounts {
            unavailable: self.unavailable.len(),
            ..ZoneCounts::default()
        };
        for record in &self.classifications {
            match record.zone {
                Zone::Regression => counts.regressions += 1,
                Zone::Improvement => counts.improvements += 1,
                Zone::Neutral => counts.neutral += 1,
                Zone::New => counts.new += 1,
            }
        }
        counts
    }

    /// Classifications in the regression zone.
    pub fn regressions(&self) -> impl Iterator<Item = &ClassificationRecord> {
        self.classifications.iter().filter(|r| r.zone == Zone::Regression)
    }

    /// Decisions taken, if the merge ran.
    pub fn decisions(&self) -> Option<&[Decision]> {
        self.update.as_ref().map(|u| u.decisions.as_slice())
    }

    /// The baseline the caller may persist: only for trusted, successful runs.
    pub fn persistable_baseline(&self) -> Option<&BaselineDocument> {
        self.update.as_ref().filter(|u| u.persist).map(|u| &u.baseline)
    }
}

/// Evaluate a run against the baseline.
///
/// Deterministic: the same inputs always produce the same outcome, whatever
/// the order of `run.results`.
pub fn evaluate(
    run: &RunResults,
    baseline: &BaselineDocument,
    trusted: bool,
    policy: &GatePolicy,
) -> GateOutcome {
    let mut unavailable = run.unavailable.clone();
    unavailable.sort_by(|a, b| (&a.label, &a.reason).cmp(&(&b.label, &b.reason)));

    let mut outcome = GateOutcome {
        verdict: Verdict::Fail,
        trusted,
        thresholds: policy.thresholds,
        classifications: Vec::new(),
        unavailable,
        not_run: Vec::new(),
        update: None,
        failure: None,
    };

    if let Err(err) = policy.thresholds.validate().and_then(|_| baseline.validate()) {
        return fail(outcome, err.to_string());
    }

    let mut ordered: Vec<&BenchmarkResult> = run.results.iter().collect();
    ordered.sort_by(|a, b| a.name.cmp(&b.name));
    if let Some(dup) = ordered.windows(2).find(|w| w[0].name == w[1].name) {
        let err = Error::from(MergeConflictError::DuplicateBenchmark {
            name: dup[0].name.clone(),
        });
        return fail(outcome, err.to_string());
    }

    let mut conflicts = Vec::new();
    for result in &ordered {
        let classified = policy
            .metrics
            .resolve(result)
            .and_then(|primary| classify(result, baseline.get(&result.name), &primary, &policy.thresholds));
        match classified {
            Ok(record) => {
                debug!(benchmark = %record.name, zone = %record.zone, delta_pct = ?record.delta_pct, "Classified");
                outcome.classifications.push(record);
            }
            Err(err) if err.is_record_level() => {
                warn!(benchmark = %result.name, error = %err, "Benchmark unavailable");
                outcome
                    .unavailable
                    .push(UnavailableBenchmark::new(result.name.clone(), err.to_string()));
            }
            Err(err) => conflicts.push(err),
        }
    }
    outcome
        .unavailable
        .sort_by(|a, b| (&a.label, &a.reason).cmp(&(&b.label, &b.reason)));

    let seen: BTreeSet<&str> = ordered
        .iter()
        .map(|r| r.name.as_str())
        .chain(outcome.unavailable.iter().map(|u| u.label.as_str()))
        .collect();
    outcome.not_run = baseline
        .names()
        .filter(|name| !seen.contains(name))
        .map(str::to_string)
        .collect();

    if let Some(err) = conflicts.into_iter().next() {
        return fail(outcome, err.to_string());
    }

    let update = if trusted {
        merge(baseline, &outcome.classifications, true).map(|m| BaselineUpdate {
            baseline: m.baseline,
            decisions: m.decisions,
            persist: true,
        })
    } else {
        merge(baseline, &outcome.classifications, false).and_then(|held| {
            let proposed = merge(baseline, &outcome.classifications, true)?;
            Ok(BaselineUpdate {
                baseline: proposed.baseline,
                decisions: held.decisions,
                persist: false,
            })
        })
    };

    match update {
        Ok(update) => outcome.update = Some(update),
        Err(err) => return fail(outcome, Error::from(err).to_string()),
    }

    outcome.verdict = if outcome.classifications.iter().any(|r| r.zone.fails_build()) {
        Verdict::Fail
    } else {
        Verdict::Pass
    };

    let counts = outcome.counts();
    info!(
        verdict = %outcome.verdict,
        trusted,
        regressions = counts.regressions,
        improvements = counts.improvements,
        neutral = counts.neutral,
        new = counts.new,
        unavailable = counts.unavailable,
        not_run = outcome.not_run.len(),
        "Gate evaluated"
    );

    outcome
}

fn fail(mut outcome: GateOutcome, reason: String) -> GateOutcome {
    warn!(reason = %reason, "Gate failed with a document-level error");
    outcome.verdict = Verdict::Fail;
    outcome.update = None;
    outcome.failure = Some(reason);
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::Action;
    use crate::policy::Direction;
    use crate::record::{BaselineEntry, MetricMap};

    fn result(name: &str, metric: &str, value: f64) -> BenchmarkResult {
        BenchmarkResult::new(name, [(metric, value)], "run-2").unwrap()
    }

    fn entry(name: &str, metric: &str, value: f64) -> BaselineEntry {
        BaselineEntry::new(name, MetricMap::from([(metric.to_string(), value)]), "run-1")
    }

    #[test]
    fn test_improvement_scenario_passes_and_ratchets() {
        let baseline = BaselineDocument::from_entries([entry("matmul", "tflops", 100.0)]);
        let run = RunResults::from_results([result("matmul", "tflops", 125.0)]);
        let outcome = evaluate(&run, &baseline, true, &GatePolicy::default());

        assert_eq!(outcome.verdict, Verdict::Pass);
        assert_eq!(outcome.classifications[0].zone, Zone::Improvement);
        assert_eq!(outcome.classifications[0].delta_pct, Some(25.0));
        let persisted = outcome.persistable_baseline().unwrap();
        assert_eq!(persisted.get("matmul").unwrap().metric("tflops"), Some(125.0));
    }

    #[test]
    fn test_zero_latency_baseline_is_ratcheted_upward() {
        let policy = GatePolicy {
            metrics: MetricPolicy {
                default_direction: Some(Direction::LowerIsBetter),
                ..MetricPolicy::default()
            },
            ..GatePolicy::default()
        };
        let baseline = BaselineDocument::from_entries([entry("launch", "latency_ms", 0.0)]);
        let run = RunResults::from_results([result("launch", "latency_ms", 5.0)]);
        let outcome = evaluate(&run, &baseline, true, &policy);

        assert_eq!(outcome.verdict, Verdict::Pass);
        assert_eq!(outcome.classifications[0].zone, Zone::Improvement);
        let persisted = outcome.persistable_baseline().unwrap();
        assert_eq!(persisted.get("launch").unwrap().metric("latency_ms"), Some(5.0));
    }

    #[test]
    fn test_regression_scenario_fails_and_holds() {
        let baseline = BaselineDocument::from_entries([entry("softmax", "gbps", 200.0)]);
        let run = RunResults::from_results([result("softmax", "gbps", 180.0)]);
        let outcome = evaluate(&run, &baseline, true, &GatePolicy::default());

        assert_eq!(outcome.verdict, Verdict::Fail);
        assert!(outcome.failure.is_none());
        assert_eq!(outcome.classifications[0].delta_pct, Some(-10.0));
        assert_eq!(outcome.persistable_baseline().unwrap(), &baseline);
        assert_eq!(outcome.regressions().count(), 1);
    }

    #[test]
    fn test_new_benchmark_never_fails() {
        let run = RunResults::from_results([result("fresh", "tflops", 1.0)]);
        let outcome = evaluate(&run, &BaselineDocument::new(), false, &GatePolicy::default());
        assert_eq!(outcome.verdict, Verdict::Pass);
        assert_eq!(outcome.counts().new, 1);
        assert!(outcome.persistable_baseline().is_none());
    }

    #[test]
    fn test_untrusted_run_returns_proposal_but_holds() {
        let baseline = BaselineDocument::from_entries([entry("matmul", "tflops", 100.0)]);
        let run = RunResults::from_results([result("matmul", "tflops", 125.0)]);
        let outcome = evaluate(&run, &baseline, false, &GatePolicy::default());

        assert_eq!(outcome.verdict, Verdict::Pass);
        let update = outcome.update.as_ref().unwrap();
        assert!(!update.persist);
        assert_ne!(update.baseline, baseline);
        assert_eq!(update.decisions[0].action, Action::Hold);
        assert!(outcome.persistable_baseline().is_none());
    }

    #[test]
    fn test_record_level_errors_degrade_to_unavailable() {
        let baseline = BaselineDocument::from_entries([entry("matmul", "tflops", 100.0)]);
        let ambiguous = BenchmarkResult::new("attention", [("a", 1.0), ("b", 2.0)], "run-2").unwrap();
        let mut run = RunResults::from_results([result("matmul", "tflops", 101.0), ambiguous]);
        run.mark_unavailable(UnavailableBenchmark::new("broken", "no metrics"));

        let outcome = evaluate(&run, &baseline, true, &GatePolicy::default());
        assert_eq!(outcome.verdict, Verdict::Pass);
        let labels: Vec<_> = outcome.unavailable.iter().map(|u| u.label.as_str()).collect();
        assert_eq!(labels, vec!["attention", "broken"]);
        assert_eq!(outcome.classifications.len(), 1);
    }

    #[test]
    fn test_shape_mismatch_is_fatal() {
        let baseline = BaselineDocument::from_entries([entry("matmul", "gbps", 100.0)]);
        let run = RunResults::from_results([result("matmul", "tflops", 100.0)]);
        let outcome = evaluate(&run, &baseline, true, &GatePolicy::default());
        assert_eq!(outcome.verdict, Verdict::Fail);
        assert!(outcome.update.is_none());
        assert!(outcome.failure.as_deref().unwrap().contains("matmul"));
    }

    #[test]
    fn test_duplicate_names_are_fatal() {
        let run = RunResults::from_results([
            result("matmul", "tflops", 1.0),
            result("matmul", "tflops", 2.0),
        ]);
        let outcome = evaluate(&run, &BaselineDocument::new(), true, &GatePolicy::default());
        assert_eq!(outcome.verdict, Verdict::Fail);
        assert!(outcome.failure.as_deref().unwrap().contains("more than once"));
    }

    #[test]
    fn test_invalid_thresholds_fail_the_gate() {
        let policy = GatePolicy {
            thresholds: Thresholds::symmetric(-3.0),
            ..GatePolicy::default()
        };
        let outcome = evaluate(&RunResults::new(), &BaselineDocument::new(), true, &policy);
        assert_eq!(outcome.verdict, Verdict::Fail);
        assert!(outcome.failure.is_some());
    }

    #[test]
    fn test_not_run_entries_are_listed_and_kept() {
        let baseline = BaselineDocument::from_entries([
            entry("matmul", "tflops", 100.0),
            entry("retired", "tflops", 5.0),
        ]);
        let run = RunResults::from_results([result("matmul", "tflops", 100.0)]);
        let outcome = evaluate(&run, &baseline, true, &GatePolicy::default());
        assert_eq!(outcome.not_run, vec!["retired".to_string()]);
        assert!(outcome.persistable_baseline().unwrap().contains("retired"));
    }
}
