// Copyright 2025 Benchgate Contributors
// SPDX-License-Identifier: Apache-2.0

//! Selective baseline merge.
//!
//! Produces the next baseline document from the previous one and a run's
//! classifications. Each benchmark is decided on its own:
//!
//! | Zone        | Trusted  | Action  |
//! |-------------|----------|---------|
//! | New         | yes      | Seed    |
//! | New         | no       | Hold    |
//! | Improvement | yes      | Ratchet |
//! | Improvement | no       | Hold    |
//! | Neutral     | either   | Hold    |
//! | Regression  | either   | Hold    |
//!
//! Held entries are carried over untouched, including entries for benchmarks
//! that did not run. The whole classification set is validated before any
//! entry changes, so a conflict never yields a partial document.

use crate::classify::{ClassificationRecord, Zone};
use crate::error::MergeConflictError;
use crate::record::{BaselineDocument, BaselineEntry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::{info, warn};

/// What the merge did with one benchmark's baseline entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Created a first baseline entry.
    Seed,
    /// Replaced the entry with the improved result.
    Ratchet,
    /// Left the entry (or its absence) untouched.
    Hold,
}

impl Action {
    /// Stable string form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Seed => "seed",
            Self::Ratchet => "ratchet",
            Self::Hold => "hold",
        }
    }

    /// Whether the action changes the document.
    pub fn mutates(self) -> bool {
        matches!(self, Self::Seed | Self::Ratchet)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an action was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    /// First observation of the benchmark.
    FirstSeen,
    /// Improved beyond the threshold.
    Improved,
    /// Change within the noise band.
    WithinNoise,
    /// Regressed; the old baseline keeps failing the benchmark until fixed.
    Regressed,
    /// Untrusted run; shared state is never updated.
    Untrusted,
}

impl DecisionReason {
    /// Stable string form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FirstSeen => "first_seen",
            Self::Improved => "improved",
            Self::WithinNoise => "within_noise",
            Self::Regressed => "regressed",
            Self::Untrusted => "untrusted",
        }
    }
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the decision log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Benchmark name.
    pub name: String,
    /// Zone the benchmark was classified into.
    pub zone: Zone,
    /// Action taken on its baseline entry.
    pub action: Action,
    /// Why.
    pub reason: DecisionReason,
}

/// Next baseline document plus the per-benchmark decisions, sorted by name.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    /// The new document.
    pub baseline: BaselineDocument,
    /// Decisions in lexicographic name order.
    pub decisions: Vec<Decision>,
}

impl MergeOutcome {
    /// Decision for a benchmark.
    pub fn decision(&self, name: &str) -> Option<&Decision> {
        self.decisions
            .binary_search_by(|d| d.name.as_str().cmp(name))
            .ok()
            .map(|i| &self.decisions[i])
    }

    /// Number of entries seeded or ratcheted.
    pub fn changed(&self) -> usize {
        self.decisions.iter().filter(|d| d.action.mutates()).count()
    }
}

/// Policy decision for one classification.
pub fn decide(zone: Zone, trusted: bool) -> (Action, DecisionReason) {
    match (zone, trusted) {
        (Zone::New, true) => (Action::Seed, DecisionReason::FirstSeen),
        (Zone::Improvement, true) => (Action::Ratchet, DecisionReason::Improved),
        (Zone::New | Zone::Improvement, false) => (Action::Hold, DecisionReason::Untrusted),
        (Zone::Neutral, _) => (Action::Hold, DecisionReason::WithinNoise),
        (Zone::Regression, _) => (Action::Hold, DecisionReason::Regressed),
    }
}

/// Merge a run's classifications into the previous baseline.
///
/// The result depends only on the inputs: classification order does not
/// matter and merging the same inputs twice yields the same document.
///
/// # Errors
///
/// Returns a [`MergeConflictError`] if any classification disagrees with the
/// old document. No partial document is produced.
pub fn merge(
    old: &BaselineDocument,
    classifications: &[ClassificationRecord],
    trusted: bool,
) -> Result<MergeOutcome, MergeConflictError> {
    let mut ordered: Vec<&ClassificationRecord> = classifications.iter().collect();
    ordered.sort_by(|a, b| a.name.cmp(&b.name));

    validate(old, &ordered)?;

    let mut baseline = old.clone();
    let mut decisions = Vec::with_capacity(ordered.len());

    for record in ordered {
        let (action, reason) = decide(record.zone, trusted);
        match action {
            Action::Seed | Action::Ratchet => {
                info!(
                    benchmark = %record.name,
                    action = %action,
                    metric = %record.metric,
                    old = ?record.old_value,
                    new = record.new_value,
                    run_id = %record.run_id,
                    "Baseline entry updated"
                );
                baseline.upsert(BaselineEntry::new(
                    record.name.clone(),
                    record.new_metrics.clone(),
                    record.run_id.clone(),
                ));
            }
            Action::Hold if record.zone == Zone::Regression => {
                warn!(
                    benchmark = %record.name,
                    metric = %record.metric,
                    delta_pct = ?record.delta_pct,
                    "Regression: keeping old baseline until fixed"
                );
            }
            Action::Hold => {}
        }
        decisions.push(Decision {
            name: record.name.clone(),
            zone: record.zone,
            action,
            reason,
        });
    }

    Ok(MergeOutcome {
        baseline,
        decisions,
    })
}

fn validate(old: &BaselineDocument, ordered: &[&ClassificationRecord]) -> Result<(), MergeConflictError> {
    let mut seen = BTreeSet::new();
    for record in ordered {
        if !seen.insert(record.name.as_str()) {
            return Err(MergeConflictError::DuplicateBenchmark {
                name: record.name.clone(),
            });
        }

        match (record.zone, old.get(&record.name)) {
            (Zone::New, Some(_)) => {
                return Err(MergeConflictError::SeedOverExisting {
                    name: record.name.clone(),
                })
            }
            (Zone::New, None) => {}
            (_, None) => {
                return Err(MergeConflictError::MissingBaselineEntry {
                    name: record.name.clone(),
                })
            }
            (_, Some(entry)) => {
                let stored = entry.metric(&record.metric).ok_or_else(|| {
                    MergeConflictError::MetricShapeMismatch {
                        name: record.name.clone(),
                        metric: record.metric.clone(),
                        available: entry.metric_names(),
                    }
                })?;
                // Bitwise: the classification must have seen exactly this value.
                if record.old_value.map(f64::to_bits) != Some(stored.to_bits()) {
                    return Err(MergeConflictError::StaleComparison {
                        name: record.name.clone(),
                        metric: record.metric.clone(),
                        recorded: record.old_value.unwrap_or(f64::NAN),
                        stored,
                    });
                }
            }
        }
    }
    Ok(())
}
