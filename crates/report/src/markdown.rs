// Copyright 2025 Benchgate Contributors
// SPDX-License-Identifier: Apache-2.0

//! Markdown rendering for gate outcomes and raw runs.
//!
//! Output contains no timestamps, so the same outcome always renders to the
//! same text.

use benchgate_core::{
    ClassificationRecord, Decision, GateOutcome, RunResults, UnavailableBenchmark, Verdict, Zone,
};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Write};

/// Marker for a value that could not be produced.
pub const UNAVAILABLE: &str = "unavailable";

/// Delta marker for zero-baseline comparisons.
pub const NOT_APPLICABLE: &str = "n/a";

const EMPTY: &str = "-";

enum Row<'a> {
    Classified(&'a ClassificationRecord, Option<&'a Decision>),
    Unavailable(&'a UnavailableBenchmark),
}

impl Row<'_> {
    fn label(&self) -> &str {
        match self {
            Row::Classified(record, _) => &record.name,
            Row::Unavailable(u) => &u.label,
        }
    }
}

/// Render the gate report.
pub fn render_report(outcome: &GateOutcome) -> String {
    let mut output = String::new();
    // Writing into a String cannot fail.
    let _ = write_report(&mut output, outcome);
    output
}

fn write_report(out: &mut String, outcome: &GateOutcome) -> fmt::Result {
    let counts = outcome.counts();

    writeln!(out, "# Benchmark Gate Report")?;
    writeln!(out)?;
    let verdict = match outcome.verdict {
        Verdict::Pass => "✅ PASS",
        Verdict::Fail => "❌ FAIL",
    };
    writeln!(out, "**Verdict:** {}", verdict)?;
    writeln!(
        out,
        "**Thresholds:** regression below -{:.2}%, improvement above +{:.2}%",
        outcome.thresholds.regression_pct, outcome.thresholds.improvement_pct
    )?;
    let trust = if outcome.trusted {
        "trusted (baseline may be updated)"
    } else {
        "untrusted (baseline is never persisted)"
    };
    writeln!(out, "**Run:** {}", trust)?;
    writeln!(out)?;
    writeln!(
        out,
        "Regressions: {} | Improvements: {} | Neutral: {} | New: {} | Unavailable: {}",
        counts.regressions, counts.improvements, counts.neutral, counts.new, counts.unavailable
    )?;
    writeln!(out)?;

    if let Some(reason) = &outcome.failure {
        writeln!(out, "## Gate Failure")?;
        writeln!(out)?;
        writeln!(out, "The gate could not complete: {}", reason)?;
        writeln!(out)?;
    }

    write_results_table(out, outcome)?;

    if !outcome.unavailable.is_empty() {
        writeln!(out, "## Unavailable")?;
        writeln!(out)?;
        for u in &outcome.unavailable {
            writeln!(out, "- `{}`: {}", u.label, u.reason)?;
        }
        writeln!(out)?;
    }

    if !outcome.not_run.is_empty() {
        writeln!(out, "## Not Run")?;
        writeln!(out)?;
        writeln!(out, "Baseline entries this run did not exercise:")?;
        writeln!(out)?;
        for name in &outcome.not_run {
            writeln!(out, "- `{}`", name)?;
        }
        writeln!(out)?;
    }

    writeln!(out, "---")?;
    writeln!(out, "{}", recommendation(outcome))?;
    Ok(())
}

fn write_results_table(out: &mut String, outcome: &GateOutcome) -> fmt::Result {
    let decisions: BTreeMap<&str, &Decision> = outcome
        .decisions()
        .unwrap_or_default()
        .iter()
        .map(|d| (d.name.as_str(), d))
        .collect();

    let mut rows: Vec<Row<'_>> = outcome
        .classifications
        .iter()
        .map(|r| Row::Classified(r, decisions.get(r.name.as_str()).copied()))
        .chain(outcome.unavailable.iter().map(Row::Unavailable))
        .collect();
    rows.sort_by(|a, b| a.label().cmp(b.label()));

    writeln!(out, "## Results")?;
    writeln!(out)?;
    if rows.is_empty() {
        writeln!(out, "No benchmarks were reported.")?;
        writeln!(out)?;
        return Ok(());
    }

    writeln!(out, "| Benchmark | Metric | Baseline | Current | Δ % | Zone | Action |")?;
    writeln!(out, "|-----------|--------|----------|---------|-----|------|--------|")?;
    for row in &rows {
        match row {
            Row::Classified(record, decision) => writeln!(
                out,
                "| {} | {} | {} | {} | {} | {} | {} |",
                escape(&record.name),
                escape(&record.metric),
                record.old_value.map_or_else(|| EMPTY.to_string(), format_value),
                format_value(record.new_value),
                format_delta(record),
                zone_cell(record.zone),
                decision.map_or(EMPTY, |d| d.action.as_str()),
            )?,
            Row::Unavailable(u) => writeln!(
                out,
                "| {} | {} | {} | {} | {} | {} | {} |",
                escape(&u.label),
                UNAVAILABLE,
                UNAVAILABLE,
                UNAVAILABLE,
                UNAVAILABLE,
                UNAVAILABLE,
                EMPTY,
            )?,
        }
    }
    writeln!(out)?;
    Ok(())
}

fn recommendation(outcome: &GateOutcome) -> String {
    if outcome.failure.is_some() {
        return "Fix the gate failure above; no baseline was produced.".to_string();
    }
    let regressions = outcome.counts().regressions;
    if regressions > 0 {
        return format!(
            "Fix the {} regressed benchmark(s) before merging; their baselines were held.",
            regressions
        );
    }
    let changed = outcome
        .decisions()
        .map_or(0, |ds| ds.iter().filter(|d| d.action.mutates()).count());
    if outcome.trusted && changed > 0 {
        format!("Baseline ratcheted for {} benchmark(s).", changed)
    } else {
        "Keep the current baseline.".to_string()
    }
}

fn zone_cell(zone: Zone) -> &'static str {
    match zone {
        Zone::Regression => "🔴 regression",
        Zone::Neutral => "⚪ neutral",
        Zone::Improvement => "🟢 improvement",
        Zone::New => "🆕 new",
    }
}

/// Two-decimal rendering; non-finite values are unavailable.
pub fn format_value(value: f64) -> String {
    if value.is_finite() {
        format!("{:.2}", value)
    } else {
        UNAVAILABLE.to_string()
    }
}

fn format_delta(record: &ClassificationRecord) -> String {
    match (record.delta_pct, record.old_value) {
        (Some(delta), _) if delta.is_finite() => format!("{:+.2}", delta),
        (Some(_), _) => UNAVAILABLE.to_string(),
        (None, Some(_)) => NOT_APPLICABLE.to_string(),
        (None, None) => EMPTY.to_string(),
    }
}

fn escape(cell: &str) -> String {
    cell.replace('|', "\\|")
}

/// Render every parsed benchmark and its metrics, with no baseline involved.
pub fn render_results_summary(run: &RunResults) -> String {
    let mut output = String::new();
    let _ = write_results_summary(&mut output, run);
    output
}

fn write_results_summary(out: &mut String, run: &RunResults) -> fmt::Result {
    writeln!(out, "# Benchmark Results")?;
    writeln!(out)?;

    let mut results: Vec<_> = run.results.iter().collect();
    results.sort_by(|a, b| a.name.cmp(&b.name));
    let mut unavailable: Vec<_> = run.unavailable.iter().collect();
    unavailable.sort_by(|a, b| a.label.cmp(&b.label));

    let columns: BTreeSet<&str> = results
        .iter()
        .flat_map(|r| r.metrics.keys().map(String::as_str))
        .collect();

    if results.is_empty() && unavailable.is_empty() {
        writeln!(out, "No benchmarks were reported.")?;
        return Ok(());
    }

    write!(out, "| Benchmark | Unit |")?;
    for column in &columns {
        write!(out, " {} |", escape(column))?;
    }
    writeln!(out)?;
    write!(out, "|-----------|------|")?;
    for _ in &columns {
        write!(out, "------|")?;
    }
    writeln!(out)?;

    for result in &results {
        write!(
            out,
            "| {} | {} |",
            escape(&result.name),
            result.unit.as_deref().unwrap_or(EMPTY)
        )?;
        for column in &columns {
            let cell = result.metric(column).map_or_else(|| EMPTY.to_string(), format_value);
            write!(out, " {} |", cell)?;
        }
        writeln!(out)?;
    }
    for u in &unavailable {
        write!(out, "| {} | {} |", escape(&u.label), EMPTY)?;
        for _ in &columns {
            write!(out, " {} |", UNAVAILABLE)?;
        }
        writeln!(out)?;
    }

    writeln!(out)?;
    writeln!(out, "---")?;
    writeln!(
        out,
        "Total benchmarks: {} ({} unavailable)",
        results.len() + unavailable.len(),
        unavailable.len()
    )?;

    for u in &unavailable {
        writeln!(out, "- `{}`: {}", u.label, u.reason)?;
    }
    Ok(())
}
