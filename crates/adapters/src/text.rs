// Copyright 2025 Benchgate Contributors
// SPDX-License-Identifier: Apache-2.0

//! Plain-text result tables.
//!
//! A text result file is a sequence of sections, each opened by a
//! `header:` line. A section is either a key/value block
//!
//! ```text
//! matmul:
//!   tflops = 125.0
//!   run_id = 3f2a9c1
//! ```
//!
//! or a whitespace table with an optional leading index column, as printed by
//! dataframe libraries:
//!
//! ```text
//! softmax-GBps:
//!         N  CuTile  PyTorch
//! 0  1024.0   100.0     80.0
//! 1  2048.0   200.0    160.0
//! ```
//!
//! Tables are flattened through the [`SuiteLayout`]. A `-TFLOPS` / `-GBps`
//! style header suffix is taken as the unit.

use crate::layout::SuiteLayout;
use benchgate_core::{BenchmarkResult, MetricMap, RunResults, UnavailableBenchmark};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

static HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([^\s:][^:]*):\s*$").expect("valid regex"));

static KEY_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([A-Za-z_][\w.\-/]*)\s*[=:]\s*(\S+)\s*$").expect("valid regex"));

static UNIT_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(.+)-(tflops|gflops|gbps|gb/s|ms|us|ns)$").expect("valid regex"));

/// Marker a failed run writes instead of results.
const FAILED_MARKER: &str = "FAILED";

struct Section<'a> {
    header: &'a str,
    lines: Vec<&'a str>,
}

/// Parse a text results file.
pub fn parse_text_results(text: &str, source_id: &str, run_id: &str, layout: &SuiteLayout) -> RunResults {
    let mut run = RunResults::new();

    if text.trim() == FAILED_MARKER {
        run.mark_unavailable(UnavailableBenchmark::new(source_id, "benchmark run FAILED"));
        return run;
    }

    let sections = split_sections(text);
    if sections.is_empty() {
        run.mark_unavailable(UnavailableBenchmark::new(source_id, "no benchmark sections found"));
        return run;
    }

    for section in &sections {
        parse_section(&mut run, section, run_id, layout);
    }

    debug!(
        source = %source_id,
        sections = sections.len(),
        results = run.results.len(),
        unavailable = run.unavailable.len(),
        "Parsed text results"
    );
    run
}

fn split_sections(text: &str) -> Vec<Section<'_>> {
    let mut sections: Vec<Section<'_>> = Vec::new();
    for line in text.lines() {
        if let Some(caps) = HEADER.captures(line) {
            if let Some(header) = caps.get(1) {
                sections.push(Section {
                    header: header.as_str().trim(),
                    lines: Vec::new(),
                });
                continue;
            }
        }
        match sections.last_mut() {
            Some(section) if !line.trim().is_empty() => section.lines.push(line),
            Some(_) => {}
            None if !line.trim().is_empty() => debug!(line = %line, "Ignoring text before the first section"),
            None => {}
        }
    }
    sections
}

fn split_unit(header: &str) -> (&str, Option<&str>) {
    match UNIT_SUFFIX.captures(header) {
        Some(caps) => match (caps.get(1), caps.get(2)) {
            (Some(name), Some(unit)) => (name.as_str(), Some(unit.as_str())),
            _ => (header, None),
        },
        None => (header, None),
    }
}

fn parse_section(run: &mut RunResults, section: &Section<'_>, run_id: &str, layout: &SuiteLayout) {
    let (name, unit) = split_unit(section.header);

    if section.lines.is_empty() {
        run.mark_unavailable(UnavailableBenchmark::new(name, "no results captured"));
        return;
    }

    let pairs: Option<Vec<(&str, &str)>> = section
        .lines
        .iter()
        .map(|line| {
            KEY_VALUE
                .captures(line)
                .and_then(|c| Some((c.get(1)?.as_str(), c.get(2)?.as_str())))
        })
        .collect();

    match pairs {
        Some(pairs) => parse_key_values(run, name, unit, &pairs, run_id),
        None => parse_table(run, name, unit, &section.lines, run_id, layout),
    }
}

fn parse_key_values(run: &mut RunResults, name: &str, unit: Option<&str>, pairs: &[(&str, &str)], run_id: &str) {
    let mut run_id = run_id;
    let mut unit = unit.map(str::to_string);
    let mut metrics = MetricMap::new();

    for (key, raw) in pairs {
        match *key {
            "run_id" => run_id = raw,
            "unit" => unit = Some(raw.to_string()),
            _ => match raw.parse::<f64>() {
                Ok(value) => {
                    metrics.insert(key.to_string(), value);
                }
                Err(_) => debug!(benchmark = %name, metric = %key, "Skipping non-numeric metric value"),
            },
        }
    }

    run.push_parsed(
        BenchmarkResult::new(name, metrics, run_id).map(|r| r.with_unit(unit)),
        name,
    );
}

fn parse_table(
    run: &mut RunResults,
    name: &str,
    unit: Option<&str>,
    lines: &[&str],
    run_id: &str,
    layout: &SuiteLayout,
) {
    let columns: Vec<&str> = lines[0].split_whitespace().collect();
    if lines.len() < 2 {
        run.mark_unavailable(UnavailableBenchmark::new(name, "table has a header but no rows"));
        return;
    }

    for (index, line) in lines[1..].iter().enumerate() {
        let row_label = format!("{}#{}", name, index);
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let cells = if tokens.len() == columns.len() + 1 {
            &tokens[1..]
        } else if tokens.len() == columns.len() {
            &tokens[..]
        } else {
            run.mark_unavailable(UnavailableBenchmark::new(
                row_label,
                format!("row has {} cells, expected {}", tokens.len(), columns.len()),
            ));
            continue;
        };

        let cells: Vec<(String, Value)> = columns
            .iter()
            .zip(cells)
            .map(|(column, cell)| (column.to_string(), Value::String(cell.to_string())))
            .collect();
        for parsed in layout.config_results(name, unit, &cells, run_id) {
            run.push_parsed(parsed, &row_label);
        }
    }
}
