// Copyright 2025 Benchgate Contributors
// SPDX-License-Identifier: Apache-2.0

//! JSON result documents.
//!
//! Accepted shapes:
//!
//! - an array of records `[{"name", "metrics", "run_id"?, "unit"?}, ..]`
//! - an envelope `{"run_id"?, "results": [..records..]}`
//! - a single record object
//! - the suite layout: `{"benchmarks": [..]}` where entries are either
//!   benchmark files (`{"benchmark_file", "status", "benchmarks": [..]}`) or
//!   benchmarks with per-size `configs`
//!
//! Records that cannot be parsed become unavailable entries; only a document
//! that is not JSON at all is an error.

use crate::layout::SuiteLayout;
use crate::AdapterError;
use benchgate_core::{BenchmarkResult, RunResults, UnavailableBenchmark};
use serde_json::{Map, Value};
use tracing::debug;

/// Parse a JSON results document.
pub fn parse_json_results(
    text: &str,
    source_id: &str,
    run_id: &str,
    layout: &SuiteLayout,
) -> Result<RunResults, AdapterError> {
    let value: Value = serde_json::from_str(text).map_err(|error| AdapterError::Json {
        source_id: source_id.to_string(),
        error,
    })?;
    Ok(parse_json_value(&value, source_id, run_id, layout))
}

/// Parse an already-decoded JSON results document.
pub fn parse_json_value(value: &Value, source_id: &str, run_id: &str, layout: &SuiteLayout) -> RunResults {
    let mut run = RunResults::new();

    match value {
        Value::Array(records) => push_records(&mut run, records, source_id, run_id),
        Value::Object(obj) if obj.contains_key("results") => {
            let run_id = obj.get("run_id").and_then(Value::as_str).unwrap_or(run_id);
            match obj.get("results") {
                Some(Value::Array(records)) => push_records(&mut run, records, source_id, run_id),
                _ => run.mark_unavailable(UnavailableBenchmark::new(source_id, "'results' must be an array")),
            }
        }
        Value::Object(obj) if is_suite_node(obj) => push_suite(&mut run, obj, source_id, run_id, layout),
        Value::Object(_) => run.push_parsed(BenchmarkResult::from_value(value, run_id), source_id),
        _ => run.mark_unavailable(UnavailableBenchmark::new(
            source_id,
            "unsupported JSON document: expected an object or an array",
        )),
    }

    debug!(
        source = %source_id,
        results = run.results.len(),
        unavailable = run.unavailable.len(),
        "Parsed JSON results"
    );
    run
}

fn push_records(run: &mut RunResults, records: &[Value], source_id: &str, run_id: &str) {
    for (index, record) in records.iter().enumerate() {
        run.push_parsed(
            BenchmarkResult::from_value(record, run_id),
            &format!("{}#{}", source_id, index),
        );
    }
}

fn is_suite_node(obj: &Map<String, Value>) -> bool {
    ["benchmarks", "configs", "benchmark_file"]
        .iter()
        .any(|key| obj.contains_key(*key))
}

/// A suite node: a combined document, a benchmark file, or a benchmark.
fn push_suite(run: &mut RunResults, obj: &Map<String, Value>, label: &str, run_id: &str, layout: &SuiteLayout) {
    if obj.contains_key("configs") {
        push_suite_benchmark(run, obj, label, run_id, layout);
        return;
    }

    let label = obj
        .get("benchmark_file")
        .and_then(Value::as_str)
        .unwrap_or(label);

    if obj.get("status").and_then(Value::as_str) == Some("FAILED") {
        run.mark_unavailable(UnavailableBenchmark::new(label, failure_reason(obj)));
        return;
    }

    let children = match obj.get("benchmarks") {
        Some(Value::Array(children)) => children,
        _ => {
            run.mark_unavailable(UnavailableBenchmark::new(label, "'benchmarks' must be an array"));
            return;
        }
    };
    if children.is_empty() {
        run.mark_unavailable(UnavailableBenchmark::new(label, "no results captured"));
        return;
    }

    for (index, child) in children.iter().enumerate() {
        let child_label = format!("{}#{}", label, index);
        match child {
            Value::Object(child_obj) if is_suite_node(child_obj) => {
                push_suite(run, child_obj, &child_label, run_id, layout)
            }
            Value::Object(_) => run.push_parsed(BenchmarkResult::from_value(child, run_id), &child_label),
            _ => run.mark_unavailable(UnavailableBenchmark::new(child_label, "benchmark entry is not an object")),
        }
    }
}

fn push_suite_benchmark(
    run: &mut RunResults,
    obj: &Map<String, Value>,
    label: &str,
    run_id: &str,
    layout: &SuiteLayout,
) {
    let name = match obj.get("name").and_then(Value::as_str).map(str::trim) {
        Some(name) if !name.is_empty() => name,
        _ => {
            run.mark_unavailable(UnavailableBenchmark::new(label, "result record has no benchmark name"));
            return;
        }
    };
    let unit = obj.get("unit").and_then(Value::as_str);
    let run_id = obj.get("run_id").and_then(Value::as_str).unwrap_or(run_id);

    let configs = match obj.get("configs") {
        Some(Value::Array(configs)) if !configs.is_empty() => configs,
        _ => {
            run.mark_unavailable(UnavailableBenchmark::new(name, "no configurations captured"));
            return;
        }
    };

    for (index, config) in configs.iter().enumerate() {
        let row_label = format!("{}#{}", name, index);
        let Some(config) = config.as_object() else {
            run.mark_unavailable(UnavailableBenchmark::new(row_label, "configuration is not an object"));
            continue;
        };
        let cells: Vec<(String, Value)> = config.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        for parsed in layout.config_results(name, unit, &cells, run_id) {
            run.push_parsed(parsed, &row_label);
        }
    }
}

fn failure_reason(obj: &Map<String, Value>) -> String {
    let error_type = obj.get("error_type").and_then(Value::as_str);
    let message = obj.get("error_message").and_then(Value::as_str);
    match (error_type, message) {
        (Some(t), Some(m)) => format!("benchmark run FAILED ({}): {}", t, m),
        (Some(t), None) => format!("benchmark run FAILED ({})", t),
        (None, Some(m)) => format!("benchmark run FAILED: {}", m),
        (None, None) => "benchmark run FAILED".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> RunResults {
        parse_json_value(&value, "results.json", "run-9", &SuiteLayout::default())
    }

    #[test]
    fn test_array_of_records() {
        let run = parse(json!([
            {"name": "matmul", "metrics": {"tflops": 125.0}},
            {"name": "softmax", "metrics": {"gbps": 180}, "run_id": "other"},
            {"metrics": {"gbps": 1.0}}
        ]));
        assert_eq!(run.results.len(), 2);
        assert_eq!(run.results[0].run_id, "run-9");
        assert_eq!(run.results[1].run_id, "other");
        assert_eq!(run.unavailable[0].label, "results.json#2");
    }

    #[test]
    fn test_envelope_run_id_applies_to_records() {
        let run = parse(json!({"run_id": "abc@2025-01-01", "results": [{"name": "a", "metrics": {"x": 1}}]}));
        assert_eq!(run.results[0].run_id, "abc@2025-01-01");
    }

    #[test]
    fn test_single_record_object() {
        let run = parse(json!({"name": "a", "metrics": {"x": 1.5}}));
        assert_eq!(run.results.len(), 1);
        assert_eq!(run.results[0].metric("x"), Some(1.5));
    }

    #[test]
    fn test_combined_suite_document_is_flattened() {
        let run = parse(json!({
            "timestamp": "2025-01-01T00:00:00Z",
            "benchmarks": [{
                "benchmark_file": "bench_softmax_results.json",
                "status": "PASSED",
                "benchmarks": [{
                    "name": "softmax-benchmark",
                    "unit": "GBps",
                    "configs": [
                        {"N": "1024", "CuTile": 100.0, "PyTorch": 80.0},
                        {"N": "2048", "CuTile": 200.0, "PyTorch": 160.0}
                    ]
                }]
            }]
        }));
        let names: Vec<_> = run.results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "softmax-benchmark[N=1024]/CuTile",
                "softmax-benchmark[N=1024]/PyTorch",
                "softmax-benchmark[N=2048]/CuTile",
                "softmax-benchmark[N=2048]/PyTorch",
            ]
        );
        assert_eq!(run.results[2].metric("CuTile"), Some(200.0));
        assert_eq!(run.results[2].metrics.len(), 1);
        assert!(run.unavailable.is_empty());
    }

    #[test]
    fn test_suite_names_match_text_tables() {
        let layout = SuiteLayout::with_backends(["CuTile"]);
        let json = parse_json_value(
            &json!({"benchmarks": [{
                "name": "gemm",
                "configs": [{"M": 64, "K": 128, "CuTile": 1.5}]
            }]}),
            "gemm_results.json",
            "r",
            &layout,
        );
        let text = crate::text::parse_text_results("gemm:\nM K CuTile\n64 128 1.5\n", "gemm_results.txt", "r", &layout);
        assert_eq!(json.results[0].name, "gemm[K=128,M=64]/CuTile");
        assert_eq!(json.results[0].name, text.results[0].name);
    }

    #[test]
    fn test_failed_benchmark_file_is_unavailable() {
        let run = parse(json!({
            "benchmarks": [{
                "benchmark_file": "bench_rope_results.json",
                "status": "FAILED",
                "error_type": "OutOfMemoryError",
                "error_message": "CUDA out of memory"
            }]
        }));
        assert!(run.results.is_empty());
        assert_eq!(run.unavailable[0].label, "bench_rope_results.json");
        assert!(run.unavailable[0].reason.contains("CUDA out of memory"));
    }

    #[test]
    fn test_benchmark_without_configs_is_unavailable() {
        let run = parse(json!({"benchmarks": [{"name": "rmsnorm", "configs": []}]}));
        assert_eq!(run.unavailable[0].label, "rmsnorm");
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let err = parse_json_results("{not json", "broken.json", "r", &SuiteLayout::default()).unwrap_err();
        assert!(err.to_string().contains("broken.json"));
    }

    #[test]
    fn test_scalar_document_is_unavailable() {
        let run = parse(json!(42));
        assert_eq!(run.unavailable.len(), 1);
        assert_eq!(run.unavailable[0].label, "results.json");
    }
}
