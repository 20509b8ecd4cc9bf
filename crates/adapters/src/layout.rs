// Copyright 2025 Benchgate Contributors
// SPDX-License-Identifier: Apache-2.0

//! Suite layout: flattening per-configuration rows into results.
//!
//! Kernel suites report one row per problem size, e.g.
//! `{"N": "1024", "CuTile": 100.0, "PyTorch": 80.0}`. Every other column than
//! the backends is a parameter folded into the benchmark name, and each
//! backend becomes its own single-metric result (`softmax[N=1024]/CuTile`),
//! so every size and backend is gated on its own.

use benchgate_core::record::parse_metric_value;
use benchgate_core::{BenchmarkResult, MalformedResultError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which columns of a configuration row are backends (metrics).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteLayout {
    /// Backend column names.
    #[serde(default = "default_backends")]
    pub backends: Vec<String>,
}

fn default_backends() -> Vec<String> {
    ["CuTile", "PyTorch", "Triton", "TorchCompile"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

impl Default for SuiteLayout {
    fn default() -> Self {
        Self {
            backends: default_backends(),
        }
    }
}

impl SuiteLayout {
    /// Layout with custom backend columns.
    pub fn with_backends<I, S>(backends: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            backends: backends.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `column` is a backend column.
    pub fn is_backend(&self, column: &str) -> bool {
        self.backends.iter().any(|b| b == column)
    }

    /// Name of a configuration: parameters sorted by column name, so the
    /// same configuration gets the same name whatever the column order.
    pub fn config_name(&self, benchmark: &str, cells: &[(String, Value)]) -> String {
        let mut params: Vec<(&str, String)> = cells
            .iter()
            .filter(|(column, _)| !self.is_backend(column))
            .map(|(column, raw)| (column.as_str(), render_param(raw)))
            .collect();
        params.sort();

        if params.is_empty() {
            benchmark.to_string()
        } else {
            let joined: Vec<String> = params.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            format!("{}[{}]", benchmark, joined.join(","))
        }
    }

    /// Build one result per backend from a configuration row, named
    /// `<config>/<backend>` with the backend as its only metric.
    ///
    /// A backend cell that is not numeric is skipped. A non-finite one
    /// rejects that backend only. A row without any numeric backend yields a
    /// single error for the configuration.
    pub fn config_results(
        &self,
        benchmark: &str,
        unit: Option<&str>,
        cells: &[(String, Value)],
        run_id: &str,
    ) -> Vec<Result<BenchmarkResult, MalformedResultError>> {
        let name = self.config_name(benchmark, cells);

        let measured: Vec<(&str, f64)> = cells
            .iter()
            .filter(|(column, _)| self.is_backend(column))
            .filter_map(|(column, raw)| parse_metric_value(raw).map(|v| (column.as_str(), v)))
            .collect();

        if measured.is_empty() {
            return vec![Err(MalformedResultError::NoMetrics { name })];
        }

        measured
            .into_iter()
            .map(|(backend, value)| {
                BenchmarkResult::new(format!("{}/{}", name, backend), [(backend, value)], run_id)
                    .map(|r| r.with_unit(unit.map(str::to_string)))
            })
            .collect()
    }
}

/// Render a parameter value so that `1024`, `"1024"` and `"1024.0"` agree.
pub fn render_param(raw: &Value) -> String {
    let text = match raw {
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    };
    match text.parse::<f64>() {
        Ok(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", n as i64),
        _ => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cells(pairs: &[(&str, Value)]) -> Vec<(String, Value)> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_render_param_normalizes_integers() {
        assert_eq!(render_param(&json!(1024)), "1024");
        assert_eq!(render_param(&json!("1024")), "1024");
        assert_eq!(render_param(&json!("1024.0")), "1024");
        assert_eq!(render_param(&json!(0.5)), "0.5");
        assert_eq!(render_param(&json!("bf16")), "bf16");
    }

    #[test]
    fn test_config_row_becomes_one_result_per_backend() {
        let layout = SuiteLayout::default();
        let row = cells(&[("N", json!("2048")), ("CuTile", json!(200.0)), ("PyTorch", json!("160.5"))]);
        let results: Vec<_> = layout
            .config_results("softmax", Some("GBps"), &row, "run-1")
            .into_iter()
            .map(Result::unwrap)
            .collect();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].name, "softmax[N=2048]/CuTile");
        assert_eq!(results[0].metrics.len(), 1);
        assert_eq!(results[0].metric("CuTile"), Some(200.0));
        assert_eq!(results[1].name, "softmax[N=2048]/PyTorch");
        assert_eq!(results[1].metric("PyTorch"), Some(160.5));
        assert_eq!(results[1].unit.as_deref(), Some("GBps"));
    }

    #[test]
    fn test_params_are_sorted_by_column() {
        let layout = SuiteLayout::with_backends(["cutile"]);
        let given = cells(&[("M", json!(64)), ("K", json!(128)), ("cutile", json!(1.5))]);
        let swapped = cells(&[("cutile", json!(1.5)), ("K", json!("128")), ("M", json!("64.0"))]);
        assert_eq!(layout.config_name("gemm", &given), "gemm[K=128,M=64]");
        assert_eq!(layout.config_name("gemm", &given), layout.config_name("gemm", &swapped));
    }

    #[test]
    fn test_row_without_backend_values_is_malformed() {
        let layout = SuiteLayout::default();
        let row = cells(&[("N", json!("1024")), ("CuTile", json!(null))]);
        let results = layout.config_results("softmax", None, &row, "r");
        assert_eq!(results.len(), 1);
        let err = results[0].as_ref().unwrap_err();
        assert_eq!(err.benchmark_name(), Some("softmax[N=1024]"));
    }

    #[test]
    fn test_non_finite_backend_rejects_only_that_backend() {
        let layout = SuiteLayout::default();
        let row = cells(&[("N", json!(1)), ("CuTile", json!("inf")), ("Triton", json!(3.0))]);
        let results = layout.config_results("rope", None, &row, "r");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().unwrap_err().benchmark_name(), Some("rope[N=1]/CuTile"));
        assert_eq!(results[1].as_ref().unwrap().name, "rope[N=1]/Triton");
    }
}
