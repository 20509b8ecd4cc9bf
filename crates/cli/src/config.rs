// Copyright 2025 Benchgate Contributors
// SPDX-License-Identifier: Apache-2.0

//! Layered configuration.
//!
//! Built-in defaults, then an optional config file (format by extension),
//! then `BENCHGATE__`-prefixed environment variables with `__` between
//! nested keys, e.g. `BENCHGATE__THRESHOLDS__REGRESSION_PCT=3`.

use anyhow::{Context, Result};
use benchgate_adapters::SuiteLayout;
use benchgate_core::{GatePolicy, MetricPolicy, Thresholds};
use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "BENCHGATE";

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of human-readable logs.
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Effective configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Zone thresholds.
    pub thresholds: Thresholds,
    /// Primary metric conventions.
    pub metrics: MetricPolicy,
    /// Result ingestion.
    pub ingest: SuiteLayout,
    /// Logging.
    pub log: LogSettings,
}

impl Settings {
    /// Load from an optional file plus the process environment.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        Self::load_with(file, environment())
    }

    /// Load from an optional file plus the given environment source.
    pub fn load_with(file: Option<&Path>, env: Environment) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(File::from(path).required(true));
        }
        let settings: Self = builder
            .add_source(env)
            .build()
            .and_then(Config::try_deserialize::<Self>)
            .with_context(|| match file {
                Some(path) => format!("invalid configuration in {}", path.display()),
                None => "invalid configuration".to_string(),
            })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the gate cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.thresholds.validate()?;
        if self.ingest.backends.is_empty() {
            anyhow::bail!("invalid configuration: ingest.backends must not be empty");
        }
        if let Some(rule) = self.metrics.rules.iter().find(|r| r.benchmark.trim().is_empty()) {
            anyhow::bail!("invalid configuration: metric rule {:?} has an empty benchmark pattern", rule);
        }
        Ok(())
    }

    /// The gate policy these settings describe.
    pub fn gate_policy(&self) -> GatePolicy {
        GatePolicy {
            thresholds: self.thresholds,
            metrics: self.metrics.clone(),
        }
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to render configuration")
    }
}

/// The process environment source.
pub fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("ingest.backends")
}
