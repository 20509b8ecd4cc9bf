// Copyright 2025 Benchgate Contributors
// SPDX-License-Identifier: Apache-2.0

//! Logging setup. Logs go to stderr; stdout carries the report.

use crate::config::LogSettings;
use anyhow::{anyhow, Result};
use std::io;
use tracing_subscriber::EnvFilter;

/// Filter directive: `RUST_LOG` wins, then `-v` flags, then the configured level.
pub fn filter_directive(settings: &LogSettings, verbose: u8) -> String {
    match verbose {
        0 => settings.level.clone(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// Install the global subscriber.
pub fn init(settings: &LogSettings, verbose: u8) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter_directive(settings, verbose)))
        .map_err(|e| anyhow!("invalid log filter: {}", e))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr);

    let installed = if settings.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| anyhow!("failed to initialize logging: {}", e))
}
