// Copyright 2025 Benchgate Contributors
// SPDX-License-Identifier: Apache-2.0

//! I/O operations for baselines and reports.
//!
//! The gate itself never touches the filesystem; these helpers are what the
//! CLI uses to read the old document and write everything a run produces.

use crate::decision_log::DecisionLog;
use benchgate_core::BaselineDocument;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use tracing::info;

fn ensure_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

/// Read and validate a baseline document.
pub fn read_baseline(path: impl AsRef<Path>) -> io::Result<BaselineDocument> {
    let content = fs::read_to_string(path)?;
    BaselineDocument::from_json(&content).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Read a baseline document, treating a missing file as an empty one.
pub fn read_baseline_or_default(path: impl AsRef<Path>) -> io::Result<BaselineDocument> {
    match read_baseline(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(BaselineDocument::new()),
        other => other,
    }
}

/// Write a baseline document as pretty JSON.
pub fn write_baseline(baseline: &BaselineDocument, path: impl AsRef<Path>) -> io::Result<()> {
    let path = path.as_ref();
    ensure_parent(path)?;
    let json = baseline
        .to_json()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    fs::write(path, json + "\n")?;
    info!(path = %path.display(), entries = baseline.len(), "Wrote baseline");
    Ok(())
}

/// Write a markdown report.
pub fn write_markdown(markdown: &str, path: impl AsRef<Path>) -> io::Result<()> {
    let path = path.as_ref();
    ensure_parent(path)?;
    fs::write(path, markdown)
}

/// Write the decision log.
pub fn write_decision_log(log: &DecisionLog, path: impl AsRef<Path>) -> io::Result<()> {
    let path = path.as_ref();
    ensure_parent(path)?;
    let json = log
        .to_json()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    fs::write(path, json + "\n")
}

/// Append markdown to a CI step summary file, creating it if needed.
pub fn append_step_summary(markdown: &str, path: impl AsRef<Path>) -> io::Result<()> {
    let path = path.as_ref();
    ensure_parent(path)?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(markdown.as_bytes())?;
    if !markdown.ends_with('\n') {
        file.write_all(b"\n")?;
    }
    Ok(())
}
