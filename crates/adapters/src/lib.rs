// Copyright 2025 Benchgate Contributors
// SPDX-License-Identifier: Apache-2.0

//! Result-source adapters for the benchmark gate.
//!
//! Benchmark runners leave their output behind in a handful of shapes: JSON
//! record lists, the suite's combined `all_benchmarks.json`, per-benchmark
//! `*_results.json` files or plain-text tables. Adapters normalize all of them
//! into [`RunResults`] for the gate.
//!
//! Ingestion is forgiving. A record that cannot be parsed becomes an
//! unavailable entry and the rest of the run is still gated. A source that
//! cannot be read at all surfaces an [`AdapterError`], and [`collect`] stops
//! there: a run whose results are missing must not pass the gate.

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod json;
pub mod layout;
pub mod source;
pub mod text;

pub use layout::SuiteLayout;
pub use source::{source_for_path, DirectorySource, FileSource};

use benchgate_core::RunResults;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{error, info};

/// Errors raised while reading a result source.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The source could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The source is not valid JSON.
    #[error("{source_id} is not valid JSON: {error}")]
    Json {
        /// Source the document came from.
        source_id: String,
        /// Underlying error.
        #[source]
        error: serde_json::Error,
    },

    /// A directory held no recognizable result files.
    #[error("no benchmark result files found in {0}")]
    NoResults(String),
}

/// Something that yields one run's results.
#[cfg_attr(test, mockall::automock)]
pub trait ResultSource {
    /// Identifier used in logs and unavailable entries.
    fn id(&self) -> String;

    /// Load and parse the results.
    fn load(&self) -> Result<RunResults, AdapterError>;
}

/// Load every source into one run.
///
/// Fails on the first source that cannot be loaded. Records a source could
/// not parse are already unavailable entries in its results.
pub fn collect(sources: &[Box<dyn ResultSource>]) -> Result<RunResults, AdapterError> {
    let mut run = RunResults::new();
    for source in sources {
        let id = source.id();
        let loaded = source.load().map_err(|err| {
            error!(source = %id, error = %err, "Failed to load result source");
            err
        })?;
        info!(
            source = %id,
            results = loaded.results.len(),
            unavailable = loaded.unavailable.len(),
            "Loaded result source"
        );
        run.extend(loaded);
    }
    Ok(run)
}
