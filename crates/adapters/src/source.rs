// Copyright 2025 Benchgate Contributors
// SPDX-License-Identifier: Apache-2.0

//! File-system result sources.

use crate::json::parse_json_results;
use crate::layout::SuiteLayout;
use crate::text::parse_text_results;
use crate::{AdapterError, ResultSource};
use benchgate_core::{RunResults, UnavailableBenchmark};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Combined suite document written by the benchmark runner.
pub const COMBINED_RESULTS_FILE: &str = "all_benchmarks.json";

/// Per-benchmark result file suffixes, in preference order.
const RESULT_SUFFIXES: [&str; 2] = ["_results.json", "_results.txt"];

/// A single results file; `.json` files are parsed as JSON, anything else
/// as text tables.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    run_id: String,
    layout: SuiteLayout,
}

impl FileSource {
    /// Create a source for `path`.
    pub fn new(path: impl Into<PathBuf>, run_id: impl Into<String>, layout: SuiteLayout) -> Self {
        Self {
            path: path.into(),
            run_id: run_id.into(),
            layout,
        }
    }

    fn is_json(&self) -> bool {
        self.path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
    }

    fn label(&self) -> String {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

impl ResultSource for FileSource {
    fn id(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> Result<RunResults, AdapterError> {
        let text = fs::read_to_string(&self.path).map_err(|source| AdapterError::Io {
            path: self.path.clone(),
            source,
        })?;
        let label = self.label();

        if self.is_json() {
            parse_json_results(&text, &label, &self.run_id, &self.layout)
        } else {
            Ok(parse_text_results(&text, &label, &self.run_id, &self.layout))
        }
    }
}

/// A results directory as left behind by the suite runner.
///
/// The combined `all_benchmarks.json` wins when present. Otherwise every
/// `*_results.json` is read, and `*_results.txt` only when no JSON file
/// exists. A file that cannot be read or parsed degrades to an unavailable
/// entry rather than failing the whole directory.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
    run_id: String,
    layout: SuiteLayout,
}

impl DirectorySource {
    /// Create a source for `dir`.
    pub fn new(dir: impl Into<PathBuf>, run_id: impl Into<String>, layout: SuiteLayout) -> Self {
        Self {
            dir: dir.into(),
            run_id: run_id.into(),
            layout,
        }
    }

    /// The files this source would read, in order.
    pub fn discover(&self) -> Result<Vec<PathBuf>, AdapterError> {
        let combined = self.dir.join(COMBINED_RESULTS_FILE);
        if combined.is_file() {
            return Ok(vec![combined]);
        }

        let entries = fs::read_dir(&self.dir).map_err(|source| AdapterError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| AdapterError::Io {
                path: self.dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.is_file() {
                files.push(path);
            }
        }
        files.sort();

        for suffix in RESULT_SUFFIXES {
            let matching: Vec<PathBuf> = files
                .iter()
                .filter(|p| file_name(p).is_some_and(|n| n.ends_with(suffix)))
                .cloned()
                .collect();
            if !matching.is_empty() {
                debug!(dir = %self.dir.display(), suffix, count = matching.len(), "Discovered result files");
                return Ok(matching);
            }
        }

        Err(AdapterError::NoResults(self.dir.display().to_string()))
    }
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}

impl ResultSource for DirectorySource {
    fn id(&self) -> String {
        self.dir.display().to_string()
    }

    fn load(&self) -> Result<RunResults, AdapterError> {
        let mut run = RunResults::new();
        for path in self.discover()? {
            let source = FileSource::new(&path, self.run_id.clone(), self.layout.clone());
            match source.load() {
                Ok(parsed) => run.extend(parsed),
                Err(err) => {
                    warn!(file = %path.display(), error = %err, "Result file unreadable");
                    run.mark_unavailable(UnavailableBenchmark::new(source.label(), err.to_string()));
                }
            }
        }
        info!(
            dir = %self.dir.display(),
            results = run.results.len(),
            unavailable = run.unavailable.len(),
            "Loaded results directory"
        );
        Ok(run)
    }
}

/// Pick the source kind for a path.
pub fn source_for_path(path: impl AsRef<Path>, run_id: &str, layout: &SuiteLayout) -> Box<dyn ResultSource> {
    let path = path.as_ref();
    if path.is_dir() {
        Box::new(DirectorySource::new(path, run_id, layout.clone()))
    } else {
        Box::new(FileSource::new(path, run_id, layout.clone()))
    }
}
