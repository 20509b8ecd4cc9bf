// Copyright 2025 Benchgate Contributors
// SPDX-License-Identifier: Apache-2.0

//! Benchmark gate CLI entry point.

use std::process::ExitCode;

fn main() -> ExitCode {
    match benchgate_cli::run() {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(benchgate_cli::EXIT_ERROR)
        }
    }
}
