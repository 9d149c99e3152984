//! Test runner dispatch and common types.

use std::fs;
use std::path::Path;

use anyhow::Result;

use crate::build::{build_example, project_root};
use crate::standard::run_standard;

/// How an example's UART0 output is turned into text, from its file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestMode {
    /// The firmware writes plain text.
    Text,
    /// The firmware sends `defmt` frames, decoded with the ELF's table.
    Defmt,
}

/// Options for running an example.
pub struct RunOptions {
    /// Print verbose output (for `qemu` command).
    pub verbose: bool,
    /// Update expected files instead of comparing (for `test --bless`).
    pub bless: bool,
    /// Build in release mode.
    pub release: bool,
}

/// Detect test mode from file header.
///
/// Looks for `@test-mode: <mode>` in the first few lines.
fn detect_test_mode(example_path: &Path) -> TestMode {
    if let Ok(content) = fs::read_to_string(example_path) {
        for line in content.lines().take(10) {
            if let Some(mode) = line.strip_prefix("//! @test-mode:") {
                if mode.trim() == "defmt" {
                    return TestMode::Defmt;
                }
            }
        }
    }
    TestMode::Text
}

/// Run an example with the given options.
///
/// Returns `Ok(true)` if the test passed, `Ok(false)` if it failed.
pub fn run_example(example: &str, opts: &RunOptions) -> Result<bool> {
    let example_path = project_root()
        .join("testsuite")
        .join("examples")
        .join(format!("{example}.rs"));
    let mode = detect_test_mode(&example_path);

    println!("Building '{example}'...");
    let elf_path = build_example(example, opts.release)?;

    run_standard(example, &elf_path, mode, opts)
}
