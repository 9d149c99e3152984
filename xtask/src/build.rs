//! Building the testsuite firmware.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};

/// Target the testsuite firmware is built for.
pub const TARGET: &str = "thumbv7m-none-eabi";

/// The workspace root, one level above this crate.
pub fn project_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .expect("xtask lives inside the workspace")
        .to_path_buf()
}

/// Build a testsuite example and return the path to its ELF.
pub fn build_example(example: &str, release: bool) -> Result<PathBuf> {
    let root = project_root();
    let cargo = std::env::var_os("CARGO").unwrap_or_else(|| "cargo".into());

    let mut cmd = Command::new(cargo);
    cmd.current_dir(root.join("testsuite"))
        .env("DEFMT_LOG", "trace")
        .args(["build", "--quiet", "--example", example, "--target", TARGET]);
    if release {
        cmd.arg("--release");
    }

    let status = cmd.status().context("Failed to run cargo build")?;
    if !status.success() {
        bail!("cargo build of '{example}' failed");
    }

    let profile = if release { "release" } else { "debug" };
    Ok(root
        .join("target")
        .join(TARGET)
        .join(profile)
        .join("examples")
        .join(example))
}

/// Names of all examples in the testsuite, sorted.
pub fn discover_examples() -> Result<Vec<String>> {
    let examples_dir = project_root().join("testsuite").join("examples");

    let mut examples = Vec::new();
    for entry in fs::read_dir(&examples_dir).context("Failed to read examples directory")? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "rs") {
            if let Some(stem) = path.file_stem() {
                examples.push(stem.to_string_lossy().into_owned());
            }
        }
    }
    examples.sort();
    Ok(examples)
}
