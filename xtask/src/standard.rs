//! Single run in QEMU, UART0 output compared against an expected file.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::build::project_root;
use crate::defmt::FrameLog;
use crate::qemu::run_qemu;
use crate::runner::{RunOptions, TestMode};

/// Run an example once and check its UART0 output.
pub fn run_standard(example: &str, elf_path: &Path, mode: TestMode, opts: &RunOptions) -> Result<bool> {
    println!("Running in QEMU...");
    let output = run_qemu(elf_path)?;
    let uart0 = match mode {
        TestMode::Text => String::from_utf8_lossy(&output.uart0).into_owned(),
        TestMode::Defmt => FrameLog::from_elf(elf_path)?.render(&output.uart0)?,
    };
    let semihosting = String::from_utf8_lossy(&output.semihosting);

    if opts.verbose {
        print!("{uart0}");
        println!("--- QEMU run end ---");
        if !semihosting.is_empty() {
            println!("--- semihosting ---");
            print!("{semihosting}");
        }
        return Ok(true);
    }

    let expected_path = project_root()
        .join("testsuite")
        .join("expected")
        .join(format!("{example}.expected"));
    let filename = format!("{example}.expected");

    if opts.bless {
        let status = if expected_path.exists() {
            let existing = fs::read_to_string(&expected_path)?;
            if existing == uart0 {
                "No change"
            } else {
                fs::write(&expected_path, &uart0)?;
                "Updated"
            }
        } else {
            let dir = expected_path
                .parent()
                .context("Expected file has no parent directory")?;
            fs::create_dir_all(dir)?;
            fs::write(&expected_path, &uart0)?;
            "Created"
        };
        println!("  {filename}: {status}");
        Ok(true)
    } else if expected_path.exists() {
        let expected = fs::read_to_string(&expected_path)?;
        if uart0 == expected {
            println!("  PASS");
            Ok(true)
        } else {
            println!("  FAIL: output differs from expected");
            println!("--- expected ---");
            print!("{expected}");
            println!("--- uart ---");
            print!("{uart0}");
            if !semihosting.is_empty() {
                println!("--- semihosting ---");
                print!("{semihosting}");
            }
            Ok(false)
        }
    } else {
        println!("  No expected output file, run with --bless to create");
        println!("--- output ---");
        print!("{uart0}");
        Ok(false)
    }
}
