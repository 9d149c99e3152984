//! QEMU runner for the LM3S6965 (Cortex-M3).

use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{Context, Result, bail};
use tempfile::NamedTempFile;

/// Output from running QEMU.
pub struct QemuOutput {
    /// Semihosting stdout, where panic messages end up.
    pub semihosting: Vec<u8>,
    /// Everything the firmware sent on UART0.
    pub uart0: Vec<u8>,
}

/// Run an ELF in QEMU, capturing UART0 to a file.
pub fn run_qemu(elf_path: &Path) -> Result<QemuOutput> {
    let uart0_file = NamedTempFile::new().context("Failed to create temp file for UART0")?;
    let uart0_path = uart0_file.path();

    let output = Command::new("qemu-system-arm")
        .args(["-cpu", "cortex-m3", "-machine", "lm3s6965evb"])
        .args(["-nographic", "-monitor", "none"])
        .args(["-semihosting-config", "enable=on,target=native"])
        .arg("-serial")
        .arg(format!("file:{}", uart0_path.display()))
        .arg("-kernel")
        .arg(elf_path)
        .stdin(Stdio::null())
        .output()
        .context("Failed to run QEMU")?;

    if !output.status.success() {
        bail!(
            "QEMU exited with error: {:?}\n{}{}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
    }

    let uart0 = fs::read(uart0_path).context("Failed to read UART0 capture")?;

    Ok(QemuOutput {
        semihosting: output.stdout,
        uart0,
    })
}
