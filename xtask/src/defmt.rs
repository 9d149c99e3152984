//! Decoding `defmt` frames captured from UART0.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use defmt_decoder::{DecodeError, Frame, Locations, Table};

/// The `defmt` table of a firmware image, with source locations when available.
pub struct FrameLog {
    table: Table,
    locations: Option<Locations>,
}

impl FrameLog {
    /// Load the table from the ELF the capture was produced by.
    pub fn from_elf(elf_path: &Path) -> Result<Self> {
        let elf = fs::read(elf_path)
            .with_context(|| format!("Failed to read {}", elf_path.display()))?;
        let table = Table::parse(&elf)
            .context("Failed to parse defmt table from ELF")?
            .ok_or_else(|| anyhow!("{} has no defmt data", elf_path.display()))?;
        let locations = table.get_locations(&elf).ok();

        Ok(FrameLog { table, locations })
    }

    /// Render `capture` as one `file:line: [LEVEL] message` line per frame.
    ///
    /// The logger drops bytes when the transmit buffer is full, so a malformed frame is
    /// skipped when the encoding can resynchronize on the next delimiter.
    pub fn render(&self, capture: &[u8]) -> Result<String> {
        let mut decoder = self.table.new_stream_decoder();
        decoder.received(capture);

        let mut text = String::new();
        let mut skipped = 0;
        loop {
            match decoder.decode() {
                Ok(frame) => {
                    text.push_str(&self.line(&frame));
                    text.push('\n');
                }
                Err(DecodeError::UnexpectedEof) => break,
                Err(DecodeError::Malformed) if self.table.encoding().can_recover() => skipped += 1,
                Err(DecodeError::Malformed) => bail!("Malformed defmt frame in UART0 capture"),
            }
        }

        if skipped > 0 {
            println!("  note: skipped {skipped} truncated frame(s)");
        }
        Ok(text)
    }

    fn line(&self, frame: &Frame) -> String {
        let level = frame
            .level()
            .map_or("print", |l| l.as_str())
            .to_uppercase();
        let message = frame.display_message();

        let location = self
            .locations
            .as_ref()
            .and_then(|locs| locs.get(&frame.index()));
        match location {
            Some(loc) => {
                let file = loc
                    .file
                    .file_name()
                    .map_or_else(|| loc.file.display().to_string(), |f| f.to_string_lossy().into_owned());
                format!("{file}:{}: [{level:<5}] {message}", loc.line)
            }
            None => format!("[{level:<5}] {message}"),
        }
    }
}
