use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write as _};
use std::path::Path;

use colored::Colorize;

use crate::opcode::Word;
use crate::unit::MemoryImage;

impl fmt::Display for MemoryImage {
    /// `.ram` representation: one word per line, starting at address 0.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for word in self {
            writeln!(f, "{word}")?;
        }
        Ok(())
    }
}

/// Write `image` to `path` as a `.ram` file. Only called once assembly succeeded.
pub fn write_ram(path: &Path, image: &MemoryImage) -> io::Result<()> {
    let mut file = BufWriter::new(File::create(path)?);
    write!(file, "{image}")?;
    file.flush()
}

/// Human-readable view of the used part of an image.
pub struct Listing<'a>(pub &'a MemoryImage);

impl fmt::Display for Listing<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let used = self
            .0
            .iter()
            .rposition(|word| !word.is_empty())
            .map_or(0, |addr| addr + 1);
        for (addr, word) in self.0.iter().enumerate().take(used) {
            let addr = format!("{addr:03}");
            let text = word.to_string();
            let text = match word {
                Word::Data(_) => text.cyan(),
                Word::Instr { op, .. } => format!("{text:>5}  {op}").green(),
            };
            writeln!(f, "{}  {}", addr.dimmed(), text)?;
        }
        Ok(())
    }
}
