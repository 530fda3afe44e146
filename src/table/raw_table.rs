use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use crate::error::Result;

/// The source file exactly as read: one entry per line, terminators stripped.
/// Line numbers handed to and reported by the pipeline are 1-based indices into this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTable {
    lines: Vec<String>,
}

impl RawTable {
    pub fn from_text(text: &str) -> Self {
        Self {
            lines: text.lines().map(str::to_string).collect(),
        }
    }

    /// Reads everything from `reader`. Invalid UTF-8 is replaced rather than rejected,
    /// so a stray byte in a comment line does not block the import.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(Self::from_text(&String::from_utf8_lossy(&buf)))
    }

    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Line by 1-based number.
    pub fn line(&self, number: usize) -> Option<&str> {
        number
            .checked_sub(1)
            .and_then(|idx| self.lines.get(idx))
            .map(String::as_str)
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Up to `count` lines starting at 1-based `start`, paired with their numbers.
    pub fn preview(&self, start: usize, count: usize) -> impl Iterator<Item = (usize, &str)> {
        let skip = start.saturating_sub(1);
        self.lines
            .iter()
            .enumerate()
            .skip(skip)
            .take(count)
            .map(|(idx, line)| (idx + 1, line.as_str()))
    }
}
