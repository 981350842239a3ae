//! Output utilities for commands with BrokenPipe handling.
//!
//! These macros handle the common case where output is piped to a command like `head`
//! that closes the pipe early. Instead of erroring, we gracefully return Ok(()).

use colored::*;
use std::io::{self, Write};

/// Write a line to `$out`, handling BrokenPipe gracefully.
///
/// Returns `Ok(())` early if BrokenPipe is encountered (e.g., when piped to `head`).
/// Propagates other IO errors.
#[macro_export]
macro_rules! write_line {
    ($out:expr, $($arg:tt)*) => {{
        match writeln!($out, $($arg)*) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }
    }};
}

pub use crate::write_line;

/// Separator printed ahead of summary lines
pub const SEPARATOR: &str = "-------------------------------";

/// Map a BrokenPipe write failure to success
pub fn ignore_broken_pipe(result: io::Result<()>) -> io::Result<()> {
    match result {
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        other => other,
    }
}

/// ASCII box table in the style of the router admin tools:
///
/// ```text
/// +----------+-------------------------+
/// | QBFS URI | TARGET FS PATH          |
/// +----------+-------------------------+
/// | c1/a     | hdfs://cluster-1/system |
/// +----------+-------------------------+
/// ```
#[derive(Debug, Clone, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    styled: bool,
}

impl Table {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Table {
            headers: headers.into_iter().map(|h| Into::<String>::into(h).to_uppercase()).collect(),
            rows: Vec::new(),
            styled: false,
        }
    }

    /// Render the header row in bold
    pub fn styled(mut self, styled: bool) -> Self {
        self.styled = styled;
        self
    }

    /// Append a row; missing cells render empty, extra cells are dropped
    pub fn push_row<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut row: Vec<String> = cells.into_iter().map(Into::into).collect();
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(cell.chars().count());
            }
        }
        widths
    }

    fn write_border(out: &mut dyn Write, widths: &[usize]) -> io::Result<()> {
        let mut line = String::from("+");
        for w in widths {
            line.push_str(&"-".repeat(w + 2));
            line.push('+');
        }
        writeln!(out, "{line}")
    }

    fn write_cells(
        out: &mut dyn Write,
        cells: &[String],
        widths: &[usize],
        bold: bool,
    ) -> io::Result<()> {
        let mut line = String::from("|");
        for (cell, w) in cells.iter().zip(widths) {
            // Pad before styling so escape codes don't count toward the width
            let padded = format!(" {cell:<w$} ");
            if bold {
                line.push_str(&padded.bold().to_string());
            } else {
                line.push_str(&padded);
            }
            line.push('|');
        }
        writeln!(out, "{line}")
    }

    /// Write the table to `out`
    pub fn render(&self, out: &mut dyn Write) -> io::Result<()> {
        let widths = self.widths();

        Self::write_border(out, &widths)?;
        Self::write_cells(out, &self.headers, &widths, self.styled)?;
        Self::write_border(out, &widths)?;
        for row in &self.rows {
            Self::write_cells(out, row, &widths, false)?;
        }
        if !self.rows.is_empty() {
            Self::write_border(out, &widths)?;
        }
        Ok(())
    }
}
