//! The line rewriter
//!
//! Reads a raw malloc/free trace one line at a time and replaces each address
//! with its index from an [`AddressTable`]:
//!
//! ```text
//! malloc 56 -> 0x7fc49a500c00      malloc 56 -> 0
//! free 0x7fc49a500c00         →    free 0
//! free 0x7fc49a999999              # free 0x7fc49a999999
//! ```
//!
//! A free whose address was never allocated is kept as a `# ` comment so the
//! index stream only ever references allocated blocks. A blank line ends the
//! trace; nothing after it is read. Bytes that aren't valid UTF-8 are read as
//! U+FFFD rather than aborting the run.

use std::io::{BufRead, Write};

use super::table::AddressTable;
use crate::trace::{lossy_lines, EventKind, TraceError, TraceLine};

/// What the rewriter produced for one input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rewritten {
    /// Address replaced by its index
    Line(String),
    /// Unmatched free, emitted as a comment
    Comment(String),
    /// Blank line: stop processing
    Halt,
}

/// Counters for a completed run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteSummary {
    pub lines_read: usize,
    pub lines_rewritten: usize,
    pub unmatched_frees: usize,
    pub halted: bool,
}

/// Stream rewriter owning the address table for one run
#[derive(Debug, Default)]
pub struct Rewriter {
    table: AddressTable,
    line_number: usize,
}

impl Rewriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self) -> &AddressTable {
        &self.table
    }

    /// Rewrite a single line. Line numbers advance on every call.
    pub fn rewrite_line(&mut self, text: &str) -> Result<Rewritten, TraceError> {
        self.line_number += 1;

        let mut trace_line = match TraceLine::parse(text, self.line_number) {
            Some(trace_line) => trace_line,
            None => return Ok(Rewritten::Halt),
        };

        let address = trace_line.address()?;
        let index = match trace_line.kind() {
            EventKind::Malloc => self.table.index_or_assign(address),
            EventKind::Free => match self.table.lookup(address) {
                Some(index) => index,
                None => return Ok(Rewritten::Comment(trace_line.render_commented())),
            },
        };

        trace_line.replace_address(index.to_string())?;
        Ok(Rewritten::Line(trace_line.render()))
    }

    /// Rewrite `input` into `output` until end of input or a blank line.
    ///
    /// Output written before an error is flushed before the error is returned.
    pub fn run<R: BufRead, W: Write>(
        &mut self,
        input: R,
        mut output: W,
    ) -> Result<RewriteSummary, TraceError> {
        let result = self.rewrite_all(input, &mut output);
        let flushed = output.flush();
        let summary = result?;
        flushed?;
        Ok(summary)
    }

    fn rewrite_all<R: BufRead, W: Write>(
        &mut self,
        input: R,
        output: &mut W,
    ) -> Result<RewriteSummary, TraceError> {
        let mut summary = RewriteSummary::default();

        for line in lossy_lines(input) {
            let line = line?;
            summary.lines_read += 1;

            match self.rewrite_line(&line)? {
                Rewritten::Line(text) => {
                    writeln!(output, "{}", text)?;
                    summary.lines_rewritten += 1;
                }
                Rewritten::Comment(text) => {
                    writeln!(output, "{}", text)?;
                    summary.unmatched_frees += 1;
                }
                Rewritten::Halt => {
                    summary.halted = true;
                    break;
                }
            }
        }

        Ok(summary)
    }
}
