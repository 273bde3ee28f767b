//! Line reading that tolerates non-UTF-8 bytes
//!
//! Traces come from instrumented programs and occasionally carry stray bytes.
//! Invalid sequences are replaced with U+FFFD instead of failing the read, so
//! one bad byte costs one token rather than the whole run.

use std::io::{self, BufRead};

/// Iterator over the lines of a reader, decoded lossily
#[derive(Debug)]
pub struct LossyLines<R> {
    reader: R,
    buf: Vec<u8>,
}

/// Split `reader` into lines with `\n` or `\r\n` removed
pub fn lossy_lines<R: BufRead>(reader: R) -> LossyLines<R> {
    LossyLines {
        reader,
        buf: Vec::new(),
    }
}

impl<R: BufRead> Iterator for LossyLines<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                if self.buf.last() == Some(&b'\n') {
                    self.buf.pop();
                    if self.buf.last() == Some(&b'\r') {
                        self.buf.pop();
                    }
                }
                Some(Ok(String::from_utf8_lossy(&self.buf).into_owned()))
            }
            Err(e) => Some(Err(e)),
        }
    }
}
