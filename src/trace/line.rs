//! Tokenization and classification of trace lines
//!
//! A trace is a sequence of lines shaped either
//!
//! ```text
//! malloc <size> -> <address>
//! free <address>
//! ```
//!
//! Lines are split on single spaces after trimming, so runs of spaces produce
//! empty tokens and survive a split/rejoin unchanged. Classification only looks
//! at the first token: anything other than `malloc` is treated as a free.

use super::errors::TraceError;

const MALLOC_KEYWORD: &str = "malloc";

/// Token position of the address in `malloc <size> -> <address>`
pub const MALLOC_ADDRESS_SLOT: usize = 3;
/// Token position of the size in `malloc <size> -> <address>`
pub const MALLOC_SIZE_SLOT: usize = 1;
/// Token position of the address in `free <address>`
pub const FREE_ADDRESS_SLOT: usize = 1;

/// Split a raw line into tokens.
///
/// Returns `None` when nothing is left after trimming, which callers treat as
/// the end-of-trace sentinel.
pub fn tokenize(line: &str) -> Option<Vec<&str>> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.split(' ').collect())
}

/// Whether a line is a `#` comment (e.g. an unmatched free kept for reference)
pub fn is_comment(line: &str) -> bool {
    line.trim_start().starts_with('#')
}

/// The two event shapes a trace line can take
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Malloc,
    Free,
}

impl EventKind {
    fn classify(first_token: &str) -> Self {
        if first_token == MALLOC_KEYWORD {
            EventKind::Malloc
        } else {
            EventKind::Free
        }
    }

    /// Token position holding the address (or index) for this kind of event
    pub fn address_slot(self) -> usize {
        match self {
            EventKind::Malloc => MALLOC_ADDRESS_SLOT,
            EventKind::Free => FREE_ADDRESS_SLOT,
        }
    }
}

/// A tokenized trace line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceLine {
    tokens: Vec<String>,
    kind: EventKind,
    line: usize,
}

impl TraceLine {
    /// Parse one input line. `line` is the 1-based line number used in errors.
    pub fn parse(text: &str, line: usize) -> Option<Self> {
        let tokens = tokenize(text)?;
        let kind = EventKind::classify(tokens[0]);
        Some(TraceLine {
            tokens: tokens.into_iter().map(str::to_string).collect(),
            kind,
            line,
        })
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn address_slot(&self) -> usize {
        self.kind.address_slot()
    }

    /// The address token, or an error if the line is too short to have one
    pub fn address(&self) -> Result<&str, TraceError> {
        self.field("address", self.address_slot())
    }

    /// Overwrite the address token in place
    pub fn replace_address(&mut self, replacement: String) -> Result<(), TraceError> {
        let slot = self.address_slot();
        self.check_slot("address", slot)?;
        self.tokens[slot] = replacement;
        Ok(())
    }

    /// Rejoin the tokens with single spaces
    pub fn render(&self) -> String {
        self.tokens.join(" ")
    }

    /// Render as a `# ` comment line
    pub fn render_commented(&self) -> String {
        format!("# {}", self.render())
    }

    fn field(&self, name: &'static str, position: usize) -> Result<&str, TraceError> {
        self.check_slot(name, position)?;
        Ok(&self.tokens[position])
    }

    fn check_slot(&self, name: &'static str, position: usize) -> Result<(), TraceError> {
        if position < self.tokens.len() {
            Ok(())
        } else {
            Err(TraceError::MissingField {
                field: name,
                position,
                tokens: self.tokens.len(),
                line: self.line,
            })
        }
    }
}

/// An event from an already-normalized trace, where addresses are indices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexedEvent {
    Malloc { size: usize, index: usize },
    Free { index: usize },
}

impl IndexedEvent {
    pub fn from_line(trace_line: &TraceLine) -> Result<Self, TraceError> {
        let index = parse_number(trace_line, "index", trace_line.address()?)?;
        match trace_line.kind() {
            EventKind::Malloc => {
                let size_text = trace_line.field("size", MALLOC_SIZE_SLOT)?;
                let size = parse_number(trace_line, "size", size_text)?;
                Ok(IndexedEvent::Malloc { size, index })
            }
            EventKind::Free => Ok(IndexedEvent::Free { index }),
        }
    }

    pub fn index(&self) -> usize {
        match self {
            IndexedEvent::Malloc { index, .. } | IndexedEvent::Free { index } => *index,
        }
    }
}

fn parse_number(
    trace_line: &TraceLine,
    field: &'static str,
    text: &str,
) -> Result<usize, TraceError> {
    text.parse::<usize>()
        .map_err(|_| TraceError::InvalidNumber {
            field,
            text: text.to_string(),
            line: trace_line.line(),
        })
}
