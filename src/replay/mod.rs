//! Trace replay
//!
//! Drives the virtual [`Heap`] with an index-normalized trace such as
//!
//! ```text
//! malloc 272 -> 437
//! malloc 64 -> 438
//! free 438
//! # free 0x7fc49a999999
//! ```
//!
//! Each index is bound to the address the heap returns for its `malloc`.
//! Bindings survive a `free`, so freeing the same index twice reaches the heap
//! twice and is reported as a double free. Such faults are recorded and the
//! replay continues; only index overruns, heap exhaustion and malformed lines
//! stop it.
//!
//! Once an index is rebound, the freed block it used to name is dropped from
//! the heap, so the heap tracks at most one block per index plus any leaked
//! live blocks.
//!
//! Comment lines (`#`) and blank lines are skipped and are not numbered.

pub mod constants;

use std::fmt;
use std::io::{self, BufRead};

use rustc_hash::FxHashMap;

use crate::memory::heap::{Heap, HeapError};
use crate::memory::Address;
use crate::trace::{is_comment, lossy_lines, IndexedEvent, TraceError, TraceLine};
use constants::{DEFAULT_HEAP_LIMIT, MAX_INDEXES};

/// One executed instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayStep {
    /// 0-based instruction number (comments and blanks excluded)
    pub instruction: usize,
    /// The trace line as read, trimmed
    pub text: String,
    /// Address allocated or freed; `None` for a free of an unbound index
    pub address: Option<Address>,
}

/// Non-fatal problems found in a trace
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayFault {
    /// `free` of an index whose block was already freed
    DoubleFree {
        instruction: usize,
        index: usize,
        address: Address,
    },
    /// `free` of an index no `malloc` has bound
    UnboundFree { instruction: usize, index: usize },
    /// `malloc` to an index whose previous block is still live
    LiveRebind {
        instruction: usize,
        index: usize,
        address: Address,
    },
}

impl fmt::Display for ReplayFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplayFault::DoubleFree {
                instruction,
                index,
                address,
            } => {
                write!(
                    f,
                    "{}: double free of index {} (0x{:x})",
                    instruction, index, address
                )
            }
            ReplayFault::UnboundFree { instruction, index } => {
                write!(
                    f,
                    "{}: free of index {} which was never allocated",
                    instruction, index
                )
            }
            ReplayFault::LiveRebind {
                instruction,
                index,
                address,
            } => {
                write!(
                    f,
                    "{}: malloc rebinds index {} while 0x{:x} is still live",
                    instruction, index, address
                )
            }
        }
    }
}

/// Fatal replay errors
#[derive(Debug)]
pub enum ReplayError {
    Trace(TraceError),
    IndexOverrun {
        index: usize,
        limit: usize,
        line: usize,
    },
    Heap {
        source: HeapError,
        line: usize,
    },
    Io(io::Error),
}

impl fmt::Display for ReplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplayError::Trace(err) => write!(f, "{}", err),
            ReplayError::IndexOverrun { index, limit, line } => {
                write!(
                    f,
                    "Index overrun at line {}: index {} exceeds limit of {}",
                    line, index, limit
                )
            }
            ReplayError::Heap { source, line } => {
                write!(f, "{} at line {}", source, line)
            }
            ReplayError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for ReplayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReplayError::Trace(err) => Some(err),
            ReplayError::Heap { source, .. } => Some(source),
            ReplayError::Io(err) => Some(err),
            ReplayError::IndexOverrun { .. } => None,
        }
    }
}

impl From<TraceError> for ReplayError {
    fn from(err: TraceError) -> Self {
        ReplayError::Trace(err)
    }
}

impl From<io::Error> for ReplayError {
    fn from(err: io::Error) -> Self {
        ReplayError::Io(err)
    }
}

/// Outcome of a replay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayReport {
    pub instructions: usize,
    pub faults: Vec<ReplayFault>,
    pub live_bytes: usize,
    pub live_blocks: usize,
    pub peak_bytes: usize,
}

/// Replays an indexed trace against a virtual heap
#[derive(Debug)]
pub struct Replayer {
    heap: Heap,
    bindings: FxHashMap<usize, Address>,
    faults: Vec<ReplayFault>,
    instruction: usize,
    line_number: usize,
}

impl Replayer {
    /// Create a replayer whose heap holds at most `heap_limit` live bytes
    pub fn new(heap_limit: usize) -> Self {
        Replayer {
            heap: Heap::new(heap_limit),
            bindings: FxHashMap::default(),
            faults: Vec::new(),
            instruction: 0,
            line_number: 0,
        }
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn faults(&self) -> &[ReplayFault] {
        &self.faults
    }

    /// Address currently bound to `index`
    pub fn binding(&self, index: usize) -> Option<Address> {
        self.bindings.get(&index).copied()
    }

    /// Execute one trace line. Returns `None` for skipped lines.
    pub fn replay_line(&mut self, text: &str) -> Result<Option<ReplayStep>, ReplayError> {
        self.line_number += 1;

        if is_comment(text) {
            return Ok(None);
        }
        let trace_line = match TraceLine::parse(text, self.line_number) {
            Some(trace_line) => trace_line,
            None => return Ok(None),
        };

        let event = IndexedEvent::from_line(&trace_line)?;
        if event.index() >= MAX_INDEXES {
            return Err(ReplayError::IndexOverrun {
                index: event.index(),
                limit: MAX_INDEXES,
                line: self.line_number,
            });
        }

        let instruction = self.instruction;
        self.instruction += 1;

        let address = match event {
            IndexedEvent::Malloc { size, index } => Some(self.malloc(instruction, size, index)?),
            IndexedEvent::Free { index } => self.free(instruction, index)?,
        };

        Ok(Some(ReplayStep {
            instruction,
            text: trace_line.render(),
            address,
        }))
    }

    /// Replay every line of `input`, handing each executed step to `on_step`
    pub fn run<R, F>(&mut self, input: R, mut on_step: F) -> Result<ReplayReport, ReplayError>
    where
        R: BufRead,
        F: FnMut(&ReplayStep),
    {
        for line in lossy_lines(input) {
            let line = line?;
            if let Some(step) = self.replay_line(&line)? {
                on_step(&step);
            }
        }
        Ok(self.report())
    }

    /// Snapshot of the counters and faults so far
    pub fn report(&self) -> ReplayReport {
        ReplayReport {
            instructions: self.instruction,
            faults: self.faults.clone(),
            live_bytes: self.heap.live_bytes(),
            live_blocks: self.heap.live_blocks(),
            peak_bytes: self.heap.peak_bytes(),
        }
    }

    fn malloc(
        &mut self,
        instruction: usize,
        size: usize,
        index: usize,
    ) -> Result<Address, ReplayError> {
        let address = self
            .heap
            .allocate(size)
            .map_err(|source| ReplayError::Heap {
                source,
                line: self.line_number,
            })?;

        if let Some(previous) = self.bindings.insert(index, address) {
            if self.heap.is_live(previous) {
                self.faults.push(ReplayFault::LiveRebind {
                    instruction,
                    index,
                    address: previous,
                });
            } else {
                // Nothing can name the old block any more
                self.heap.forget(previous);
            }
        }
        Ok(address)
    }

    fn free(&mut self, instruction: usize, index: usize) -> Result<Option<Address>, ReplayError> {
        let address = match self.binding(index) {
            Some(address) => address,
            None => {
                self.faults
                    .push(ReplayFault::UnboundFree { instruction, index });
                return Ok(None);
            }
        };

        match self.heap.free(address) {
            Ok(_) => {}
            Err(HeapError::DoubleFree { address }) => {
                self.faults.push(ReplayFault::DoubleFree {
                    instruction,
                    index,
                    address,
                });
            }
            // Bound addresses always name a block this heap still tracks
            Err(
                source @ (HeapError::InvalidFree { .. } | HeapError::OutOfMemory { .. }),
            ) => {
                return Err(ReplayError::Heap {
                    source,
                    line: self.line_number,
                });
            }
        }
        Ok(Some(address))
    }
}

impl Default for Replayer {
    fn default() -> Self {
        Self::new(DEFAULT_HEAP_LIMIT)
    }
}
