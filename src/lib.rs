//! # Introduction
//!
//! addrindex normalizes malloc/free traces. Raw pointer values differ from run
//! to run, so traces that record them can't be diffed or replayed directly.
//! Rewriting each distinct address to a small index, assigned in first-seen
//! order, makes the trace deterministic.
//!
//! ## Pipeline
//!
//! ```text
//! raw trace → Trace parsing → Rewriter (AddressTable) → indexed trace → Replayer → Heap
//! ```
//!
//! 1. [`trace`] — tokenises lines and classifies them as malloc or free.
//! 2. [`rewrite`] — replaces addresses with indices via an
//!    [`rewrite::AddressTable`]; unmatched frees are kept as `#` comments.
//! 3. [`replay`] — runs an indexed trace against the virtual
//!    [`memory::heap::Heap`], reporting double frees and other faults.
//! 4. [`memory`] — the bookkeeping-only heap used by replay.
//!
//! ## Trace format
//!
//! ```text
//! malloc 56 -> 0x7fc49a500c00      malloc 56 -> 0
//! free 0x7fc49a500c00              free 0
//! ```
//!
//! A blank line ends the trace.

pub mod memory;
pub mod replay;
pub mod rewrite;
pub mod trace;
