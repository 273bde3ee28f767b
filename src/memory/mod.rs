//! Memory model for trace replay
//!
//! - [`heap`]: virtual heap with malloc/free and tombstone tracking
//!
//! Addresses are plain 64-bit integers handed out by the heap; nothing is
//! ever read from or written to them.

pub mod heap;

/// Virtual address in the replay heap
pub type Address = u64;
