//! Virtual heap for trace replay
//!
//! This module provides a bookkeeping-only heap:
//! - Bump allocation of addresses, no backing bytes
//! - Tombstone tracking for freed blocks
//! - Double-free and invalid-free detection
//! - Live and peak byte accounting against a size limit

use std::fmt;

use rustc_hash::FxHashMap;

use super::Address;
use crate::replay::constants::{DEFAULT_HEAP_LIMIT, HEAP_ADDRESS_START};

/// State of a heap block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    Allocated,
    Tombstone, // Freed, kept so a second free can be recognized
}

/// A block of heap memory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapBlock {
    pub size: usize,
    pub state: BlockState,
}

/// Errors from heap operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeapError {
    OutOfMemory {
        requested: usize,
        live: usize,
        limit: usize,
    },
    DoubleFree {
        address: Address,
    },
    InvalidFree {
        address: Address,
    },
}

impl fmt::Display for HeapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeapError::OutOfMemory {
                requested,
                live,
                limit,
            } => {
                write!(
                    f,
                    "Out of memory: requested {} bytes, {} already live, limit is {}",
                    requested, live, limit
                )
            }
            HeapError::DoubleFree { address } => {
                write!(f, "Double free detected at address 0x{:x}", address)
            }
            HeapError::InvalidFree { address } => {
                write!(
                    f,
                    "Invalid free: address 0x{:x} was never allocated",
                    address
                )
            }
        }
    }
}

impl std::error::Error for HeapError {}

/// The heap
#[derive(Debug, Clone)]
pub struct Heap {
    blocks: FxHashMap<Address, HeapBlock>,
    next_address: Address,
    live_bytes: usize,
    peak_bytes: usize,
    live_blocks: usize,
    max_heap_size: usize,
}

impl Heap {
    /// Create a new heap with a maximum size limit
    pub fn new(max_heap_size: usize) -> Self {
        Heap {
            blocks: FxHashMap::default(),
            next_address: HEAP_ADDRESS_START,
            live_bytes: 0,
            peak_bytes: 0,
            live_blocks: 0,
            max_heap_size,
        }
    }

    /// Allocate a block of memory
    pub fn allocate(&mut self, size: usize) -> Result<Address, HeapError> {
        let out_of_memory = HeapError::OutOfMemory {
            requested: size,
            live: self.live_bytes,
            limit: self.max_heap_size,
        };

        let live_bytes = match self.live_bytes.checked_add(size) {
            Some(total) if total <= self.max_heap_size => total,
            _ => return Err(out_of_memory),
        };
        // Zero-sized blocks still need an address of their own
        let next_address = match self.next_address.checked_add(size.max(1) as u64) {
            Some(next) => next,
            None => return Err(out_of_memory),
        };

        let addr = self.next_address;
        self.next_address = next_address;
        self.blocks.insert(
            addr,
            HeapBlock {
                size,
                state: BlockState::Allocated,
            },
        );
        self.live_bytes = live_bytes;
        self.live_blocks += 1;
        self.peak_bytes = self.peak_bytes.max(self.live_bytes);

        Ok(addr)
    }

    /// Free a block of memory (mark as tombstone), returning its size
    pub fn free(&mut self, addr: Address) -> Result<usize, HeapError> {
        match self.blocks.get_mut(&addr) {
            Some(block) if block.state == BlockState::Allocated => {
                block.state = BlockState::Tombstone;
                self.live_bytes -= block.size;
                self.live_blocks -= 1;
                Ok(block.size)
            }
            Some(_) => Err(HeapError::DoubleFree { address: addr }),
            None => Err(HeapError::InvalidFree { address: addr }),
        }
    }

    /// Drop a tombstone so it no longer takes up space in the block map.
    ///
    /// Live blocks are left alone; returns whether a tombstone was removed.
    pub fn forget(&mut self, addr: Address) -> bool {
        match self.blocks.get(&addr) {
            Some(block) if block.state == BlockState::Tombstone => {
                self.blocks.remove(&addr);
                true
            }
            _ => false,
        }
    }

    /// Look up a block, including tombstones
    pub fn block(&self, addr: Address) -> Option<&HeapBlock> {
        self.blocks.get(&addr)
    }

    /// Whether `addr` is the start of a block that hasn't been freed
    pub fn is_live(&self, addr: Address) -> bool {
        self.block(addr)
            .is_some_and(|block| block.state == BlockState::Allocated)
    }

    pub fn live_bytes(&self) -> usize {
        self.live_bytes
    }

    pub fn peak_bytes(&self) -> usize {
        self.peak_bytes
    }

    pub fn live_blocks(&self) -> usize {
        self.live_blocks
    }

    /// Blocks tracked, live and tombstoned
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn max_size(&self) -> usize {
        self.max_heap_size
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new(DEFAULT_HEAP_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_and_free() {
        let mut heap = Heap::new(1024);
        let a = heap.allocate(56).unwrap();
        let b = heap.allocate(24).unwrap();

        assert_eq!(a, HEAP_ADDRESS_START);
        assert_eq!(b, HEAP_ADDRESS_START + 56);
        assert_eq!(heap.live_bytes(), 80);
        assert_eq!(heap.live_blocks(), 2);

        assert_eq!(heap.free(a).unwrap(), 56);
        assert!(!heap.is_live(a));
        assert!(heap.is_live(b));
        assert_eq!(heap.live_bytes(), 24);
        assert_eq!(heap.peak_bytes(), 80);
    }

    #[test]
    fn test_double_and_invalid_free() {
        let mut heap = Heap::new(1024);
        let a = heap.allocate(8).unwrap();
        heap.free(a).unwrap();

        assert_eq!(heap.free(a), Err(HeapError::DoubleFree { address: a }));
        assert_eq!(
            heap.free(0xdead),
            Err(HeapError::InvalidFree { address: 0xdead })
        );
        assert_eq!(heap.block(a).map(|b| b.state), Some(BlockState::Tombstone));
    }

    #[test]
    fn test_zero_size_blocks_get_distinct_addresses() {
        let mut heap = Heap::new(16);
        let a = heap.allocate(0).unwrap();
        let b = heap.allocate(0).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_oversized_request_does_not_overflow() {
        let mut heap = Heap::new(1024);
        heap.allocate(1).unwrap();

        assert!(matches!(
            heap.allocate(usize::MAX),
            Err(HeapError::OutOfMemory {
                requested: usize::MAX,
                live: 1,
                limit: 1024
            })
        ));
        assert_eq!(heap.live_bytes(), 1);
        assert_eq!(heap.allocate(8).unwrap(), HEAP_ADDRESS_START + 1);
    }

    #[test]
    fn test_address_space_exhaustion() {
        let mut heap = Heap::new(usize::MAX);
        heap.next_address = u64::MAX - 4;

        assert!(matches!(
            heap.allocate(8),
            Err(HeapError::OutOfMemory { requested: 8, .. })
        ));
        assert_eq!(heap.live_blocks(), 0);
        assert!(heap.allocate(2).is_ok());
    }

    #[test]
    fn test_forget_only_drops_tombstones() {
        let mut heap = Heap::new(1024);
        let a = heap.allocate(8).unwrap();
        let b = heap.allocate(8).unwrap();
        heap.free(a).unwrap();

        assert!(!heap.forget(b));
        assert!(heap.forget(a));
        assert!(!heap.forget(a));
        assert_eq!(heap.block_count(), 1);
        assert!(heap.block(a).is_none());
    }

    #[test]
    fn test_limit_counts_live_bytes_only() {
        let mut heap = Heap::new(100);
        let a = heap.allocate(60).unwrap();
        assert!(matches!(
            heap.allocate(60),
            Err(HeapError::OutOfMemory {
                requested: 60,
                live: 60,
                limit: 100
            })
        ));

        heap.free(a).unwrap();
        assert!(heap.allocate(60).is_ok());
    }
}
