// Constants for trace replay

/// Highest index count a replayed trace may use; indices must be below this
pub const MAX_INDEXES: usize = 200_000;

/// Starting address for virtual heap allocations
/// Kept well away from zero so a printed address is never mistaken for an index
pub const HEAP_ADDRESS_START: u64 = 0x1000_0000;

/// Default cap on live bytes in the virtual heap (1 GB)
pub const DEFAULT_HEAP_LIMIT: usize = 1024 * 1024 * 1024;
