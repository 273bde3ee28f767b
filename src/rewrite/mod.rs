//! Address normalization
//!
//! - [`table`]: the first-seen address → index table
//! - [`engine`]: the line-by-line stream rewriter built on it

pub mod engine;
pub mod table;

pub use engine::{RewriteSummary, Rewriter, Rewritten};
pub use table::AddressTable;
