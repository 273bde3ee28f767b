//! Trace line parsing
//!
//! - [`line`]: tokenization, malloc/free classification and field access
//! - [`reader`]: line reading that survives non-UTF-8 input
//! - [`errors`]: the [`TraceError`] type shared by the rewriter and replayer

pub mod errors;
pub mod line;
pub mod reader;

pub use errors::TraceError;
pub use line::{is_comment, tokenize, EventKind, IndexedEvent, TraceLine};
pub use reader::{lossy_lines, LossyLines};
