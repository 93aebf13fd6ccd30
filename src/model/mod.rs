//! Data model shared across the builder, runtime, and UI layers.

pub mod types;

pub use types::{MessageRecord, StoredMessage, Suggestion, format_timestamp, truncate_chars};
