//! Artifact contract shared by the builder and the query runtime.
//!
//! - **[`shard`]**: the closed shard name set and payload codecs.
//! - **[`tokenize`]**: the single tokenizer both sides must use.
//! - **[`version`]**: content-addressed build identity for freshness signaling.

pub mod shard;
pub mod tokenize;
pub mod version;

/// Directory under the site output root holding the shard files; doubles as
/// the runtime's default fetch base route (`/search/`).
pub const ARTIFACT_DIR: &str = "search";

/// Dataset file the site generator leaves at the input root.
pub const DATASET_FILE: &str = "search.json";
