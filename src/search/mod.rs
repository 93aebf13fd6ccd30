//! Search layer facade.
//!
//! This module provides the client side of the shard contract:
//!
//! - **[`fetch`]**: Shard transport (HTTP and filesystem) behind the [`ShardFetcher`] trait.
//! - **[`runtime`]**: Lazy artifact loading and query evaluation over loaded shards.

pub mod fetch;
pub mod runtime;

pub use fetch::{FetchError, FsShardFetcher, HttpShardFetcher, ShardFetcher};
pub use runtime::{LoadError, SearchIndex, SearchRuntime};
