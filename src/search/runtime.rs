//! Lazy, memoized query runtime over a published shard artifact.
//!
//! A [`SearchRuntime`] starts empty. The first [`ensure_loaded`] call fetches
//! the entire shard set through its [`ShardFetcher`], decodes and cross-checks
//! it, and memoizes the outcome; concurrent callers coalesce onto that single
//! attempt and later callers reuse its result, success or failure. Queries
//! never trigger loading: [`search`] answers from whatever state is present
//! and returns nothing while the artifact is unavailable.
//!
//! [`ensure_loaded`]: SearchRuntime::ensure_loaded
//! [`search`]: SearchRuntime::search

use std::collections::BTreeMap;
use std::ops::Bound;

use futures::future::try_join_all;
use fxhash::{FxHashMap, FxHashSet};
use itertools::{EitherOrBoth, Itertools};
use thiserror::Error;
use tokio::sync::OnceCell;

use crate::artifact::shard::{
    self, Field, FieldConfig, FieldContext, FieldMap, FieldShard, RegistryShard, ShardError,
    ShardName, StoreShard,
};
use crate::artifact::tokenize::tokenize;
use crate::model::{StoredMessage, Suggestion};
use crate::search::fetch::{FetchError, ShardFetcher};

/// Why an artifact could not be brought into memory.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Shard(#[from] ShardError),
}

/// One field's decoded index: full postings plus the leading-token subset.
#[derive(Debug)]
struct FieldIndex {
    field: Field,
    lead: BTreeMap<String, Vec<u64>>,
    postings: BTreeMap<String, Vec<u64>>,
}

impl FieldIndex {
    /// Ids matching every query token in this field, opening matches first.
    ///
    /// Each token selects the union of postings for all its forward matches;
    /// the per-token unions are intersected. Ids whose field starts with a
    /// forward match of the first token rank ahead of the rest, and each
    /// partition stays in ascending id order.
    fn matches(&self, tokens: &[String]) -> Vec<u64> {
        let mut candidates: Option<Vec<u64>> = None;
        for token in tokens {
            let ids = prefix_union(&self.postings, token);
            if ids.is_empty() {
                return Vec::new();
            }
            candidates = Some(match candidates {
                None => ids,
                Some(acc) => intersect(acc, ids),
            });
        }
        let Some(ids) = candidates else { return Vec::new() };

        let lead = match tokens.first() {
            Some(first) => prefix_union(&self.lead, first),
            None => Vec::new(),
        };
        let (opening, interior): (Vec<u64>, Vec<u64>) =
            ids.into_iter().partition(|id| lead.binary_search(id).is_ok());
        opening.into_iter().chain(interior).collect()
    }
}

/// Union of postings for every key the token forward-matches.
///
/// Returned ids are ascending and unique. The scan walks the key range
/// starting at the token and stops at the first key that no longer extends it.
fn prefix_union(map: &BTreeMap<String, Vec<u64>>, token: &str) -> Vec<u64> {
    let mut ids: Vec<u64> = map
        .range::<str, _>((Bound::Included(token), Bound::Unbounded))
        .take_while(|(key, _)| key.starts_with(token))
        .flat_map(|(_, ids)| ids.iter().copied())
        .collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Intersection of two ascending id lists.
fn intersect(a: Vec<u64>, b: Vec<u64>) -> Vec<u64> {
    a.into_iter()
        .merge_join_by(b, |x, y| x.cmp(y))
        .filter_map(|pair| match pair {
            EitherOrBoth::Both(id, _) => Some(id),
            _ => None,
        })
        .collect()
}

/// A fully decoded, cross-checked artifact.
#[derive(Debug)]
pub struct SearchIndex {
    docs: FxHashMap<u64, StoredMessage>,
    fields: Vec<FieldIndex>,
    record_count: usize,
}

impl SearchIndex {
    /// Decode raw shard bytes, in [`ShardName::ALL`] order, into an index.
    ///
    /// Every field config is validated against this runtime's format version
    /// and tokenizer policy, and the store must agree with the registry on
    /// the exact document set.
    pub fn from_shard_bytes(all: Vec<Vec<u8>>) -> Result<Self, LoadError> {
        if all.len() != ShardName::ALL.len() {
            return Err(contract(
                ShardName::Registry,
                format!("expected {} shards, got {}", ShardName::ALL.len(), all.len()),
            ));
        }

        let mut registry: Option<RegistryShard> = None;
        let mut store: Option<StoreShard> = None;
        let mut contexts: [Option<FieldContext>; 4] = [None, None, None, None];
        let mut maps: [Option<FieldMap>; 4] = [None, None, None, None];
        for (name, bytes) in ShardName::ALL.iter().zip(&all) {
            match *name {
                ShardName::Registry => registry = Some(shard::decode_shard(*name, bytes)?),
                ShardName::Store => store = Some(shard::decode_shard(*name, bytes)?),
                ShardName::Field(field, FieldShard::Cfg) => {
                    let cfg: FieldConfig = shard::decode_shard(*name, bytes)?;
                    cfg.validate(field)?;
                }
                ShardName::Field(field, FieldShard::Ctx) => {
                    contexts[field.ordinal()] = Some(shard::decode_shard(*name, bytes)?);
                }
                ShardName::Field(field, FieldShard::Map) => {
                    maps[field.ordinal()] = Some(shard::decode_shard(*name, bytes)?);
                }
            }
        }

        let registry =
            registry.ok_or_else(|| missing(ShardName::Registry))?;
        let store = store.ok_or_else(|| missing(ShardName::Store))?;
        let mut fields = Vec::with_capacity(Field::ALL.len());
        for field in Field::ALL {
            let ctx = contexts[field.ordinal()]
                .take()
                .ok_or_else(|| missing(ShardName::Field(field, FieldShard::Ctx)))?;
            let map = maps[field.ordinal()]
                .take()
                .ok_or_else(|| missing(ShardName::Field(field, FieldShard::Map)))?;
            fields.push(FieldIndex { field, lead: ctx.lead, postings: map.postings });
        }

        if !registry.ids.windows(2).all(|pair| pair[0] < pair[1]) {
            return Err(contract(ShardName::Registry, "ids are not strictly ascending".into()));
        }
        let store_ids: Vec<u64> = store.docs.iter().map(|doc| doc.id).collect();
        if store_ids != registry.ids {
            return Err(contract(
                ShardName::Store,
                "document ids disagree with the registry".into(),
            ));
        }

        let record_count = registry.ids.len();
        let docs = store.docs.into_iter().map(|doc| (doc.id, doc)).collect();
        Ok(Self { docs, fields, record_count })
    }

    pub fn record_count(&self) -> usize {
        self.record_count
    }

    /// Evaluate `query` and return at most `limit` suggestions.
    ///
    /// Fields are consulted in priority order (user, flair, title, body) and
    /// a navigation target appears once, under the first field that matched
    /// it. A query with no tokens matches nothing.
    pub fn search(&self, query: &str, limit: usize) -> Vec<Suggestion> {
        let tokens = tokenize(query);
        if tokens.is_empty() || limit == 0 {
            return Vec::new();
        }

        let mut seen: FxHashSet<String> = FxHashSet::default();
        let mut out: Vec<Suggestion> = Vec::new();
        for field in &self.fields {
            for id in field.matches(&tokens) {
                let Some(doc) = self.docs.get(&id) else { continue };
                let suggestion = Suggestion::from_stored(doc);
                if !seen.insert(suggestion.href.clone()) {
                    continue;
                }
                out.push(suggestion);
                if out.len() == limit {
                    tracing::debug!(
                        field = %field.field,
                        returned = out.len(),
                        "suggestion_limit_reached"
                    );
                    return out;
                }
            }
        }
        out
    }
}

fn contract(name: ShardName, reason: String) -> LoadError {
    LoadError::Shard(ShardError::Contract { name, reason })
}

fn missing(name: ShardName) -> LoadError {
    contract(name, "payload absent from fetched shard set".into())
}

/// Shard-backed search with single-flight, memoized loading.
pub struct SearchRuntime<F> {
    fetcher: F,
    index: OnceCell<Result<SearchIndex, LoadError>>,
}

impl<F: ShardFetcher> SearchRuntime<F> {
    pub fn new(fetcher: F) -> Self {
        Self { fetcher, index: OnceCell::new() }
    }

    /// Load the artifact unless an attempt has already completed.
    ///
    /// All shards are fetched together and the outcome is memoized: a failed
    /// attempt is never retried, and no shard is ever requested twice over
    /// the lifetime of this runtime. Concurrent callers share one attempt.
    pub async fn ensure_loaded(&self) -> Result<&SearchIndex, &LoadError> {
        self.index
            .get_or_init(|| async {
                match self.load().await {
                    Ok(index) => {
                        tracing::info!(records = index.record_count(), "artifact_loaded");
                        Ok(index)
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "artifact_load_failed");
                        Err(err)
                    }
                }
            })
            .await
            .as_ref()
    }

    /// Whether a completed load attempt produced a usable index.
    pub fn is_loaded(&self) -> bool {
        matches!(self.index.get(), Some(Ok(_)))
    }

    /// Answer from the current state without triggering a load.
    ///
    /// Returns no suggestions while the artifact is not loaded, whether the
    /// load has not been requested yet or failed.
    pub fn search(&self, query: &str, limit: usize) -> Vec<Suggestion> {
        match self.index.get() {
            Some(Ok(index)) => index.search(query, limit),
            _ => Vec::new(),
        }
    }

    async fn load(&self) -> Result<SearchIndex, LoadError> {
        let fetched =
            try_join_all(ShardName::ALL.iter().map(|name| self.fetcher.fetch(*name))).await?;
        SearchIndex::from_shard_bytes(fetched)
    }
}
