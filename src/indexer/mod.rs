//! Offline index builder: dataset file in, shard artifact out.
//!
//! The builder reads `search.json` from the input directory, tokenizes every
//! record once per field, and serializes the fixed shard set under
//! `<output>/search/`. Publication is two-phase: shards are staged into a
//! temporary directory next to the final location and moved into place only
//! after every shard has been written, so readers never observe a
//! half-written artifact.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::Serialize;

use crate::artifact::shard::{
    self, Field, FieldConfig, FieldContext, FieldMap, FieldShard, RegistryShard, ShardError,
    ShardName, StoreShard,
};
use crate::artifact::tokenize::tokenize;
use crate::artifact::version::{ArtifactVersion, content_version};
use crate::artifact::{ARTIFACT_DIR, DATASET_FILE};
use crate::model::{MessageRecord, StoredMessage, truncate_chars};

/// Cap on the stored body projection, in characters, unless overridden via
/// `MARS_STORE_BODY_MAX`.
pub const DEFAULT_STORE_BODY_MAX: usize = 400;

/// Read the store body cap from the environment (or `.env`).
///
/// Unset or unparsable values fall back to [`DEFAULT_STORE_BODY_MAX`].
pub fn store_body_max() -> usize {
    dotenvy::var("MARS_STORE_BODY_MAX")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_STORE_BODY_MAX)
}

/// Builder inputs.
#[derive(Debug, Clone)]
pub struct IndexOptions {
    /// Directory expected to contain `search.json`.
    pub input_dir: PathBuf,
    /// Site output root; the artifact lands under `<output_dir>/search/`.
    pub output_dir: PathBuf,
}

/// What a completed build produced, for logs and `--json` output.
#[derive(Debug, Clone, Serialize)]
pub struct BuildSummary {
    pub records: usize,
    pub distinct_tokens: usize,
    pub shards: usize,
    pub version: ArtifactVersion,
    pub artifact_dir: PathBuf,
    pub elapsed_ms: u64,
}

/// Per-record, per-field tokenization output.
struct FieldTokens {
    distinct: BTreeSet<String>,
    lead: Option<String>,
}

fn tokenize_record(record: &MessageRecord) -> [FieldTokens; 4] {
    Field::ALL.map(|field| {
        let tokens = tokenize(field.extract(record));
        FieldTokens {
            lead: tokens.first().cloned(),
            distinct: tokens.into_iter().collect(),
        }
    })
}

/// Fully built in-memory index, ready to serialize shard by shard.
///
/// Construction is deterministic: records are canonicalized to ascending id
/// order before hashing or tokenizing, so the same dataset always yields the
/// same shard bytes and the same [`ArtifactVersion`].
pub struct IndexedCorpus {
    registry: RegistryShard,
    store: StoreShard,
    configs: Vec<FieldConfig>,
    contexts: Vec<FieldContext>,
    maps: Vec<FieldMap>,
    version: ArtifactVersion,
    distinct_tokens: usize,
}

impl IndexedCorpus {
    /// Tokenize and invert `records` into the full shard set.
    ///
    /// Records sharing an id keep the first occurrence; the rest are dropped
    /// so the registry stays a strictly ascending id list.
    pub fn from_records(mut records: Vec<MessageRecord>) -> Result<Self> {
        records.sort_by_key(|r| r.id);
        let before = records.len();
        records.dedup_by_key(|r| r.id);
        if records.len() != before {
            tracing::warn!(dropped = before - records.len(), "duplicate_ids_dropped");
        }

        let store_body_max = store_body_max();
        let configs: Vec<FieldConfig> = Field::ALL.iter().map(|f| FieldConfig::for_field(*f)).collect();
        let version = content_version(&configs, store_body_max, &records)
            .context("hash dataset for artifact version")?;

        // Tokenization dominates build time on real datasets; fan it out and
        // keep the postings merge serial so ids are appended in record order.
        let tokenized: Vec<[FieldTokens; 4]> = records.par_iter().map(tokenize_record).collect();

        let mut contexts: Vec<FieldContext> =
            Field::ALL.iter().map(|_| FieldContext::default()).collect();
        let mut maps: Vec<FieldMap> = Field::ALL.iter().map(|_| FieldMap::default()).collect();
        for (record, fields) in records.iter().zip(&tokenized) {
            for (idx, tokens) in fields.iter().enumerate() {
                for token in &tokens.distinct {
                    maps[idx].postings.entry(token.clone()).or_default().push(record.id);
                }
                if let Some(lead) = &tokens.lead {
                    contexts[idx].lead.entry(lead.clone()).or_default().push(record.id);
                }
            }
        }

        let registry = RegistryShard { ids: records.iter().map(|r| r.id).collect() };
        let store = StoreShard {
            docs: records
                .iter()
                .map(|r| StoredMessage {
                    id: r.id,
                    page: r.page,
                    timestamp: r.timestamp,
                    user: r.user.clone(),
                    title: r.title.clone(),
                    body: truncate_chars(&r.body, store_body_max),
                })
                .collect(),
        };
        let distinct_tokens = maps.iter().map(|m| m.postings.len()).sum();

        Ok(Self { registry, store, configs, contexts, maps, version, distinct_tokens })
    }

    pub fn record_count(&self) -> usize {
        self.registry.ids.len()
    }

    /// Distinct token count summed across fields.
    pub fn distinct_tokens(&self) -> usize {
        self.distinct_tokens
    }

    pub fn version(&self) -> ArtifactVersion {
        self.version
    }

    /// Serialized payload for one shard of the fixed set.
    pub fn shard_bytes(&self, name: ShardName) -> Result<Vec<u8>, ShardError> {
        match name {
            ShardName::Registry => shard::encode_shard(name, &self.registry),
            ShardName::Store => shard::encode_shard(name, &self.store),
            ShardName::Field(field, FieldShard::Cfg) => {
                shard::encode_shard(name, &self.configs[field.ordinal()])
            }
            ShardName::Field(field, FieldShard::Ctx) => {
                shard::encode_shard(name, &self.contexts[field.ordinal()])
            }
            ShardName::Field(field, FieldShard::Map) => {
                shard::encode_shard(name, &self.maps[field.ordinal()])
            }
        }
    }
}

/// Read and parse the dataset, treating absence and malformed content as
/// "this deployment has no search".
fn load_dataset(input_dir: &Path) -> Option<Vec<MessageRecord>> {
    let path = input_dir.join(DATASET_FILE);
    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::debug!(path = %path.display(), error = %err, "dataset_absent");
            return None;
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(records) => Some(records),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "dataset_unparsable");
            None
        }
    }
}

/// Build the artifact from `<input>/search.json`.
///
/// Returns `Ok(None)` when the dataset is missing or unparsable; any existing
/// artifact is left untouched in that case. Write failures are fatal.
pub fn build_index(opts: &IndexOptions) -> Result<Option<BuildSummary>> {
    let started = Instant::now();
    let Some(records) = load_dataset(&opts.input_dir) else {
        return Ok(None);
    };
    let corpus = IndexedCorpus::from_records(records)?;
    let artifact_dir = write_artifact(&corpus, &opts.output_dir)?;
    let summary = BuildSummary {
        records: corpus.record_count(),
        distinct_tokens: corpus.distinct_tokens(),
        shards: ShardName::ALL.len(),
        version: corpus.version(),
        artifact_dir,
        elapsed_ms: started.elapsed().as_millis() as u64,
    };
    tracing::info!(
        records = summary.records,
        distinct_tokens = summary.distinct_tokens,
        version = %summary.version,
        elapsed_ms = summary.elapsed_ms,
        "index_built"
    );
    Ok(Some(summary))
}

/// Stage every shard, then swap the staged directory into place.
///
/// A failed write aborts before anything replaces the previous artifact. The
/// window between removing the old directory and renaming the new one can
/// only leave "no artifact", never a partial one.
fn write_artifact(corpus: &IndexedCorpus, output_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("create output directory {}", output_dir.display()))?;
    let staging = tempfile::Builder::new()
        .prefix(".search-staging-")
        .tempdir_in(output_dir)
        .context("create staging directory")?;

    for name in ShardName::ALL {
        let bytes = corpus.shard_bytes(name)?;
        let path = staging.path().join(name.file_name());
        fs::write(&path, &bytes).with_context(|| format!("write shard {name}"))?;
        tracing::debug!(shard = %name, bytes = bytes.len(), "shard_written");
    }

    let artifact_dir = output_dir.join(ARTIFACT_DIR);
    if artifact_dir.exists() {
        fs::remove_dir_all(&artifact_dir)
            .with_context(|| format!("clear previous artifact {}", artifact_dir.display()))?;
    }
    let staged = staging.keep();
    fs::rename(&staged, &artifact_dir)
        .with_context(|| format!("publish artifact to {}", artifact_dir.display()))?;
    Ok(artifact_dir)
}
