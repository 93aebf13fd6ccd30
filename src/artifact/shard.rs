//! Shard contract between the index builder and the query runtime.
//!
//! The artifact is a closed set of independently fetched blobs: a `registry`
//! shard, a `store` shard, and a `cfg`/`ctx`/`map` triple per indexed field,
//! 14 shards in all. The name set is a compile-time constant on both sides;
//! no manifest is ever produced or transmitted. A runtime that cannot obtain
//! and validate the complete set treats the artifact as not loaded.
//!
//! Payloads are JSON. They are opaque to the hosting layer; only the builder
//! (encode) and the runtime (decode) interpret them.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::artifact::tokenize::TOKENIZE_POLICY;
use crate::model::{MessageRecord, StoredMessage};

/// Bumped whenever a shard payload changes shape. Carried in every field
/// config shard and checked at import so a stale runtime never evaluates
/// against a newer artifact.
pub const SHARD_FORMAT_VERSION: u32 = 1;

/// Indexed fields, in query priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    User,
    Flair,
    Title,
    Body,
}

impl Field {
    /// All indexed fields, highest priority first.
    pub const ALL: [Field; 4] = [Field::User, Field::Flair, Field::Title, Field::Body];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::User => "user",
            Field::Flair => "flair",
            Field::Title => "title",
            Field::Body => "body",
        }
    }

    /// Position within [`Field::ALL`].
    pub fn ordinal(&self) -> usize {
        match self {
            Field::User => 0,
            Field::Flair => 1,
            Field::Title => 2,
            Field::Body => 3,
        }
    }

    /// The text this field indexes from a record.
    pub fn extract<'a>(&self, record: &'a MessageRecord) -> &'a str {
        match self {
            Field::User => &record.user,
            Field::Flair => record.flair.as_deref().unwrap_or(""),
            Field::Title => &record.title,
            Field::Body => &record.body,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three per-field shard kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldShard {
    Cfg,
    Ctx,
    Map,
}

impl FieldShard {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldShard::Cfg => "cfg",
            FieldShard::Ctx => "ctx",
            FieldShard::Map => "map",
        }
    }
}

/// One name out of the closed shard set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShardName {
    Registry,
    Store,
    Field(Field, FieldShard),
}

impl ShardName {
    /// The complete shard set. Spelled out because this list *is* the wire
    /// contract; the test below pins every name.
    pub const ALL: [ShardName; 14] = [
        ShardName::Registry,
        ShardName::Store,
        ShardName::Field(Field::User, FieldShard::Cfg),
        ShardName::Field(Field::User, FieldShard::Ctx),
        ShardName::Field(Field::User, FieldShard::Map),
        ShardName::Field(Field::Flair, FieldShard::Cfg),
        ShardName::Field(Field::Flair, FieldShard::Ctx),
        ShardName::Field(Field::Flair, FieldShard::Map),
        ShardName::Field(Field::Title, FieldShard::Cfg),
        ShardName::Field(Field::Title, FieldShard::Ctx),
        ShardName::Field(Field::Title, FieldShard::Map),
        ShardName::Field(Field::Body, FieldShard::Cfg),
        ShardName::Field(Field::Body, FieldShard::Ctx),
        ShardName::Field(Field::Body, FieldShard::Map),
    ];

    /// File name (and URL path segment) for this shard.
    pub fn file_name(&self) -> String {
        match self {
            ShardName::Registry => "registry".to_string(),
            ShardName::Store => "store".to_string(),
            ShardName::Field(field, kind) => format!("{}.{}", field.as_str(), kind.as_str()),
        }
    }
}

impl fmt::Display for ShardName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_name())
    }
}

/// `registry` payload: ascending ids of every document in the artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryShard {
    pub ids: Vec<u64>,
}

/// `store` payload: the document store projection, ascending by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreShard {
    pub docs: Vec<StoredMessage>,
}

/// `f.cfg` payload: how field `f` was indexed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldConfig {
    pub version: u32,
    pub field: String,
    pub tokenize: String,
}

impl FieldConfig {
    pub fn for_field(field: Field) -> Self {
        Self {
            version: SHARD_FORMAT_VERSION,
            field: field.as_str().to_string(),
            tokenize: TOKENIZE_POLICY.to_string(),
        }
    }

    /// Reject configs produced under a different format version, field name,
    /// or tokenizer policy. Any mismatch means the artifact and this runtime
    /// would disagree on token boundaries or payload shape.
    pub fn validate(&self, expected: Field) -> Result<(), ShardError> {
        let name = ShardName::Field(expected, FieldShard::Cfg);
        if self.version != SHARD_FORMAT_VERSION {
            return Err(ShardError::Contract {
                name,
                reason: format!(
                    "format version {} does not match supported version {}",
                    self.version, SHARD_FORMAT_VERSION
                ),
            });
        }
        if self.field != expected.as_str() {
            return Err(ShardError::Contract {
                name,
                reason: format!("config names field {:?}, expected {:?}", self.field, expected.as_str()),
            });
        }
        if self.tokenize != TOKENIZE_POLICY {
            return Err(ShardError::Contract {
                name,
                reason: format!(
                    "tokenizer policy {:?} does not match {:?}",
                    self.tokenize, TOKENIZE_POLICY
                ),
            });
        }
        Ok(())
    }
}

/// `f.ctx` payload: leading-token postings. For each token, the ascending
/// ids of documents whose field *starts* with that token. Always a subset of
/// the field map; used to rank opening matches ahead of interior ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldContext {
    pub lead: BTreeMap<String, Vec<u64>>,
}

/// `f.map` payload: full postings, token to ascending ids of documents whose
/// field contains the token anywhere.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMap {
    pub postings: BTreeMap<String, Vec<u64>>,
}

/// Encode one shard payload to its wire bytes.
pub fn encode_shard<T: Serialize>(name: ShardName, payload: &T) -> Result<Vec<u8>, ShardError> {
    serde_json::to_vec(payload).map_err(|source| ShardError::Encode { name, source })
}

/// Decode one shard payload from wire bytes.
pub fn decode_shard<T: DeserializeOwned>(name: ShardName, bytes: &[u8]) -> Result<T, ShardError> {
    serde_json::from_slice(bytes).map_err(|source| ShardError::Decode { name, source })
}

#[derive(Debug, Error)]
pub enum ShardError {
    #[error("failed to encode {name} shard: {source}")]
    Encode {
        name: ShardName,
        source: serde_json::Error,
    },
    #[error("failed to decode {name} shard: {source}")]
    Decode {
        name: ShardName,
        source: serde_json::Error,
    },
    #[error("{name} shard rejected: {reason}")]
    Contract { name: ShardName, reason: String },
}
