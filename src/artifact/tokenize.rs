//! Shared tokenizer for build-time indexing and query-time evaluation.
//!
//! The builder and the query runtime must tokenize identically or recall
//! silently degrades: a token indexed one way can never be found another way.
//! Both sides therefore call this one implementation, and the policy
//! identifier below is embedded in every field config shard so a runtime can
//! refuse an artifact produced under a different policy.
//!
//! The policy itself is deliberately small: case-fold, then split on
//! non-alphanumeric boundaries. Prefix matching ("forward" semantics) happens
//! at lookup time against the sorted token map, not by expanding prefixes at
//! index time.

/// Tokenizer policy identifier carried in each `f.cfg` shard.
pub const TOKENIZE_POLICY: &str = "forward";

/// Split text into normalized tokens.
///
/// Case-folds the whole input, then splits on every non-alphanumeric
/// character. Tokens are returned in text order and duplicates are kept;
/// callers that need a distinct set de-duplicate themselves.
///
/// ```
/// use message_archive_search::artifact::tokenize::tokenize;
///
/// assert_eq!(tokenize("Hello, world!"), vec!["hello", "world"]);
/// assert_eq!(tokenize("re-subscribed 2024"), vec!["re", "subscribed", "2024"]);
/// ```
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
