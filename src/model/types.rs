//! Archived message entities and search hit types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One message entry from the site generator's dataset file.
///
/// The dataset is trusted input, so parsing is lenient: text fields default
/// to empty, `page` to 1, and an absent or malformed timestamp falls back to
/// the Unix epoch. No single field can fail the whole dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Dataset-wide unique message id.
    #[serde(default)]
    pub id: u64,
    /// Archive page the message is rendered on (1-based).
    #[serde(default = "default_page")]
    pub page: u32,
    /// Posting instant, RFC 3339 in the dataset file.
    #[serde(default = "epoch", deserialize_with = "lenient_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub user: String,
    /// Optional author tag shown next to the user name.
    #[serde(default)]
    pub flair: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
}

fn default_page() -> u32 {
    1
}

fn epoch() -> DateTime<Utc> {
    DateTime::UNIX_EPOCH
}

/// Accept RFC 3339 strings; anything else degrades to the epoch instead of
/// failing the record.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(epoch))
}

/// Document-store projection of a message: everything needed to render a
/// suggestion without touching the postings again. `flair` is indexed but
/// deliberately not stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: u64,
    pub page: u32,
    pub timestamp: DateTime<Utc>,
    pub user: String,
    pub title: String,
    pub body: String,
}

impl StoredMessage {
    /// Navigation target for this message within the rendered archive.
    ///
    /// Page 1 lives at the site root, so its anchors omit the page segment.
    pub fn href(&self) -> String {
        if self.page <= 1 {
            format!("/#message-{}", self.id)
        } else {
            format!("/{}/#message-{}", self.page, self.id)
        }
    }
}

/// One enriched search hit, ready for the rendering layer.
///
/// `datetime` is the machine-readable RFC 3339 instant (for a `datetime`
/// attribute); `timestamp` is the fixed-format human display string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub href: String,
    pub user: String,
    pub datetime: String,
    pub timestamp: String,
    pub title: String,
    pub body: String,
}

impl Suggestion {
    pub fn from_stored(doc: &StoredMessage) -> Self {
        Self {
            href: doc.href(),
            user: doc.user.clone(),
            datetime: doc.timestamp.to_rfc3339(),
            timestamp: format_timestamp(&doc.timestamp),
            title: doc.title.clone(),
            body: doc.body.clone(),
        }
    }
}

/// Render an instant in the fixed display format, e.g. `20 Nov 2024, 10:00 UTC`.
///
/// Always UTC, independent of client locale, so builds and suggestion lists
/// are reproducible.
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%-d %b %Y, %H:%M UTC").to_string()
}

/// Truncate to at most `max_chars` characters, respecting char boundaries.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect()
    }
}
