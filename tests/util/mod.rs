use message_archive_search::model::MessageRecord;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde_json::json;
use std::path::{Path, PathBuf};

/// Captures tracing output for tests.
#[allow(dead_code)]
pub struct TestTracing {
    buffer: std::sync::Arc<std::sync::Mutex<Vec<u8>>>,
}

#[allow(dead_code)]
impl TestTracing {
    pub fn new() -> Self {
        Self {
            buffer: std::sync::Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }

    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let writer = self.buffer.clone();
        let make_writer = move || TestWriter(writer.clone());
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .without_time()
            .with_writer(make_writer)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn output(&self) -> String {
        let buf = self.buffer.lock().unwrap();
        String::from_utf8_lossy(&buf).to_string()
    }

    /// Assert that the captured log output contains the provided substring.
    pub fn assert_contains(&self, needle: &str) {
        let out = self.output();
        assert!(
            out.contains(needle),
            "expected logs to contain `{needle}`, got:\n{out}"
        );
    }
}

struct TestWriter(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

impl std::io::Write for TestWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut guard = self.0.lock().unwrap();
        guard.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[allow(dead_code)]
pub struct EnvGuard {
    key: String,
    prev: Option<String>,
}

#[allow(dead_code)]
impl EnvGuard {
    pub fn set(key: &str, val: impl AsRef<str>) -> Self {
        let prev = std::env::var(key).ok();
        unsafe { std::env::set_var(key, val.as_ref()) };
        Self {
            key: key.to_string(),
            prev,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        match &self.prev {
            Some(v) => unsafe { std::env::set_var(&self.key, v) },
            None => unsafe { std::env::remove_var(&self.key) },
        }
    }
}

/// Fluent builder for one dataset record.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct RecordFixture {
    id: u64,
    page: u32,
    timestamp: String,
    user: String,
    flair: Option<String>,
    title: String,
    body: String,
}

#[allow(dead_code)]
impl RecordFixture {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            page: 1,
            timestamp: "2024-11-20T10:00:00Z".into(),
            user: format!("user-{id}"),
            flair: None,
            title: String::new(),
            body: String::new(),
        }
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn timestamp(mut self, ts: impl Into<String>) -> Self {
        self.timestamp = ts.into();
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    pub fn flair(mut self, flair: impl Into<String>) -> Self {
        self.flair = Some(flair.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn build(self) -> MessageRecord {
        serde_json::from_value(json!({
            "id": self.id,
            "page": self.page,
            "timestamp": self.timestamp,
            "user": self.user,
            "flair": self.flair,
            "title": self.title,
            "body": self.body,
        }))
        .expect("fixture record deserializes")
    }

    pub fn build_json(self) -> serde_json::Value {
        json!({
            "id": self.id,
            "page": self.page,
            "timestamp": self.timestamp,
            "user": self.user,
            "flair": self.flair,
            "title": self.title,
            "body": self.body,
        })
    }
}

/// Deterministic random dataset generator for property-style tests.
#[allow(dead_code)]
pub struct DatasetGenerator {
    rng: ChaCha8Rng,
}

#[allow(dead_code)]
impl DatasetGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    fn word(&mut self) -> &'static str {
        const WORDS: &[&str] = &[
            "archive", "message", "thread", "reply", "hello", "world", "search", "token",
            "sequoia", "lantern", "quartz", "violet", "ember", "harbor", "meadow", "pixel",
        ];
        WORDS[self.rng.gen_range(0..WORDS.len())]
    }

    fn phrase(&mut self, min_words: usize, max_words: usize) -> String {
        let count = self.rng.gen_range(min_words..=max_words);
        (0..count).map(|_| self.word()).collect::<Vec<_>>().join(" ")
    }

    /// Generate `count` records with ids `1..=count` spread over a few pages.
    pub fn records(&mut self, count: usize) -> Vec<MessageRecord> {
        (1..=count as u64)
            .map(|id| {
                let page = self.rng.gen_range(1..=4);
                let mut fixture = RecordFixture::new(id)
                    .page(page)
                    .user(format!("{}{}", self.word(), id))
                    .title(self.phrase(1, 4))
                    .body(self.phrase(3, 12));
                if self.rng.gen_bool(0.3) {
                    fixture = fixture.flair(self.word().to_string());
                }
                fixture.build()
            })
            .collect()
    }
}

/// Write `records` as a `search.json` dataset under `dir`.
#[allow(dead_code)]
pub fn write_dataset(dir: &Path, records: &[serde_json::Value]) -> PathBuf {
    let path = dir.join("search.json");
    std::fs::write(&path, serde_json::to_vec_pretty(records).expect("serialize dataset"))
        .expect("write dataset");
    path
}
