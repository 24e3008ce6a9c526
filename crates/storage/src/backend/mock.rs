//! In-memory repository for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

use crate::backend::{ResourceRepository, validate_key, validate_put};
use crate::codec;
use crate::error::Result;
use crate::models::Record;

type Key = (String, String);

/// In-memory repository for testing.
///
/// Records are stored encoded, exactly as the real backends store them, in a
/// `HashMap` behind a [`RwLock`]. Counters expose how many calls reached the
/// repository and how many of the writes actually changed a payload, so
/// idempotence can be asserted.
///
/// # Examples
///
/// ```
/// use themer_storage::{Preset, backend::{MockRepository, ResourceRepository}};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let preset = Preset { name: "default".into(), items: vec!["app.css".into()], appendable: false };
/// let repo = MockRepository::with_records([("main", preset.clone())]);
/// repo.put("main", "default", &preset.into()).await?;
/// assert_eq!(repo.writes(), 1);
/// assert_eq!(repo.mutations(), 0);
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct MockRepository {
    storage: RwLock<HashMap<Key, String>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
    mutations: AtomicUsize,
}

impl MockRepository {
    /// Create a repository pre-populated with records.
    ///
    /// Panics if a record cannot be encoded or its key is invalid. If test
    /// setup is wrong, then test should not pass.
    pub fn with_records(records: impl IntoIterator<Item = (impl Into<String>, impl Into<Record>)>) -> Self {
        let mut map = HashMap::new();
        for (theme, record) in records {
            let theme = theme.into();
            let record = record.into();
            let name = record.name().to_string();
            let (Ok(()), Ok(payload)) = (validate_key(&theme, &name), codec::encode(&record)) else {
                panic!("MockRepository::with_records: invalid record ({theme}, {name})");
            };
            map.insert((theme, name), payload);
        }
        Self { storage: RwLock::new(map), ..Default::default() }
    }

    /// Number of `get` calls, including those made through `resource` and
    /// `preset`.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of `put` calls.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of `put` and `delete` calls that changed what is stored.
    pub fn mutations(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.storage.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.storage.read().await.is_empty()
    }
}

#[async_trait]
impl ResourceRepository for MockRepository {
    fn name(&self) -> &str {
        "mock"
    }

    async fn get(&self, theme: &str, name: &str) -> Result<Option<Record>> {
        validate_key(theme, name)?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        let guard = self.storage.read().await;
        guard.get(&(theme.to_string(), name.to_string())).map(String::as_str).map(codec::decode).transpose()
    }

    async fn put(&self, theme: &str, name: &str, record: &Record) -> Result<()> {
        validate_put(theme, name, record)?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        let payload = codec::encode(record)?;
        let previous = self.storage.write().await.insert((theme.to_string(), name.to_string()), payload.clone());
        if previous.as_deref() != Some(payload.as_str()) {
            self.mutations.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn delete(&self, theme: &str, name: &str) -> Result<()> {
        validate_key(theme, name)?;
        if self.storage.write().await.remove(&(theme.to_string(), name.to_string())).is_some() {
            self.mutations.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}
