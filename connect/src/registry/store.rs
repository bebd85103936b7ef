//! Key-value storage behind the registry

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::errors::ConnectError;
use crate::filesys::dir::Dir;
use crate::filesys::file::File;

/// Durable string storage keyed by name
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, ConnectError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), ConnectError>;
}

/// One file per key inside a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: Dir,
}

impl FileStore {
    pub fn new(dir: Dir) -> Self {
        Self { dir }
    }

    /// File holding `key`; characters outside `[A-Za-z0-9_-]` become `_`
    pub fn file_for(&self, key: &str) -> File {
        let name: String = key
            .trim_start_matches('@')
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.file(&format!("{}.json", name))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, ConnectError> {
        let file = self.file_for(key);
        if !file.exists().await {
            return Ok(None);
        }
        Ok(Some(file.read_string().await?))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), ConnectError> {
        self.dir.create().await?;
        self.file_for(key).write_atomic(value.as_bytes()).await
    }
}

/// Process-local store, lost on exit
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, ConnectError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), ConnectError> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
