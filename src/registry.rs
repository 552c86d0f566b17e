use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::RegistryError;

/// The registered feed sources plus companion website URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceList {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub feeds: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub websites: Vec<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Shapes the backing document is accepted in. Older files are a bare list of
/// feed URLs.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredDocument {
    Bare(Vec<String>),
    Object(SourceList),
}

impl From<StoredDocument> for SourceList {
    fn from(doc: StoredDocument) -> Self {
        match doc {
            StoredDocument::Bare(feeds) => SourceList {
                feeds,
                websites: Vec::new(),
            },
            StoredDocument::Object(list) => list,
        }
    }
}

/// File-backed list of feed sources.
///
/// Readers share the lock; every mutation holds the write lock across its
/// read-modify-write and installs the new document with an atomic rename, so
/// a reader never sees a partially written list.
pub struct SourceRegistry {
    path: PathBuf,
    lock: RwLock<()>,
}

impl SourceRegistry {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            lock: RwLock::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn list(&self) -> Result<SourceList, RegistryError> {
        let _guard = self.lock.read().await;
        self.read_document().await
    }

    pub async fn feeds(&self) -> Result<Vec<String>, RegistryError> {
        Ok(self.list().await?.feeds)
    }

    pub async fn replace(
        &self,
        feeds: Vec<String>,
        websites: Vec<String>,
    ) -> Result<(), RegistryError> {
        let _guard = self.lock.write().await;
        info!(
            "Replacing registry with {} feeds and {} websites",
            feeds.len(),
            websites.len()
        );
        self.write_document(&SourceList { feeds, websites }).await
    }

    /// Returns `false` without touching the document if `url` is already registered.
    pub async fn add(&self, url: &str) -> Result<bool, RegistryError> {
        let _guard = self.lock.write().await;
        let mut list = self.read_document().await?;

        if list.feeds.iter().any(|f| f == url) {
            warn!("Feed already registered: {}", url);
            return Ok(false);
        }

        list.feeds.push(url.to_string());
        self.write_document(&list).await?;
        info!("Added feed: {}", url);
        Ok(true)
    }

    /// Returns `false` without touching the document if `url` is not registered.
    pub async fn remove(&self, url: &str) -> Result<bool, RegistryError> {
        let _guard = self.lock.write().await;
        let mut list = self.read_document().await?;

        let before = list.feeds.len();
        list.feeds.retain(|f| f != url);
        if list.feeds.len() == before {
            warn!("Feed not registered: {}", url);
            return Ok(false);
        }

        self.write_document(&list).await?;
        info!("Removed feed: {}", url);
        Ok(true)
    }

    async fn read_document(&self) -> Result<SourceList, RegistryError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("Registry file {} not found, using empty registry", self.path.display());
                return Ok(SourceList::default());
            }
            Err(e) => return Err(e.into()),
        };

        Ok(parse_document(&bytes).unwrap_or_else(|e| {
            warn!(
                "Registry file {} is malformed ({}), using empty registry",
                self.path.display(),
                e
            );
            SourceList::default()
        }))
    }

    async fn write_document(&self, list: &SourceList) -> Result<(), RegistryError> {
        let body = serde_json::to_vec_pretty(list)?;
        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn parse_document(bytes: &[u8]) -> Result<SourceList, serde_json::Error> {
    serde_json::from_slice::<StoredDocument>(bytes).map(SourceList::from)
}
