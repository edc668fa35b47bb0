//! 文件缓存：单个 JSON 文件，按 cache_id 隔离
//!
//! 打开时整体加载；每次 put 后整体重写。文件中的 cache_id 或版本与当前不一致时
//! 丢弃旧记录从空缓存开始，避免复用另一套脚本或旧版本生成的载荷。

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::cache::{CacheError, CachedPayload, Fingerprint, TaskCache};

#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    cache_id: String,
    version: String,
    records: BTreeMap<Fingerprint, CachedPayload>,
}

pub struct FileTaskCache {
    path: PathBuf,
    cache_id: String,
    records: RwLock<BTreeMap<Fingerprint, CachedPayload>>,
}

impl FileTaskCache {
    /// 打开（或新建）缓存文件；文件不存在时返回空缓存
    pub fn open(path: impl AsRef<Path>, cache_id: impl Into<String>) -> Result<Self, CacheError> {
        let path = path.as_ref().to_path_buf();
        let cache_id = cache_id.into();
        let records = Self::load(&path, &cache_id)?;
        tracing::debug!(path = %path.display(), cache_id = %cache_id, records = records.len(), "task cache opened");
        Ok(Self {
            path,
            cache_id,
            records: RwLock::new(records),
        })
    }

    fn load(path: &Path, cache_id: &str) -> Result<BTreeMap<Fingerprint, CachedPayload>, CacheError> {
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let data = std::fs::read_to_string(path)?;
        let file: CacheFile = serde_json::from_str(&data)?;
        if file.cache_id != cache_id || file.version != env!("CARGO_PKG_VERSION") {
            tracing::warn!(
                path = %path.display(),
                found_id = %file.cache_id,
                found_version = %file.version,
                "task cache belongs to another cache id or version, starting empty"
            );
            return Ok(BTreeMap::new());
        }
        Ok(file.records)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    async fn flush(&self, records: &BTreeMap<Fingerprint, CachedPayload>) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let file = CacheFile {
            cache_id: self.cache_id.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            records: records.clone(),
        };
        tokio::fs::write(&self.path, serde_json::to_string_pretty(&file)?).await?;
        Ok(())
    }
}

#[async_trait]
impl TaskCache for FileTaskCache {
    async fn get(&self, fingerprint: &Fingerprint) -> Result<Option<CachedPayload>, CacheError> {
        Ok(self.records.read().await.get(fingerprint).cloned())
    }

    async fn put(&self, fingerprint: Fingerprint, payload: CachedPayload) -> Result<(), CacheError> {
        let mut records = self.records.write().await;
        records.insert(fingerprint, payload);
        self.flush(&records).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheKind;
    use crate::inference::LocateResponse;

    fn payload(id: &str) -> CachedPayload {
        CachedPayload::Locate(LocateResponse {
            element_id: Some(id.to_string()),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_persists_across_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache").join("login.cache.json");
        let fp = Fingerprint::compute(CacheKind::Locate, &["login"], "sig");

        let cache = FileTaskCache::open(&path, "login-flow").unwrap();
        cache.put(fp.clone(), payload("e1")).await.unwrap();

        let reopened = FileTaskCache::open(&path, "login-flow").unwrap();
        assert_eq!(reopened.get(&fp).await.unwrap(), Some(payload("e1")));
    }

    #[tokio::test]
    async fn test_other_cache_id_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shared.cache.json");
        let fp = Fingerprint::compute(CacheKind::Locate, &["login"], "sig");

        let cache = FileTaskCache::open(&path, "a").unwrap();
        cache.put(fp.clone(), payload("e1")).await.unwrap();

        let other = FileTaskCache::open(&path, "b").unwrap();
        assert!(other.get(&fp).await.unwrap().is_none());
        assert_eq!(other.len().await, 0);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            FileTaskCache::open(&path, "x"),
            Err(CacheError::Serde(_))
        ));
    }
}
