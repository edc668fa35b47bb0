//! 内存缓存与空缓存

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::cache::{CacheError, CachedPayload, Fingerprint, TaskCache};

/// 进程内缓存
#[derive(Debug, Default)]
pub struct InMemoryTaskCache {
    entries: RwLock<HashMap<Fingerprint, CachedPayload>>,
}

impl InMemoryTaskCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl TaskCache for InMemoryTaskCache {
    async fn get(&self, fingerprint: &Fingerprint) -> Result<Option<CachedPayload>, CacheError> {
        Ok(self.entries.read().await.get(fingerprint).cloned())
    }

    async fn put(&self, fingerprint: Fingerprint, payload: CachedPayload) -> Result<(), CacheError> {
        self.entries.write().await.insert(fingerprint, payload);
        Ok(())
    }
}

/// 关闭缓存时使用：永远未命中，写入被丢弃
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTaskCache;

#[async_trait]
impl TaskCache for NoopTaskCache {
    async fn get(&self, _fingerprint: &Fingerprint) -> Result<Option<CachedPayload>, CacheError> {
        Ok(None)
    }

    async fn put(&self, _fingerprint: Fingerprint, _payload: CachedPayload) -> Result<(), CacheError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheKind;
    use crate::inference::LocateResponse;

    #[tokio::test]
    async fn test_put_then_get() {
        let cache = InMemoryTaskCache::new();
        let fp = Fingerprint::compute(CacheKind::Locate, &["ok button"], "sig");
        assert!(cache.get(&fp).await.unwrap().is_none());

        let payload = CachedPayload::Locate(LocateResponse {
            element_id: Some("e7".into()),
            ..Default::default()
        });
        cache.put(fp.clone(), payload.clone()).await.unwrap();
        assert_eq!(cache.get(&fp).await.unwrap(), Some(payload));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_noop_never_hits() {
        let cache = NoopTaskCache;
        let fp = Fingerprint::compute(CacheKind::Plan, &["x"], "sig");
        cache
            .put(fp.clone(), CachedPayload::Plan(Default::default()))
            .await
            .unwrap();
        assert!(cache.get(&fp).await.unwrap().is_none());
    }
}
