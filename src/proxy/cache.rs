//! API 响应缓存
//!
//! 仅缓存 `CacheableApi` 类响应的有界 TTL 存储。过期条目按未命中处理，
//! 不主动清除，等待后续写入覆盖。容量满时淘汰最早插入的条目——
//! 按插入顺序而非访问顺序，命中不会延长条目寿命。

use std::sync::Mutex;
use std::time::{Duration, Instant};

use bytes::Bytes;
use indexmap::IndexMap;

use crate::config::ProxyConfig;

struct CacheEntry {
    content_type: Option<String>,
    body: Bytes,
    inserted_at: Instant,
}

/// 进程级共享的响应缓存。锁只在 get/put 内短暂持有，
/// 从不跨越 await 点，媒体直通热路径完全不触碰它。
pub struct ResponseCache {
    entries: Mutex<IndexMap<String, CacheEntry>>,
    max_entries: usize,
    manifest_ttl: Duration,
    metadata_ttl: Duration,
}

impl ResponseCache {
    pub fn new(max_entries: usize, manifest_ttl: Duration, metadata_ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(IndexMap::new()),
            max_entries,
            manifest_ttl,
            metadata_ttl,
        }
    }

    pub fn from_config(config: &ProxyConfig) -> Self {
        Self::new(
            config.cache_max_entries,
            Duration::from_secs(config.cache_ttl_manifest_secs),
            Duration::from_secs(config.cache_ttl_metadata_secs),
        )
    }

    /// 清单相邻的 key 用短 TTL（上游令牌过期快），其余用长 TTL
    fn ttl_for(&self, key: &str) -> Duration {
        if key.contains(".m3u8") {
            self.manifest_ttl
        } else {
            self.metadata_ttl
        }
    }

    /// 查询缓存；过期条目等同未命中（不删除，留待覆盖）
    pub fn get(&self, key: &str) -> Option<(Option<String>, Bytes)> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let entry = entries.get(key)?;
        if entry.inserted_at.elapsed() > self.ttl_for(key) {
            return None;
        }
        Some((entry.content_type.clone(), entry.body.clone()))
    }

    /// 写入缓存；容量已满且为新 key 时先淘汰最早插入的条目
    pub fn put(&self, key: String, content_type: Option<String>, body: Bytes) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if !entries.contains_key(&key) && entries.len() >= self.max_entries {
            entries.shift_remove_index(0);
        }
        entries.insert(
            key,
            CacheEntry {
                content_type,
                body,
                inserted_at: Instant::now(),
            },
        );
    }

    /// 当前条目数（含已过期未覆盖的条目）
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(max: usize) -> ResponseCache {
        ResponseCache::new(max, Duration::from_millis(10), Duration::from_secs(60))
    }

    #[test]
    fn test_hit_and_miss() {
        let cache = cache(10);
        assert!(cache.get("http://h.tv/player_api.php").is_none());

        cache.put(
            "http://h.tv/player_api.php".into(),
            Some("application/json".into()),
            Bytes::from_static(b"{}"),
        );

        let (ct, body) = cache.get("http://h.tv/player_api.php").unwrap();
        assert_eq!(ct.as_deref(), Some("application/json"));
        assert_eq!(&body[..], b"{}");
        assert!(cache.get("http://h.tv/other").is_none());
    }

    #[test]
    fn test_expired_entry_behaves_as_miss_but_stays() {
        let cache = cache(10);
        // .m3u8 key 走 10ms 的短 TTL
        cache.put("http://h.tv/x.m3u8".into(), None, Bytes::from_static(b"a"));
        assert!(cache.get("http://h.tv/x.m3u8").is_some());

        std::thread::sleep(Duration::from_millis(25));
        assert!(cache.get("http://h.tv/x.m3u8").is_none());
        // 过期后条目仍占位，等待覆盖
        assert_eq!(cache.len(), 1);

        cache.put("http://h.tv/x.m3u8".into(), None, Bytes::from_static(b"b"));
        let (_, body) = cache.get("http://h.tv/x.m3u8").unwrap();
        assert_eq!(&body[..], b"b");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_eviction_is_insertion_order() {
        let cache = cache(2);
        cache.put("k1".into(), None, Bytes::from_static(b"1"));
        cache.put("k2".into(), None, Bytes::from_static(b"2"));

        // 访问 k1 不能保护它不被淘汰
        assert!(cache.get("k1").is_some());

        cache.put("k3".into(), None, Bytes::from_static(b"3"));
        assert!(cache.get("k1").is_none());
        assert!(cache.get("k2").is_some());
        assert!(cache.get("k3").is_some());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_overwrite_does_not_evict() {
        let cache = cache(2);
        cache.put("k1".into(), None, Bytes::from_static(b"1"));
        cache.put("k2".into(), None, Bytes::from_static(b"2"));

        // 覆盖已有 key 不触发淘汰
        cache.put("k2".into(), None, Bytes::from_static(b"2b"));
        assert!(cache.get("k1").is_some());
        let (_, body) = cache.get("k2").unwrap();
        assert_eq!(&body[..], b"2b");
        assert_eq!(cache.len(), 2);
    }
}
