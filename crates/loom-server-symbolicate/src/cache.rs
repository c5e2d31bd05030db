// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-process cache of fetched sources and decoded source maps.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use loom_crash_symbolicate::ParsedSourceMap;
use tokio::sync::Mutex;

use crate::config::SymbolicationConfig;

#[derive(Debug, Clone)]
struct Entry<V> {
	value: V,
	expires_at: Instant,
	last_used: Instant,
}

/// Map with a per-entry TTL and least-recently-used eviction at capacity.
#[derive(Debug)]
struct ExpiringMap<V> {
	entries: HashMap<String, Entry<V>>,
	capacity: usize,
	ttl: Duration,
}

impl<V: Clone> ExpiringMap<V> {
	fn new(capacity: usize, ttl: Duration) -> Self {
		Self {
			entries: HashMap::new(),
			capacity,
			ttl,
		}
	}

	fn get(&mut self, key: &str) -> Option<V> {
		let now = Instant::now();

		if let Some(entry) = self.entries.get_mut(key) {
			if entry.expires_at > now {
				entry.last_used = now;
				return Some(entry.value.clone());
			}
			self.entries.remove(key);
		}

		None
	}

	fn insert(&mut self, key: String, value: V) {
		if self.capacity == 0 {
			return;
		}

		if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
			self.evict_expired();
			if self.entries.len() >= self.capacity {
				self.evict_lru();
			}
		}

		let now = Instant::now();
		self.entries.insert(
			key,
			Entry {
				value,
				expires_at: now + self.ttl,
				last_used: now,
			},
		);
	}

	fn evict_expired(&mut self) {
		let now = Instant::now();
		self.entries.retain(|_, entry| entry.expires_at > now);
	}

	fn evict_lru(&mut self) {
		if let Some(oldest) = self
			.entries
			.iter()
			.min_by_key(|(_, entry)| entry.last_used)
			.map(|(key, _)| key.clone())
		{
			self.entries.remove(&oldest);
		}
	}

	fn len(&self) -> usize {
		self.entries.len()
	}
}

#[derive(Debug)]
struct Inner {
	sources: ExpiringMap<Bytes>,
	source_maps: ExpiringMap<Arc<ParsedSourceMap>>,
}

/// Cache shared by every frame an enhancer processes, keyed by resolved
/// location.
///
/// Raw source bytes and decoded source maps are held in separate maps, each
/// bounded by `capacity`. A capacity of 0 disables caching.
#[derive(Debug)]
pub struct ArtifactCache {
	inner: Mutex<Inner>,
}

impl ArtifactCache {
	pub fn new(capacity: usize, ttl: Duration) -> Self {
		Self {
			inner: Mutex::new(Inner {
				sources: ExpiringMap::new(capacity, ttl),
				source_maps: ExpiringMap::new(capacity, ttl),
			}),
		}
	}

	pub fn from_config(config: &SymbolicationConfig) -> Self {
		Self::new(config.cache_capacity, config.cache_ttl())
	}

	pub async fn get_source(&self, location: &str) -> Option<Bytes> {
		self.inner.lock().await.sources.get(location)
	}

	pub async fn insert_source(&self, location: &str, data: Bytes) {
		self.inner
			.lock()
			.await
			.sources
			.insert(location.to_string(), data);
	}

	pub async fn get_source_map(&self, location: &str) -> Option<Arc<ParsedSourceMap>> {
		self.inner.lock().await.source_maps.get(location)
	}

	pub async fn insert_source_map(&self, location: &str, source_map: Arc<ParsedSourceMap>) {
		self.inner
			.lock()
			.await
			.source_maps
			.insert(location.to_string(), source_map);
	}

	/// Number of cached sources and source maps.
	pub async fn entry_counts(&self) -> (usize, usize) {
		let inner = self.inner.lock().await;
		(inner.sources.len(), inner.source_maps.len())
	}
}

impl Default for ArtifactCache {
	fn default() -> Self {
		Self::from_config(&SymbolicationConfig::default())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const MAP: &str = r#"{"version":3,"sources":["a.ts"],"names":[],"mappings":"AAAA"}"#;

	fn source_map() -> Arc<ParsedSourceMap> {
		Arc::new(MAP.parse().unwrap())
	}

	#[test]
	fn test_expiring_map_lru_eviction() {
		let mut map = ExpiringMap::new(2, Duration::from_secs(60));
		map.insert("a".to_string(), 1);
		map.insert("b".to_string(), 2);

		std::thread::sleep(Duration::from_millis(2));
		assert_eq!(map.get("a"), Some(1));

		map.insert("c".to_string(), 3);
		assert_eq!(map.len(), 2);
		assert_eq!(map.get("a"), Some(1));
		assert_eq!(map.get("b"), None);
		assert_eq!(map.get("c"), Some(3));
	}

	#[test]
	fn test_expiring_map_overwrite_does_not_evict() {
		let mut map = ExpiringMap::new(2, Duration::from_secs(60));
		map.insert("a".to_string(), 1);
		map.insert("b".to_string(), 2);
		map.insert("a".to_string(), 10);

		assert_eq!(map.len(), 2);
		assert_eq!(map.get("a"), Some(10));
		assert_eq!(map.get("b"), Some(2));
	}

	#[test]
	fn test_expiring_map_ttl() {
		let mut map = ExpiringMap::new(4, Duration::ZERO);
		map.insert("a".to_string(), 1);
		assert_eq!(map.get("a"), None);
		assert_eq!(map.len(), 0);
	}

	#[tokio::test]
	async fn test_sources_roundtrip() {
		let cache = ArtifactCache::default();
		assert!(cache.get_source("/tmp/app.js").await.is_none());

		cache
			.insert_source("/tmp/app.js", Bytes::from_static(b"var a;"))
			.await;
		assert_eq!(
			cache.get_source("/tmp/app.js").await,
			Some(Bytes::from_static(b"var a;"))
		);
	}

	#[tokio::test]
	async fn test_source_maps_are_shared() {
		let cache = ArtifactCache::default();
		let map = source_map();
		cache.insert_source_map("/tmp/app.js.map", map.clone()).await;

		let cached = cache.get_source_map("/tmp/app.js.map").await.unwrap();
		assert!(Arc::ptr_eq(&map, &cached));
		assert_eq!(cache.entry_counts().await, (0, 1));
	}

	#[tokio::test]
	async fn test_zero_capacity_disables_cache() {
		let cache = ArtifactCache::new(0, Duration::from_secs(60));
		cache.insert_source("a", Bytes::from_static(b"x")).await;
		cache.insert_source_map("a.map", source_map()).await;

		assert!(cache.get_source("a").await.is_none());
		assert!(cache.get_source_map("a.map").await.is_none());
		assert_eq!(cache.entry_counts().await, (0, 0));
	}
}
