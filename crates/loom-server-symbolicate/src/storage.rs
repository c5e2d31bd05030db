// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Object storage tier for fetched artifacts.
//!
//! Sources and source maps are stored under an [`ArtifactKey`] so a later
//! enhancement for the same project and version can skip the fetch.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use loom_crash_core::ArtifactKey;
use tokio::sync::RwLock;

use crate::error::StorageError;

/// Persistent store for raw artifact bytes.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
	async fn get(&self, key: &ArtifactKey) -> Result<Option<Bytes>, StorageError>;

	async fn put(&self, key: &ArtifactKey, data: Bytes) -> Result<(), StorageError>;
}

/// Store backed by a process-local map.
#[derive(Debug, Default)]
pub struct InMemoryArtifactStore {
	objects: RwLock<HashMap<String, Bytes>>,
}

impl InMemoryArtifactStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub async fn len(&self) -> usize {
		self.objects.read().await.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.objects.read().await.is_empty()
	}

	pub async fn contains(&self, key: &ArtifactKey) -> bool {
		self.objects.read().await.contains_key(&key.to_string())
	}
}

#[async_trait]
impl ArtifactStore for InMemoryArtifactStore {
	async fn get(&self, key: &ArtifactKey) -> Result<Option<Bytes>, StorageError> {
		Ok(self.objects.read().await.get(&key.to_string()).cloned())
	}

	async fn put(&self, key: &ArtifactKey, data: Bytes) -> Result<(), StorageError> {
		self.objects.write().await.insert(key.to_string(), data);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use loom_crash_core::ProjectId;

	#[tokio::test]
	async fn test_put_then_get() {
		let store = InMemoryArtifactStore::new();
		let key = ArtifactKey::new(ProjectId(1), Some("1.2.0"), "https://cdn.example.com/app.js");

		assert!(store.get(&key).await.unwrap().is_none());
		store
			.put(&key, Bytes::from_static(b"var a;"))
			.await
			.unwrap();

		assert_eq!(
			store.get(&key).await.unwrap(),
			Some(Bytes::from_static(b"var a;"))
		);
		assert!(store.contains(&key).await);
		assert_eq!(store.len().await, 1);
	}

	#[tokio::test]
	async fn test_keys_are_isolated_by_project_and_version() {
		let store = InMemoryArtifactStore::new();
		let location = "https://cdn.example.com/app.js";
		let v1 = ArtifactKey::new(ProjectId(1), Some("1.0.0"), location);
		let v2 = ArtifactKey::new(ProjectId(1), Some("2.0.0"), location);
		let other = ArtifactKey::new(ProjectId(2), Some("1.0.0"), location);

		store.put(&v1, Bytes::from_static(b"v1")).await.unwrap();

		assert!(store.get(&v2).await.unwrap().is_none());
		assert!(store.get(&other).await.unwrap().is_none());
	}

	#[tokio::test]
	async fn test_overwrite() {
		let store = InMemoryArtifactStore::new();
		let key = ArtifactKey::new(ProjectId(3), None, "./dist/app.js");

		store.put(&key, Bytes::from_static(b"old")).await.unwrap();
		store.put(&key, Bytes::from_static(b"new")).await.unwrap();

		assert_eq!(
			store.get(&key).await.unwrap(),
			Some(Bytes::from_static(b"new"))
		);
		assert_eq!(store.len().await, 1);
		assert!(!store.is_empty().await);
	}
}
