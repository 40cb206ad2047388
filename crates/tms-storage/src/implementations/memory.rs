//! In-memory storage backend.
//!
//! Stores data in a HashMap behind a read-write lock, providing fast
//! access but no persistence across restarts. Primarily for testing and
//! development scenarios.

use crate::{StorageError, StorageInterface};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory storage implementation.
pub struct MemoryStorage {
	store: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryStorage {
	/// Creates a new MemoryStorage instance.
	pub fn new() -> Self {
		Self {
			store: Arc::new(RwLock::new(HashMap::new())),
		}
	}
}

impl Default for MemoryStorage {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl StorageInterface for MemoryStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let store = self.store.read().await;
		store.get(key).cloned().ok_or(StorageError::NotFound)
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		let mut store = self.store.write().await;
		store.insert(key.to_string(), value);
		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		let mut store = self.store.write().await;
		store.remove(key);
		Ok(())
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		let store = self.store.read().await;
		Ok(store.contains_key(key))
	}

	async fn keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
		let store = self.store.read().await;
		Ok(store
			.keys()
			.filter(|k| k.starts_with(prefix))
			.cloned()
			.collect())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_basic_operations() {
		let storage = MemoryStorage::new();

		let key = "test_key";
		let value = b"test_value".to_vec();
		storage.set_bytes(key, value.clone()).await.unwrap();

		let retrieved = storage.get_bytes(key).await.unwrap();
		assert_eq!(retrieved, value);

		assert!(storage.exists(key).await.unwrap());

		storage.delete(key).await.unwrap();
		assert!(!storage.exists(key).await.unwrap());

		let result = storage.get_bytes(key).await;
		assert!(matches!(result, Err(StorageError::NotFound)));
	}

	#[tokio::test]
	async fn test_keys_prefix_scan() {
		let storage = MemoryStorage::new();

		storage.set_bytes("orders:1", b"a".to_vec()).await.unwrap();
		storage.set_bytes("orders:2", b"b".to_vec()).await.unwrap();
		storage
			.set_bytes("history:1", b"c".to_vec())
			.await
			.unwrap();

		let mut keys = storage.keys("orders:").await.unwrap();
		keys.sort();
		assert_eq!(keys, vec!["orders:1", "orders:2"]);
	}
}
