//! Storage module for the transport order management system.
//!
//! This crate provides abstractions for persisting transport orders and
//! their problem history, supporting different backend implementations
//! such as in-memory or file-based storage.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

pub mod implementations {
	pub mod file;
	pub mod memory;
}

mod orders;

pub use orders::OrderStore;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	/// A requested item is not found.
	#[error("Not found")]
	NotFound,
	/// The persisted version does not match the caller's copy. The caller
	/// may reload and retry.
	#[error("Version conflict: expected {expected}, found {found}")]
	Conflict { expected: u64, found: u64 },
	/// Serialization or deserialization failed.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// The storage backend failed.
	#[error("Backend error: {0}")]
	Backend(String),
}

/// Trait defining the low-level interface for storage backends.
///
/// Backends provide plain key-value byte operations plus a prefix scan
/// that the typed layer uses for the order queries.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Retrieves raw bytes for the given key.
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError>;

	/// Stores raw bytes under the given key.
	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

	/// Deletes the value associated with the given key.
	async fn delete(&self, key: &str) -> Result<(), StorageError>;

	/// Checks if a key exists in storage.
	async fn exists(&self, key: &str) -> Result<bool, StorageError>;

	/// Returns all keys starting with the given prefix.
	async fn keys(&self, prefix: &str) -> Result<Vec<String>, StorageError>;
}

/// High-level storage service that provides typed operations.
///
/// Wraps a low-level backend and adds JSON serialization. The namespace and
/// id are combined into a unique key.
pub struct StorageService {
	backend: Box<dyn StorageInterface>,
}

impl StorageService {
	/// Creates a new StorageService with the specified backend.
	pub fn new(backend: Box<dyn StorageInterface>) -> Self {
		Self { backend }
	}

	/// Stores a serializable value.
	pub async fn store<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		let key = format!("{}:{}", namespace, id);
		let bytes =
			serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.backend.set_bytes(&key, bytes).await
	}

	/// Retrieves and deserializes a value from storage.
	pub async fn retrieve<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<T, StorageError> {
		let key = format!("{}:{}", namespace, id);
		let bytes = self.backend.get_bytes(&key).await?;
		serde_json::from_slice(&bytes).map_err(|e| StorageError::Serialization(e.to_string()))
	}

	/// Removes a value from storage.
	pub async fn remove(&self, namespace: &str, id: &str) -> Result<(), StorageError> {
		let key = format!("{}:{}", namespace, id);
		self.backend.delete(&key).await
	}

	/// Checks if a value exists in storage.
	pub async fn exists(&self, namespace: &str, id: &str) -> Result<bool, StorageError> {
		let key = format!("{}:{}", namespace, id);
		self.backend.exists(&key).await
	}

	/// Retrieves and deserializes every value within a namespace.
	pub async fn retrieve_all<T: DeserializeOwned>(
		&self,
		namespace: &str,
	) -> Result<Vec<T>, StorageError> {
		let prefix = format!("{}:", namespace);
		let keys = self.backend.keys(&prefix).await?;
		let mut values = Vec::with_capacity(keys.len());
		for key in keys {
			let bytes = self.backend.get_bytes(&key).await?;
			let value = serde_json::from_slice(&bytes)
				.map_err(|e| StorageError::Serialization(e.to_string()))?;
			values.push(value);
		}
		Ok(values)
	}
}
