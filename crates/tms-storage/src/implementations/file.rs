//! File-based storage backend.
//!
//! Persists every value as one file under a configured directory. Keys are
//! sanitized into file names; the namespace separator maps to a double
//! underscore so that prefix scans can be answered from the directory
//! listing alone.

use crate::{StorageError, StorageInterface};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

/// File-based storage implementation.
pub struct FileStorage {
	base_path: PathBuf,
}

impl FileStorage {
	/// Creates a FileStorage rooted at the given directory.
	///
	/// The directory is created on first write if it does not exist.
	pub fn new(base_path: impl AsRef<Path>) -> Self {
		Self {
			base_path: base_path.as_ref().to_path_buf(),
		}
	}

	fn file_path(&self, key: &str) -> PathBuf {
		self.base_path.join(Self::encode_key(key))
	}

	fn encode_key(key: &str) -> String {
		key.replace(':', "__")
	}

	fn decode_key(file_name: &str) -> String {
		file_name.replace("__", ":")
	}

	async fn ensure_dir(&self) -> Result<(), StorageError> {
		fs::create_dir_all(&self.base_path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))
	}
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		match fs::read(self.file_path(key)).await {
			Ok(bytes) => Ok(bytes),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		self.ensure_dir().await?;
		let path = self.file_path(key);
		// Write to a temp file first, then rename for atomic replacement.
		let tmp = path.with_extension("tmp");
		fs::write(&tmp, &value)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		fs::rename(&tmp, &path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		match fs::remove_file(self.file_path(key)).await {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		Ok(fs::try_exists(self.file_path(key))
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?)
	}

	async fn keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
		let mut entries = match fs::read_dir(&self.base_path).await {
			Ok(entries) => entries,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
			Err(e) => return Err(StorageError::Backend(e.to_string())),
		};
		let mut keys = Vec::new();
		while let Some(entry) = entries
			.next_entry()
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?
		{
			let name = entry.file_name().to_string_lossy().into_owned();
			if name.ends_with(".tmp") {
				continue;
			}
			let key = Self::decode_key(&name);
			if key.starts_with(prefix) {
				keys.push(key);
			}
		}
		Ok(keys)
	}
}
