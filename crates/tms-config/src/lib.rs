//! Configuration for the transport order management system.
//!
//! Supports loading configuration from TOML files and validates that all
//! required values are properly set before any service is assembled.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// File I/O failed.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// TOML parsing failed.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// The configuration is structurally valid but carries illegal values.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		ConfigError::Parse(err.message().to_string())
	}
}

/// Supported storage backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
	Memory,
	File,
}

/// Configuration for the storage backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
	/// Which backend to use.
	pub backend: StorageBackend,
	/// Directory for the file backend. Ignored by the memory backend.
	pub path: Option<PathBuf>,
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
	/// Storage backend configuration.
	pub storage: StorageConfig,
}

impl Config {
	/// Loads and validates a configuration from a TOML file.
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let content = tokio::fs::read_to_string(path.as_ref()).await?;
		content.parse()
	}

	/// Validates invariants the type system cannot express.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.storage.backend == StorageBackend::File && self.storage.path.is_none() {
			return Err(ConfigError::Validation(
				"storage.path is required for the file backend".into(),
			));
		}
		Ok(())
	}
}

impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let config: Config = toml::from_str(s)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_memory_backend() {
		let config: Config = "[storage]\nbackend = \"memory\"\n".parse().unwrap();
		assert_eq!(config.storage.backend, StorageBackend::Memory);
		assert!(config.storage.path.is_none());
	}

	#[test]
	fn test_file_backend_requires_path() {
		let err = "[storage]\nbackend = \"file\"\n"
			.parse::<Config>()
			.unwrap_err();
		assert!(matches!(err, ConfigError::Validation(_)));

		let config: Config = "[storage]\nbackend = \"file\"\npath = \"/tmp/orders\"\n"
			.parse()
			.unwrap();
		assert_eq!(config.storage.backend, StorageBackend::File);
	}

	#[tokio::test]
	async fn test_load_from_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("tms.toml");
		tokio::fs::write(&path, "[storage]\nbackend = \"memory\"\n")
			.await
			.unwrap();
		let config = Config::from_file(&path).await.unwrap();
		assert_eq!(config.storage.backend, StorageBackend::Memory);
	}

	#[test]
	fn test_unknown_backend_is_a_parse_error() {
		let err = "[storage]\nbackend = \"redis\"\n"
			.parse::<Config>()
			.unwrap_err();
		assert!(matches!(err, ConfigError::Parse(_)));
	}
}
