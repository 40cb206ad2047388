//! Assembly of a [`TransportationService`] from configuration.

use std::sync::Arc;
use tms_config::{Config, StorageBackend};
use tms_storage::implementations::{file::FileStorage, memory::MemoryStorage};
use tms_storage::{OrderStore, StorageInterface, StorageService};
use tracing::info;

use crate::event_bus::EventBus;
use crate::service::TransportationService;
use crate::targets::{TargetResolver, UnitRegistry};
use crate::translate::{DefaultTranslator, MessageTranslator};
use crate::voting::DecisionVoter;
use crate::ServiceError;

/// Builds a [`TransportationService`] from a [`Config`] plus the
/// deployment-supplied collaborators.
///
/// The unit registry is the only mandatory collaborator. Resolvers and
/// voters are optional; without voters the default target-availability
/// voter over the registered resolvers is installed.
pub struct TransportationServiceBuilder {
	config: Config,
	units: Option<Arc<dyn UnitRegistry>>,
	resolvers: Vec<Arc<dyn TargetResolver>>,
	voters: Vec<Arc<dyn DecisionVoter>>,
	translator: Arc<dyn MessageTranslator>,
}

impl TransportationServiceBuilder {
	pub fn new(config: Config) -> Self {
		Self {
			config,
			units: None,
			resolvers: Vec::new(),
			voters: Vec::new(),
			translator: Arc::new(DefaultTranslator),
		}
	}

	pub fn with_unit_registry(mut self, units: Arc<dyn UnitRegistry>) -> Self {
		self.units = Some(units);
		self
	}

	/// Registers a target resolver. Resolvers are queried in registration
	/// order; the first one claiming a target wins.
	pub fn with_resolver(mut self, resolver: Arc<dyn TargetResolver>) -> Self {
		self.resolvers.push(resolver);
		self
	}

	pub fn with_voter(mut self, voter: Arc<dyn DecisionVoter>) -> Self {
		self.voters.push(voter);
		self
	}

	pub fn with_translator(mut self, translator: Arc<dyn MessageTranslator>) -> Self {
		self.translator = translator;
		self
	}

	pub fn build(self) -> Result<TransportationService, ServiceError> {
		let units = self.units.ok_or_else(|| ServiceError::Validation {
			code: tms_types::codes::TO_INVALID_REQUEST,
			message: "A unit registry is required to build the TransportationService".into(),
		})?;

		let backend: Box<dyn StorageInterface> = match self.config.storage.backend {
			StorageBackend::Memory => Box::new(MemoryStorage::new()),
			StorageBackend::File => {
				let path =
					self.config
						.storage
						.path
						.as_ref()
						.ok_or_else(|| ServiceError::Validation {
							code: tms_types::codes::TO_INVALID_REQUEST,
							message: "storage.path is required for the file backend".into(),
						})?;
				Box::new(FileStorage::new(path))
			}
		};
		info!(backend = ?self.config.storage.backend, "Assembling TransportationService");

		let store = Arc::new(OrderStore::new(StorageService::new(backend)));
		Ok(TransportationService::new(
			store,
			units,
			self.resolvers,
			self.voters,
			self.translator,
			EventBus::default(),
		))
	}
}
