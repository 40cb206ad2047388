//! Transport order lifecycle core.
//!
//! This crate provides the orchestration logic around transport orders: the
//! ranked state machine, the ordered update pipeline applying partial change
//! requests, the redirect voting protocol for mid-flight target changes, the
//! transportation service as the public entry point and the removal guard
//! that cleans up orders before a transport unit is deleted.

use thiserror::Error;
use tms_storage::StorageError;

pub mod builder;
pub mod event_bus;
pub mod pipeline;
pub mod removal;
pub mod service;
pub mod startup;
pub mod state;
pub mod targets;
pub mod translate;
pub mod voting;

pub use builder::TransportationServiceBuilder;
pub use event_bus::EventBus;
pub use removal::TransportUnitRemovalGuard;
pub use service::TransportationService;
pub use state::StateMachine;
pub use targets::{TargetResolver, UnitRegistry};
pub use translate::{DefaultTranslator, MessageTranslator};
pub use voting::{DecisionVoter, RedirectVote, TargetAvailabilityVoter};

/// Errors raised by the lifecycle core.
///
/// Every variant carries a stable machine-readable code or the persisted
/// key(s) involved, so the surrounding transport layer can map errors to
/// responses without parsing message text.
#[derive(Debug, Error)]
pub enum ServiceError {
	/// A malformed or incomplete request, rejected before any mutation.
	#[error("{message}")]
	Validation {
		code: &'static str,
		message: String,
	},
	/// An illegal state transition per the state machine rules.
	#[error("{message}")]
	StateChange {
		code: &'static str,
		pkey: String,
		message: String,
	},
	/// The redirect voting protocol completed without full approval.
	#[error("TransportOrder [{pkey}] couldn't be redirected to a new target")]
	RedirectDenied {
		code: &'static str,
		pkey: String,
	},
	/// An order or referenced unit/target does not exist.
	#[error("[{pkey}] not found")]
	NotFound { pkey: String },
	/// The optimistic-version check failed on persist; retryable.
	#[error("Version conflict on TransportOrder [{pkey}]")]
	Conflict { pkey: String },
	/// Removal of a transport unit is not allowed because its orders could
	/// not be cleaned up.
	#[error("Not allowed to remove TransportUnit [{unit_bk}], orders could not be canceled")]
	RemovalNotAllowed { unit_bk: String },
	/// The storage backend failed.
	#[error("Storage error: {0}")]
	Storage(String),
}

impl ServiceError {
	/// Maps a storage failure for a known persisted key into the typed
	/// error taxonomy.
	pub(crate) fn from_storage(pkey: &str, err: StorageError) -> Self {
		match err {
			StorageError::NotFound => ServiceError::NotFound { pkey: pkey.into() },
			StorageError::Conflict { .. } => ServiceError::Conflict { pkey: pkey.into() },
			other => ServiceError::Storage(other.to_string()),
		}
	}
}

impl From<StorageError> for ServiceError {
	fn from(err: StorageError) -> Self {
		ServiceError::Storage(err.to_string())
	}
}
