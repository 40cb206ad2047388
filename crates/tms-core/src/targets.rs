//! Collaborator interfaces toward master data owned elsewhere.
//!
//! Units, locations and location groups are not managed by this core; they
//! are consumed through these narrow traits.

use async_trait::async_trait;
use tms_types::{Target, TransportOrderState, TransportUnit};

use crate::ServiceError;

/// Resolves a string target identifier into a concrete target.
///
/// Multiple resolvers can be registered; they are queried in registration
/// order and the first one claiming the target wins.
#[async_trait]
pub trait TargetResolver: Send + Sync {
	/// Resolves the identifier, or returns `None` if this resolver does not
	/// know it.
	async fn resolve(&self, target_id: &str) -> Result<Option<Target>, ServiceError>;

	/// Counts the orders currently en route to the given target, filtered
	/// by state. An empty filter matches all states.
	async fn count_orders_to_target(
		&self,
		target: &Target,
		states: &[TransportOrderState],
	) -> Result<usize, ServiceError>;
}

/// External registry owning the transport units.
#[async_trait]
pub trait UnitRegistry: Send + Sync {
	/// Looks up a unit by business key.
	async fn get_unit(&self, bk: &str) -> Result<Option<TransportUnit>, ServiceError>;

	/// Writes back a modified unit.
	async fn update_unit(&self, unit: TransportUnit) -> Result<(), ServiceError>;
}
