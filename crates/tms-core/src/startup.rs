//! Best-effort startup of freshly created orders.
//!
//! After an order is persisted in CREATED state, the service tries to push
//! it forward: initialize it once it is complete, and start it once the
//! target resolves to an incoming-active location the unit is not already
//! resting on. Any refusal leaves the order in its highest reached state;
//! startup never fails the create call.

use std::sync::Arc;
use tms_storage::OrderStore;
use tms_types::{codes, Target, TransportOrder, TransportOrderState};
use tracing::{debug, info};

use crate::state::StateMachine;
use crate::targets::{TargetResolver, UnitRegistry};
use crate::ServiceError;

pub(crate) struct Startup {
	store: Arc<OrderStore>,
	units: Arc<dyn UnitRegistry>,
	resolvers: Vec<Arc<dyn TargetResolver>>,
	state_machine: Arc<StateMachine>,
}

impl Startup {
	pub(crate) fn new(
		store: Arc<OrderStore>,
		units: Arc<dyn UnitRegistry>,
		resolvers: Vec<Arc<dyn TargetResolver>>,
		state_machine: Arc<StateMachine>,
	) -> Self {
		Self {
			store,
			units,
			resolvers,
			state_machine,
		}
	}

	/// Tries to initialize and start the order, swallowing refusals.
	pub(crate) async fn attempt(&self, order: &mut TransportOrder) {
		if let Err(e) = self.initialize(order).await {
			debug!(pkey = %order.pkey, error = %e, "Order stays CREATED");
			return;
		}
		if let Err(e) = self.start(order).await {
			debug!(pkey = %order.pkey, error = %e, "Order stays INITIALIZED");
		}
	}

	async fn initialize(&self, order: &mut TransportOrder) -> Result<(), ServiceError> {
		let validated = self
			.state_machine
			.validate(order, Some(TransportOrderState::Initialized))
			.await?;
		order.state = validated;
		self.store
			.save(order)
			.await
			.map_err(|e| ServiceError::from_storage(&order.pkey, e))?;
		Ok(())
	}

	async fn start(&self, order: &mut TransportOrder) -> Result<(), ServiceError> {
		let target_id = order
			.target_location_group
			.clone()
			.or_else(|| order.target_location.clone())
			.ok_or_else(|| ServiceError::NotFound {
				pkey: order.pkey.clone(),
			})?;
		let target = self.resolve(&target_id).await?;

		if target.is_incoming_blocked() {
			return Err(ServiceError::StateChange {
				code: codes::TARGET_BLOCKED,
				pkey: order.pkey.clone(),
				message: format!(
					"Cannot start TransportOrder [{}] because target [{}] is blocked",
					order.pkey,
					target.id()
				),
			});
		}
		// Starting toward a location group needs routing to a concrete
		// location first; that is a downstream mover's call.
		let Target::Location(location) = &target else {
			return Ok(());
		};
		let bk = order
			.transport_unit_bk
			.as_deref()
			.unwrap_or_default()
			.to_owned();
		let unit = self
			.units
			.get_unit(&bk)
			.await?
			.ok_or_else(|| ServiceError::NotFound { pkey: bk.clone() })?;
		if unit.actual_location.as_deref() == Some(location.id.as_str()) {
			debug!(pkey = %order.pkey, "Unit already rests on the target location");
			return Ok(());
		}

		let validated = self
			.state_machine
			.validate(order, Some(TransportOrderState::Started))
			.await?;
		order.state = validated;
		self.store
			.save(order)
			.await
			.map_err(|e| ServiceError::from_storage(&order.pkey, e))?;
		info!(
			pkey = %order.pkey,
			unit = %bk,
			target = %location.id,
			"TransportOrder STARTED"
		);
		Ok(())
	}

	async fn resolve(&self, target_id: &str) -> Result<Target, ServiceError> {
		for resolver in &self.resolvers {
			if let Some(target) = resolver.resolve(target_id).await? {
				return Ok(target);
			}
		}
		Err(ServiceError::NotFound {
			pkey: target_id.to_owned(),
		})
	}
}
