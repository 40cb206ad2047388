//! Guard run before a transport unit is deleted.
//!
//! A unit must not disappear while orders still reference it. The guard
//! sweeps the unit's orders in three passes: active orders are canceled and
//! unlinked, completed and canceled orders are unlinked with an annotation.
//! Only when an active order cannot be canceled does the guard veto the
//! removal, and it does so after finishing all three passes so the unit is
//! never left half cleaned.

use async_trait::async_trait;
use std::sync::Arc;
use tms_storage::OrderStore;
use tms_types::{codes, Message, TransportOrder, TransportOrderState};
use tracing::{info, warn};

use crate::state::StateMachine;
use crate::translate::MessageTranslator;
use crate::ServiceError;

/// The guard's narrow view onto cancellation validation.
#[async_trait]
trait CancelValidator: Send + Sync {
	async fn validate_cancel(
		&self,
		order: &mut TransportOrder,
	) -> Result<TransportOrderState, ServiceError>;
}

#[async_trait]
impl CancelValidator for StateMachine {
	async fn validate_cancel(
		&self,
		order: &mut TransportOrder,
	) -> Result<TransportOrderState, ServiceError> {
		self.validate(order, Some(TransportOrderState::Canceled)).await
	}
}

pub struct TransportUnitRemovalGuard {
	store: Arc<OrderStore>,
	state_machine: Arc<dyn CancelValidator>,
	translator: Arc<dyn MessageTranslator>,
}

impl TransportUnitRemovalGuard {
	pub fn new(
		store: Arc<OrderStore>,
		state_machine: Arc<StateMachine>,
		translator: Arc<dyn MessageTranslator>,
	) -> Self {
		Self {
			store,
			state_machine,
			translator,
		}
	}

	/// Cleans up every order of the unit; returns `RemovalNotAllowed` when
	/// an active order refused cancellation.
	///
	/// The caller must abort the unit deletion on error. Storage failures
	/// propagate immediately.
	pub async fn pre_remove(&self, unit_bk: &str) -> Result<(), ServiceError> {
		let denied = self.cancel_active(unit_bk).await?;
		self.unlink(
			unit_bk,
			&[
				TransportOrderState::Finished,
				TransportOrderState::OnFailure,
			],
		)
		.await?;
		self.unlink(unit_bk, &[TransportOrderState::Canceled]).await?;

		if denied {
			return Err(ServiceError::RemovalNotAllowed {
				unit_bk: unit_bk.to_owned(),
			});
		}
		info!(unit = %unit_bk, "TransportUnit cleaned up for removal");
		Ok(())
	}

	/// First pass: cancel CREATED and INITIALIZED orders and unlink them.
	///
	/// A state-machine rejection is recorded as a problem on the offending
	/// order and turns the whole guard into a veto, but the sweep continues.
	async fn cancel_active(&self, unit_bk: &str) -> Result<bool, ServiceError> {
		let orders = self
			.store
			.find_by_unit_and_states(
				unit_bk,
				&[
					TransportOrderState::Created,
					TransportOrderState::Initialized,
				],
			)
			.await?;

		let mut denied = false;
		for mut order in orders {
			match self.state_machine.validate_cancel(&mut order).await {
				Ok(validated) => {
					order.state = validated;
					order.problem = Some(self.removal_problem(
						codes::TO_CANCELED_BY_REMOVAL,
						unit_bk,
						&order,
					));
					order.transport_unit_bk = None;
					info!(pkey = %order.pkey, "Active TransportOrder canceled before unit removal");
				}
				Err(ServiceError::StateChange { code, message, .. }) => {
					warn!(pkey = %order.pkey, %message, "Could not cancel TransportOrder, vetoing removal");
					order.problem = Some(Message::new(code, message));
					denied = true;
				}
				Err(other) => return Err(other),
			}
			self.store
				.save(&mut order)
				.await
				.map_err(|e| ServiceError::from_storage(&order.pkey, e))?;
		}
		Ok(denied)
	}

	/// Unlinks finished business: the order keeps its state, loses the unit
	/// reference and gets an informational problem.
	async fn unlink(
		&self,
		unit_bk: &str,
		states: &[TransportOrderState],
	) -> Result<(), ServiceError> {
		let orders = self.store.find_by_unit_and_states(unit_bk, states).await?;
		for mut order in orders {
			order.problem = Some(self.removal_problem(
				codes::TO_UNLINKED_BY_REMOVAL,
				unit_bk,
				&order,
			));
			order.transport_unit_bk = None;
			self.store
				.save(&mut order)
				.await
				.map_err(|e| ServiceError::from_storage(&order.pkey, e))?;
		}
		Ok(())
	}

	fn removal_problem(&self, code: &'static str, unit_bk: &str, order: &TransportOrder) -> Message {
		Message::new(
			code,
			self.translator.translate(code, &[unit_bk, &order.pkey]),
		)
	}
}
