//! Transport order state machine.
//!
//! Pure decision logic mapping (current state, requested state, order
//! attributes) to allowed or rejected-with-reason, plus the timestamps that
//! accompany a transition. The machine validates and stamps but never
//! assigns the state itself; the caller commits `state = requested` after a
//! successful validation.

use chrono::Utc;
use std::sync::Arc;
use tms_storage::OrderStore;
use tms_types::{codes, TransportOrder, TransportOrderState};
use tracing::debug;

use crate::translate::MessageTranslator;
use crate::ServiceError;

/// Validates state transitions of transport orders.
///
/// The "no second STARTED order per unit" invariant is a plain read-check
/// against the order store at transition time; without a serializable
/// transaction around the caller there is a narrow race window between the
/// check and the persist.
pub struct StateMachine {
	store: Arc<OrderStore>,
	translator: Arc<dyn MessageTranslator>,
}

impl StateMachine {
	pub fn new(store: Arc<OrderStore>, translator: Arc<dyn MessageTranslator>) -> Self {
		Self { store, translator }
	}

	/// Validates the requested transition and stamps the transition
	/// timestamps on success.
	///
	/// Returns the validated state for the caller to assign. `start_date`
	/// is stamped only on the first entry into STARTED; `end_date` on
	/// entering any terminal state.
	pub async fn validate(
		&self,
		order: &mut TransportOrder,
		new_state: Option<TransportOrderState>,
	) -> Result<TransportOrderState, ServiceError> {
		let current = order.state;
		debug!(
			pkey = %order.pkey,
			from = %current,
			to = ?new_state,
			"Request for state change"
		);

		let new_state = new_state.ok_or_else(|| ServiceError::Validation {
			code: codes::TO_STATE_CHANGE_NULL_STATE,
			message: self
				.translator
				.translate(codes::TO_STATE_CHANGE_NULL_STATE, &[&order.pkey]),
		})?;

		if current.is_terminal() {
			return Err(self.state_error(codes::TO_STATE_CHANGE_ALREADY_COMPLETED, order, &[]));
		}
		if new_state.rank() < current.rank() {
			return Err(self.state_error(codes::TO_STATE_CHANGE_BACKWARDS_NOT_ALLOWED, order, &[]));
		}

		match current {
			TransportOrderState::Created => {
				if new_state != TransportOrderState::Initialized
					&& new_state != TransportOrderState::Canceled
				{
					let requested = new_state.to_string();
					return Err(self.state_error(
						codes::TO_STATE_CHANGE_NOT_READY,
						order,
						&[&requested],
					));
				}
				if new_state == TransportOrderState::Initialized && !self.is_complete(order) {
					return Err(self.state_error(codes::TO_STATE_CHANGE_INCOMPLETE, order, &[]));
				}
			}
			TransportOrderState::Initialized => {
				if new_state != TransportOrderState::Started
					&& new_state != TransportOrderState::Canceled
					&& new_state != TransportOrderState::OnFailure
				{
					return Err(self.state_error(
						codes::STATE_CHANGE_ERROR_FOR_INITIALIZED_TO,
						order,
						&[],
					));
				}
				if new_state == TransportOrderState::Started {
					self.assert_no_started_order(order).await?;
				}
			}
			// Any forward state is legal from here on.
			TransportOrderState::Started | TransportOrderState::Interrupted => {}
			// Terminal states were rejected above.
			TransportOrderState::OnFailure
			| TransportOrderState::Canceled
			| TransportOrderState::Finished => {}
		}

		match new_state {
			TransportOrderState::Started => {
				if order.start_date.is_none() {
					order.start_date = Some(Utc::now());
				}
			}
			s if s.is_terminal() => order.end_date = Some(Utc::now()),
			_ => {}
		}

		debug!(pkey = %order.pkey, state = %new_state, "Request processed");
		Ok(new_state)
	}

	/// A CREATED order may only be initialized once the unit and at least
	/// one target are assigned.
	fn is_complete(&self, order: &TransportOrder) -> bool {
		order
			.transport_unit_bk
			.as_deref()
			.is_some_and(|bk| !bk.trim().is_empty())
			&& order.has_target()
	}

	async fn assert_no_started_order(&self, order: &TransportOrder) -> Result<(), ServiceError> {
		let bk = order.transport_unit_bk.as_deref().unwrap_or_default();
		let started = self
			.store
			.find_by_unit_and_states(bk, &[TransportOrderState::Started])
			.await
			.map_err(|e| ServiceError::from_storage(&order.pkey, e))?;
		if started.is_empty() {
			Ok(())
		} else {
			Err(self.state_error(
				codes::START_TO_NOT_ALLOWED_ALREADY_STARTED_ONE,
				order,
				&[bk],
			))
		}
	}

	fn state_error(
		&self,
		code: &'static str,
		order: &TransportOrder,
		extra_args: &[&str],
	) -> ServiceError {
		let mut args: Vec<&str> = extra_args.to_vec();
		args.push(&order.pkey);
		ServiceError::StateChange {
			code,
			pkey: order.pkey.clone(),
			message: self.translator.translate(code, &args),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::translate::DefaultTranslator;
	use tms_storage::implementations::memory::MemoryStorage;
	use tms_storage::StorageService;
	use tms_types::TransportOrderState::*;

	fn machine_with_store() -> (StateMachine, Arc<OrderStore>) {
		let store = Arc::new(OrderStore::new(StorageService::new(Box::new(
			MemoryStorage::new(),
		))));
		(
			StateMachine::new(store.clone(), Arc::new(DefaultTranslator)),
			store,
		)
	}

	fn initialized_order(bk: &str) -> TransportOrder {
		let mut order = TransportOrder::new(bk);
		order.target_location = Some("LOC1".into());
		order.state = Initialized;
		order
	}

	fn code_of(err: ServiceError) -> &'static str {
		match err {
			ServiceError::StateChange { code, .. } => code,
			ServiceError::Validation { code, .. } => code,
			other => panic!("unexpected error: {other:?}"),
		}
	}

	#[tokio::test]
	async fn test_null_state_is_rejected() {
		let (machine, _) = machine_with_store();
		let mut order = TransportOrder::new("4711");
		let err = machine.validate(&mut order, None).await.unwrap_err();
		assert_eq!(code_of(err), codes::TO_STATE_CHANGE_NULL_STATE);
	}

	#[tokio::test]
	async fn test_backwards_transitions_are_rejected() {
		let (machine, _) = machine_with_store();
		let pairs = [
			(Initialized, Created),
			(Started, Initialized),
			(Started, Created),
			(Interrupted, Started),
			(Interrupted, Initialized),
		];
		for (from, to) in pairs {
			let mut order = TransportOrder::new("4711");
			order.state = from;
			let err = machine.validate(&mut order, Some(to)).await.unwrap_err();
			assert_eq!(
				code_of(err),
				codes::TO_STATE_CHANGE_BACKWARDS_NOT_ALLOWED,
				"{from:?} -> {to:?}"
			);
		}
	}

	#[tokio::test]
	async fn test_terminal_states_reject_everything() {
		let (machine, _) = machine_with_store();
		for from in [Finished, Canceled, OnFailure] {
			for to in [
				Created,
				Initialized,
				Started,
				Interrupted,
				OnFailure,
				Canceled,
				Finished,
			] {
				let mut order = TransportOrder::new("4711");
				order.state = from;
				let err = machine.validate(&mut order, Some(to)).await.unwrap_err();
				assert_eq!(
					code_of(err),
					codes::TO_STATE_CHANGE_ALREADY_COMPLETED,
					"{from:?} -> {to:?}"
				);
			}
		}
	}

	#[tokio::test]
	async fn test_created_allows_only_initialized_and_canceled() {
		let (machine, _) = machine_with_store();
		for to in [Started, Interrupted, OnFailure, Finished] {
			let mut order = TransportOrder::new("4711");
			order.target_location = Some("LOC1".into());
			let err = machine.validate(&mut order, Some(to)).await.unwrap_err();
			assert_eq!(code_of(err), codes::TO_STATE_CHANGE_NOT_READY, "{to:?}");
		}
	}

	#[tokio::test]
	async fn test_initialize_requires_unit_and_target() {
		let (machine, _) = machine_with_store();

		// Unit set, no target.
		let mut order = TransportOrder::new("4711");
		let err = machine
			.validate(&mut order, Some(Initialized))
			.await
			.unwrap_err();
		assert_eq!(code_of(err), codes::TO_STATE_CHANGE_INCOMPLETE);

		// Either target field alone is enough.
		let mut order = TransportOrder::new("4711");
		order.target_location = Some("LOC1".into());
		assert_eq!(
			machine.validate(&mut order, Some(Initialized)).await.unwrap(),
			Initialized
		);

		let mut order = TransportOrder::new("4711");
		order.target_location_group = Some("GROUP1".into());
		assert_eq!(
			machine.validate(&mut order, Some(Initialized)).await.unwrap(),
			Initialized
		);

		// No unit at all.
		let mut order = TransportOrder::new("4711");
		order.transport_unit_bk = None;
		order.target_location = Some("LOC1".into());
		let err = machine
			.validate(&mut order, Some(Initialized))
			.await
			.unwrap_err();
		assert_eq!(code_of(err), codes::TO_STATE_CHANGE_INCOMPLETE);
	}

	#[tokio::test]
	async fn test_canceling_an_incomplete_created_order_is_allowed() {
		let (machine, _) = machine_with_store();
		let mut order = TransportOrder::new("4711");
		assert_eq!(
			machine.validate(&mut order, Some(Canceled)).await.unwrap(),
			Canceled
		);
		assert!(order.end_date.is_some());
	}

	#[tokio::test]
	async fn test_start_blocked_while_another_order_is_started() {
		let (machine, store) = machine_with_store();

		let mut blocking = initialized_order("4711");
		blocking.state = Started;
		store.insert(&blocking).await.unwrap();

		let mut order = initialized_order("4711");
		store.insert(&order).await.unwrap();
		let err = machine
			.validate(&mut order, Some(Started))
			.await
			.unwrap_err();
		assert_eq!(code_of(err), codes::START_TO_NOT_ALLOWED_ALREADY_STARTED_ONE);

		// After the blocking order leaves STARTED the same attempt succeeds.
		blocking.state = Finished;
		store.save(&mut blocking).await.unwrap();
		assert_eq!(
			machine.validate(&mut order, Some(Started)).await.unwrap(),
			Started
		);
	}

	#[tokio::test]
	async fn test_started_allows_any_forward_state() {
		let (machine, _) = machine_with_store();
		for to in [Interrupted, OnFailure, Canceled, Finished] {
			let mut order = initialized_order("4711");
			order.state = Started;
			assert_eq!(machine.validate(&mut order, Some(to)).await.unwrap(), to);
		}
	}

	#[tokio::test]
	async fn test_timestamps_are_stamped_on_transition() {
		let (machine, _) = machine_with_store();

		let mut order = initialized_order("4711");
		let created_at = order.created_at;
		machine.validate(&mut order, Some(Started)).await.unwrap();
		order.state = Started;
		assert!(order.start_date.is_some());
		assert!(order.start_date.unwrap() >= created_at);
		assert!(order.end_date.is_none());

		machine.validate(&mut order, Some(Finished)).await.unwrap();
		order.state = Finished;
		assert!(order.end_date.is_some());
	}

	#[tokio::test]
	async fn test_initialized_and_interrupted_stamp_nothing() {
		let (machine, _) = machine_with_store();

		let mut order = TransportOrder::new("4711");
		order.target_location = Some("LOC1".into());
		machine.validate(&mut order, Some(Initialized)).await.unwrap();
		assert!(order.start_date.is_none());
		assert!(order.end_date.is_none());

		let mut order = initialized_order("4711");
		order.state = Started;
		machine.validate(&mut order, Some(Interrupted)).await.unwrap();
		assert!(order.start_date.is_none());
		assert!(order.end_date.is_none());
	}

	#[tokio::test]
	async fn test_start_date_is_stamped_only_once() {
		let (machine, _) = machine_with_store();
		let mut order = initialized_order("4711");
		order.state = Started;
		let stamped = Utc::now();
		order.start_date = Some(stamped);
		machine.validate(&mut order, Some(Started)).await.unwrap();
		assert_eq!(order.start_date, Some(stamped));
	}
}
