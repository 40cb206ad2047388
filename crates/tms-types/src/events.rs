//! Lifecycle events emitted by the transportation service.
//!
//! Events are fire-and-forget notifications toward downstream consumers;
//! the core never waits for acknowledgement.

use serde::{Deserialize, Serialize};

use crate::TransportOrderState;

/// The kinds of lifecycle events the service publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportEventKind {
	/// A transport order has been created.
	Created,
	/// A transport order has been interrupted.
	Interrupted,
	/// A transport order failed.
	OnFailure,
	/// A transport order has been canceled.
	Canceled,
	/// A transport order has been finished.
	Finished,
}

impl TransportEventKind {
	/// Maps an entered state to the event kind to publish, if any.
	///
	/// Entering INITIALIZED or STARTED is internal chaining and carries no
	/// outward event.
	pub fn from_state(state: TransportOrderState) -> Option<Self> {
		match state {
			TransportOrderState::Interrupted => Some(TransportEventKind::Interrupted),
			TransportOrderState::OnFailure => Some(TransportEventKind::OnFailure),
			TransportOrderState::Canceled => Some(TransportEventKind::Canceled),
			TransportOrderState::Finished => Some(TransportEventKind::Finished),
			_ => None,
		}
	}
}

/// A lifecycle event for one transport order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportServiceEvent {
	/// Persisted key of the order the event refers to.
	pub order_pkey: String,
	/// What happened.
	pub kind: TransportEventKind,
}

impl TransportServiceEvent {
	pub fn new(order_pkey: impl Into<String>, kind: TransportEventKind) -> Self {
		Self {
			order_pkey: order_pkey.into(),
			kind,
		}
	}
}
