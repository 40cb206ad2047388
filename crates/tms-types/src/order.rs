//! Transport order entity and its lifecycle state.
//!
//! A transport order moves a transport unit from its current location to a
//! target. The order is created in CREATED state and advances through a
//! ranked state machine; terminal orders are retained for audit and never
//! physically deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Message;

/// Lifecycle state of a transport order, strictly ranked.
///
/// Transitions only move forward along the rank order; CANCELED and
/// ONFAILURE are sibling terminal states both reachable directly from
/// STARTED. FINISHED, CANCELED and ONFAILURE are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransportOrderState {
	Created,
	Initialized,
	Started,
	Interrupted,
	OnFailure,
	Canceled,
	Finished,
}

impl TransportOrderState {
	/// Numeric rank used for the forward-only transition rule.
	pub fn rank(&self) -> u32 {
		match self {
			TransportOrderState::Created => 10,
			TransportOrderState::Initialized => 20,
			TransportOrderState::Started => 30,
			TransportOrderState::Interrupted => 40,
			TransportOrderState::OnFailure => 50,
			TransportOrderState::Canceled => 60,
			TransportOrderState::Finished => 70,
		}
	}

	/// Whether no further state change is accepted from this state.
	pub fn is_terminal(&self) -> bool {
		matches!(
			self,
			TransportOrderState::Finished
				| TransportOrderState::Canceled
				| TransportOrderState::OnFailure
		)
	}
}

impl fmt::Display for TransportOrderState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			TransportOrderState::Created => "CREATED",
			TransportOrderState::Initialized => "INITIALIZED",
			TransportOrderState::Started => "STARTED",
			TransportOrderState::Interrupted => "INTERRUPTED",
			TransportOrderState::OnFailure => "ONFAILURE",
			TransportOrderState::Canceled => "CANCELED",
			TransportOrderState::Finished => "FINISHED",
		};
		write!(f, "{}", s)
	}
}

/// Priority level of a transport order.
///
/// The level affects execution ordering by downstream movers, not the
/// lifecycle bookkeeping itself.
#[derive(
	Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriorityLevel {
	Lowest,
	Low,
	#[default]
	Normal,
	High,
	Highest,
}

/// The central entity: an order to transport a unit to a target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportOrder {
	/// Persisted key, opaque and stable once created.
	pub pkey: String,
	/// Business key of the transport unit to move. Only `None` while the
	/// order is unlinked from a removed unit.
	pub transport_unit_bk: Option<String>,
	/// Priority level, defaults to NORMAL.
	pub priority: PriorityLevel,
	/// Current lifecycle state.
	pub state: TransportOrderState,
	/// Source location, set before the order is started.
	pub source_location: Option<String>,
	/// Target location. At least one target must be set before the order
	/// can leave CREATED.
	pub target_location: Option<String>,
	/// Target location group, the alternative target kind.
	pub target_location_group: Option<String>,
	/// Set exactly once, on entering STARTED.
	pub start_date: Option<DateTime<Utc>>,
	/// Set exactly once, on entering a terminal state.
	pub end_date: Option<DateTime<Utc>>,
	/// Last reported problem, if any.
	pub problem: Option<Message>,
	/// Timestamp when the order was created.
	pub created_at: DateTime<Utc>,
	/// Optimistic-concurrency version counter, bumped on every persist.
	pub version: u64,
}

impl TransportOrder {
	/// Creates a new order in CREATED state for the given unit.
	pub fn new(transport_unit_bk: impl Into<String>) -> Self {
		Self {
			pkey: uuid::Uuid::new_v4().to_string(),
			transport_unit_bk: Some(transport_unit_bk.into()),
			priority: PriorityLevel::default(),
			state: TransportOrderState::Created,
			source_location: None,
			target_location: None,
			target_location_group: None,
			start_date: None,
			end_date: None,
			problem: None,
			created_at: Utc::now(),
			version: 0,
		}
	}

	/// Whether a problem is currently reported on this order.
	pub fn has_problem(&self) -> bool {
		self.problem.is_some()
	}

	/// Whether at least one of the two target fields is set.
	pub fn has_target(&self) -> bool {
		self.target_location.is_some() || self.target_location_group.is_some()
	}
}

/// Requested change applied to the problem field of an order.
///
/// A dedicated type keeps "clear the problem" distinct from "leave the
/// problem untouched".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProblemChange {
	/// Report a (possibly new) problem.
	Report(Message),
	/// Clear the currently reported problem.
	Clear,
}

/// A partial change request against a persisted transport order.
///
/// Every `None` field is left untouched by the update pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateRequest {
	/// New transport unit business key.
	pub transport_unit_bk: Option<String>,
	/// New target location.
	pub target_location: Option<String>,
	/// New target location group; a change here triggers the redirect
	/// voting protocol.
	pub target_location_group: Option<String>,
	/// Requested lifecycle state.
	pub state: Option<TransportOrderState>,
	/// Requested priority level.
	pub priority: Option<PriorityLevel>,
	/// Requested problem change.
	pub problem: Option<ProblemChange>,
}
