//! Shared domain types for the transport order management system.
//!
//! This crate defines the central entities moved through the lifecycle
//! manager: transport orders and their states, problem messages and their
//! history, targets (locations and location groups), transport units and
//! the lifecycle events emitted by the transportation service.

pub mod codes;
mod events;
mod message;
mod order;
mod target;
mod unit;

pub use events::{TransportEventKind, TransportServiceEvent};
pub use message::{Message, ProblemHistory};
pub use order::{
	PriorityLevel, ProblemChange, TransportOrder, TransportOrderState, UpdateRequest,
};
pub use target::{Location, LocationGroup, Target};
pub use unit::TransportUnit;
