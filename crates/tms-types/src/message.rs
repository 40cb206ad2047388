//! Problem messages and their append-only history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A problem reported on a transport order.
///
/// A message is an immutable value; equality is structural over all three
/// fields. The `occurred` timestamp is taken when the message is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
	/// Timestamp when the problem occurred.
	pub occurred: DateTime<Utc>,
	/// Message number, a stable identifier of the problem kind.
	pub message_no: String,
	/// Free-text message.
	pub message: String,
}

impl Message {
	/// Creates a message with the occurrence timestamp set to now.
	pub fn new(message_no: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			occurred: Utc::now(),
			message_no: message_no.into(),
			message: message.into(),
		}
	}
}

impl fmt::Display for Message {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "[{}] {}", self.message_no, self.message)
	}
}

/// An archived problem that was superseded on a transport order.
///
/// Created whenever a new, distinct problem replaces an existing one.
/// Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemHistory {
	/// Unique identifier of this history entry.
	pub pkey: String,
	/// Persisted key of the order the problem was reported on.
	pub order_pkey: String,
	/// The superseded problem.
	pub problem: Message,
	/// Timestamp when the entry was archived.
	pub created_at: DateTime<Utc>,
}

impl ProblemHistory {
	/// Archives `problem` for the order identified by `order_pkey`.
	pub fn new(order_pkey: impl Into<String>, problem: Message) -> Self {
		Self {
			pkey: uuid::Uuid::new_v4().to_string(),
			order_pkey: order_pkey.into(),
			problem,
			created_at: Utc::now(),
		}
	}
}
