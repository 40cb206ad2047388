//! Redirect voting protocol.
//!
//! When an update requests a different target, the change is put to a vote.
//! Voters inspect the vote and may attach problem messages and/or leave it
//! incomplete; ordinary denial is communicated through the vote itself,
//! never through an error. Attached messages are recorded as problems on
//! the order regardless of the approval outcome.

use async_trait::async_trait;
use std::sync::Arc;
use tms_types::{codes, Message};
use tracing::debug;

use crate::targets::TargetResolver;
use crate::ServiceError;

/// A proposal to redirect one transport order to a new target.
#[derive(Debug)]
pub struct RedirectVote {
	target: String,
	order_pkey: String,
	messages: Vec<Message>,
	completed: bool,
}

impl RedirectVote {
	/// Creates a vote for redirecting the given order to `target`.
	pub fn new(target: impl Into<String>, order_pkey: impl Into<String>) -> Self {
		Self {
			target: target.into(),
			order_pkey: order_pkey.into(),
			messages: Vec::new(),
			completed: false,
		}
	}

	/// The requested target identifier.
	pub fn target(&self) -> &str {
		&self.target
	}

	/// Persisted key of the order under vote.
	pub fn order_pkey(&self) -> &str {
		&self.order_pkey
	}

	/// Attaches a problem message to the vote.
	pub fn add_message(&mut self, message: Message) {
		self.messages.push(message);
	}

	/// Marks the vote as fully approved.
	pub fn complete(&mut self) {
		self.completed = true;
	}

	/// Whether the vote carries full approval.
	pub fn completed(&self) -> bool {
		self.completed
	}

	/// Whether any voter attached a message.
	pub fn has_messages(&self) -> bool {
		!self.messages.is_empty()
	}

	/// The attached messages, in voting order.
	pub fn messages(&self) -> &[Message] {
		&self.messages
	}
}

/// A voter evaluating the feasibility of a redirect.
///
/// Implementations must not return an error for ordinary denial; they
/// express denial by leaving the vote incomplete, optionally attaching
/// messages. Errors are reserved for infrastructure failures.
#[async_trait]
pub trait DecisionVoter: Send + Sync {
	async fn vote_for(&self, vote: &mut RedirectVote) -> Result<(), ServiceError>;
}

/// Default voter checking that the requested target exists and currently
/// accepts incoming transports.
///
/// Resolvers are queried in registration order; the first one claiming the
/// target wins. An unresolvable target is a denial, not a separate error
/// path.
pub struct TargetAvailabilityVoter {
	resolvers: Vec<Arc<dyn TargetResolver>>,
}

impl TargetAvailabilityVoter {
	pub fn new(resolvers: Vec<Arc<dyn TargetResolver>>) -> Self {
		Self { resolvers }
	}
}

#[async_trait]
impl DecisionVoter for TargetAvailabilityVoter {
	async fn vote_for(&self, vote: &mut RedirectVote) -> Result<(), ServiceError> {
		for resolver in &self.resolvers {
			if let Some(target) = resolver.resolve(vote.target()).await? {
				if target.is_incoming_blocked() {
					debug!(
						order = %vote.order_pkey(),
						target = %target.id(),
						"Redirect target is blocked for incoming transports"
					);
					vote.add_message(Message::new(
						codes::TARGET_BLOCKED,
						format!(
							"Target [{}] is blocked for incoming transports",
							target.id()
						),
					));
				} else {
					vote.complete();
				}
				return Ok(());
			}
		}
		vote.add_message(Message::new(
			codes::TARGET_NOT_FOUND,
			format!(
				"No Location or LocationGroup found for target [{}]",
				vote.target()
			),
		));
		Ok(())
	}
}
