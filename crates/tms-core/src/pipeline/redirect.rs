//! Redirect: target change via the voting protocol.

use async_trait::async_trait;
use std::sync::Arc;
use tms_types::{codes, TransportOrder, UpdateRequest};
use tracing::debug;

use super::{AddProblem, UpdateContext, UpdateFunction};
use crate::voting::{DecisionVoter, RedirectVote};
use crate::ServiceError;

/// Handles target changes of a transport order.
///
/// Only a change of the `target_location_group` triggers the vote. Voter
/// messages are recorded as problems on the order whether or not the vote
/// completes; an incomplete vote aborts the whole update and no partial
/// target change is applied.
pub struct RedirectTO {
	voters: Vec<Arc<dyn DecisionVoter>>,
	add_problem: AddProblem,
}

impl RedirectTO {
	pub fn new(voters: Vec<Arc<dyn DecisionVoter>>) -> Self {
		Self {
			voters,
			add_problem: AddProblem::new(),
		}
	}
}

#[async_trait]
impl UpdateFunction for RedirectTO {
	async fn update(
		&self,
		saved: &mut TransportOrder,
		request: &UpdateRequest,
		ctx: &mut UpdateContext,
	) -> Result<(), ServiceError> {
		let Some(requested) = request.target_location_group.as_deref() else {
			return Ok(());
		};
		if saved.target_location_group.as_deref() == Some(requested) {
			return Ok(());
		}

		debug!(
			pkey = %saved.pkey,
			from = ?saved.target_location_group,
			to = %requested,
			"Redirect requested"
		);

		let mut vote = RedirectVote::new(requested, &saved.pkey);
		for voter in &self.voters {
			voter.vote_for(&mut vote).await?;
		}

		for message in vote.messages() {
			self.add_problem.apply(Some(message.clone()), saved, ctx);
		}

		if !vote.completed() {
			return Err(ServiceError::RedirectDenied {
				code: codes::TO_REDIRECT_DENIED,
				pkey: saved.pkey.clone(),
			});
		}

		saved.target_location_group = Some(requested.to_owned());
		if let Some(location) = request.target_location.as_deref() {
			saved.target_location = Some(location.to_owned());
		}
		Ok(())
	}
}
