//! Problem reporting.

use async_trait::async_trait;
use tms_types::{Message, ProblemChange, ProblemHistory, TransportOrder, UpdateRequest};

use super::{UpdateContext, UpdateFunction};
use crate::ServiceError;

/// Applies a requested problem change to the order.
///
/// Whenever a distinct new value replaces an existing problem, the old one
/// is archived into a problem-history row first. Requesting the value the
/// order already carries is a no-op and leaves the history untouched.
pub struct AddProblem;

impl AddProblem {
	pub fn new() -> Self {
		Self
	}

	/// Overwrites the order's problem, archiving the superseded one.
	///
	/// Also used by the redirect function to record voter messages.
	pub(crate) fn apply(
		&self,
		new_problem: Option<Message>,
		saved: &mut TransportOrder,
		ctx: &mut UpdateContext,
	) {
		if new_problem == saved.problem {
			return;
		}
		if let Some(previous) = saved.problem.take() {
			ctx.histories.push(ProblemHistory::new(&saved.pkey, previous));
		}
		saved.problem = new_problem;
	}
}

impl Default for AddProblem {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl UpdateFunction for AddProblem {
	async fn update(
		&self,
		saved: &mut TransportOrder,
		request: &UpdateRequest,
		ctx: &mut UpdateContext,
	) -> Result<(), ServiceError> {
		match &request.problem {
			Some(ProblemChange::Report(message)) => self.apply(Some(message.clone()), saved, ctx),
			Some(ProblemChange::Clear) => self.apply(None, saved, ctx),
			None => {}
		}
		Ok(())
	}
}
