//! Ordered update pipeline.
//!
//! An update is a chain of independent functions, each inspecting the delta
//! between the persisted order and the incoming change request and applying
//! one concern. The order of the chain is load-bearing: the unit change must
//! be validated before the state is re-evaluated, since a changed unit may
//! invalidate a pending STARTED precondition.
//!
//! Any function may fail; the transportation service persists nothing until
//! the whole chain returned without error, so a failure aborts the update
//! atomically.

use async_trait::async_trait;
use std::sync::Arc;
use tms_types::{ProblemHistory, TransportOrder, TransportOrderState, UpdateRequest};

mod add_problem;
mod change_state;
mod change_tu;
mod prioritize;
mod redirect;

pub use add_problem::AddProblem;
pub use change_state::ChangeState;
pub use change_tu::ChangeTU;
pub use prioritize::PrioritizeTO;
pub use redirect::RedirectTO;

use crate::state::StateMachine;
use crate::targets::UnitRegistry;
use crate::voting::DecisionVoter;
use crate::ServiceError;

/// Side effects collected while the chain runs.
///
/// Nothing in here touches storage; the service flushes the buffered
/// history rows and publishes the entered state only after the full chain
/// succeeded.
#[derive(Debug, Default)]
pub struct UpdateContext {
	/// Problem-history rows to append on success.
	pub histories: Vec<ProblemHistory>,
	/// State the order entered during this update, if any.
	pub entered_state: Option<TransportOrderState>,
}

/// One concern of the update pipeline.
#[async_trait]
pub trait UpdateFunction: Send + Sync {
	/// Applies this function's concern to `saved` if the request carries a
	/// delta for it.
	async fn update(
		&self,
		saved: &mut TransportOrder,
		request: &UpdateRequest,
		ctx: &mut UpdateContext,
	) -> Result<(), ServiceError>;
}

/// Builds the pipeline in its fixed, documented order:
/// unit change, redirect, problem, state, priority.
pub fn build_pipeline(
	units: Arc<dyn UnitRegistry>,
	voters: Vec<Arc<dyn DecisionVoter>>,
	state_machine: Arc<StateMachine>,
) -> Vec<Arc<dyn UpdateFunction>> {
	vec![
		Arc::new(ChangeTU::new(units)),
		Arc::new(RedirectTO::new(voters)),
		Arc::new(AddProblem::new()),
		Arc::new(ChangeState::new(state_machine)),
		Arc::new(PrioritizeTO::new()),
	]
}
