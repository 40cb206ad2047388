//! State change via the state machine.

use async_trait::async_trait;
use std::sync::Arc;
use tms_types::{TransportOrder, UpdateRequest};

use super::{UpdateContext, UpdateFunction};
use crate::state::StateMachine;
use crate::ServiceError;

/// Applies a requested state change after validation by the state machine.
pub struct ChangeState {
	state_machine: Arc<StateMachine>,
}

impl ChangeState {
	pub fn new(state_machine: Arc<StateMachine>) -> Self {
		Self { state_machine }
	}
}

#[async_trait]
impl UpdateFunction for ChangeState {
	async fn update(
		&self,
		saved: &mut TransportOrder,
		request: &UpdateRequest,
		ctx: &mut UpdateContext,
	) -> Result<(), ServiceError> {
		let Some(requested) = request.state else {
			return Ok(());
		};
		if requested == saved.state {
			return Ok(());
		}
		let validated = self.state_machine.validate(saved, Some(requested)).await?;
		saved.state = validated;
		ctx.entered_state = Some(validated);
		Ok(())
	}
}
