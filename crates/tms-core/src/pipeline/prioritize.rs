//! Priority change.

use async_trait::async_trait;
use tms_types::{TransportOrder, UpdateRequest};

use super::{UpdateContext, UpdateFunction};
use crate::ServiceError;

/// Overwrites the order's priority when the request carries a different one.
pub struct PrioritizeTO;

impl PrioritizeTO {
	pub fn new() -> Self {
		Self
	}
}

impl Default for PrioritizeTO {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl UpdateFunction for PrioritizeTO {
	async fn update(
		&self,
		saved: &mut TransportOrder,
		request: &UpdateRequest,
		_ctx: &mut UpdateContext,
	) -> Result<(), ServiceError> {
		if let Some(priority) = request.priority {
			if priority != saved.priority {
				saved.priority = priority;
			}
		}
		Ok(())
	}
}
