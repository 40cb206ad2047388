//! Transport unit change.

use async_trait::async_trait;
use std::sync::Arc;
use tms_types::{codes, TransportOrder, UpdateRequest};
use tracing::debug;

use super::{UpdateContext, UpdateFunction};
use crate::targets::UnitRegistry;
use crate::ServiceError;

/// Reassigns a transport order to a different transport unit.
///
/// The newly assigned unit is retargeted to the order's target, the
/// formerly assigned unit loses its target. Business keys are compared
/// case-insensitively.
pub struct ChangeTU {
	units: Arc<dyn UnitRegistry>,
}

impl ChangeTU {
	pub fn new(units: Arc<dyn UnitRegistry>) -> Self {
		Self { units }
	}
}

#[async_trait]
impl UpdateFunction for ChangeTU {
	async fn update(
		&self,
		saved: &mut TransportOrder,
		request: &UpdateRequest,
		_ctx: &mut UpdateContext,
	) -> Result<(), ServiceError> {
		let Some(new_bk) = request.transport_unit_bk.as_deref() else {
			return Ok(());
		};
		if new_bk.trim().is_empty() {
			return Err(ServiceError::Validation {
				code: codes::TO_INVALID_REQUEST,
				message: "Requested transport unit business key must not be blank".into(),
			});
		}
		let current_bk = match saved.transport_unit_bk.as_deref() {
			Some(bk) if !bk.trim().is_empty() => bk.to_owned(),
			_ => {
				return Err(ServiceError::Validation {
					code: codes::TO_INVALID_REQUEST,
					message: format!(
						"TransportOrder [{}] has no transport unit assigned to change from",
						saved.pkey
					),
				})
			}
		};
		if current_bk.eq_ignore_ascii_case(new_bk) {
			return Ok(());
		}

		debug!(
			pkey = %saved.pkey,
			from = %current_bk,
			to = %new_bk,
			"Changing assigned transport unit"
		);

		let target = saved
			.target_location_group
			.clone()
			.or_else(|| saved.target_location.clone());

		let mut new_unit = self
			.units
			.get_unit(new_bk)
			.await?
			.ok_or_else(|| ServiceError::NotFound {
				pkey: new_bk.to_owned(),
			})?;
		new_unit.target = target;
		self.units.update_unit(new_unit).await?;

		if let Some(mut old_unit) = self.units.get_unit(&current_bk).await? {
			old_unit.target = None;
			self.units.update_unit(old_unit).await?;
		}

		saved.transport_unit_bk = Some(new_bk.to_owned());
		Ok(())
	}
}
