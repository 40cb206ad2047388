//! Transport unit reference.

use serde::{Deserialize, Serialize};

/// The physical container or load being moved.
///
/// Units are owned by an external registry and referenced by business key
/// only; the lifecycle core reads and retargets them through the
/// `UnitRegistry` collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportUnit {
	/// Business key of the unit.
	pub bk: String,
	/// Location the unit currently rests on, if known.
	pub actual_location: Option<String>,
	/// Target the unit is currently directed toward, if any.
	pub target: Option<String>,
}

impl TransportUnit {
	pub fn new(bk: impl Into<String>) -> Self {
		Self {
			bk: bk.into(),
			actual_location: None,
			target: None,
		}
	}
}
