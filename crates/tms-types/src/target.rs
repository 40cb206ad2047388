//! Targets a transport order can be directed toward.

use serde::{Deserialize, Serialize};

/// A physical location identified by its business identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
	/// Business identifier of the location.
	pub id: String,
	/// Whether the location currently accepts incoming transports.
	pub incoming_active: bool,
}

/// A group of locations addressed as one logical target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationGroup {
	/// Name of the location group.
	pub name: String,
	/// Whether the group currently accepts incoming transports.
	pub incoming_active: bool,
}

/// A polymorphic reference to either a Location or a LocationGroup.
///
/// Resolution from a string target identifier into one of the two kinds is
/// the job of the registered target resolvers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Target {
	Location(Location),
	LocationGroup(LocationGroup),
}

impl Target {
	/// Business identifier of the resolved target.
	pub fn id(&self) -> &str {
		match self {
			Target::Location(l) => &l.id,
			Target::LocationGroup(g) => &g.name,
		}
	}

	/// Whether the target currently refuses incoming transports.
	pub fn is_incoming_blocked(&self) -> bool {
		match self {
			Target::Location(l) => !l.incoming_active,
			Target::LocationGroup(g) => !g.incoming_active,
		}
	}
}
