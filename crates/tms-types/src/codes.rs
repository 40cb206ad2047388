//! Stable machine-readable error codes.
//!
//! The surrounding REST layer maps these codes to HTTP statuses; the core
//! only guarantees code stability. Logic must branch on codes, never on
//! translated message text.

/// A state change was requested without a target state.
pub const TO_STATE_CHANGE_NULL_STATE: &str = "TMS.TO_STATE_CHANGE_NULL_STATE";

/// The requested state lies behind the current state.
pub const TO_STATE_CHANGE_BACKWARDS_NOT_ALLOWED: &str =
	"TMS.TO_STATE_CHANGE_BACKWARDS_NOT_ALLOWED";

/// A CREATED order was asked for anything other than INITIALIZED or CANCELED.
pub const TO_STATE_CHANGE_NOT_READY: &str = "TMS.TO_STATE_CHANGE_NOT_READY";

/// A CREATED order misses the unit business key or a target.
pub const TO_STATE_CHANGE_INCOMPLETE: &str = "TMS.TO_STATE_CHANGE_INCOMPLETE";

/// An INITIALIZED order was asked for anything other than STARTED, CANCELED
/// or ONFAILURE.
pub const STATE_CHANGE_ERROR_FOR_INITIALIZED_TO: &str =
	"TMS.STATE_CHANGE_ERROR_FOR_INITIALIZED_TO";

/// Another order for the same transport unit is already STARTED.
pub const START_TO_NOT_ALLOWED_ALREADY_STARTED_ONE: &str =
	"TMS.START_TO_NOT_ALLOWED_ALREADY_STARTED_ONE";

/// The order already reached a terminal state.
pub const TO_STATE_CHANGE_ALREADY_COMPLETED: &str = "TMS.TO_STATE_CHANGE_ALREADY_COMPLETED";

/// A redirect was denied by the voting protocol.
pub const TO_REDIRECT_DENIED: &str = "TMS.TO_REDIRECT_DENIED";

/// A create or update request carried malformed or missing fields.
pub const TO_INVALID_REQUEST: &str = "TMS.TO_INVALID_REQUEST";

/// The target cannot accept incoming transports.
pub const TARGET_BLOCKED: &str = "TMS.TARGET_BLOCKED";

/// Neither a Location nor a LocationGroup matches the requested target.
pub const TARGET_NOT_FOUND: &str = "TMS.TARGET_NOT_FOUND";

/// An active order was canceled because its transport unit is being removed.
pub const TO_CANCELED_BY_REMOVAL: &str = "TMS.TO_CANCELED_BY_REMOVAL";

/// A completed order was unlinked because its transport unit is being removed.
pub const TO_UNLINKED_BY_REMOVAL: &str = "TMS.TO_UNLINKED_BY_REMOVAL";
