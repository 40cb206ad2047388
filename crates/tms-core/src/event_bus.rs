//! Broadcast bus for lifecycle events.
//!
//! Publishing is fire-and-forget: events are delivered to whoever is
//! subscribed at the time, and a publish without subscribers is not an
//! error.

use tms_types::TransportServiceEvent;
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 256;

/// Clone-able handle to the lifecycle event channel.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<TransportServiceEvent>,
}

impl EventBus {
	/// Creates a bus buffering up to `capacity` undelivered events per
	/// subscriber.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	/// Publishes an event to all current subscribers.
	pub fn publish(&self, event: TransportServiceEvent) {
		// A send error only means nobody is listening.
		let _ = self.sender.send(event);
	}

	/// Subscribes to all events published from now on.
	pub fn subscribe(&self) -> broadcast::Receiver<TransportServiceEvent> {
		self.sender.subscribe()
	}
}

impl Default for EventBus {
	fn default() -> Self {
		Self::new(DEFAULT_CAPACITY)
	}
}
