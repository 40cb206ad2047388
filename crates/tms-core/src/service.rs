//! Transportation service, the public entry point of the lifecycle core.

use std::sync::Arc;
use tms_storage::OrderStore;
use tms_types::{
	codes, Message, PriorityLevel, TransportEventKind, TransportOrder, TransportOrderState,
	TransportServiceEvent, UpdateRequest,
};
use tracing::{debug, error, info};

use crate::event_bus::EventBus;
use crate::pipeline::{build_pipeline, UpdateContext, UpdateFunction};
use crate::startup::Startup;
use crate::state::StateMachine;
use crate::targets::{TargetResolver, UnitRegistry};
use crate::translate::MessageTranslator;
use crate::voting::{DecisionVoter, TargetAvailabilityVoter};
use crate::ServiceError;

/// Orchestrates creation, update, query and bulk cancellation of transport
/// orders.
///
/// Every operation takes one logical transaction: the order is loaded, the
/// change is applied to the in-memory value, and the result is persisted
/// once with the optimistic-version check. Nothing is written when any step
/// of an update fails.
pub struct TransportationService {
	store: Arc<OrderStore>,
	resolvers: Vec<Arc<dyn TargetResolver>>,
	state_machine: Arc<StateMachine>,
	functions: Vec<Arc<dyn UpdateFunction>>,
	startup: Startup,
	event_bus: EventBus,
}

impl std::fmt::Debug for TransportationService {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TransportationService").finish_non_exhaustive()
	}
}

impl TransportationService {
	/// Assembles the service with its fixed update pipeline.
	///
	/// When no voters are supplied, the default target-availability voter
	/// over the given resolvers is installed.
	pub fn new(
		store: Arc<OrderStore>,
		units: Arc<dyn UnitRegistry>,
		resolvers: Vec<Arc<dyn TargetResolver>>,
		voters: Vec<Arc<dyn DecisionVoter>>,
		translator: Arc<dyn MessageTranslator>,
		event_bus: EventBus,
	) -> Self {
		let state_machine = Arc::new(StateMachine::new(store.clone(), translator));
		let voters = if voters.is_empty() {
			vec![Arc::new(TargetAvailabilityVoter::new(resolvers.clone())) as Arc<dyn DecisionVoter>]
		} else {
			voters
		};
		let functions = build_pipeline(units.clone(), voters, state_machine.clone());
		let startup = Startup::new(
			store.clone(),
			units,
			resolvers.clone(),
			state_machine.clone(),
		);
		Self {
			store,
			resolvers,
			state_machine,
			functions,
			startup,
			event_bus,
		}
	}

	/// Creates a new transport order for the given unit and target.
	///
	/// The target is assigned to both target fields; the resolvers later
	/// disambiguate which one is authoritative. No target validity or unit
	/// existence check happens here; that is the startup pass's and the
	/// update pipeline's job.
	pub async fn create(
		&self,
		transport_unit_bk: &str,
		target: &str,
		priority: Option<PriorityLevel>,
	) -> Result<TransportOrder, ServiceError> {
		if transport_unit_bk.trim().is_empty() {
			return Err(ServiceError::Validation {
				code: codes::TO_INVALID_REQUEST,
				message: "Business key cannot be blank when creating a TransportOrder".into(),
			});
		}
		debug!(
			unit = %transport_unit_bk,
			target = %target,
			priority = ?priority,
			"Create TransportOrder"
		);

		let mut order = TransportOrder::new(transport_unit_bk);
		order.target_location = Some(target.to_owned());
		order.target_location_group = Some(target.to_owned());
		if let Some(priority) = priority {
			order.priority = priority;
		}
		self.store
			.insert(&order)
			.await
			.map_err(|e| ServiceError::from_storage(&order.pkey, e))?;
		self.event_bus.publish(TransportServiceEvent::new(
			&order.pkey,
			TransportEventKind::Created,
		));

		self.startup.attempt(&mut order).await;
		Ok(order)
	}

	/// Applies a partial change request to the order identified by `pkey`.
	///
	/// Runs the full update pipeline; any failure aborts the update and
	/// leaves the persisted order untouched.
	pub async fn update(
		&self,
		pkey: &str,
		request: &UpdateRequest,
	) -> Result<TransportOrder, ServiceError> {
		let mut order = self
			.store
			.find_by_pkey(pkey)
			.await
			.map_err(|e| ServiceError::from_storage(pkey, e))?;

		let mut ctx = UpdateContext::default();
		for function in &self.functions {
			function.update(&mut order, request, &mut ctx).await?;
		}

		// Archive rows go first: a failure between the two writes may leave
		// an orphaned history row, but never a replaced problem without its
		// archive.
		for history in &ctx.histories {
			self.store
				.add_history(history)
				.await
				.map_err(|e| ServiceError::from_storage(pkey, e))?;
		}
		self.store
			.save(&mut order)
			.await
			.map_err(|e| ServiceError::from_storage(pkey, e))?;
		if let Some(kind) = ctx.entered_state.and_then(TransportEventKind::from_state) {
			self.event_bus
				.publish(TransportServiceEvent::new(&order.pkey, kind));
		}
		Ok(order)
	}

	/// Returns all orders for a unit, filtered by any of the given states.
	///
	/// An empty filter matches all states.
	pub async fn find_by(
		&self,
		transport_unit_bk: &str,
		states: &[TransportOrderState],
	) -> Result<Vec<TransportOrder>, ServiceError> {
		Ok(self
			.store
			.find_by_unit_and_states(transport_unit_bk, states)
			.await?)
	}

	/// Counts the orders currently en route to the given target.
	///
	/// The target is resolved through the registered resolvers in order;
	/// the first resolver claiming it answers the count. Returns 0 when no
	/// resolver claims the target.
	pub async fn get_no_transport_orders_to_target(
		&self,
		target: &str,
		states: &[TransportOrderState],
	) -> Result<usize, ServiceError> {
		for resolver in &self.resolvers {
			if let Some(resolved) = resolver.resolve(target).await? {
				return resolver.count_orders_to_target(&resolved, states).await;
			}
		}
		Ok(0)
	}

	/// Best-effort bulk transition of orders into `target_state`.
	///
	/// Per-order state-machine rejections are recorded as a problem on the
	/// offending order and collected into the returned failure list; they
	/// never fail the call as a whole.
	pub async fn cancel_transport_orders(
		&self,
		pkeys: &[String],
		target_state: TransportOrderState,
	) -> Result<Vec<String>, ServiceError> {
		let mut failures = Vec::new();
		let orders = self.store.find_by_pkeys(pkeys).await?;
		for mut order in orders {
			debug!(pkey = %order.pkey, state = %target_state, "Trying to turn TransportOrder");
			match self
				.state_machine
				.validate(&mut order, Some(target_state))
				.await
			{
				Ok(validated) => {
					order.state = validated;
					self.store
						.save(&mut order)
						.await
						.map_err(|e| ServiceError::from_storage(&order.pkey, e))?;
					if let Some(kind) = TransportEventKind::from_state(validated) {
						self.event_bus
							.publish(TransportServiceEvent::new(&order.pkey, kind));
					}
					info!(pkey = %order.pkey, state = %validated, "TransportOrder turned");
				}
				Err(ServiceError::StateChange { code, message, .. }) => {
					error!(pkey = %order.pkey, %message, "Could not turn TransportOrder");
					order.problem = Some(Message::new(code, message));
					self.store
						.save(&mut order)
						.await
						.map_err(|e| ServiceError::from_storage(&order.pkey, e))?;
					failures.push(order.pkey.clone());
				}
				Err(other) => return Err(other),
			}
		}
		Ok(failures)
	}

	/// The bus lifecycle events are published on.
	pub fn event_bus(&self) -> &EventBus {
		&self.event_bus
	}

	/// The underlying order store.
	pub fn store(&self) -> &Arc<OrderStore> {
		&self.store
	}

	/// The state machine governing order transitions.
	pub fn state_machine(&self) -> &Arc<StateMachine> {
		&self.state_machine
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use std::collections::HashMap;
	use tms_storage::implementations::memory::MemoryStorage;
	use tms_storage::StorageService;
	use tms_types::{Location, LocationGroup, ProblemChange, Target, TransportUnit};
	use tokio::sync::Mutex;

	use crate::translate::DefaultTranslator;

	struct MockRegistry {
		units: Mutex<HashMap<String, TransportUnit>>,
	}

	impl MockRegistry {
		fn new(units: Vec<TransportUnit>) -> Arc<Self> {
			Arc::new(Self {
				units: Mutex::new(units.into_iter().map(|u| (u.bk.clone(), u)).collect()),
			})
		}
	}

	#[async_trait]
	impl UnitRegistry for MockRegistry {
		async fn get_unit(&self, bk: &str) -> Result<Option<TransportUnit>, ServiceError> {
			Ok(self.units.lock().await.get(bk).cloned())
		}

		async fn update_unit(&self, unit: TransportUnit) -> Result<(), ServiceError> {
			self.units.lock().await.insert(unit.bk.clone(), unit);
			Ok(())
		}
	}

	struct MapResolver {
		targets: HashMap<String, Target>,
		count: usize,
	}

	impl MapResolver {
		fn new(targets: Vec<Target>) -> Arc<Self> {
			Arc::new(Self {
				targets: targets
					.into_iter()
					.map(|t| (t.id().to_owned(), t))
					.collect(),
				count: 0,
			})
		}

		fn with_count(targets: Vec<Target>, count: usize) -> Arc<Self> {
			let mut resolver = Self {
				targets: HashMap::new(),
				count,
			};
			for t in targets {
				resolver.targets.insert(t.id().to_owned(), t);
			}
			Arc::new(resolver)
		}
	}

	#[async_trait]
	impl TargetResolver for MapResolver {
		async fn resolve(&self, target_id: &str) -> Result<Option<Target>, ServiceError> {
			Ok(self.targets.get(target_id).cloned())
		}

		async fn count_orders_to_target(
			&self,
			_target: &Target,
			_states: &[TransportOrderState],
		) -> Result<usize, ServiceError> {
			Ok(self.count)
		}
	}

	fn location(id: &str, incoming_active: bool) -> Target {
		Target::Location(Location {
			id: id.into(),
			incoming_active,
		})
	}

	fn service(
		units: Arc<MockRegistry>,
		resolvers: Vec<Arc<dyn TargetResolver>>,
	) -> TransportationService {
		let _ = tracing_subscriber::fmt().with_test_writer().try_init();
		let store = Arc::new(OrderStore::new(StorageService::new(Box::new(
			MemoryStorage::new(),
		))));
		TransportationService::new(
			store,
			units,
			resolvers,
			Vec::new(),
			Arc::new(DefaultTranslator),
			EventBus::default(),
		)
	}

	fn unit_at(bk: &str, location: &str) -> TransportUnit {
		TransportUnit {
			bk: bk.into(),
			actual_location: Some(location.into()),
			target: None,
		}
	}

	#[tokio::test]
	async fn test_create_rejects_blank_business_key() {
		let service = service(MockRegistry::new(vec![]), vec![]);
		let err = service.create("  ", "ERR_LOC", None).await.unwrap_err();
		assert!(matches!(err, ServiceError::Validation { .. }));
	}

	#[tokio::test]
	async fn test_create_starts_when_target_is_an_active_location() {
		let resolver = MapResolver::new(vec![location("ERR_LOC", true)]);
		let service = service(
			MockRegistry::new(vec![unit_at("4711", "SOMEWHERE_ELSE")]),
			vec![resolver],
		);

		let order = service.create("4711", "ERR_LOC", None).await.unwrap();
		assert_eq!(order.state, TransportOrderState::Started);
		assert_eq!(order.target_location.as_deref(), Some("ERR_LOC"));
		assert_eq!(order.target_location_group.as_deref(), Some("ERR_LOC"));
		assert!(order.start_date.is_some());

		let persisted = service.store().find_by_pkey(&order.pkey).await.unwrap();
		assert_eq!(persisted.state, TransportOrderState::Started);
	}

	#[tokio::test]
	async fn test_create_stays_initialized_when_unit_rests_on_target() {
		let resolver = MapResolver::new(vec![location("ERR_LOC", true)]);
		let service = service(
			MockRegistry::new(vec![unit_at("4711", "ERR_LOC")]),
			vec![resolver],
		);

		let order = service.create("4711", "ERR_LOC", None).await.unwrap();
		assert_eq!(order.state, TransportOrderState::Initialized);
		assert!(order.start_date.is_none());
	}

	#[tokio::test]
	async fn test_create_stays_initialized_when_target_is_blocked() {
		let resolver = MapResolver::new(vec![location("ERR_LOC", false)]);
		let service = service(
			MockRegistry::new(vec![unit_at("4711", "SOMEWHERE_ELSE")]),
			vec![resolver],
		);

		let order = service.create("4711", "ERR_LOC", None).await.unwrap();
		assert_eq!(order.state, TransportOrderState::Initialized);
	}

	#[tokio::test]
	async fn test_create_stays_initialized_for_a_group_target() {
		let resolver = MapResolver::new(vec![Target::LocationGroup(LocationGroup {
			name: "GROUP1".into(),
			incoming_active: true,
		})]);
		let service = service(
			MockRegistry::new(vec![unit_at("4711", "SOMEWHERE_ELSE")]),
			vec![resolver],
		);

		let order = service.create("4711", "GROUP1", None).await.unwrap();
		assert_eq!(order.state, TransportOrderState::Initialized);
	}

	#[tokio::test]
	async fn test_create_applies_priority() {
		let service = service(MockRegistry::new(vec![]), vec![]);
		let order = service
			.create("4711", "ERR_LOC", Some(PriorityLevel::Highest))
			.await
			.unwrap();
		assert_eq!(order.priority, PriorityLevel::Highest);

		let order = service.create("4712", "ERR_LOC", None).await.unwrap();
		assert_eq!(order.priority, PriorityLevel::Normal);
	}

	#[tokio::test]
	async fn test_update_problem_roundtrip_with_history() {
		let service = service(MockRegistry::new(vec![]), vec![]);
		let order = service.create("4711", "ERR_LOC", None).await.unwrap();

		let p1 = Message::new("77", "text");
		let p2 = Message::new("78", "text2");

		let request = UpdateRequest {
			problem: Some(ProblemChange::Report(p1.clone())),
			..Default::default()
		};
		service.update(&order.pkey, &request).await.unwrap();
		assert!(service
			.store()
			.histories_for(&order.pkey)
			.await
			.unwrap()
			.is_empty());

		let request = UpdateRequest {
			problem: Some(ProblemChange::Report(p2.clone())),
			..Default::default()
		};
		let updated = service.update(&order.pkey, &request).await.unwrap();
		assert_eq!(updated.problem, Some(p2.clone()));

		let histories = service.store().histories_for(&order.pkey).await.unwrap();
		assert_eq!(histories.len(), 1);
		assert_eq!(histories[0].problem, p1);

		// Requesting the same problem again adds no history entry.
		let request = UpdateRequest {
			problem: Some(ProblemChange::Report(p2)),
			..Default::default()
		};
		service.update(&order.pkey, &request).await.unwrap();
		let histories = service.store().histories_for(&order.pkey).await.unwrap();
		assert_eq!(histories.len(), 1);
	}

	#[tokio::test]
	async fn test_update_redirect_denial_leaves_persisted_target_unchanged() {
		// The default voter cannot resolve "NEW", so the vote stays
		// incomplete.
		let resolver = MapResolver::new(vec![location("OLD", true)]);
		let service = service(MockRegistry::new(vec![]), vec![resolver]);
		let order = service.create("4711", "OLD", None).await.unwrap();

		let request = UpdateRequest {
			target_location_group: Some("NEW".into()),
			..Default::default()
		};
		let err = service.update(&order.pkey, &request).await.unwrap_err();
		assert!(matches!(err, ServiceError::RedirectDenied { .. }));

		let persisted = service.store().find_by_pkey(&order.pkey).await.unwrap();
		assert_eq!(persisted.target_location_group.as_deref(), Some("OLD"));
	}

	#[tokio::test]
	async fn test_update_redirect_to_available_group_succeeds() {
		let resolver = MapResolver::new(vec![Target::LocationGroup(LocationGroup {
			name: "NEW".into(),
			incoming_active: true,
		})]);
		let service = service(MockRegistry::new(vec![]), vec![resolver]);
		let order = service.create("4711", "OLD", None).await.unwrap();

		let request = UpdateRequest {
			target_location_group: Some("NEW".into()),
			..Default::default()
		};
		let updated = service.update(&order.pkey, &request).await.unwrap();
		assert_eq!(updated.target_location_group.as_deref(), Some("NEW"));
	}

	#[tokio::test]
	async fn test_update_unknown_order_is_not_found() {
		let service = service(MockRegistry::new(vec![]), vec![]);
		let err = service
			.update("missing", &UpdateRequest::default())
			.await
			.unwrap_err();
		assert!(matches!(err, ServiceError::NotFound { pkey } if pkey == "missing"));
	}

	#[tokio::test]
	async fn test_find_by_filters_states() {
		let service = service(MockRegistry::new(vec![]), vec![]);
		// No resolver claims the target, so both orders stay INITIALIZED.
		service.create("4711", "ERR_LOC", None).await.unwrap();
		service.create("4711", "ERR_LOC", None).await.unwrap();

		let all = service.find_by("4711", &[]).await.unwrap();
		assert_eq!(all.len(), 2);

		let started = service
			.find_by("4711", &[TransportOrderState::Started])
			.await
			.unwrap();
		assert!(started.is_empty());

		let initialized = service
			.find_by("4711", &[TransportOrderState::Initialized])
			.await
			.unwrap();
		assert_eq!(initialized.len(), 2);
	}

	#[tokio::test]
	async fn test_count_orders_to_target() {
		let resolver = MapResolver::with_count(vec![location("ERR_LOC", true)], 3);
		let service = service(MockRegistry::new(vec![]), vec![resolver]);

		let count = service
			.get_no_transport_orders_to_target("ERR_LOC", &[])
			.await
			.unwrap();
		assert_eq!(count, 3);

		let count = service
			.get_no_transport_orders_to_target("UNCLAIMED", &[])
			.await
			.unwrap();
		assert_eq!(count, 0);
	}

	#[tokio::test]
	async fn test_cancel_mixed_batch_collects_failures() {
		let resolver = MapResolver::new(vec![location("ERR_LOC", true)]);
		let service = service(
			MockRegistry::new(vec![unit_at("4711", "SOMEWHERE_ELSE")]),
			vec![resolver],
		);

		// One order runs through to STARTED, the other is forced terminal.
		let started = service.create("4711", "ERR_LOC", None).await.unwrap();
		assert_eq!(started.state, TransportOrderState::Started);
		let terminal = service.create("4712", "ERR_LOC", None).await.unwrap();
		let request = UpdateRequest {
			state: Some(TransportOrderState::Canceled),
			..Default::default()
		};
		service.update(&terminal.pkey, &request).await.unwrap();

		let mut events = service.event_bus().subscribe();
		let failures = service
			.cancel_transport_orders(
				&[started.pkey.clone(), terminal.pkey.clone()],
				TransportOrderState::Canceled,
			)
			.await
			.unwrap();

		assert_eq!(failures, vec![terminal.pkey.clone()]);

		let started_after = service.store().find_by_pkey(&started.pkey).await.unwrap();
		assert_eq!(started_after.state, TransportOrderState::Canceled);
		assert!(started_after.end_date.is_some());

		let terminal_after = service.store().find_by_pkey(&terminal.pkey).await.unwrap();
		assert!(terminal_after.has_problem());

		let event = events.recv().await.unwrap();
		assert_eq!(event.order_pkey, started.pkey);
		assert_eq!(event.kind, TransportEventKind::Canceled);
	}

	#[tokio::test]
	async fn test_create_publishes_created_event() {
		let service = service(MockRegistry::new(vec![]), vec![]);
		let mut events = service.event_bus().subscribe();
		let order = service.create("4711", "ERR_LOC", None).await.unwrap();

		let event = events.recv().await.unwrap();
		assert_eq!(event.order_pkey, order.pkey);
		assert_eq!(event.kind, TransportEventKind::Created);
	}
}
