//! Typed persistence layer for transport orders and problem history.

use crate::{StorageError, StorageService};
use tms_types::{ProblemHistory, TransportOrder, TransportOrderState};
use tokio::sync::Mutex;

const ORDERS: &str = "orders";
const HISTORY: &str = "history";

/// Order-specific storage operations on top of the generic service.
///
/// All writes of existing orders go through [`OrderStore::save`], which
/// enforces the optimistic-version check: the persisted copy must still
/// carry the version the caller loaded, otherwise the write fails with
/// [`StorageError::Conflict`] and the caller may reload and retry. The
/// check and the write must happen atomically, so all order writes
/// serialize through one store-level lock.
pub struct OrderStore {
	storage: StorageService,
	write_lock: Mutex<()>,
}

impl OrderStore {
	pub fn new(storage: StorageService) -> Self {
		Self {
			storage,
			write_lock: Mutex::new(()),
		}
	}

	/// Persists a freshly created order.
	pub async fn insert(&self, order: &TransportOrder) -> Result<(), StorageError> {
		let _guard = self.write_lock.lock().await;
		if self.storage.exists(ORDERS, &order.pkey).await? {
			return Err(StorageError::Backend(format!(
				"Order with pkey [{}] already exists",
				order.pkey
			)));
		}
		self.storage.store(ORDERS, &order.pkey, order).await
	}

	/// Loads an order by its persisted key.
	pub async fn find_by_pkey(&self, pkey: &str) -> Result<TransportOrder, StorageError> {
		self.storage.retrieve(ORDERS, pkey).await
	}

	/// Loads all orders matching any of the given persisted keys.
	///
	/// Unknown keys are skipped, mirroring a `WHERE pkey IN (..)` query.
	pub async fn find_by_pkeys(&self, pkeys: &[String]) -> Result<Vec<TransportOrder>, StorageError> {
		let mut orders = Vec::with_capacity(pkeys.len());
		for pkey in pkeys {
			match self.find_by_pkey(pkey).await {
				Ok(order) => orders.push(order),
				Err(StorageError::NotFound) => continue,
				Err(e) => return Err(e),
			}
		}
		Ok(orders)
	}

	/// Returns all orders for the given unit, filtered by state.
	///
	/// An empty state filter matches all states.
	pub async fn find_by_unit_and_states(
		&self,
		transport_unit_bk: &str,
		states: &[TransportOrderState],
	) -> Result<Vec<TransportOrder>, StorageError> {
		let orders: Vec<TransportOrder> = self.storage.retrieve_all(ORDERS).await?;
		Ok(orders
			.into_iter()
			.filter(|o| {
				o.transport_unit_bk.as_deref() == Some(transport_unit_bk)
					&& (states.is_empty() || states.contains(&o.state))
			})
			.collect())
	}

	/// Writes back a loaded order, bumping its version.
	///
	/// The caller's copy must carry the currently persisted version;
	/// otherwise a concurrent writer won the race and the write is refused.
	/// Compare and bump run under the store's write lock, so two callers
	/// holding the same version can never both succeed.
	pub async fn save(&self, order: &mut TransportOrder) -> Result<(), StorageError> {
		let _guard = self.write_lock.lock().await;
		let stored: TransportOrder = self.storage.retrieve(ORDERS, &order.pkey).await?;
		if stored.version != order.version {
			return Err(StorageError::Conflict {
				expected: order.version,
				found: stored.version,
			});
		}
		order.version += 1;
		self.storage.store(ORDERS, &order.pkey, order).await
	}

	/// Appends a problem-history entry.
	pub async fn add_history(&self, history: &ProblemHistory) -> Result<(), StorageError> {
		let id = format!("{}:{}", history.order_pkey, history.pkey);
		self.storage.store(HISTORY, &id, history).await
	}

	/// Returns the problem history of one order.
	pub async fn histories_for(&self, order_pkey: &str) -> Result<Vec<ProblemHistory>, StorageError> {
		let all: Vec<ProblemHistory> = self.storage.retrieve_all(HISTORY).await?;
		Ok(all
			.into_iter()
			.filter(|h| h.order_pkey == order_pkey)
			.collect())
	}
}
