//! In-memory order book with per-order locking.
//!
//! Each order sits behind its own async mutex: transitions for one order are
//! serialized while different orders proceed concurrently. The maps
//! themselves are only locked briefly to look up or insert a handle.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::Mutex;

use crate::domain::order_execution::Order;
use crate::domain::shared::{GatewayOrderId, OrderId};

/// Shared handle to one order.
pub type OrderHandle = Arc<Mutex<Order>>;

/// Orders tracked by this process.
#[derive(Debug, Default)]
pub struct OrderBook {
    orders: RwLock<HashMap<OrderId, OrderHandle>>,
    by_gateway_id: RwLock<HashMap<GatewayOrderId, OrderId>>,
}

impl OrderBook {
    /// Create an empty book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a new order and return its handle.
    pub fn insert(&self, order: Order) -> OrderHandle {
        let id = order.id().clone();
        if let Some(gateway_id) = order.gateway_order_id() {
            self.by_gateway_id.write().insert(gateway_id.clone(), id.clone());
        }
        let handle = Arc::new(Mutex::new(order));
        self.orders.write().insert(id, Arc::clone(&handle));
        handle
    }

    /// Index `order_id` under its gateway id.
    pub fn link(&self, gateway_order_id: &GatewayOrderId, order_id: &OrderId) {
        self.by_gateway_id
            .write()
            .insert(gateway_order_id.clone(), order_id.clone());
    }

    /// Stop tracking an order, dropping its gateway id index entries.
    pub fn remove(&self, order_id: &OrderId) -> Option<OrderHandle> {
        let handle = self.orders.write().remove(order_id)?;
        self.by_gateway_id.write().retain(|_, id| id != order_id);
        Some(handle)
    }

    /// Look up by local id.
    #[must_use]
    pub fn get(&self, order_id: &OrderId) -> Option<OrderHandle> {
        self.orders.read().get(order_id).cloned()
    }

    /// Look up by gateway id.
    #[must_use]
    pub fn get_by_gateway_id(&self, gateway_order_id: &GatewayOrderId) -> Option<OrderHandle> {
        let order_id = self.by_gateway_id.read().get(gateway_order_id).cloned()?;
        self.get(&order_id)
    }

    /// Look up by gateway id, falling back to the client reference.
    #[must_use]
    pub fn find(
        &self,
        gateway_order_id: &GatewayOrderId,
        client_order_id: Option<&OrderId>,
    ) -> Option<OrderHandle> {
        self.get_by_gateway_id(gateway_order_id)
            .or_else(|| client_order_id.and_then(|id| self.get(id)))
    }

    /// Returns true if the gateway id is known.
    #[must_use]
    pub fn knows_gateway_id(&self, gateway_order_id: &GatewayOrderId) -> bool {
        self.by_gateway_id.read().contains_key(gateway_order_id)
    }

    /// Handles to every tracked order, in no particular order.
    #[must_use]
    pub fn handles(&self) -> Vec<OrderHandle> {
        self.orders.read().values().cloned().collect()
    }

    /// Number of tracked orders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.read().len()
    }

    /// Returns true if no orders are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.read().is_empty()
    }
}
