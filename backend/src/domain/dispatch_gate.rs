//! Per-order guard allowing at most one receipt email in flight.
//!
//! Each order moves `Idle → Sending → (Sent | Failed) → Idle`. A caller that
//! finds the order `Sending` is turned away rather than queued. The
//! [`DispatchPermit`] returns the order to `Idle` when dropped, so a panic or
//! early return inside the dispatch cannot leave the order stuck.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use super::OrderId;

/// Dispatch lifecycle of a single order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    Sending,
    Sent,
    Failed,
}

type GateMap = HashMap<OrderId, DispatchState>;

/// Registry of orders with a dispatch in progress.
#[derive(Debug, Clone, Default)]
pub struct DispatchGate {
    orders: Arc<Mutex<GateMap>>,
}

fn lock(orders: &Mutex<GateMap>) -> MutexGuard<'_, GateMap> {
    orders.lock().unwrap_or_else(PoisonError::into_inner)
}

impl DispatchGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move `order_id` from `Idle` to `Sending`.
    ///
    /// Returns `None` when a dispatch for the order is already under way.
    pub fn try_acquire(&self, order_id: &OrderId) -> Option<DispatchPermit> {
        let mut orders = lock(&self.orders);
        if orders.contains_key(order_id) {
            debug!(%order_id, "receipt dispatch already in flight");
            return None;
        }
        orders.insert(order_id.clone(), DispatchState::Sending);
        Some(DispatchPermit {
            orders: Arc::clone(&self.orders),
            order_id: order_id.clone(),
        })
    }

    /// Current state of `order_id`.
    pub fn state(&self, order_id: &OrderId) -> DispatchState {
        lock(&self.orders)
            .get(order_id)
            .copied()
            .unwrap_or(DispatchState::Idle)
    }
}

/// Exclusive right to dispatch one order's receipt.
#[derive(Debug)]
pub struct DispatchPermit {
    orders: Arc<Mutex<GateMap>>,
    order_id: OrderId,
}

impl DispatchPermit {
    pub fn order_id(&self) -> &OrderId {
        &self.order_id
    }

    /// Record how the dispatch ended and release the order.
    pub fn settle(self, succeeded: bool) -> DispatchState {
        let outcome = if succeeded {
            DispatchState::Sent
        } else {
            DispatchState::Failed
        };
        lock(&self.orders).insert(self.order_id.clone(), outcome);
        debug!(order_id = %self.order_id, state = ?outcome, "receipt dispatch settled");
        outcome
    }
}

impl Drop for DispatchPermit {
    fn drop(&mut self) {
        lock(&self.orders).remove(&self.order_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn order(raw: &str) -> OrderId {
        OrderId::new(raw).expect("valid order id")
    }

    #[test]
    fn second_acquire_for_same_order_is_refused() {
        let gate = DispatchGate::new();
        let first = gate.try_acquire(&order("ORDER_1"));

        assert!(first.is_some());
        assert!(gate.try_acquire(&order("ORDER_1")).is_none());
        assert_eq!(gate.state(&order("ORDER_1")), DispatchState::Sending);
    }

    #[test]
    fn different_orders_do_not_contend() {
        let gate = DispatchGate::new();
        let first = gate.try_acquire(&order("ORDER_1"));
        let second = gate.try_acquire(&order("ORDER_2"));

        assert!(first.is_some() && second.is_some());
    }

    #[rstest]
    #[case(true, DispatchState::Sent)]
    #[case(false, DispatchState::Failed)]
    fn settling_returns_order_to_idle(#[case] succeeded: bool, #[case] expected: DispatchState) {
        let gate = DispatchGate::new();
        let permit = gate.try_acquire(&order("ORDER_1")).expect("permit");

        assert_eq!(permit.settle(succeeded), expected);
        assert_eq!(gate.state(&order("ORDER_1")), DispatchState::Idle);
        assert!(gate.try_acquire(&order("ORDER_1")).is_some());
    }

    #[test]
    fn dropping_permit_releases_order() {
        let gate = DispatchGate::new();
        drop(gate.try_acquire(&order("ORDER_1")).expect("permit"));

        assert_eq!(gate.state(&order("ORDER_1")), DispatchState::Idle);
    }
}
