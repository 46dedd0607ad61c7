//! Order cancellation.
//!
//! A cancel is only a request: the local state changes when the gateway
//! confirms with a `Cancelled` event. Fills recorded before the
//! confirmation stand, so a partially filled order ends `CANCELLED` with its
//! filled quantity intact.

use super::OrderCoordinator;
use crate::application::dto::OrderDto;
use crate::application::ports::{CancelOrderRequest, GatewayPort};
use crate::application::retry::with_retry;
use crate::domain::instrument::InstrumentCode;
use crate::domain::shared::{GatewayOrderId, OrderId};
use crate::error::CoordinatorError;

impl<G: GatewayPort + ?Sized> OrderCoordinator<G> {
    /// Request cancellation of a live order.
    ///
    /// An order the gateway has not acknowledged yet records the request and
    /// forwards it once linked.
    pub async fn cancel(&self, order_id: &OrderId) -> Result<OrderDto, CoordinatorError> {
        let handle = self
            .orders
            .get(order_id)
            .ok_or_else(|| CoordinatorError::OrderNotFound(order_id.clone()))?;

        let mut order = handle.lock().await;
        if !order.status().is_cancelable() {
            return Err(CoordinatorError::InvalidState {
                order_id: order_id.clone(),
                status: order.status(),
                operation: "cancel",
            });
        }
        let current = self.guard.current();
        if order.environment() != current {
            return Err(CoordinatorError::EnvironmentMismatch {
                declared: order.environment(),
                current,
            });
        }

        order.request_cancel();
        let Some(gateway_order_id) = order.gateway_order_id().cloned() else {
            tracing::info!(order_id = %order_id, "Cancel deferred until the gateway acknowledges");
            return Ok(OrderDto::from_order(&order));
        };
        let code = order.code().clone();
        drop(order);

        self.forward_cancel(order_id, gateway_order_id, code).await?;

        let order = handle.lock().await;
        Ok(OrderDto::from_order(&order))
    }

    /// Send a cancel request to the gateway.
    pub(super) async fn forward_cancel(
        &self,
        order_id: &OrderId,
        gateway_order_id: GatewayOrderId,
        code: InstrumentCode,
    ) -> Result<(), CoordinatorError> {
        let request = CancelOrderRequest {
            gateway_order_id,
            code,
            environment: self.guard.current(),
        };
        tracing::info!(
            order_id = %order_id,
            gateway_order_id = %request.gateway_order_id,
            "Forwarding cancel request"
        );
        let gateway = self.gateway.as_ref();
        let result = with_retry(&self.settings.retry, "cancel_order", || {
            gateway.cancel_order(request.clone())
        })
        .await;

        match result {
            Ok(()) => Ok(()),
            Err(failure) => {
                if !failure.possibly_delivered
                    && let Some(handle) = self.orders.get(order_id)
                {
                    handle.lock().await.withdraw_cancel_request();
                }
                tracing::warn!(
                    order_id = %order_id,
                    attempts = failure.attempts,
                    error = %failure.last_error,
                    "Cancel request failed"
                );
                Err(failure.into())
            }
        }
    }
}
