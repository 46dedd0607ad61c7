//! Order submission.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::OrderCoordinator;
use crate::application::dto::{OrderIntentDto, SubmitReceipt};
use crate::application::ports::{GatewayError, GatewayPort, PlaceOrderRequest};
use crate::application::retry::with_retry;
use crate::domain::instrument::InstrumentCode;
use crate::domain::market_data::{QuoteRead, QuoteSnapshot, check_deviation};
use crate::domain::order_execution::{
    AnomalyKind, NewOrder, Order, OrderPricing, OrderSide, OrderStatus,
};
use crate::domain::session::SessionState;
use crate::domain::trading_hours::session_at;
use crate::error::CoordinatorError;
use crate::observability::{record_order_anomaly, record_order_intent};

impl<G: GatewayPort + ?Sized> OrderCoordinator<G> {
    /// Validate an intent and forward it to the gateway.
    ///
    /// Returns once the gateway acknowledged, rejected, or could not confirm
    /// the order. Never waits for fills.
    pub async fn submit(&self, intent: OrderIntentDto) -> Result<SubmitReceipt, CoordinatorError> {
        self.submit_at(intent, Utc::now()).await
    }

    /// [`submit`](Self::submit) evaluated at `now`.
    pub async fn submit_at(
        &self,
        intent: OrderIntentDto,
        now: DateTime<Utc>,
    ) -> Result<SubmitReceipt, CoordinatorError> {
        let result = self.submit_inner(intent, now).await;
        match &result {
            Ok(receipt) if receipt.status == OrderStatus::Rejected => {
                record_order_intent("gateway_rejected");
            }
            Ok(_) => record_order_intent("accepted"),
            Err(err) => {
                record_order_intent(err.code().reason());
                tracing::info!(code = %err.code(), error = %err, "Order intent rejected");
            }
        }
        result
    }

    async fn submit_inner(
        &self,
        intent: OrderIntentDto,
        now: DateTime<Utc>,
    ) -> Result<SubmitReceipt, CoordinatorError> {
        let environment = self.guard.current();
        if !self.guard.admits(intent.environment) {
            tracing::warn!(
                declared = %intent.environment,
                current = %environment,
                instrument = %intent.instrument,
                "Environment mismatch, intent refused"
            );
            return Err(CoordinatorError::EnvironmentMismatch {
                declared: intent.environment,
                current: environment,
            });
        }

        let code = InstrumentCode::parse_with_default(&intent.instrument, self.settings.default_market)?;
        if !self.settings.enabled_markets.contains(&code.market()) {
            return Err(CoordinatorError::InvalidIntent {
                field: "instrument",
                message: format!("market {} is not enabled", code.market()),
            });
        }
        if intent.quantity <= Decimal::ZERO {
            return Err(CoordinatorError::InvalidIntent {
                field: "quantity",
                message: format!("must be positive, got {}", intent.quantity),
            });
        }
        let pricing = OrderPricing::from_limit(intent.price);
        if let Some(price) = pricing.limit_price()
            && price <= Decimal::ZERO
        {
            return Err(CoordinatorError::InvalidIntent {
                field: "price",
                message: format!("must be positive, got {price}"),
            });
        }

        let hours = session_at(code.market(), now);
        if !hours.session.admits(self.instruments.extended_hours(&code)) {
            return Err(CoordinatorError::MarketClosed {
                market: code.market(),
                session: hours.session,
                local_time: hours.local_time.format("%H:%M:%S").to_string(),
            });
        }

        match self.gateway.session_state() {
            SessionState::Connected => {}
            SessionState::Degraded => {
                return Err(CoordinatorError::TransientGateway(
                    "gateway session is degraded and reconnecting".to_string(),
                ));
            }
            SessionState::Disconnected => {
                return Err(CoordinatorError::GatewayUnavailable(
                    "gateway session is disconnected".to_string(),
                ));
            }
        }

        let gateway = self.gateway.as_ref();
        let instrument = with_retry(&self.settings.retry, "resolve_instrument", || {
            self.instruments.resolve(gateway, &code)
        })
        .await?;
        instrument.validate_quantity(intent.quantity)?;
        if let Some(price) = pricing.limit_price() {
            instrument.validate_price(price)?;
        }

        let quote = self.fresh_quote(&code, now).await?;
        let reference = quote.reference_price().ok_or_else(|| CoordinatorError::PriceSanity {
            code: code.to_string(),
            message: "quote carries no usable price".to_string(),
        })?;
        if let Some(price) = pricing.limit_price() {
            check_deviation(reference, price, self.settings.deviation_band_bps).map_err(|d| {
                CoordinatorError::PriceSanity {
                    code: code.to_string(),
                    message: format!(
                        "limit {} deviates {} bps from reference {} (band {} bps)",
                        d.price, d.deviation_bps, d.reference, d.band_bps
                    ),
                }
            })?;
        }

        let market = code.market();
        let account = with_retry(&self.settings.retry, "account_snapshot", move || {
            gateway.account_snapshot(environment, market)
        })
        .await?;
        match intent.side {
            OrderSide::Buy => {
                let notional = intent
                    .quantity
                    .checked_mul(pricing.limit_price().unwrap_or(reference))
                    .ok_or_else(|| CoordinatorError::InvalidIntent {
                        field: "quantity",
                        message: format!(
                            "notional of {} at {} is out of range",
                            intent.quantity,
                            pricing.limit_price().unwrap_or(reference)
                        ),
                    })?;
                if !account.can_afford(notional) {
                    return Err(CoordinatorError::InsufficientBuyingPower {
                        required: notional,
                        available: account.buying_power,
                    });
                }
            }
            OrderSide::Sell => {
                let sellable = account.sellable(&code);
                if sellable < intent.quantity {
                    return Err(CoordinatorError::InsufficientPosition {
                        code: code.to_string(),
                        requested: intent.quantity,
                        sellable,
                    });
                }
            }
        }

        let order = Order::new(
            NewOrder {
                code: code.clone(),
                side: intent.side,
                quantity: intent.quantity,
                pricing,
                environment,
            },
            now,
        )
        .map_err(|e| CoordinatorError::InvalidIntent {
            field: "order",
            message: e.to_string(),
        })?;
        let order_id = order.id().clone();
        let request = PlaceOrderRequest {
            client_order_id: order_id.clone(),
            code,
            side: intent.side,
            quantity: intent.quantity,
            pricing,
            environment,
            extended_hours: instrument.extended_hours(),
        };
        let handle = self.orders.insert(order);

        tracing::info!(
            order_id = %order_id,
            code = %request.code,
            side = %request.side,
            quantity = %request.quantity,
            environment = %environment,
            "Submitting order"
        );

        let outcome = with_retry(&self.settings.retry, "place_order", || {
            gateway.place_order(request.clone())
        })
        .await;

        let mut order = handle.lock().await;
        match outcome {
            Ok(ack) => {
                self.link_order(&mut order, &ack.gateway_order_id, now);
                tracing::info!(
                    order_id = %order_id,
                    gateway_order_id = %ack.gateway_order_id,
                    status = %order.status(),
                    "Order acknowledged"
                );
            }
            Err(failure) => match failure.last_error {
                GatewayError::Rejected(reason) => {
                    tracing::info!(order_id = %order_id, reason = %reason, "Gateway rejected order");
                    if let Err(e) = order.reject(reason, now) {
                        tracing::warn!(order_id = %order_id, error = %e, "Rejection not applied");
                    }
                }
                err if failure.possibly_delivered => {
                    let detail = format!(
                        "no acknowledgment after {} attempts: {err}",
                        failure.attempts
                    );
                    if order.status() == OrderStatus::PendingSubmit
                        && order.raise_anomaly(AnomalyKind::SubmitUnconfirmed, detail, now)
                    {
                        record_order_anomaly(AnomalyKind::SubmitUnconfirmed.as_str());
                        tracing::warn!(
                            order_id = %order_id,
                            attempts = failure.attempts,
                            error = %err,
                            "Submission unconfirmed, left for reconciliation"
                        );
                    }
                }
                err => {
                    if let Err(e) = order.reject(format!("not sent: {err}"), now) {
                        tracing::warn!(order_id = %order_id, error = %e, "Rejection not applied");
                    }
                    return Err(err.into());
                }
            },
        }

        let receipt = SubmitReceipt::from_order(&order);
        let deferred_cancel = order.cancel_requested() && !order.status().is_terminal();
        let gateway_order_id = order.gateway_order_id().cloned();
        let code = order.code().clone();
        drop(order);

        if deferred_cancel && let Some(gateway_order_id) = gateway_order_id {
            if let Err(e) = self.forward_cancel(&order_id, gateway_order_id, code).await {
                tracing::warn!(order_id = %order_id, error = %e, "Deferred cancel failed");
            }
        }
        Ok(receipt)
    }

    /// Return a fresh quote for `code`, fetching one when the cache is stale.
    async fn fresh_quote(
        &self,
        code: &InstrumentCode,
        now: DateTime<Utc>,
    ) -> Result<Arc<QuoteSnapshot>, CoordinatorError> {
        if let Some(QuoteRead::Fresh { snapshot, .. }) = self.market_data.get_at(code, now) {
            return Ok(snapshot);
        }
        let gateway = self.gateway.as_ref();
        let fetched = with_retry(&self.settings.retry, "quote", || gateway.quote(code.clone())).await?;
        self.on_quote(fetched);

        match self.market_data.get_at(code, now) {
            Some(QuoteRead::Fresh { snapshot, .. }) => Ok(snapshot),
            Some(QuoteRead::Stale { age, .. }) => Err(CoordinatorError::PriceSanity {
                code: code.to_string(),
                message: format!(
                    "quote is stale ({} ms old, threshold {} ms)",
                    age.as_millis(),
                    self.settings.staleness_threshold.as_millis()
                ),
            }),
            None => Err(CoordinatorError::PriceSanity {
                code: code.to_string(),
                message: "no quote available".to_string(),
            }),
        }
    }
}
