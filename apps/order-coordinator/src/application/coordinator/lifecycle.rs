//! Queries, manual resolution, session-close expiry and shutdown.

use chrono::{DateTime, Utc};

use super::OrderCoordinator;
use crate::application::dto::{MarketStatusDto, OrderDto};
use crate::application::ports::GatewayPort;
use crate::application::retry::with_retry;
use crate::domain::account::AccountSnapshot;
use crate::domain::instrument::{InstrumentCode, Market};
use crate::domain::market_data::{DepthSnapshot, QuoteRead};
use crate::domain::order_execution::AnomalyKind;
use crate::domain::shared::OrderId;
use crate::domain::trading_hours::{is_after_day_end, session_at};
use crate::error::CoordinatorError;

/// Book levels per side when the caller names none.
pub const DEFAULT_BOOK_DEPTH: usize = 10;

/// Most book levels per side a caller may request.
pub const MAX_BOOK_DEPTH: usize = 40;

impl<G: GatewayPort + ?Sized> OrderCoordinator<G> {
    /// Current state of one order.
    pub async fn get_order(&self, order_id: &OrderId) -> Result<OrderDto, CoordinatorError> {
        let handle = self
            .orders
            .get(order_id)
            .ok_or_else(|| CoordinatorError::OrderNotFound(order_id.clone()))?;
        let order = handle.lock().await;
        Ok(OrderDto::from_order(&order))
    }

    /// All tracked orders, newest first.
    pub async fn list_orders(&self) -> Vec<OrderDto> {
        let mut orders = Vec::with_capacity(self.orders.len());
        for handle in self.orders.handles() {
            orders.push(OrderDto::from_order(&*handle.lock().await));
        }
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders
    }

    /// Latest cached quote for `instrument`, fetching one if none is cached.
    ///
    /// A stale quote is returned with its `Stale` marker.
    pub async fn get_quote(&self, instrument: &str) -> Result<QuoteRead, CoordinatorError> {
        let code = InstrumentCode::parse_with_default(instrument, self.settings.default_market)?;
        if let Some(read) = self.market_data.get(&code) {
            return Ok(read);
        }
        let gateway = self.gateway.as_ref();
        let snapshot =
            with_retry(&self.settings.retry, "quote", || gateway.quote(code.clone())).await?;
        self.on_quote(snapshot);
        self.market_data
            .get(&code)
            .ok_or_else(|| CoordinatorError::PriceSanity {
                code: code.to_string(),
                message: "no quote available".to_string(),
            })
    }

    /// Bid and ask levels for `instrument`, always fetched from the gateway.
    pub async fn get_order_book(
        &self,
        instrument: &str,
        depth: Option<usize>,
    ) -> Result<DepthSnapshot, CoordinatorError> {
        let code = InstrumentCode::parse_with_default(instrument, self.settings.default_market)?;
        let depth = depth.unwrap_or(DEFAULT_BOOK_DEPTH);
        if depth == 0 || depth > MAX_BOOK_DEPTH {
            return Err(CoordinatorError::InvalidIntent {
                field: "depth",
                message: format!("must be between 1 and {MAX_BOOK_DEPTH}, got {depth}"),
            });
        }
        let gateway = self.gateway.as_ref();
        let book = with_retry(&self.settings.retry, "order_book", || {
            gateway.order_book(code.clone(), depth)
        })
        .await?;
        if !book.is_ordered() {
            tracing::warn!(
                code = %code,
                best_bid = ?book.best_bid(),
                best_ask = ?book.best_ask(),
                "Order book is crossed or unsorted"
            );
        }
        Ok(book.truncated(depth))
    }

    /// Session and exchange-local clock of `market` now.
    #[must_use]
    pub fn get_market_status(&self, market: Market) -> MarketStatusDto {
        self.get_market_status_at(market, Utc::now())
    }

    /// Session and exchange-local clock of `market` at `now`.
    #[must_use]
    pub fn get_market_status_at(&self, market: Market, now: DateTime<Utc>) -> MarketStatusDto {
        let status = session_at(market, now);
        if !self.settings.enabled_markets.contains(&market) {
            tracing::debug!(market = %market, "Status requested for a market not enabled");
        }
        MarketStatusDto::from_status(&status, now)
    }

    /// Fresh account snapshot for `market`, or the default market.
    pub async fn get_account_snapshot(
        &self,
        market: Option<Market>,
    ) -> Result<AccountSnapshot, CoordinatorError> {
        let environment = self.guard.current();
        let market = market.unwrap_or(self.settings.default_market);
        let gateway = self.gateway.as_ref();
        let snapshot = with_retry(&self.settings.retry, "account_snapshot", move || {
            gateway.account_snapshot(environment, market)
        })
        .await?;
        Ok(snapshot)
    }

    /// Clear every anomaly flag on an order.
    pub async fn resolve_anomaly(&self, order_id: &OrderId) -> Result<OrderDto, CoordinatorError> {
        let handle = self
            .orders
            .get(order_id)
            .ok_or_else(|| CoordinatorError::OrderNotFound(order_id.clone()))?;
        let mut order = handle.lock().await;
        let cleared = order.clear_anomalies();
        tracing::info!(
            order_id = %order_id,
            cleared = ?cleared.iter().map(AnomalyKind::as_str).collect::<Vec<_>>(),
            "Anomalies resolved"
        );
        Ok(OrderDto::from_order(&order))
    }

    /// Expire live day orders of `market` once its trading day has ended.
    ///
    /// Orders created on an earlier exchange-local date are expired too.
    /// Returns the expired order ids.
    pub async fn expire_day_orders(&self, market: Market, now: DateTime<Utc>) -> Vec<OrderId> {
        let tz = market.timezone();
        let today = now.with_timezone(&tz).date_naive();
        let day_over = is_after_day_end(market, now);
        let mut expired = Vec::new();

        for handle in self.orders.handles() {
            let mut order = handle.lock().await;
            if order.code().market() != market || order.status().is_terminal() {
                continue;
            }
            let created_earlier = order.created_at().with_timezone(&tz).date_naive() < today;
            if !day_over && !created_earlier {
                continue;
            }
            match order.expire(now) {
                Ok(()) => {
                    tracing::info!(
                        order_id = %order.id(),
                        market = %market,
                        filled = %order.filled_quantity(),
                        "Day order expired at session close"
                    );
                    expired.push(order.id().clone());
                }
                Err(e) => tracing::warn!(order_id = %order.id(), error = %e, "Expiry not applied"),
            }
        }
        expired
    }

    /// Log every live order so the next start can recover it from the
    /// gateway. Returns the live orders.
    pub async fn shutdown(&self) -> Vec<OrderDto> {
        let open: Vec<OrderDto> = self
            .list_orders()
            .await
            .into_iter()
            .filter(|o| !o.status.is_terminal())
            .collect();
        for order in &open {
            tracing::warn!(
                order_id = %order.order_id,
                gateway_order_id = order.gateway_order_id.as_deref().unwrap_or("-"),
                instrument = %order.instrument,
                status = %order.status,
                filled = %order.filled_quantity,
                quantity = %order.quantity,
                "Open order left with the gateway at shutdown"
            );
        }
        tracing::info!(open_orders = open.len(), "Coordinator shut down");
        open
    }
}
