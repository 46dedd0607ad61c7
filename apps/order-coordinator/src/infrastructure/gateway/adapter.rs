//! Futu gateway adapter implementing `GatewayPort`.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::codec::Command;
use super::connection_manager::ConnectionManager;
use crate::application::ports::{
    CancelOrderRequest, GatewayError, GatewayOrderReport, GatewayPort, PlaceOrderAck,
    PlaceOrderRequest,
};
use crate::domain::account::AccountSnapshot;
use crate::domain::environment::TradeEnvironment;
use crate::domain::instrument::{Instrument, InstrumentCode, Market};
use crate::domain::market_data::{DepthSnapshot, QuoteSnapshot};
use crate::domain::session::SessionState;

/// `stock_info` reply.
#[derive(Debug, Deserialize)]
struct StockInfoPayload {
    code: InstrumentCode,
    name: String,
    lot_size: Decimal,
    tick_size: Decimal,
}

/// `order_list` reply.
#[derive(Debug, Deserialize)]
struct OrderListPayload {
    orders: Vec<GatewayOrderReport>,
}

/// Gateway adapter over a supervised [`ConnectionManager`].
#[derive(Clone)]
pub struct FutuGateway {
    manager: Arc<ConnectionManager>,
}

impl FutuGateway {
    /// Wrap a connection manager.
    #[must_use]
    pub const fn new(manager: Arc<ConnectionManager>) -> Self {
        Self { manager }
    }

    /// The underlying connection manager.
    #[must_use]
    pub const fn manager(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }

    async fn request<T: DeserializeOwned>(&self, command: Command) -> Result<T, GatewayError> {
        let name = command.name();
        let payload = self.manager.send(command).await?;
        decode(name, payload)
    }
}

fn decode<T: DeserializeOwned>(command: &'static str, payload: Value) -> Result<T, GatewayError> {
    serde_json::from_value(payload)
        .map_err(|e| GatewayError::Protocol(format!("{command} reply: {e}")))
}

#[async_trait]
impl GatewayPort for FutuGateway {
    fn session_state(&self) -> SessionState {
        self.manager.state()
    }

    async fn place_order(
        &self,
        request: PlaceOrderRequest,
    ) -> Result<PlaceOrderAck, GatewayError> {
        if request.environment.is_real() {
            tracing::warn!(
                client_order_id = %request.client_order_id,
                code = %request.code,
                "Placing REAL order"
            );
        }
        let client_order_id = request.client_order_id.clone();
        let ack: PlaceOrderAck = self.request(Command::PlaceOrder(request)).await?;
        if ack.client_order_id != client_order_id {
            return Err(GatewayError::Protocol(format!(
                "place_order ack for {} answered {}",
                client_order_id, ack.client_order_id
            )));
        }
        tracing::info!(
            client_order_id = %ack.client_order_id,
            gateway_order_id = %ack.gateway_order_id,
            "Order placed"
        );
        Ok(ack)
    }

    async fn cancel_order(&self, request: CancelOrderRequest) -> Result<(), GatewayError> {
        let gateway_order_id = request.gateway_order_id.clone();
        self.manager.send(Command::CancelOrder(request)).await?;
        tracing::info!(gateway_order_id = %gateway_order_id, "Cancel forwarded");
        Ok(())
    }

    async fn open_orders(
        &self,
        environment: TradeEnvironment,
    ) -> Result<Vec<GatewayOrderReport>, GatewayError> {
        let payload: OrderListPayload = self.request(Command::OrderList { environment }).await?;
        Ok(payload.orders)
    }

    async fn account_snapshot(
        &self,
        environment: TradeEnvironment,
        market: Market,
    ) -> Result<AccountSnapshot, GatewayError> {
        let snapshot: AccountSnapshot = self
            .request(Command::AccountInfo {
                environment,
                market,
            })
            .await?;
        if snapshot.environment != environment {
            return Err(GatewayError::Protocol(format!(
                "account_info for {environment} answered {}",
                snapshot.environment
            )));
        }
        Ok(snapshot)
    }

    async fn quote(&self, code: InstrumentCode) -> Result<QuoteSnapshot, GatewayError> {
        self.request(Command::Quote { code }).await
    }

    async fn order_book(
        &self,
        code: InstrumentCode,
        depth: usize,
    ) -> Result<DepthSnapshot, GatewayError> {
        let book: DepthSnapshot = self
            .request(Command::OrderBook {
                code: code.clone(),
                depth,
            })
            .await?;
        if book.code != code {
            return Err(GatewayError::Protocol(format!(
                "order_book for {code} answered {}",
                book.code
            )));
        }
        Ok(book.truncated(depth))
    }

    async fn resolve_instrument(&self, code: InstrumentCode) -> Result<Instrument, GatewayError> {
        let info: StockInfoPayload = self.request(Command::StockInfo { code: code.clone() }).await?;
        if info.code != code {
            return Err(GatewayError::Protocol(format!(
                "stock_info for {code} answered {}",
                info.code
            )));
        }
        Instrument::new(info.code, info.name, info.lot_size, info.tick_size)
            .map_err(|e| GatewayError::Protocol(e.to_string()))
    }
}
