//! Shared fixtures: a scripted in-memory gateway and coordinator builders.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use order_coordinator::application::ports::{
    CancelOrderRequest, GatewayError, GatewayOrderReport, GatewayPort, PlaceOrderAck,
    PlaceOrderRequest,
};
use order_coordinator::application::retry::RetryPolicy;
use order_coordinator::application::{CoordinatorSettings, OrderCoordinator};
use order_coordinator::domain::account::{AccountSnapshot, Position};
use order_coordinator::domain::environment::{EnvironmentGuard, TradeEnvironment};
use order_coordinator::domain::instrument::{Instrument, InstrumentCode, Market};
use order_coordinator::domain::market_data::{
    DepthLevel, DepthSnapshot, MarketDataCache, QuoteSnapshot,
};
use order_coordinator::domain::order_execution::{GatewayOrderEvent, OrderEventKind, OrderSide};
use order_coordinator::domain::session::SessionState;
use order_coordinator::domain::shared::GatewayOrderId;
use order_coordinator::application::dto::OrderIntentDto;

/// Monday 2024-03-04 10:00 Hong Kong time.
pub fn hk_morning() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 4, 2, 0, 0).unwrap()
}

pub fn hk_code() -> InstrumentCode {
    "HK.00700".parse().unwrap()
}

/// Gateway double with scripted replies. Every call is recorded by name.
pub struct FakeGateway {
    state: Mutex<SessionState>,
    quotes: Mutex<HashMap<InstrumentCode, QuoteSnapshot>>,
    buying_power: Mutex<Decimal>,
    positions: Mutex<HashMap<InstrumentCode, Position>>,
    place_failures: Mutex<VecDeque<GatewayError>>,
    open_orders: Mutex<Vec<GatewayOrderReport>>,
    placed: Mutex<Vec<PlaceOrderRequest>>,
    cancels: Mutex<Vec<CancelOrderRequest>>,
    calls: Mutex<Vec<&'static str>>,
    next_id: AtomicU64,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SessionState::Connected),
            quotes: Mutex::new(HashMap::new()),
            buying_power: Mutex::new(dec!(1_000_000)),
            positions: Mutex::new(HashMap::new()),
            place_failures: Mutex::new(VecDeque::new()),
            open_orders: Mutex::new(Vec::new()),
            placed: Mutex::new(Vec::new()),
            cancels: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn set_state(&self, state: SessionState) {
        *self.state.lock() = state;
    }

    pub fn set_quote(&self, code: &InstrumentCode, last: Decimal, timestamp: DateTime<Utc>) {
        self.quotes.lock().insert(
            code.clone(),
            QuoteSnapshot {
                code: code.clone(),
                bid: last - dec!(0.2),
                ask: last + dec!(0.2),
                last,
                timestamp,
                sequence: 1,
            },
        );
    }

    pub fn set_buying_power(&self, amount: Decimal) {
        *self.buying_power.lock() = amount;
    }

    pub fn set_position(&self, code: &InstrumentCode, sellable: Decimal) {
        self.positions.lock().insert(
            code.clone(),
            Position {
                quantity: sellable,
                sellable_quantity: sellable,
                cost_price: dec!(300),
            },
        );
    }

    /// The next `place_order` call fails with `err`.
    pub fn fail_next_place(&self, err: GatewayError) {
        self.place_failures.lock().push_back(err);
    }

    pub fn set_open_orders(&self, reports: Vec<GatewayOrderReport>) {
        *self.open_orders.lock() = reports;
    }

    pub fn placed(&self) -> Vec<PlaceOrderRequest> {
        self.placed.lock().clone()
    }

    pub fn cancels(&self) -> Vec<CancelOrderRequest> {
        self.cancels.lock().clone()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().clone()
    }

    fn record(&self, name: &'static str) {
        self.calls.lock().push(name);
    }
}

#[async_trait]
impl GatewayPort for FakeGateway {
    fn session_state(&self) -> SessionState {
        *self.state.lock()
    }

    async fn place_order(&self, request: PlaceOrderRequest) -> Result<PlaceOrderAck, GatewayError> {
        self.record("place_order");
        self.placed.lock().push(request.clone());
        if let Some(err) = self.place_failures.lock().pop_front() {
            return Err(err);
        }
        let n = self.next_id.fetch_add(1, Ordering::Relaxed);
        Ok(PlaceOrderAck {
            gateway_order_id: GatewayOrderId::new(format!("GW-{n}")),
            client_order_id: request.client_order_id,
        })
    }

    async fn cancel_order(&self, request: CancelOrderRequest) -> Result<(), GatewayError> {
        self.record("cancel_order");
        self.cancels.lock().push(request);
        Ok(())
    }

    async fn open_orders(
        &self,
        _environment: TradeEnvironment,
    ) -> Result<Vec<GatewayOrderReport>, GatewayError> {
        self.record("open_orders");
        Ok(self.open_orders.lock().clone())
    }

    async fn account_snapshot(
        &self,
        environment: TradeEnvironment,
        market: Market,
    ) -> Result<AccountSnapshot, GatewayError> {
        self.record("account_snapshot");
        let buying_power = *self.buying_power.lock();
        Ok(AccountSnapshot {
            environment,
            market,
            total_assets: buying_power,
            cash: buying_power,
            market_value: Decimal::ZERO,
            frozen_cash: Decimal::ZERO,
            buying_power,
            positions: self.positions.lock().clone(),
            fetched_at: Utc::now(),
        })
    }

    async fn quote(&self, code: InstrumentCode) -> Result<QuoteSnapshot, GatewayError> {
        self.record("quote");
        self.quotes
            .lock()
            .get(&code)
            .cloned()
            .ok_or_else(|| GatewayError::UnknownInstrument(code.to_string()))
    }

    /// Ladder of `depth` levels 0.2 apart around the scripted quote.
    async fn order_book(
        &self,
        code: InstrumentCode,
        depth: usize,
    ) -> Result<DepthSnapshot, GatewayError> {
        self.record("order_book");
        let quote = self
            .quotes
            .lock()
            .get(&code)
            .cloned()
            .ok_or_else(|| GatewayError::UnknownInstrument(code.to_string()))?;
        let ladder = |start: Decimal, step: Decimal| {
            (0..depth)
                .map(|i| DepthLevel {
                    price: start + step * Decimal::from(i),
                    volume: dec!(1000),
                    order_count: 1,
                })
                .collect::<Vec<_>>()
        };
        Ok(DepthSnapshot {
            code,
            bids: ladder(quote.bid, dec!(-0.2)),
            asks: ladder(quote.ask, dec!(0.2)),
            timestamp: quote.timestamp,
        })
    }

    async fn resolve_instrument(&self, code: InstrumentCode) -> Result<Instrument, GatewayError> {
        self.record("resolve_instrument");
        let lot = match code.market() {
            Market::Hk => dec!(100),
            Market::Us => dec!(1),
        };
        Instrument::new(code, "TEST", lot, dec!(0.01))
            .map_err(|e| GatewayError::Protocol(e.to_string()))
    }
}

pub fn settings() -> CoordinatorSettings {
    CoordinatorSettings {
        default_market: Market::Hk,
        enabled_markets: vec![Market::Hk, Market::Us],
        staleness_threshold: Duration::from_secs(3),
        deviation_band_bps: 500,
        extended_hours: HashSet::new(),
        grace_period: Duration::from_secs(30),
        missed_report_threshold: 3,
        terminal_retention: Duration::from_secs(3600),
        retry: RetryPolicy::no_retry(),
    }
}

pub fn coordinator_with(
    gateway: Arc<FakeGateway>,
    settings: CoordinatorSettings,
) -> OrderCoordinator<FakeGateway> {
    let market_data = Arc::new(MarketDataCache::new(settings.staleness_threshold));
    OrderCoordinator::new(
        gateway,
        EnvironmentGuard::new(TradeEnvironment::Simulate),
        market_data,
        settings,
    )
}

/// Coordinator over a connected fake with a fresh HK.00700 quote at 320.
pub fn coordinator() -> (OrderCoordinator<FakeGateway>, Arc<FakeGateway>) {
    let gateway = Arc::new(FakeGateway::new());
    gateway.set_quote(&hk_code(), dec!(320), hk_morning() - chrono::Duration::seconds(1));
    (coordinator_with(Arc::clone(&gateway), settings()), gateway)
}

pub fn buy(quantity: Decimal, price: Decimal) -> OrderIntentDto {
    OrderIntentDto {
        instrument: "HK.00700".to_string(),
        side: OrderSide::Buy,
        quantity,
        price: Some(price),
        environment: TradeEnvironment::Simulate,
    }
}

pub fn sell(quantity: Decimal, price: Decimal) -> OrderIntentDto {
    OrderIntentDto {
        side: OrderSide::Sell,
        ..buy(quantity, price)
    }
}

pub fn event(sequence: u64, gateway_order_id: &str, kind: OrderEventKind) -> GatewayOrderEvent {
    GatewayOrderEvent {
        sequence,
        gateway_order_id: GatewayOrderId::new(gateway_order_id),
        client_order_id: None,
        kind,
        timestamp: hk_morning() + chrono::Duration::seconds(sequence as i64),
    }
}

pub fn fill(sequence: u64, gateway_order_id: &str, cumulative: Decimal) -> GatewayOrderEvent {
    event(
        sequence,
        gateway_order_id,
        OrderEventKind::Fill {
            cumulative_quantity: cumulative,
            average_price: Some(dec!(320)),
        },
    )
}
