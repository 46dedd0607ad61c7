//! An intent for the wrong environment never reaches the gateway.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use async_trait::async_trait;
use mockall::mock;
use rust_decimal_macros::dec;

use order_coordinator::application::dto::OrderIntentDto;
use order_coordinator::application::ports::{
    CancelOrderRequest, GatewayError, GatewayOrderReport, GatewayPort, PlaceOrderAck,
    PlaceOrderRequest,
};
use order_coordinator::domain::account::AccountSnapshot;
use order_coordinator::domain::instrument::{Instrument, InstrumentCode, Market};
use order_coordinator::domain::market_data::{DepthSnapshot, MarketDataCache, QuoteSnapshot};
use order_coordinator::domain::order_execution::OrderSide;
use order_coordinator::domain::session::SessionState;
use order_coordinator::{
    CoordinatorError, CoordinatorSettings, EnvironmentGuard, OrderCoordinator, TradeEnvironment,
};

mock! {
    pub Gateway {}

    #[async_trait]
    impl GatewayPort for Gateway {
        fn session_state(&self) -> SessionState;
        async fn place_order(&self, request: PlaceOrderRequest) -> Result<PlaceOrderAck, GatewayError>;
        async fn cancel_order(&self, request: CancelOrderRequest) -> Result<(), GatewayError>;
        async fn open_orders(
            &self,
            environment: TradeEnvironment,
        ) -> Result<Vec<GatewayOrderReport>, GatewayError>;
        async fn account_snapshot(
            &self,
            environment: TradeEnvironment,
            market: Market,
        ) -> Result<AccountSnapshot, GatewayError>;
        async fn quote(&self, code: InstrumentCode) -> Result<QuoteSnapshot, GatewayError>;
        async fn order_book(
            &self,
            code: InstrumentCode,
            depth: usize,
        ) -> Result<DepthSnapshot, GatewayError>;
        async fn resolve_instrument(&self, code: InstrumentCode) -> Result<Instrument, GatewayError>;
    }
}

fn untouched_gateway() -> MockGateway {
    let mut gateway = MockGateway::new();
    gateway.expect_session_state().times(0);
    gateway.expect_place_order().times(0);
    gateway.expect_cancel_order().times(0);
    gateway.expect_open_orders().times(0);
    gateway.expect_account_snapshot().times(0);
    gateway.expect_quote().times(0);
    gateway.expect_order_book().times(0);
    gateway.expect_resolve_instrument().times(0);
    gateway
}

fn settings() -> CoordinatorSettings {
    CoordinatorSettings {
        default_market: Market::Hk,
        enabled_markets: vec![Market::Hk],
        staleness_threshold: std::time::Duration::from_secs(3),
        deviation_band_bps: 500,
        extended_hours: std::collections::HashSet::new(),
        grace_period: std::time::Duration::from_secs(30),
        missed_report_threshold: 3,
        terminal_retention: std::time::Duration::from_secs(3600),
        retry: order_coordinator::application::retry::RetryPolicy::no_retry(),
    }
}

#[tokio::test]
async fn real_intent_in_simulate_process_is_refused_before_any_gateway_call() {
    let settings = settings();
    let coordinator = OrderCoordinator::new(
        Arc::new(untouched_gateway()),
        EnvironmentGuard::new(TradeEnvironment::Simulate),
        Arc::new(MarketDataCache::new(settings.staleness_threshold)),
        settings,
    );
    let intent = OrderIntentDto {
        instrument: "HK.00700".to_string(),
        side: OrderSide::Buy,
        quantity: dec!(100),
        price: Some(dec!(320)),
        environment: TradeEnvironment::Real,
    };

    let err = coordinator.submit(intent).await.unwrap_err();

    assert_eq!(
        err,
        CoordinatorError::EnvironmentMismatch {
            declared: TradeEnvironment::Real,
            current: TradeEnvironment::Simulate,
        }
    );
    assert!(!err.is_retryable());
    assert!(coordinator.list_orders().await.is_empty());
}

#[tokio::test]
async fn simulate_intent_in_real_process_is_refused() {
    let settings = settings();
    let coordinator = OrderCoordinator::new(
        Arc::new(untouched_gateway()),
        EnvironmentGuard::new(TradeEnvironment::Real),
        Arc::new(MarketDataCache::new(settings.staleness_threshold)),
        settings,
    );
    let intent = OrderIntentDto {
        instrument: "00700".to_string(),
        side: OrderSide::Sell,
        quantity: dec!(100),
        price: None,
        environment: TradeEnvironment::Simulate,
    };

    let err = coordinator.submit(intent).await.unwrap_err();

    assert!(matches!(err, CoordinatorError::EnvironmentMismatch { .. }));
}
