//! HTTP Controller (Driver Adapter)
//!
//! Axum-based REST API that delegates to the order coordinator.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use crate::application::coordinator::OrderCoordinator;
use crate::application::dto::{MarketStatusDto, OrderDto, SubmitReceipt};
use crate::application::ports::GatewayPort;
use crate::domain::account::AccountSnapshot;
use crate::domain::instrument::{InstrumentError, Market};
use crate::domain::market_data::DepthSnapshot;
use crate::domain::session::SessionState;
use crate::domain::shared::OrderId;

use super::request::{AccountQuery, BookQuery, SubmitOrderRequest};
use super::response::{ApiError, HealthResponse, OrderListResponse, QuoteResponse};

/// Application state shared across handlers.
pub struct AppState<G: GatewayPort + ?Sized> {
    /// The order coordinator.
    pub coordinator: Arc<OrderCoordinator<G>>,
    /// Application version.
    pub version: String,
}

impl<G: GatewayPort + ?Sized> Clone for AppState<G> {
    fn clone(&self) -> Self {
        Self {
            coordinator: Arc::clone(&self.coordinator),
            version: self.version.clone(),
        }
    }
}

/// Create the HTTP router with all endpoints.
pub fn create_router<G: GatewayPort + ?Sized + 'static>(state: AppState<G>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/orders", post(submit_order).get(list_orders))
        .route("/api/v1/orders/{id}", get(get_order))
        .route("/api/v1/orders/{id}/cancel", post(cancel_order))
        .route("/api/v1/orders/{id}/resolve", post(resolve_anomaly))
        .route("/api/v1/quotes/{instrument}", get(get_quote))
        .route("/api/v1/quotes/{instrument}/book", get(get_order_book))
        .route("/api/v1/markets/{market}/status", get(get_market_status))
        .route("/api/v1/account", get(get_account))
        .with_state(state)
}

/// Health check endpoint.
async fn health_check<G: GatewayPort + ?Sized>(
    State(state): State<AppState<G>>,
) -> impl IntoResponse {
    let session = state.coordinator.gateway().session_state();
    let status = if session == SessionState::Connected {
        "healthy"
    } else {
        "degraded"
    };
    Json(HealthResponse {
        status: status.to_string(),
        version: state.version.clone(),
        environment: state.coordinator.guard().current(),
        session,
    })
}

/// Submit an order intent.
async fn submit_order<G: GatewayPort + ?Sized>(
    State(state): State<AppState<G>>,
    payload: Result<Json<SubmitOrderRequest>, JsonRejection>,
) -> Result<Json<SubmitReceipt>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::invalid_intent(e.body_text()))?;
    let receipt = state.coordinator.submit(request.into()).await?;
    Ok(Json(receipt))
}

/// All tracked orders.
async fn list_orders<G: GatewayPort + ?Sized>(
    State(state): State<AppState<G>>,
) -> Json<OrderListResponse> {
    Json(OrderListResponse {
        orders: state.coordinator.list_orders().await,
    })
}

/// Order status, fills and anomaly flags.
async fn get_order<G: GatewayPort + ?Sized>(
    State(state): State<AppState<G>>,
    Path(id): Path<String>,
) -> Result<Json<OrderDto>, ApiError> {
    let order = state.coordinator.get_order(&OrderId::new(id)).await?;
    Ok(Json(order))
}

/// Request cancellation.
async fn cancel_order<G: GatewayPort + ?Sized>(
    State(state): State<AppState<G>>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<OrderDto>), ApiError> {
    let order = state.coordinator.cancel(&OrderId::new(id)).await?;
    Ok((StatusCode::ACCEPTED, Json(order)))
}

/// Clear anomaly flags after operator review.
async fn resolve_anomaly<G: GatewayPort + ?Sized>(
    State(state): State<AppState<G>>,
    Path(id): Path<String>,
) -> Result<Json<OrderDto>, ApiError> {
    let order = state.coordinator.resolve_anomaly(&OrderId::new(id)).await?;
    Ok(Json(order))
}

/// Latest quote.
async fn get_quote<G: GatewayPort + ?Sized>(
    State(state): State<AppState<G>>,
    Path(instrument): Path<String>,
) -> Result<Json<QuoteResponse>, ApiError> {
    let read = state.coordinator.get_quote(&instrument).await?;
    Ok(Json(QuoteResponse::from(&read)))
}

/// Bid and ask levels.
async fn get_order_book<G: GatewayPort + ?Sized>(
    State(state): State<AppState<G>>,
    Path(instrument): Path<String>,
    Query(query): Query<BookQuery>,
) -> Result<Json<DepthSnapshot>, ApiError> {
    let book = state
        .coordinator
        .get_order_book(&instrument, query.depth)
        .await?;
    Ok(Json(book))
}

/// Session, trading flag and local clock of a market.
async fn get_market_status<G: GatewayPort + ?Sized>(
    State(state): State<AppState<G>>,
    Path(market): Path<String>,
) -> Result<Json<MarketStatusDto>, ApiError> {
    let market: Market = market
        .parse()
        .map_err(|e: InstrumentError| ApiError::invalid_intent(e.to_string()))?;
    Ok(Json(state.coordinator.get_market_status(market)))
}

/// Fresh account snapshot.
async fn get_account<G: GatewayPort + ?Sized>(
    State(state): State<AppState<G>>,
    Query(query): Query<AccountQuery>,
) -> Result<Json<AccountSnapshot>, ApiError> {
    let snapshot = state.coordinator.get_account_snapshot(query.market).await?;
    Ok(Json(snapshot))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use tower::ServiceExt;

    use crate::application::coordinator::CoordinatorSettings;
    use crate::application::ports::{
        CancelOrderRequest, GatewayError, GatewayOrderReport, PlaceOrderAck, PlaceOrderRequest,
    };
    use crate::application::retry::RetryPolicy;
    use crate::domain::environment::{EnvironmentGuard, TradeEnvironment};
    use crate::domain::instrument::{Instrument, InstrumentCode};
    use crate::domain::market_data::{DepthLevel, MarketDataCache, QuoteSnapshot};
    use crate::error::ErrorCode;
    use crate::infrastructure::http::ErrorResponse;

    struct StubGateway;

    #[async_trait]
    impl GatewayPort for StubGateway {
        fn session_state(&self) -> SessionState {
            SessionState::Connected
        }

        async fn place_order(
            &self,
            _request: PlaceOrderRequest,
        ) -> Result<PlaceOrderAck, GatewayError> {
            Err(GatewayError::Rejected("stub".to_string()))
        }

        async fn cancel_order(&self, _request: CancelOrderRequest) -> Result<(), GatewayError> {
            Ok(())
        }

        async fn open_orders(
            &self,
            _environment: TradeEnvironment,
        ) -> Result<Vec<GatewayOrderReport>, GatewayError> {
            Ok(vec![])
        }

        async fn account_snapshot(
            &self,
            environment: TradeEnvironment,
            market: Market,
        ) -> Result<AccountSnapshot, GatewayError> {
            Ok(AccountSnapshot {
                environment,
                market,
                total_assets: dec!(100000),
                cash: dec!(100000),
                market_value: dec!(0),
                frozen_cash: dec!(0),
                buying_power: dec!(100000),
                positions: HashMap::new(),
                fetched_at: Utc::now(),
            })
        }

        async fn quote(&self, code: InstrumentCode) -> Result<QuoteSnapshot, GatewayError> {
            Ok(QuoteSnapshot {
                code,
                bid: dec!(319.8),
                ask: dec!(320.2),
                last: dec!(320),
                timestamp: Utc::now(),
                sequence: 7,
            })
        }

        async fn order_book(
            &self,
            code: InstrumentCode,
            _depth: usize,
        ) -> Result<DepthSnapshot, GatewayError> {
            let level = |price, volume| DepthLevel {
                price,
                volume,
                order_count: 2,
            };
            Ok(DepthSnapshot {
                code,
                bids: vec![level(dec!(319.8), dec!(1200)), level(dec!(319.6), dec!(800))],
                asks: vec![level(dec!(320.2), dec!(500)), level(dec!(320.4), dec!(900))],
                timestamp: Utc::now(),
            })
        }

        async fn resolve_instrument(
            &self,
            code: InstrumentCode,
        ) -> Result<Instrument, GatewayError> {
            Instrument::new(code, "TENCENT", dec!(100), dec!(0.2))
                .map_err(|e| GatewayError::Protocol(e.to_string()))
        }
    }

    fn create_test_state() -> AppState<StubGateway> {
        let settings = CoordinatorSettings {
            default_market: Market::Hk,
            enabled_markets: vec![Market::Hk, Market::Us],
            staleness_threshold: Duration::from_secs(5),
            deviation_band_bps: 500,
            extended_hours: HashSet::new(),
            grace_period: Duration::from_secs(30),
            missed_report_threshold: 3,
            terminal_retention: Duration::from_secs(3600),
            retry: RetryPolicy::no_retry(),
        };
        let coordinator = OrderCoordinator::new(
            Arc::new(StubGateway),
            EnvironmentGuard::new(TradeEnvironment::Simulate),
            Arc::new(MarketDataCache::new(settings.staleness_threshold)),
            settings,
        );
        AppState {
            coordinator: Arc::new(coordinator),
            version: "0.1.0-test".to_string(),
        }
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_check_reports_session() {
        let app = create_router(create_test_state());
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let health: HealthResponse = body_json(response).await;
        assert_eq!(health.status, "healthy");
        assert_eq!(health.environment, TradeEnvironment::Simulate);
    }

    #[tokio::test]
    async fn environment_mismatch_is_forbidden_and_not_retryable() {
        let app = create_router(create_test_state());
        let body = serde_json::json!({
            "instrument": "HK.00700",
            "side": "BUY",
            "quantity": "100",
            "price": "320",
            "environment": "REAL"
        });
        let response = app.oneshot(post_json("/api/v1/orders", &body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let error: ErrorResponse = body_json(response).await;
        assert_eq!(error.code, ErrorCode::EnvironmentMismatch);
        assert!(!error.retryable);
    }

    #[tokio::test]
    async fn malformed_intent_is_bad_request() {
        let app = create_router(create_test_state());
        let body = serde_json::json!({ "instrument": "HK.00700", "side": "HOLD" });
        let response = app.oneshot(post_json("/api/v1/orders", &body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ErrorResponse = body_json(response).await;
        assert_eq!(error.code, ErrorCode::InvalidIntent);
    }

    #[tokio::test]
    async fn unknown_order_is_not_found() {
        let app = create_router(create_test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/orders/oc-missing")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let error: ErrorResponse = body_json(response).await;
        assert_eq!(error.code, ErrorCode::OrderNotFound);
    }

    #[tokio::test]
    async fn quote_is_fetched_when_not_cached() {
        let app = create_router(create_test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/quotes/HK.00700")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let quote: QuoteResponse = body_json(response).await;
        assert_eq!(quote.code, "HK.00700");
        assert_eq!(quote.sequence, 7);
        assert!(!quote.stale);
    }

    #[tokio::test]
    async fn list_starts_empty() {
        let app = create_router(create_test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/orders")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let list: OrderListResponse = body_json(response).await;
        assert!(list.orders.is_empty());
    }

    #[tokio::test]
    async fn market_status_accepts_lowercase_market() {
        let app = create_router(create_test_state());
        let response = app
            .oneshot(get_request("/api/v1/markets/hk/status"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let status: MarketStatusDto = body_json(response).await;
        assert_eq!(status.market, Market::Hk);
        assert_eq!(status.timezone, "Asia/Hong_Kong");
        assert_eq!(status.is_trading, status.session.is_trading());
    }

    #[tokio::test]
    async fn unknown_market_status_is_bad_request() {
        let app = create_router(create_test_state());
        let response = app
            .oneshot(get_request("/api/v1/markets/JP/status"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ErrorResponse = body_json(response).await;
        assert_eq!(error.code, ErrorCode::InvalidIntent);
    }

    #[tokio::test]
    async fn order_book_is_truncated_to_requested_depth() {
        let app = create_router(create_test_state());
        let response = app
            .oneshot(get_request("/api/v1/quotes/HK.00700/book?depth=1"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let book: DepthSnapshot = body_json(response).await;
        assert_eq!(book.code.to_string(), "HK.00700");
        assert_eq!(book.bids.len(), 1);
        assert_eq!(book.asks.len(), 1);
        assert_eq!(book.best_bid(), Some(dec!(319.8)));
    }

    #[tokio::test]
    async fn zero_book_depth_is_bad_request() {
        let app = create_router(create_test_state());
        let response = app
            .oneshot(get_request("/api/v1/quotes/HK.00700/book?depth=0"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ErrorResponse = body_json(response).await;
        assert_eq!(error.code, ErrorCode::InvalidIntent);
    }
}
