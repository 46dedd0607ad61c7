//! HTTP response DTOs.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::application::dto::OrderDto;
use crate::domain::environment::TradeEnvironment;
use crate::domain::market_data::QuoteRead;
use crate::domain::session::SessionState;
use crate::error::{CoordinatorError, ErrorCode};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `healthy` when the gateway session is connected, else `degraded`.
    pub status: String,
    /// Service version.
    pub version: String,
    /// Process trade environment.
    pub environment: TradeEnvironment,
    /// Gateway session state.
    pub session: SessionState,
}

/// Order list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderListResponse {
    /// Orders, newest first.
    pub orders: Vec<OrderDto>,
}

/// Latest quote with its freshness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteResponse {
    /// Instrument code.
    pub code: String,
    /// Best bid.
    pub bid: Decimal,
    /// Best ask.
    pub ask: Decimal,
    /// Last trade.
    pub last: Decimal,
    /// Gateway timestamp.
    pub timestamp: DateTime<Utc>,
    /// Gateway sequence number.
    pub sequence: u64,
    /// Age at read time, in milliseconds.
    pub age_ms: u64,
    /// Whether the quote exceeds the staleness threshold.
    pub stale: bool,
}

impl From<&QuoteRead> for QuoteResponse {
    fn from(read: &QuoteRead) -> Self {
        let snapshot = read.snapshot();
        Self {
            code: snapshot.code.to_string(),
            bid: snapshot.bid,
            ask: snapshot.ask,
            last: snapshot.last,
            timestamp: snapshot.timestamp,
            sequence: snapshot.sequence,
            age_ms: read.age().as_millis() as u64,
            stale: read.is_stale(),
        }
    }
}

/// Error body: `{code, message, retryable}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Rule that was violated.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// Whether the agent may retry.
    pub retryable: bool,
}

/// Coordinator error rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError {
    code: ErrorCode,
    message: String,
}

impl ApiError {
    /// Error for a request the coordinator never saw.
    pub fn invalid_intent(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::InvalidIntent,
            message: message.into(),
        }
    }

    const fn status(&self) -> StatusCode {
        match self.code {
            ErrorCode::ConnectionError
            | ErrorCode::GatewayUnavailable
            | ErrorCode::TransientGatewayError => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::EnvironmentMismatch => StatusCode::FORBIDDEN,
            ErrorCode::InvalidIntent => StatusCode::BAD_REQUEST,
            ErrorCode::OrderNotFound => StatusCode::NOT_FOUND,
            ErrorCode::InvalidState => StatusCode::CONFLICT,
            ErrorCode::PriceSanity
            | ErrorCode::MarketClosed
            | ErrorCode::InsufficientBuyingPower
            | ErrorCode::InsufficientPosition
            | ErrorCode::GatewayRejected => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::GatewayProtocolError => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<CoordinatorError> for ApiError {
    fn from(err: CoordinatorError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse {
            code: self.code,
            retryable: self.code.is_retryable(),
            message: self.message,
        };
        (status, Json(body)).into_response()
    }
}
