//! HTTP request DTOs.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::application::dto::OrderIntentDto;
use crate::domain::environment::TradeEnvironment;
use crate::domain::instrument::Market;
use crate::domain::order_execution::OrderSide;

/// Order intent as posted by the agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitOrderRequest {
    /// `MARKET.SYMBOL`, or a bare symbol in the default market.
    pub instrument: String,
    /// Order side.
    pub side: OrderSide,
    /// Quantity in shares.
    pub quantity: Decimal,
    /// Limit price; omitted for a market order.
    #[serde(default)]
    pub price: Option<Decimal>,
    /// Environment the agent believes it trades in.
    pub environment: TradeEnvironment,
}

impl From<SubmitOrderRequest> for OrderIntentDto {
    fn from(request: SubmitOrderRequest) -> Self {
        Self {
            instrument: request.instrument,
            side: request.side,
            quantity: request.quantity,
            price: request.price,
            environment: request.environment,
        }
    }
}

/// Query for the account endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountQuery {
    /// Market context; the default market when omitted.
    #[serde(default)]
    pub market: Option<Market>,
}

/// Query for the order book endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookQuery {
    /// Levels per side; ten when omitted.
    #[serde(default)]
    pub depth: Option<usize>,
}
