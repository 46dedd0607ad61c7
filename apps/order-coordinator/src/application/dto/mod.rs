//! Data Transfer Objects
//!
//! DTOs carry data between the agent-facing adapters and the coordinator.

mod market_dto;
mod order_dto;

pub use market_dto::MarketStatusDto;
pub use order_dto::{OrderDto, OrderIntentDto, ReconcileSummary, SubmitReceipt};
