//! Application Layer
//!
//! The application layer orchestrates domain logic. It defines:
//!
//! - **Ports**: Interfaces for interacting with the gateway
//! - **Coordinator**: The order lifecycle operations
//! - **Services**: Long-running background tasks around the coordinator
//! - **DTOs**: Data transfer objects for API boundaries

pub mod coordinator;
pub mod dto;
pub mod ports;
pub mod retry;
pub mod services;

pub use coordinator::{CoordinatorSettings, EventOutcome, OrderCoordinator};
pub use dto::*;
pub use ports::*;
