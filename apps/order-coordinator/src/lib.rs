// Allow unwrap/expect in tests - tests should panic on unexpected errors
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Order Coordinator
//!
//! Session and order lifecycle coordinator between a trading agent and a
//! Futu OpenD gateway, for HK and US equities.
//!
//! # Architecture (Clean Architecture + Hexagonal)
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: environment guard, instruments, trading hours, quotes,
//!   account snapshot, gateway session state, the order aggregate
//!
//! - **Application**: the [`OrderCoordinator`](application::OrderCoordinator),
//!   the `GatewayPort`, retry policy and background services
//!
//! - **Infrastructure**: the Futu gateway adapter and the agent HTTP API
//!
//! Cross-cutting: [`config`] (YAML + environment), [`error`] (the stable
//! error taxonomy), [`observability`] (Prometheus counters).

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

/// Domain layer - business rules with no I/O.
pub mod domain;

/// Application layer - the coordinator, ports and background services.
pub mod application;

/// Infrastructure layer - gateway adapter and HTTP API.
pub mod infrastructure;

pub mod config;
pub mod error;
pub mod observability;

pub use application::{CoordinatorSettings, OrderCoordinator};
pub use domain::environment::{EnvironmentGuard, TradeEnvironment};
pub use error::{CoordinatorError, ErrorCode};
