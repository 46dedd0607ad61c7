//! Domain Layer
//!
//! Business rules with no I/O:
//!
//! - [`environment`]: SIMULATE/REAL and the guard every mutating path consults
//! - [`instrument`]: markets, instrument codes, lot and tick rules
//! - [`trading_hours`]: HK/US session calendar
//! - [`market_data`]: quote snapshots and the latest-quote cache
//! - [`account`]: account snapshot used for buying power and sellable checks
//! - [`session`]: gateway session state
//! - [`order_execution`]: order aggregate and lifecycle

pub mod account;
pub mod environment;
pub mod instrument;
pub mod market_data;
pub mod order_execution;
pub mod session;
pub mod shared;
pub mod trading_hours;
