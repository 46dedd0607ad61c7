//! Order aggregate.

mod order;

pub use order::{FillOutcome, NewOrder, Order, RecoveredOrder};
