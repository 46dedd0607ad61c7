//! Market data: quote snapshots, book depth, the latest-quote cache and
//! the sanity band.

mod cache;
mod depth;
mod quote;
mod sanity;

pub use cache::{MarketDataCache, QuoteRead, UpdateOutcome};
pub use depth::{DepthLevel, DepthSnapshot};
pub use quote::QuoteSnapshot;
pub use sanity::{PriceDeviation, check_deviation};
