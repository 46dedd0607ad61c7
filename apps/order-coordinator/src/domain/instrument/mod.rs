//! Instruments: markets, codes and resolved metadata.

mod code;
mod instrument;
mod market;

pub use code::InstrumentCode;
pub use instrument::Instrument;
pub use market::Market;

use rust_decimal::Decimal;
use thiserror::Error;

/// Instrument validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InstrumentError {
    /// Market prefix not recognized.
    #[error("unknown market '{0}': expected HK or US")]
    UnknownMarket(String),

    /// Code has no `MARKET.` prefix.
    #[error("instrument code '{0}' has no market prefix")]
    MissingMarket(String),

    /// Symbol is malformed for its market.
    #[error("invalid {market} symbol '{symbol}'")]
    InvalidSymbol {
        /// Market.
        market: Market,
        /// Raw symbol.
        symbol: String,
    },

    /// Lot size is not a positive whole number.
    #[error("{code}: invalid lot size {lot_size}")]
    InvalidLotSize {
        /// Instrument code.
        code: String,
        /// Lot size.
        lot_size: Decimal,
    },

    /// Tick size is not positive.
    #[error("{code}: invalid tick size {tick_size}")]
    InvalidTickSize {
        /// Instrument code.
        code: String,
        /// Tick size.
        tick_size: Decimal,
    },

    /// Quantity is not a positive whole multiple of the lot size.
    #[error("{code}: quantity {quantity} must be a positive multiple of lot size {lot_size}")]
    InvalidQuantity {
        /// Instrument code.
        code: String,
        /// Requested quantity.
        quantity: Decimal,
        /// Lot size.
        lot_size: Decimal,
    },

    /// Price is not positive or off the tick grid.
    #[error("{code}: price {price} must be positive and a multiple of tick size {tick_size}")]
    InvalidPrice {
        /// Instrument code.
        code: String,
        /// Requested price.
        price: Decimal,
        /// Tick size.
        tick_size: Decimal,
    },
}
