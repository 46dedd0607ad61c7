//! Resolved instrument metadata.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{InstrumentCode, InstrumentError, Market};

/// Tradable instrument. Immutable once resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    code: InstrumentCode,
    name: String,
    lot_size: Decimal,
    tick_size: Decimal,
    extended_hours: bool,
}

impl Instrument {
    /// Create an instrument. Lot and tick sizes must be positive.
    pub fn new(
        code: InstrumentCode,
        name: impl Into<String>,
        lot_size: Decimal,
        tick_size: Decimal,
    ) -> Result<Self, InstrumentError> {
        if lot_size <= Decimal::ZERO || !lot_size.fract().is_zero() {
            return Err(InstrumentError::InvalidLotSize {
                code: code.to_string(),
                lot_size,
            });
        }
        if tick_size <= Decimal::ZERO {
            return Err(InstrumentError::InvalidTickSize {
                code: code.to_string(),
                tick_size,
            });
        }
        Ok(Self {
            code,
            name: name.into(),
            lot_size,
            tick_size,
            extended_hours: false,
        })
    }

    /// Allow trading in pre/post-market sessions.
    #[must_use]
    pub const fn with_extended_hours(mut self, enabled: bool) -> Self {
        self.extended_hours = enabled;
        self
    }

    /// Instrument code.
    #[must_use]
    pub const fn code(&self) -> &InstrumentCode {
        &self.code
    }

    /// Market.
    #[must_use]
    pub const fn market(&self) -> Market {
        self.code.market()
    }

    /// Display name reported by the gateway.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Board lot size.
    #[must_use]
    pub const fn lot_size(&self) -> Decimal {
        self.lot_size
    }

    /// Minimum price increment.
    #[must_use]
    pub const fn tick_size(&self) -> Decimal {
        self.tick_size
    }

    /// Whether pre/post-market sessions are enabled.
    #[must_use]
    pub const fn extended_hours(&self) -> bool {
        self.extended_hours
    }

    /// Validate an order quantity: positive whole shares, and whole lots on HK.
    pub fn validate_quantity(&self, quantity: Decimal) -> Result<(), InstrumentError> {
        if quantity <= Decimal::ZERO || !quantity.fract().is_zero() {
            return Err(InstrumentError::InvalidQuantity {
                code: self.code.to_string(),
                quantity,
                lot_size: self.lot_size,
            });
        }
        if self.market() == Market::Hk && !(quantity % self.lot_size).is_zero() {
            return Err(InstrumentError::InvalidQuantity {
                code: self.code.to_string(),
                quantity,
                lot_size: self.lot_size,
            });
        }
        Ok(())
    }

    /// Validate a limit price: positive and on the tick grid.
    pub fn validate_price(&self, price: Decimal) -> Result<(), InstrumentError> {
        if price <= Decimal::ZERO || !(price % self.tick_size).is_zero() {
            return Err(InstrumentError::InvalidPrice {
                code: self.code.to_string(),
                price,
                tick_size: self.tick_size,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn tencent() -> Instrument {
        Instrument::new("HK.00700".parse().unwrap(), "TENCENT", dec!(100), dec!(0.2)).unwrap()
    }

    fn apple() -> Instrument {
        Instrument::new("US.AAPL".parse().unwrap(), "Apple", dec!(1), dec!(0.01)).unwrap()
    }

    #[test]
    fn hk_quantity_must_be_whole_lots() {
        let inst = tencent();
        assert!(inst.validate_quantity(dec!(200)).is_ok());
        assert!(inst.validate_quantity(dec!(150)).is_err());
        assert!(inst.validate_quantity(dec!(0)).is_err());
    }

    #[test]
    fn us_quantity_must_be_whole_shares() {
        let inst = apple();
        assert!(inst.validate_quantity(dec!(7)).is_ok());
        assert!(inst.validate_quantity(dec!(1.5)).is_err());
        assert!(inst.validate_quantity(dec!(-1)).is_err());
    }

    #[test]
    fn price_must_sit_on_tick_grid() {
        let inst = tencent();
        assert!(inst.validate_price(dec!(380.4)).is_ok());
        assert!(inst.validate_price(dec!(380.5)).is_err());
        assert!(inst.validate_price(dec!(0)).is_err());
    }

    #[test]
    fn rejects_non_positive_sizes() {
        let code: InstrumentCode = "US.AAPL".parse().unwrap();
        assert!(Instrument::new(code.clone(), "x", dec!(0), dec!(0.01)).is_err());
        assert!(Instrument::new(code, "x", dec!(1), dec!(0)).is_err());
    }
}
