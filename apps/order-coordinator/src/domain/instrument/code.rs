//! Gateway instrument codes (`MARKET.SYMBOL`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{InstrumentError, Market};

const HK_SYMBOL_WIDTH: usize = 5;

/// Normalized instrument code, e.g. `HK.00700` or `US.AAPL`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InstrumentCode {
    market: Market,
    symbol: String,
}

impl InstrumentCode {
    /// Build a code from a market and a raw symbol, normalizing the symbol.
    ///
    /// HK symbols are numeric and zero-padded to five digits. US symbols are
    /// upper-cased.
    pub fn new(market: Market, symbol: &str) -> Result<Self, InstrumentError> {
        let symbol = symbol.trim();
        let symbol = match market {
            Market::Hk => normalize_hk(symbol)?,
            Market::Us => normalize_us(symbol)?,
        };
        Ok(Self { market, symbol })
    }

    /// Parse `MARKET.SYMBOL`, or a bare symbol in `default_market`.
    pub fn parse_with_default(raw: &str, default_market: Market) -> Result<Self, InstrumentError> {
        let raw = raw.trim();
        match raw.split_once('.') {
            Some((prefix, symbol)) if prefix.parse::<Market>().is_ok() => {
                Self::new(prefix.parse()?, symbol)
            }
            _ => Self::new(default_market, raw),
        }
    }

    /// Market of the instrument.
    #[must_use]
    pub const fn market(&self) -> Market {
        self.market
    }

    /// Normalized symbol without the market prefix.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }
}

fn normalize_hk(symbol: &str) -> Result<String, InstrumentError> {
    if symbol.is_empty() || !symbol.chars().all(|c| c.is_ascii_digit()) {
        return Err(InstrumentError::InvalidSymbol {
            market: Market::Hk,
            symbol: symbol.to_string(),
        });
    }
    let stripped = symbol.trim_start_matches('0');
    if stripped.is_empty() || stripped.len() > HK_SYMBOL_WIDTH {
        return Err(InstrumentError::InvalidSymbol {
            market: Market::Hk,
            symbol: symbol.to_string(),
        });
    }
    Ok(format!("{stripped:0>HK_SYMBOL_WIDTH$}"))
}

fn normalize_us(symbol: &str) -> Result<String, InstrumentError> {
    let valid = !symbol.is_empty()
        && symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    if !valid {
        return Err(InstrumentError::InvalidSymbol {
            market: Market::Us,
            symbol: symbol.to_string(),
        });
    }
    Ok(symbol.to_uppercase())
}

impl fmt::Display for InstrumentCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.market, self.symbol)
    }
}

impl FromStr for InstrumentCode {
    type Err = InstrumentError;

    /// Parse a fully qualified `MARKET.SYMBOL` code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix, symbol) = s
            .trim()
            .split_once('.')
            .ok_or_else(|| InstrumentError::MissingMarket(s.to_string()))?;
        Self::new(prefix.parse()?, symbol)
    }
}

impl TryFrom<String> for InstrumentCode {
    type Error = InstrumentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<InstrumentCode> for String {
    fn from(code: InstrumentCode) -> Self {
        code.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("HK.700", "HK.00700"; "pads short hk code")]
    #[test_case("HK.00700", "HK.00700"; "keeps padded hk code")]
    #[test_case("hk.0000005", "HK.00005"; "strips excess zeros")]
    #[test_case("US.aapl", "US.AAPL"; "uppercases us")]
    #[test_case("US.BRK.B", "US.BRK.B"; "us class share")]
    fn parses_and_normalizes(raw: &str, expected: &str) {
        let code: InstrumentCode = raw.parse().unwrap();
        assert_eq!(code.to_string(), expected);
    }

    #[test_case("HK.ABC"; "non numeric hk")]
    #[test_case("HK.000"; "all zero hk")]
    #[test_case("HK.123456"; "too long hk")]
    #[test_case("JP.7203"; "unknown market")]
    #[test_case("AAPL"; "missing market")]
    fn rejects_invalid_codes(raw: &str) {
        assert!(raw.parse::<InstrumentCode>().is_err());
    }

    #[test]
    fn bare_symbol_uses_default_market() {
        let code = InstrumentCode::parse_with_default("9988", Market::Hk).unwrap();
        assert_eq!(code.to_string(), "HK.09988");

        let code = InstrumentCode::parse_with_default("tsla", Market::Us).unwrap();
        assert_eq!(code.market(), Market::Us);
        assert_eq!(code.symbol(), "TSLA");
    }

    #[test]
    fn explicit_prefix_overrides_default_market() {
        let code = InstrumentCode::parse_with_default("US.NVDA", Market::Hk).unwrap();
        assert_eq!(code.market(), Market::Us);
    }

    #[test]
    fn serde_round_trips_through_string() {
        let code: InstrumentCode = "HK.700".parse().unwrap();
        let json = serde_json::to_string(&code).unwrap();
        assert_eq!(json, "\"HK.00700\"");
        assert!(serde_json::from_str::<InstrumentCode>("\"XX.1\"").is_err());
    }
}
