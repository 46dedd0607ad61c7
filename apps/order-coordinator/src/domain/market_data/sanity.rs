//! Price sanity band.

use rust_decimal::Decimal;

/// A price outside the allowed band around the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceDeviation {
    /// Reference price (last quote).
    pub reference: Decimal,
    /// Price requested.
    pub price: Decimal,
    /// Observed deviation in basis points.
    pub deviation_bps: Decimal,
    /// Allowed band in basis points.
    pub band_bps: u32,
}

/// Check that `price` lies within `band_bps` of `reference`.
///
/// A deviation too large to represent fails the check.
pub fn check_deviation(
    reference: Decimal,
    price: Decimal,
    band_bps: u32,
) -> Result<(), PriceDeviation> {
    let out_of_range = || PriceDeviation {
        reference,
        price,
        deviation_bps: Decimal::MAX,
        band_bps,
    };
    if reference <= Decimal::ZERO {
        return Err(out_of_range());
    }
    let deviation_bps = price
        .checked_sub(reference)
        .and_then(|diff| diff.abs().checked_div(reference))
        .and_then(|ratio| ratio.checked_mul(Decimal::from(10_000)))
        .ok_or_else(out_of_range)?
        .round_dp(2);
    if deviation_bps > Decimal::from(band_bps) {
        return Err(PriceDeviation {
            reference,
            price,
            deviation_bps,
            band_bps,
        });
    }
    Ok(())
}
