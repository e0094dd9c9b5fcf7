//! Money and quantity rounding rules.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! Money is held as `rust_decimal::Decimal` with 2 fractional digits,
//! inventory quantities with 4. Both round half away from zero.

use rust_decimal::{Decimal, RoundingStrategy};

/// Fractional digits kept for monetary amounts.
pub const MONEY_SCALE: u32 = 2;

/// Fractional digits kept for inventory quantities.
pub const QUANTITY_SCALE: u32 = 4;

/// Rounds a monetary amount to 2 fractional digits.
///
/// The result always carries scale 2, so `35` renders as `35.00`.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    let mut rounded =
        amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_SCALE);
    rounded
}

/// Rounds an inventory quantity to 4 fractional digits.
#[must_use]
pub fn round_quantity(quantity: Decimal) -> Decimal {
    let mut rounded =
        quantity.round_dp_with_strategy(QUANTITY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(QUANTITY_SCALE);
    rounded
}

/// The monetary zero, `0.00`.
#[must_use]
pub fn zero_money() -> Decimal {
    Decimal::new(0, MONEY_SCALE)
}

/// Returns `rate` percent of `amount`, unrounded.
#[must_use]
pub fn percent_of(amount: Decimal, rate: Decimal) -> Decimal {
    amount * rate / Decimal::ONE_HUNDRED
}

/// Total of a priced line: `round2(quantity * unit_price + tax)`.
///
/// Tax is `tax_rate` percent of the net line value and is only rounded
/// together with the net amount, never on its own.
#[must_use]
pub fn line_total(quantity: Decimal, unit_price: Decimal, tax_rate: Decimal) -> Decimal {
    let net = quantity * unit_price;
    round_money(net + percent_of(net, tax_rate))
}

/// Converts an amount with a flat conversion rate and rounds to money scale.
#[must_use]
pub fn convert_at_rate(amount: Decimal, rate: Decimal) -> Decimal {
    round_money(amount * rate)
}
