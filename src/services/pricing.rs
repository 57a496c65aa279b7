use rust_decimal::{Decimal, RoundingStrategy};

use crate::utils::error::AppError;

/// Largest amount a `NUMERIC(12, 2)` money column holds.
// 999_999_999_999 (0xE8_D4A5_0FFF) with scale 2; `Decimal::new` is not const.
pub const MAX_MONEY: Decimal = Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 2);

/// Rounds to cents, half away from zero, always carrying two decimal places.
pub fn round_money(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

pub fn zero_money() -> Decimal {
    Decimal::new(0, 2)
}

/// `unit_price × quantity` in cents. Totals past [`MAX_MONEY`] are rejected.
pub fn line_total(unit_price: Decimal, quantity: i32) -> Result<Decimal, AppError> {
    unit_price
        .checked_mul(Decimal::from(quantity))
        .map(round_money)
        .filter(|total| *total <= MAX_MONEY)
        .ok_or_else(|| {
            AppError::validation("quantity", "Order total exceeds the maximum supported amount")
        })
}
