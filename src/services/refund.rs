use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::services::pricing::round_money;

/// Visits further out than this get a full refund.
pub const FULL_REFUND_AFTER_DAYS: i64 = 7;
/// Visits at least this far out get a half refund.
pub const HALF_REFUND_FROM_DAYS: i64 = 3;

pub fn refund_fraction(days_until_visit: i64) -> Decimal {
    if days_until_visit > FULL_REFUND_AFTER_DAYS {
        Decimal::ONE
    } else if days_until_visit >= HALF_REFUND_FROM_DAYS {
        Decimal::new(5, 1)
    } else {
        Decimal::ZERO
    }
}

/// Advisory refund for cancelling an order; it never gates the cancellation.
pub fn refund_amount(visit_date: NaiveDate, original_price: Decimal, today: NaiveDate) -> Decimal {
    let days_until_visit = (visit_date - today).num_days();
    round_money(original_price * refund_fraction(days_until_visit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
    }

    fn refund_in(days: i64) -> String {
        refund_amount(today() + Duration::days(days), Decimal::new(10000, 2), today()).to_string()
    }

    #[test]
    fn test_tiers() {
        assert_eq!(refund_in(10), "100.00");
        assert_eq!(refund_in(5), "50.00");
        assert_eq!(refund_in(1), "0.00");
        assert_eq!(refund_in(0), "0.00");
    }

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(refund_in(8), "100.00");
        assert_eq!(refund_in(7), "50.00");
        assert_eq!(refund_in(3), "50.00");
        assert_eq!(refund_in(2), "0.00");
        assert_eq!(refund_in(-4), "0.00");
    }

    #[test]
    fn test_half_refund_rounds_to_cents() {
        let refund = refund_amount(today() + Duration::days(4), Decimal::new(3333, 2), today());
        assert_eq!(refund.to_string(), "16.67");
    }
}
