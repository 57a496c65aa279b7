use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::services::pricing::{round_money, MAX_MONEY};
use crate::utils::error::AppError;

pub const MAX_TICKET_NAME_LEN: usize = 100;
pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 50;

/// Parses a strict `YYYY-MM-DD` visit date that exists on the calendar.
pub fn parse_visit_date(raw: &str) -> Result<NaiveDate, AppError> {
    let bytes = raw.as_bytes();
    let shaped = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !shaped {
        return Err(AppError::InvalidDate(raw.to_string()));
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| AppError::InvalidDate(raw.to_string()))
}

pub fn ensure_not_past(date: NaiveDate, today: NaiveDate) -> Result<(), AppError> {
    if date < today {
        return Err(AppError::PastDate);
    }
    Ok(())
}

/// Parses and checks a bookable visit date in one step.
pub fn parse_bookable_date(raw: &str, today: NaiveDate) -> Result<NaiveDate, AppError> {
    let date = parse_visit_date(raw)?;
    ensure_not_past(date, today)?;
    Ok(date)
}

pub fn ensure_positive_quantity(quantity: i64) -> Result<i32, AppError> {
    if quantity < 1 {
        return Err(AppError::InvalidQuantity);
    }
    i32::try_from(quantity).map_err(|_| AppError::InvalidQuantity)
}

pub fn validate_ticket_name(name: &str) -> Result<String, AppError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("name", "Ticket name must not be blank"));
    }
    if trimmed.chars().count() > MAX_TICKET_NAME_LEN {
        return Err(AppError::validation(
            "name",
            format!("Ticket name must not exceed {MAX_TICKET_NAME_LEN} characters"),
        ));
    }
    Ok(trimmed.to_string())
}

pub fn validate_capacity(capacity: i64) -> Result<i32, AppError> {
    if capacity < 0 {
        return Err(AppError::validation(
            "daily_capacity",
            "Daily capacity must be a non-negative integer",
        ));
    }
    i32::try_from(capacity)
        .map_err(|_| AppError::validation("daily_capacity", "Daily capacity is too large"))
}

/// Accepts non-negative prices with at most cents precision, up to
/// [`MAX_MONEY`]. Returned with exactly two decimal places.
pub fn validate_price(price: Decimal) -> Result<Decimal, AppError> {
    if price < Decimal::ZERO {
        return Err(AppError::validation(
            "unit_price",
            "Unit price must be a non-negative number",
        ));
    }
    if price.normalize().scale() > 2 {
        return Err(AppError::validation(
            "unit_price",
            "Unit price must have at most two decimal places",
        ));
    }
    if price > MAX_MONEY {
        return Err(AppError::validation(
            "unit_price",
            format!("Unit price must not exceed {MAX_MONEY}"),
        ));
    }
    Ok(round_money(price))
}

/// Validated page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub page_size: i64,
}

impl Pagination {
    pub fn new(page: Option<i64>, page_size: Option<i64>) -> Result<Self, AppError> {
        let page = page.unwrap_or(DEFAULT_PAGE);
        let page_size = page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if page < 1 || !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(AppError::InvalidPagination);
        }
        Ok(Self { page, page_size })
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.page_size
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}
