use chrono::NaiveDate;
use uuid::Uuid;

use crate::store::{OrderStore, Store, TicketStore};
use crate::utils::error::AppError;

/// Capacity left after `sold` units. May be negative when capacity was
/// lowered below what is already sold.
pub fn remaining(capacity: i32, sold: i64) -> i64 {
    i64::from(capacity) - sold
}

/// Gate for new commitments; compares against the unclamped remainder.
pub fn ensure_available(remaining: i64, requested: i32) -> Result<(), AppError> {
    if remaining < i64::from(requested) {
        return Err(AppError::InsufficientAvailability);
    }
    Ok(())
}

pub fn display_available(remaining: i64) -> i64 {
    remaining.max(0)
}

/// Remaining units of `ticket_id` on `date`, optionally ignoring one order's
/// own commitment.
pub async fn remaining_for(
    store: &dyn Store,
    ticket_id: Uuid,
    date: NaiveDate,
    excluding: Option<Uuid>,
) -> Result<i64, AppError> {
    let ticket = store
        .get_ticket(ticket_id)
        .await?
        .ok_or(AppError::TicketNotFound)?;
    let sold = store.sold_quantity(ticket_id, date, excluding).await?;
    Ok(remaining(ticket.daily_capacity, sold))
}
