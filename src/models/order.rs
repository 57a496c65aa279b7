use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Attraction, TicketType};
use crate::utils::error::AppError;

/// Order lifecycle state. `Cancelled` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Success,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Success => "success",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(OrderStatus::Success),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(AppError::InvalidStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub ticket_id: Uuid,
    pub quantity: i32,
    /// Visit date, no time component.
    pub date: NaiveDate,
    pub status: OrderStatus,
    /// Snapshot taken at the last pricing event; `0.00` once cancelled.
    pub total_price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn is_cancelled(&self) -> bool {
        matches!(self.status, OrderStatus::Cancelled)
    }
}

/// A priced order that has not been committed to the ledger yet.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: Uuid,
    pub ticket_id: Uuid,
    pub quantity: i32,
    pub date: NaiveDate,
    pub total_price: Decimal,
}

impl NewOrder {
    pub fn into_order(self) -> Order {
        let now = Utc::now();
        Order {
            id: Uuid::new_v4(),
            user_id: self.user_id,
            ticket_id: self.ticket_id,
            quantity: self.quantity,
            date: self.date,
            status: OrderStatus::Success,
            total_price: self.total_price,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Ledger query filter. Every bound is optional and inclusive.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub user_id: Option<Uuid>,
    pub status: Option<OrderStatus>,
    /// Restricts results to these ticket types (resolved from an attraction).
    pub ticket_ids: Option<Vec<Uuid>>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl OrderFilter {
    pub fn matches(&self, order: &Order) -> bool {
        self.user_id.map_or(true, |id| order.user_id == id)
            && self.status.map_or(true, |status| order.status == status)
            && self
                .ticket_ids
                .as_ref()
                .map_or(true, |ids| ids.contains(&order.ticket_id))
            && self.start_date.map_or(true, |start| order.date >= start)
            && self.end_date.map_or(true, |end| order.date <= end)
    }
}

/// Order enriched with ticket and attraction display fields.
#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    pub id: Uuid,
    pub order_id: Uuid,
    pub ticket_id: Uuid,
    pub ticket_name: Option<String>,
    pub quantity: i32,
    pub attraction_id: Option<Uuid>,
    pub attraction_name: Option<String>,
    pub date: NaiveDate,
    pub total_price: Decimal,
    pub user_id: Uuid,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderView {
    pub fn build(order: Order, ticket: Option<&TicketType>, attraction: Option<&Attraction>) -> Self {
        Self {
            id: order.id,
            order_id: order.id,
            ticket_id: order.ticket_id,
            ticket_name: ticket.map(|t| t.name.clone()),
            quantity: order.quantity,
            attraction_id: ticket.map(|t| t.attraction_id),
            attraction_name: attraction.map(|a| a.name.clone()),
            date: order.date,
            total_price: order.total_price,
            user_id: order.user_id,
            status: order.status,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_on(date: NaiveDate) -> Order {
        NewOrder {
            user_id: Uuid::new_v4(),
            ticket_id: Uuid::new_v4(),
            quantity: 1,
            date,
            total_price: Decimal::new(5000, 2),
        }
        .into_order()
    }

    #[test]
    fn test_new_order_is_success() {
        let order = order_on(NaiveDate::from_ymd_opt(2099, 1, 1).unwrap());
        assert_eq!(order.status, OrderStatus::Success);
        assert!(!order.is_cancelled());
    }

    #[test]
    fn test_status_rejects_unknown() {
        assert!(matches!(
            "pending".parse::<OrderStatus>(),
            Err(AppError::InvalidStatus(s)) if s == "pending"
        ));
        assert_eq!("cancelled".parse::<OrderStatus>().unwrap(), OrderStatus::Cancelled);
    }

    #[test]
    fn test_filter_date_range_is_inclusive() {
        let day = NaiveDate::from_ymd_opt(2099, 3, 10).unwrap();
        let order = order_on(day);
        let filter = OrderFilter {
            start_date: Some(day),
            end_date: Some(day),
            ..Default::default()
        };
        assert!(filter.matches(&order));

        let later = OrderFilter {
            start_date: day.succ_opt(),
            ..Default::default()
        };
        assert!(!later.matches(&order));
    }

    #[test]
    fn test_view_without_lookups_has_empty_display_fields() {
        let order = order_on(NaiveDate::from_ymd_opt(2099, 1, 1).unwrap());
        let view = OrderView::build(order.clone(), None, None);
        assert_eq!(view.order_id, order.id);
        assert!(view.ticket_name.is_none());
        assert!(view.attraction_name.is_none());
    }
}
