use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Active,
    Inactive,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Active => "active",
            TicketStatus::Inactive => "inactive",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(TicketStatus::Active),
            "inactive" => Ok(TicketStatus::Inactive),
            other => Err(AppError::InvalidStatus(other.to_string())),
        }
    }
}

/// A purchasable admission category of one attraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketType {
    pub id: Uuid,
    pub attraction_id: Uuid,
    pub name: String,
    /// Units sellable per visit date.
    pub daily_capacity: i32,
    pub unit_price: Decimal,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TicketType {
    pub fn is_active(&self) -> bool {
        matches!(self.status, TicketStatus::Active)
    }
}

/// Validated input for a new ticket type.
#[derive(Debug, Clone)]
pub struct NewTicketType {
    pub attraction_id: Uuid,
    pub name: String,
    pub daily_capacity: i32,
    pub unit_price: Decimal,
}

impl NewTicketType {
    pub fn into_ticket(self) -> TicketType {
        let now = Utc::now();
        TicketType {
            id: Uuid::new_v4(),
            attraction_id: self.attraction_id,
            name: self.name,
            daily_capacity: self.daily_capacity,
            unit_price: self.unit_price,
            status: TicketStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Validated partial update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct TicketTypeChanges {
    pub name: Option<String>,
    pub daily_capacity: Option<i32>,
    pub unit_price: Option<Decimal>,
    pub status: Option<TicketStatus>,
}

impl TicketTypeChanges {
    pub fn apply(self, ticket: &mut TicketType) {
        if let Some(name) = self.name {
            ticket.name = name;
        }
        if let Some(capacity) = self.daily_capacity {
            ticket.daily_capacity = capacity;
        }
        if let Some(price) = self.unit_price {
            ticket.unit_price = price;
        }
        if let Some(status) = self.status {
            ticket.status = status;
        }
        ticket.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Default)]
pub struct TicketFilter {
    pub attraction_id: Option<Uuid>,
    pub status: Option<TicketStatus>,
}

impl TicketFilter {
    pub fn matches(&self, ticket: &TicketType) -> bool {
        self.attraction_id.map_or(true, |id| ticket.attraction_id == id)
            && self.status.map_or(true, |status| ticket.status == status)
    }
}

/// Remaining units of a ticket type on a visit date, clamped for display.
#[derive(Debug, Clone, Serialize)]
pub struct TicketAvailability {
    pub id: Uuid,
    pub attraction_id: Uuid,
    pub name: String,
    pub available: i64,
    pub date: NaiveDate,
}

/// Result of removing a ticket type from the catalog.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum Removal {
    /// Still referenced by orders, so only marked inactive.
    Retired { ticket: TicketType },
    Deleted { id: Uuid },
}
