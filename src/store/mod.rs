//! Persistence seams for the catalog, the order ledger and attraction lookups.
//!
//! The only check-then-write sequences in the system live behind
//! [`OrderStore::commit_new`] and [`OrderStore::commit_update`], so each
//! backend decides how strictly an availability check and the write that
//! depends on it are isolated from concurrent requests.

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::{
    Attraction, NewOrder, Order, OrderFilter, OrderStatus, TicketFilter, TicketType,
};
use crate::services::validation::Pagination;
use crate::utils::error::AppError;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait AttractionLookup: Send + Sync {
    async fn get_attraction(&self, id: Uuid) -> Result<Option<Attraction>, AppError>;

    async fn get_attractions(&self, ids: &[Uuid]) -> Result<Vec<Attraction>, AppError>;
}

#[async_trait]
pub trait TicketStore: Send + Sync {
    async fn get_ticket(&self, id: Uuid) -> Result<Option<TicketType>, AppError>;

    async fn get_tickets(&self, ids: &[Uuid]) -> Result<Vec<TicketType>, AppError>;

    async fn find_ticket_by_name(
        &self,
        attraction_id: Uuid,
        name: &str,
    ) -> Result<Option<TicketType>, AppError>;

    /// Ticket types ordered by name, with the unpaginated total.
    async fn list_tickets(
        &self,
        filter: &TicketFilter,
        page: Pagination,
    ) -> Result<(i64, Vec<TicketType>), AppError>;

    async fn ticket_ids_for_attraction(&self, attraction_id: Uuid) -> Result<Vec<Uuid>, AppError>;

    /// Fails with [`AppError::Conflict`] when `(attraction_id, name)` is taken.
    async fn insert_ticket(&self, ticket: &TicketType) -> Result<TicketType, AppError>;

    async fn update_ticket(&self, ticket: &TicketType) -> Result<TicketType, AppError>;

    /// Returns whether a row was removed.
    async fn delete_ticket(&self, id: Uuid) -> Result<bool, AppError>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, AppError>;

    /// Sum of `success` quantities for `(ticket_id, date)`, optionally
    /// ignoring one order.
    async fn sold_quantity(
        &self,
        ticket_id: Uuid,
        date: NaiveDate,
        excluding: Option<Uuid>,
    ) -> Result<i64, AppError>;

    /// Number of orders referencing `ticket_id`, optionally only those in
    /// `status`.
    async fn count_ticket_orders(
        &self,
        ticket_id: Uuid,
        status: Option<OrderStatus>,
    ) -> Result<i64, AppError>;

    /// Orders newest first, with the unpaginated total.
    async fn list_orders(
        &self,
        filter: &OrderFilter,
        page: Pagination,
    ) -> Result<(i64, Vec<Order>), AppError>;

    /// Checks that `capacity` still covers the draft's quantity on its date
    /// and records it. Fails with [`AppError::InsufficientAvailability`]
    /// without writing anything otherwise.
    ///
    /// Backends that lock the ticket type row may check against the locked
    /// capacity instead of the caller's snapshot.
    async fn commit_new(&self, draft: NewOrder, capacity: i32) -> Result<Order, AppError>;

    /// Saves an edited order. With `capacity` set, availability for the
    /// order's effective `(ticket, date)` is re-checked first, leaving the
    /// order's own prior commitment out of the sum. Fails with
    /// `OrderAlreadyCancelled` when the stored order is no longer `success`.
    async fn commit_update(&self, order: Order, capacity: Option<i32>) -> Result<Order, AppError>;
}

/// Everything the services need from a backend.
pub trait Store: AttractionLookup + TicketStore + OrderStore {}

impl<T> Store for T where T: AttractionLookup + TicketStore + OrderStore {}
