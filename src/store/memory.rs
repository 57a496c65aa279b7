use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{
    Attraction, NewOrder, Order, OrderFilter, OrderStatus, TicketFilter, TicketType,
};
use crate::services::availability::{ensure_available, remaining};
use crate::services::validation::Pagination;
use crate::store::{AttractionLookup, OrderStore, TicketStore};
use crate::utils::error::AppError;

#[derive(Default)]
struct State {
    attractions: Vec<Attraction>,
    tickets: Vec<TicketType>,
    /// Insertion order is creation order.
    orders: Vec<Order>,
}

impl State {
    fn sold_quantity(&self, ticket_id: Uuid, date: NaiveDate, excluding: Option<Uuid>) -> i64 {
        self.orders
            .iter()
            .filter(|o| {
                o.ticket_id == ticket_id
                    && o.date == date
                    && o.status == OrderStatus::Success
                    && Some(o.id) != excluding
            })
            .map(|o| i64::from(o.quantity))
            .sum()
    }

    fn name_taken(&self, ticket: &TicketType) -> bool {
        self.tickets.iter().any(|t| {
            t.id != ticket.id && t.attraction_id == ticket.attraction_id && t.name == ticket.name
        })
    }
}

/// In-process backend. Every commit checks and writes under one write lock,
/// so it never oversells.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_attraction(&self, attraction: Attraction) -> Attraction {
        self.state.write().await.attractions.push(attraction.clone());
        attraction
    }

    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }
}

fn page_of<T: Clone>(items: &[T], page: Pagination) -> Vec<T> {
    let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
    let limit = usize::try_from(page.limit()).unwrap_or(0);
    items.iter().skip(offset).take(limit).cloned().collect()
}

#[async_trait]
impl AttractionLookup for MemoryStore {
    async fn get_attraction(&self, id: Uuid) -> Result<Option<Attraction>, AppError> {
        let state = self.state.read().await;
        Ok(state.attractions.iter().find(|a| a.id == id).cloned())
    }

    async fn get_attractions(&self, ids: &[Uuid]) -> Result<Vec<Attraction>, AppError> {
        let state = self.state.read().await;
        Ok(state
            .attractions
            .iter()
            .filter(|a| ids.contains(&a.id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl TicketStore for MemoryStore {
    async fn get_ticket(&self, id: Uuid) -> Result<Option<TicketType>, AppError> {
        let state = self.state.read().await;
        Ok(state.tickets.iter().find(|t| t.id == id).cloned())
    }

    async fn get_tickets(&self, ids: &[Uuid]) -> Result<Vec<TicketType>, AppError> {
        let state = self.state.read().await;
        Ok(state
            .tickets
            .iter()
            .filter(|t| ids.contains(&t.id))
            .cloned()
            .collect())
    }

    async fn find_ticket_by_name(
        &self,
        attraction_id: Uuid,
        name: &str,
    ) -> Result<Option<TicketType>, AppError> {
        let state = self.state.read().await;
        Ok(state
            .tickets
            .iter()
            .find(|t| t.attraction_id == attraction_id && t.name == name)
            .cloned())
    }

    async fn list_tickets(
        &self,
        filter: &TicketFilter,
        page: Pagination,
    ) -> Result<(i64, Vec<TicketType>), AppError> {
        let state = self.state.read().await;
        let mut matching: Vec<TicketType> = state
            .tickets
            .iter()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.name.cmp(&b.name));

        Ok((matching.len() as i64, page_of(&matching, page)))
    }

    async fn ticket_ids_for_attraction(&self, attraction_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        let state = self.state.read().await;
        Ok(state
            .tickets
            .iter()
            .filter(|t| t.attraction_id == attraction_id)
            .map(|t| t.id)
            .collect())
    }

    async fn insert_ticket(&self, ticket: &TicketType) -> Result<TicketType, AppError> {
        let mut state = self.state.write().await;
        if state.name_taken(ticket) {
            return Err(AppError::Conflict(format!(
                "Ticket type '{}' already exists for this attraction",
                ticket.name
            )));
        }
        state.tickets.push(ticket.clone());
        Ok(ticket.clone())
    }

    async fn update_ticket(&self, ticket: &TicketType) -> Result<TicketType, AppError> {
        let mut state = self.state.write().await;
        if state.name_taken(ticket) {
            return Err(AppError::Conflict(format!(
                "Ticket type '{}' already exists for this attraction",
                ticket.name
            )));
        }
        let slot = state
            .tickets
            .iter_mut()
            .find(|t| t.id == ticket.id)
            .ok_or(AppError::TicketNotFound)?;
        *slot = ticket.clone();
        Ok(ticket.clone())
    }

    async fn delete_ticket(&self, id: Uuid) -> Result<bool, AppError> {
        let mut state = self.state.write().await;
        let before = state.tickets.len();
        state.tickets.retain(|t| t.id != id);
        Ok(state.tickets.len() != before)
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, AppError> {
        let state = self.state.read().await;
        Ok(state.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn sold_quantity(
        &self,
        ticket_id: Uuid,
        date: NaiveDate,
        excluding: Option<Uuid>,
    ) -> Result<i64, AppError> {
        Ok(self.state.read().await.sold_quantity(ticket_id, date, excluding))
    }

    async fn count_ticket_orders(
        &self,
        ticket_id: Uuid,
        status: Option<OrderStatus>,
    ) -> Result<i64, AppError> {
        let state = self.state.read().await;
        Ok(state
            .orders
            .iter()
            .filter(|o| o.ticket_id == ticket_id && status.map_or(true, |s| o.status == s))
            .count() as i64)
    }

    async fn list_orders(
        &self,
        filter: &OrderFilter,
        page: Pagination,
    ) -> Result<(i64, Vec<Order>), AppError> {
        let state = self.state.read().await;
        let matching: Vec<Order> = state
            .orders
            .iter()
            .rev()
            .filter(|o| filter.matches(o))
            .cloned()
            .collect();

        Ok((matching.len() as i64, page_of(&matching, page)))
    }

    async fn commit_new(&self, draft: NewOrder, capacity: i32) -> Result<Order, AppError> {
        let mut state = self.state.write().await;
        let sold = state.sold_quantity(draft.ticket_id, draft.date, None);
        ensure_available(remaining(capacity, sold), draft.quantity)?;

        let order = draft.into_order();
        state.orders.push(order.clone());
        Ok(order)
    }

    async fn commit_update(&self, mut order: Order, capacity: Option<i32>) -> Result<Order, AppError> {
        let mut state = self.state.write().await;
        match state.orders.iter().find(|o| o.id == order.id) {
            None => return Err(AppError::OrderNotFound),
            Some(stored) if stored.is_cancelled() => return Err(AppError::OrderAlreadyCancelled),
            Some(_) => {}
        }
        if let Some(capacity) = capacity {
            let sold = state.sold_quantity(order.ticket_id, order.date, Some(order.id));
            ensure_available(remaining(capacity, sold), order.quantity)?;
        }

        order.updated_at = Utc::now();
        let slot = state
            .orders
            .iter_mut()
            .find(|o| o.id == order.id)
            .ok_or(AppError::OrderNotFound)?;
        *slot = order.clone();
        Ok(order)
    }
}
