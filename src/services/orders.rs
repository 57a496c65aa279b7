use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::models::{AuthUser, NewOrder, Order, OrderFilter, OrderStatus, OrderView, TicketType};
use crate::services::clock::Clock;
use crate::services::pricing::{line_total, zero_money};
use crate::services::refund::refund_amount;
use crate::services::validation::{
    ensure_positive_quantity, parse_bookable_date, parse_visit_date, Pagination,
};
use crate::store::{AttractionLookup, OrderStore, Store, TicketStore};
use crate::utils::error::AppError;

/// Tunable order rules.
#[derive(Debug, Clone, Copy)]
pub struct OrderPolicy {
    /// Whether an order may be moved onto a ticket type of another attraction.
    pub allow_cross_attraction_rebooking: bool,
}

impl Default for OrderPolicy {
    fn default() -> Self {
        Self {
            allow_cross_attraction_rebooking: true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateOrderRequest {
    pub ticket_id: Option<Uuid>,
    pub quantity: Option<i64>,
    pub date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateOrderRequest {
    pub order_id: Option<Uuid>,
    pub quantity: Option<i64>,
    pub date: Option<String>,
    pub status: Option<String>,
    pub ticket_id: Option<Uuid>,
}

impl UpdateOrderRequest {
    fn has_changes(&self) -> bool {
        self.quantity.is_some()
            || self.date.is_some()
            || self.status.is_some()
            || self.ticket_id.is_some()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct OrderQuery {
    pub order_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub status: Option<String>,
    pub attraction_id: Option<Uuid>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub page: Option<i64>,
    #[serde(alias = "pageSize")]
    pub page_size: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct OrderPage {
    pub total: i64,
    pub orders: Vec<OrderView>,
    pub page: i64,
    pub page_size: i64,
}

impl OrderPage {
    fn empty(page: Pagination) -> Self {
        Self {
            total: 0,
            orders: Vec::new(),
            page: page.page,
            page_size: page.page_size,
        }
    }
}

/// Where a rebooked order came from.
struct Rebooking {
    from_attraction: Option<Uuid>,
    cross_attraction: bool,
}

/// Purchase, edit, cancellation and lookup of orders.
#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    policy: OrderPolicy,
}

impl OrderService {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, policy: OrderPolicy) -> Self {
        Self {
            store,
            clock,
            policy,
        }
    }

    pub async fn create(&self, user: AuthUser, req: CreateOrderRequest) -> Result<OrderView, AppError> {
        let ticket_id = req.ticket_id.ok_or(AppError::MissingField("ticket_id"))?;
        let quantity = req.quantity.ok_or(AppError::MissingField("quantity"))?;
        let raw_date = req.date.ok_or(AppError::MissingField("date"))?;

        let quantity = ensure_positive_quantity(quantity)?;
        let date = parse_bookable_date(&raw_date, self.clock.today())?;

        let ticket = self.bookable_ticket(ticket_id).await?;

        let draft = NewOrder {
            user_id: user.id,
            ticket_id,
            quantity,
            date,
            total_price: line_total(ticket.unit_price, quantity)?,
        };
        let order = self.store.commit_new(draft, ticket.daily_capacity).await?;

        info!(
            order_id = %order.id,
            user_id = %order.user_id,
            ticket_id = %order.ticket_id,
            quantity = order.quantity,
            date = %order.date,
            total_price = %order.total_price,
            "Order created"
        );
        self.view(order, Some(ticket)).await
    }

    pub async fn update(&self, user: AuthUser, req: UpdateOrderRequest) -> Result<OrderView, AppError> {
        let order_id = req.order_id.ok_or(AppError::MissingOrderId)?;
        if !req.has_changes() {
            return Err(AppError::NoUpdateFields);
        }

        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or(AppError::OrderNotFound)?;

        if order.is_cancelled() {
            return Err(AppError::OrderAlreadyCancelled);
        }

        if !user.can_act_for(order.user_id) {
            return Err(AppError::Forbidden(
                "Not allowed to modify this order".to_string(),
            ));
        }

        let today = self.clock.today();
        let quantity = req.quantity.map(ensure_positive_quantity).transpose()?;
        let date = req
            .date
            .as_deref()
            .map(|raw| parse_bookable_date(raw, today))
            .transpose()?;
        let status = req
            .status
            .as_deref()
            .map(str::parse::<OrderStatus>)
            .transpose()?;

        let (ticket, rebooking) = match req.ticket_id {
            Some(ticket_id) if ticket_id != order.ticket_id => {
                let (target, rebooking) = self.rebook_target(&order, ticket_id).await?;
                (target, Some(rebooking))
            }
            _ => {
                let current = self
                    .store
                    .get_ticket(order.ticket_id)
                    .await?
                    .ok_or(AppError::TicketNotFound)?;
                (current, None)
            }
        };

        let mut updated = order.clone();
        updated.quantity = quantity.unwrap_or(order.quantity);
        updated.date = date.unwrap_or(order.date);
        updated.ticket_id = ticket.id;
        updated.status = status.unwrap_or(order.status);

        let fields_changed = updated.quantity != order.quantity
            || updated.date != order.date
            || updated.ticket_id != order.ticket_id;
        let recheck = fields_changed || status.is_some();

        let refund = match updated.status {
            OrderStatus::Cancelled => {
                updated.total_price = zero_money();
                Some(refund_amount(order.date, order.total_price, today))
            }
            OrderStatus::Success => {
                if recheck {
                    updated.total_price = line_total(ticket.unit_price, updated.quantity)?;
                }
                None
            }
        };

        let capacity = recheck.then_some(ticket.daily_capacity);
        let saved = self.store.commit_update(updated, capacity).await?;

        // Audit lines only for changes that were actually stored.
        if let Some(rebooking) = rebooking {
            info!(
                order_id = %saved.id,
                from_ticket = %order.ticket_id,
                to_ticket = %saved.ticket_id,
                from_attraction = ?rebooking.from_attraction,
                to_attraction = %ticket.attraction_id,
                cross_attraction = rebooking.cross_attraction,
                "Order rebooked"
            );
        }
        if let Some(refund) = refund {
            info!(
                order_id = %saved.id,
                user_id = %saved.user_id,
                original_price = %order.total_price,
                refund = %refund,
                "Order cancelled"
            );
        }

        info!(
            order_id = %saved.id,
            updated_by = %user.id,
            status = %saved.status,
            quantity = saved.quantity,
            date = %saved.date,
            total_price = %saved.total_price,
            "Order updated"
        );
        self.view(saved, Some(ticket)).await
    }

    pub async fn query(&self, user: AuthUser, query: OrderQuery) -> Result<OrderPage, AppError> {
        let page = Pagination::new(query.page, query.page_size)?;

        if let Some(order_id) = query.order_id {
            let order = self
                .store
                .get_order(order_id)
                .await?
                .ok_or(AppError::OrderNotFound)?;
            if !user.can_act_for(order.user_id) {
                return Err(AppError::Forbidden(
                    "Not allowed to view this order".to_string(),
                ));
            }
            return Ok(OrderPage {
                total: 1,
                orders: self.enrich(vec![order]).await?,
                page: page.page,
                page_size: page.page_size,
            });
        }

        if !user.is_admin() && query.user_id.is_some_and(|id| id != user.id) {
            return Err(AppError::Forbidden(
                "Not allowed to view other users' orders".to_string(),
            ));
        }

        let ticket_ids = match query.attraction_id {
            Some(attraction_id) => {
                let ids = self.store.ticket_ids_for_attraction(attraction_id).await?;
                if ids.is_empty() {
                    return Ok(OrderPage::empty(page));
                }
                Some(ids)
            }
            None => None,
        };

        let filter = OrderFilter {
            user_id: if user.is_admin() { query.user_id } else { Some(user.id) },
            status: query
                .status
                .as_deref()
                .map(str::parse::<OrderStatus>)
                .transpose()?,
            ticket_ids,
            start_date: query.start_date.as_deref().map(parse_visit_date).transpose()?,
            end_date: query.end_date.as_deref().map(parse_visit_date).transpose()?,
        };

        let (total, orders) = self.store.list_orders(&filter, page).await?;
        Ok(OrderPage {
            total,
            orders: self.enrich(orders).await?,
            page: page.page,
            page_size: page.page_size,
        })
    }

    async fn bookable_ticket(&self, ticket_id: Uuid) -> Result<TicketType, AppError> {
        self.store
            .get_ticket(ticket_id)
            .await?
            .filter(TicketType::is_active)
            .ok_or(AppError::TicketNotFound)
    }

    async fn rebook_target(
        &self,
        order: &Order,
        ticket_id: Uuid,
    ) -> Result<(TicketType, Rebooking), AppError> {
        let target = self.bookable_ticket(ticket_id).await?;
        let current = self.store.get_ticket(order.ticket_id).await?;

        let from_attraction = current.as_ref().map(|t| t.attraction_id);
        let cross_attraction = from_attraction.is_some_and(|id| id != target.attraction_id);

        if cross_attraction && !self.policy.allow_cross_attraction_rebooking {
            return Err(AppError::validation(
                "ticket_id",
                "Rebooking onto a ticket type of another attraction is not allowed",
            ));
        }

        Ok((
            target,
            Rebooking {
                from_attraction,
                cross_attraction,
            },
        ))
    }

    async fn view(&self, order: Order, ticket: Option<TicketType>) -> Result<OrderView, AppError> {
        let attraction = match &ticket {
            Some(t) => self.store.get_attraction(t.attraction_id).await?,
            None => None,
        };
        Ok(OrderView::build(order, ticket.as_ref(), attraction.as_ref()))
    }

    async fn enrich(&self, orders: Vec<Order>) -> Result<Vec<OrderView>, AppError> {
        let mut ticket_ids: Vec<Uuid> = orders.iter().map(|o| o.ticket_id).collect();
        ticket_ids.sort_unstable();
        ticket_ids.dedup();

        let tickets: HashMap<Uuid, TicketType> = self
            .store
            .get_tickets(&ticket_ids)
            .await?
            .into_iter()
            .map(|t| (t.id, t))
            .collect();

        let mut attraction_ids: Vec<Uuid> = tickets.values().map(|t| t.attraction_id).collect();
        attraction_ids.sort_unstable();
        attraction_ids.dedup();

        let attractions: HashMap<Uuid, _> = self
            .store
            .get_attractions(&attraction_ids)
            .await?
            .into_iter()
            .map(|a| (a.id, a))
            .collect();

        Ok(orders
            .into_iter()
            .map(|order| {
                let ticket = tickets.get(&order.ticket_id);
                let attraction = ticket.and_then(|t| attractions.get(&t.attraction_id));
                OrderView::build(order, ticket, attraction)
            })
            .collect())
    }
}
