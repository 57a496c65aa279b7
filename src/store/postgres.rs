use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{FromRow, PgConnection, PgExecutor, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::models::{
    Attraction, NewOrder, Order, OrderFilter, OrderStatus, TicketFilter, TicketType,
};
use crate::services::availability::{ensure_available, remaining};
use crate::services::validation::Pagination;
use crate::store::{AttractionLookup, OrderStore, TicketStore};
use crate::utils::error::AppError;

const TICKET_COLUMNS: &str =
    "id, attraction_id, name, daily_capacity, unit_price, status, created_at, updated_at";
const ORDER_COLUMNS: &str =
    "id, user_id, ticket_id, quantity, date, status, total_price, created_at, updated_at";

#[derive(FromRow)]
struct TicketRow {
    id: Uuid,
    attraction_id: Uuid,
    name: String,
    daily_capacity: i32,
    unit_price: Decimal,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TicketRow> for TicketType {
    type Error = AppError;

    fn try_from(row: TicketRow) -> Result<Self, Self::Error> {
        let status = row.status.parse().map_err(|_| {
            AppError::InternalServerError(format!("unknown ticket status '{}'", row.status))
        })?;
        Ok(TicketType {
            id: row.id,
            attraction_id: row.attraction_id,
            name: row.name,
            daily_capacity: row.daily_capacity,
            unit_price: row.unit_price,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: Uuid,
    ticket_id: Uuid,
    quantity: i32,
    date: NaiveDate,
    status: String,
    total_price: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = AppError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status = row.status.parse().map_err(|_| {
            AppError::InternalServerError(format!("unknown order status '{}'", row.status))
        })?;
        Ok(Order {
            id: row.id,
            user_id: row.user_id,
            ticket_id: row.ticket_id,
            quantity: row.quantity,
            date: row.date,
            status,
            total_price: row.total_price,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn collect<R, T>(rows: Vec<R>) -> Result<Vec<T>, AppError>
where
    T: TryFrom<R, Error = AppError>,
{
    rows.into_iter().map(T::try_from).collect()
}

fn unique_to_conflict(err: sqlx::Error, name: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => AppError::Conflict(format!(
            "Ticket type '{name}' already exists for this attraction"
        )),
        _ => AppError::DatabaseError(err),
    }
}

async fn sum_sold<'e, E>(
    executor: E,
    ticket_id: Uuid,
    date: NaiveDate,
    excluding: Option<Uuid>,
) -> Result<i64, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let (sold,): (i64,) = sqlx::query_as(
        "SELECT COALESCE(SUM(quantity), 0)::BIGINT FROM orders
         WHERE ticket_id = $1 AND date = $2 AND status = 'success'
           AND ($3::UUID IS NULL OR id <> $3)",
    )
    .bind(ticket_id)
    .bind(date)
    .bind(excluding)
    .fetch_one(executor)
    .await?;

    Ok(sold)
}

/// Locks the ticket type row for the rest of the transaction and returns its
/// current capacity. Commitments against one ticket type queue up here.
async fn lock_capacity(conn: &mut PgConnection, ticket_id: Uuid) -> Result<Option<i32>, sqlx::Error> {
    let row: Option<(i32,)> =
        sqlx::query_as("SELECT daily_capacity FROM ticket_types WHERE id = $1 FOR UPDATE")
            .bind(ticket_id)
            .fetch_optional(conn)
            .await?;

    Ok(row.map(|(capacity,)| capacity))
}

fn push_ticket_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &TicketFilter) {
    qb.push(" WHERE TRUE");
    if let Some(attraction_id) = filter.attraction_id {
        qb.push(" AND attraction_id = ").push_bind(attraction_id);
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
}

fn push_order_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &OrderFilter) {
    qb.push(" WHERE TRUE");
    if let Some(user_id) = filter.user_id {
        qb.push(" AND user_id = ").push_bind(user_id);
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(ticket_ids) = &filter.ticket_ids {
        qb.push(" AND ticket_id = ANY(")
            .push_bind(ticket_ids.clone())
            .push(")");
    }
    if let Some(start) = filter.start_date {
        qb.push(" AND date >= ").push_bind(start);
    }
    if let Some(end) = filter.end_date {
        qb.push(" AND date <= ").push_bind(end);
    }
}

/// PostgreSQL backend. Order commits lock the ticket type row, so the
/// availability check and the write it guards cannot interleave with
/// another commitment on the same ticket type.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::migrate!()
            .run(&self.pool)
            .await
            .map_err(|e| AppError::InternalServerError(format!("migration failed: {e}")))
    }
}

#[async_trait]
impl AttractionLookup for PgStore {
    async fn get_attraction(&self, id: Uuid) -> Result<Option<Attraction>, AppError> {
        let attraction =
            sqlx::query_as::<_, Attraction>("SELECT id, name, created_at FROM attractions WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(attraction)
    }

    async fn get_attractions(&self, ids: &[Uuid]) -> Result<Vec<Attraction>, AppError> {
        let attractions = sqlx::query_as::<_, Attraction>(
            "SELECT id, name, created_at FROM attractions WHERE id = ANY($1)",
        )
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await?;
        Ok(attractions)
    }
}

#[async_trait]
impl TicketStore for PgStore {
    async fn get_ticket(&self, id: Uuid) -> Result<Option<TicketType>, AppError> {
        let row = sqlx::query_as::<_, TicketRow>(&format!(
            "SELECT {TICKET_COLUMNS} FROM ticket_types WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(TicketType::try_from).transpose()
    }

    async fn get_tickets(&self, ids: &[Uuid]) -> Result<Vec<TicketType>, AppError> {
        let rows = sqlx::query_as::<_, TicketRow>(&format!(
            "SELECT {TICKET_COLUMNS} FROM ticket_types WHERE id = ANY($1)"
        ))
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }

    async fn find_ticket_by_name(
        &self,
        attraction_id: Uuid,
        name: &str,
    ) -> Result<Option<TicketType>, AppError> {
        let row = sqlx::query_as::<_, TicketRow>(&format!(
            "SELECT {TICKET_COLUMNS} FROM ticket_types WHERE attraction_id = $1 AND name = $2"
        ))
        .bind(attraction_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        row.map(TicketType::try_from).transpose()
    }

    async fn list_tickets(
        &self,
        filter: &TicketFilter,
        page: Pagination,
    ) -> Result<(i64, Vec<TicketType>), AppError> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM ticket_types");
        push_ticket_filter(&mut count, filter);
        let (total,): (i64,) = count.build_query_as().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::new(format!("SELECT {TICKET_COLUMNS} FROM ticket_types"));
        push_ticket_filter(&mut select, filter);
        select
            .push(" ORDER BY name ASC, id ASC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let rows: Vec<TicketRow> = select.build_query_as().fetch_all(&self.pool).await?;

        Ok((total, collect(rows)?))
    }

    async fn ticket_ids_for_attraction(&self, attraction_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        let ids: Vec<(Uuid,)> = sqlx::query_as("SELECT id FROM ticket_types WHERE attraction_id = $1")
            .bind(attraction_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids.into_iter().map(|(id,)| id).collect())
    }

    async fn insert_ticket(&self, ticket: &TicketType) -> Result<TicketType, AppError> {
        let row = sqlx::query_as::<_, TicketRow>(&format!(
            "INSERT INTO ticket_types ({TICKET_COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {TICKET_COLUMNS}"
        ))
        .bind(ticket.id)
        .bind(ticket.attraction_id)
        .bind(&ticket.name)
        .bind(ticket.daily_capacity)
        .bind(ticket.unit_price)
        .bind(ticket.status.as_str())
        .bind(ticket.created_at)
        .bind(ticket.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_to_conflict(e, &ticket.name))?;
        TicketType::try_from(row)
    }

    async fn update_ticket(&self, ticket: &TicketType) -> Result<TicketType, AppError> {
        let row = sqlx::query_as::<_, TicketRow>(&format!(
            "UPDATE ticket_types
             SET name = $2, daily_capacity = $3, unit_price = $4, status = $5, updated_at = NOW()
             WHERE id = $1
             RETURNING {TICKET_COLUMNS}"
        ))
        .bind(ticket.id)
        .bind(&ticket.name)
        .bind(ticket.daily_capacity)
        .bind(ticket.unit_price)
        .bind(ticket.status.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| unique_to_conflict(e, &ticket.name))?
        .ok_or(AppError::TicketNotFound)?;
        TicketType::try_from(row)
    }

    async fn delete_ticket(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM ticket_types WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, AppError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Order::try_from).transpose()
    }

    async fn sold_quantity(
        &self,
        ticket_id: Uuid,
        date: NaiveDate,
        excluding: Option<Uuid>,
    ) -> Result<i64, AppError> {
        Ok(sum_sold(&self.pool, ticket_id, date, excluding).await?)
    }

    async fn count_ticket_orders(
        &self,
        ticket_id: Uuid,
        status: Option<OrderStatus>,
    ) -> Result<i64, AppError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM orders WHERE ticket_id = $1 AND ($2::TEXT IS NULL OR status = $2)",
        )
        .bind(ticket_id)
        .bind(status.map(|s| s.as_str()))
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn list_orders(
        &self,
        filter: &OrderFilter,
        page: Pagination,
    ) -> Result<(i64, Vec<Order>), AppError> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM orders");
        push_order_filter(&mut count, filter);
        let (total,): (i64,) = count.build_query_as().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::new(format!("SELECT {ORDER_COLUMNS} FROM orders"));
        push_order_filter(&mut select, filter);
        select
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let rows: Vec<OrderRow> = select.build_query_as().fetch_all(&self.pool).await?;

        Ok((total, collect(rows)?))
    }

    async fn commit_new(&self, draft: NewOrder, capacity: i32) -> Result<Order, AppError> {
        let mut tx = self.pool.begin().await?;

        let capacity = lock_capacity(&mut tx, draft.ticket_id)
            .await?
            .unwrap_or(capacity);
        let sold = sum_sold(&mut *tx, draft.ticket_id, draft.date, None).await?;
        ensure_available(remaining(capacity, sold), draft.quantity)?;

        let order = draft.into_order();
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "INSERT INTO orders ({ORDER_COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(order.id)
        .bind(order.user_id)
        .bind(order.ticket_id)
        .bind(order.quantity)
        .bind(order.date)
        .bind(order.status.as_str())
        .bind(order.total_price)
        .bind(order.created_at)
        .bind(order.updated_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Order::try_from(row)
    }

    async fn commit_update(&self, order: Order, capacity: Option<i32>) -> Result<Order, AppError> {
        let mut tx = self.pool.begin().await?;

        if let Some(capacity) = capacity {
            let capacity = lock_capacity(&mut tx, order.ticket_id)
                .await?
                .unwrap_or(capacity);
            let sold = sum_sold(&mut *tx, order.ticket_id, order.date, Some(order.id)).await?;
            ensure_available(remaining(capacity, sold), order.quantity)?;
        }

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "UPDATE orders
             SET ticket_id = $2, quantity = $3, date = $4, status = $5, total_price = $6,
                 updated_at = NOW()
             WHERE id = $1 AND status = $7
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(order.id)
        .bind(order.ticket_id)
        .bind(order.quantity)
        .bind(order.date)
        .bind(order.status.as_str())
        .bind(order.total_price)
        .bind(OrderStatus::Success.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        // No row means the order was cancelled after the caller read it.
        let Some(row) = row else {
            let exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS (SELECT 1 FROM orders WHERE id = $1)",
            )
            .bind(order.id)
            .fetch_one(&mut *tx)
            .await?;
            return Err(if exists {
                AppError::OrderAlreadyCancelled
            } else {
                AppError::OrderNotFound
            });
        };

        tx.commit().await?;
        Order::try_from(row)
    }
}
