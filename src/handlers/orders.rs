use axum::extract::State;
use axum::response::Response;
use serde::Serialize;

use crate::models::{AuthUser, OrderView};
use crate::services::orders::{CreateOrderRequest, OrderQuery, UpdateOrderRequest};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::extract::ApiJson;
use crate::utils::response::success;

/// Orders travel under `ticket`, matching what the frontend reads.
#[derive(Serialize)]
struct OrderPayload {
    ticket: OrderView,
}

pub async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateOrderRequest>,
) -> Result<Response, AppError> {
    let ticket = state.orders.create(user, req).await?;
    Ok(success(OrderPayload { ticket }))
}

pub async fn update_order(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<UpdateOrderRequest>,
) -> Result<Response, AppError> {
    let ticket = state.orders.update(user, req).await?;
    Ok(success(OrderPayload { ticket }))
}

pub async fn query_orders(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(query): ApiJson<OrderQuery>,
) -> Result<Response, AppError> {
    let page = state.orders.query(user, query).await?;
    Ok(success(page))
}
