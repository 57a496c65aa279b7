use axum::extract::State;
use axum::response::Response;
use serde::Serialize;

use crate::auth::AdminUser;
use crate::models::TicketType;
use crate::services::catalog::{
    CheckTicketRequest, CreateTicketRequest, DeleteTicketRequest, TicketQuery, UpdateTicketRequest,
};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::extract::ApiJson;
use crate::utils::response::success;

#[derive(Serialize)]
struct TicketPayload<T: Serialize> {
    ticket: T,
}

pub async fn query_tickets(
    State(state): State<AppState>,
    ApiJson(query): ApiJson<TicketQuery>,
) -> Result<Response, AppError> {
    let page = state.catalog.list_ticket_types(query).await?;
    Ok(success(page))
}

pub async fn check_ticket(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CheckTicketRequest>,
) -> Result<Response, AppError> {
    let ticket = state.catalog.check_availability(req).await?;
    Ok(success(TicketPayload { ticket }))
}

pub async fn add_ticket(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiJson(req): ApiJson<CreateTicketRequest>,
) -> Result<Response, AppError> {
    tracing::debug!(admin_id = %admin.id, "Creating ticket type");
    let ticket: TicketType = state.catalog.create_ticket_type(req).await?;
    Ok(success(TicketPayload { ticket }))
}

pub async fn update_ticket(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiJson(req): ApiJson<UpdateTicketRequest>,
) -> Result<Response, AppError> {
    tracing::debug!(admin_id = %admin.id, "Updating ticket type");
    let ticket = state.catalog.update_ticket_type(req).await?;
    Ok(success(TicketPayload { ticket }))
}

pub async fn delete_ticket(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiJson(req): ApiJson<DeleteTicketRequest>,
) -> Result<Response, AppError> {
    tracing::debug!(admin_id = %admin.id, "Removing ticket type");
    let removal = state.catalog.retire_or_delete(req).await?;
    Ok(success(removal))
}
