use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer, Config};
use crate::handlers::{health_check, orders, tickets};
use crate::state::AppState;

fn ticket_routes() -> Router<AppState> {
    Router::new()
        .route("/query", post(tickets::query_tickets))
        .route("/check", post(tickets::check_ticket))
        .route("/add", post(tickets::add_ticket))
        .route("/update", post(tickets::update_ticket))
        .route("/delete", post(tickets::delete_ticket))
}

fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/create", post(orders::create_order))
        .route("/query", post(orders::query_orders))
        .route("/update", post(orders::update_order))
}

pub fn create_routes(state: AppState, config: &Config) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/ticket", ticket_routes())
        .nest("/api/order", order_routes())
        .layer(TraceLayer::new_for_http())
        .layer(create_security_headers_layer(config.production))
        .layer(create_cors_layer(&config.cors_allowed_origins))
        .with_state(state)
}
