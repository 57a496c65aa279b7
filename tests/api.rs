use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::{Duration, NaiveDate};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use attraction_ticketing_server::auth::JwtKeys;
use attraction_ticketing_server::config::Config;
use attraction_ticketing_server::models::{Attraction, AuthUser};
use attraction_ticketing_server::routes::create_routes;
use attraction_ticketing_server::services::{FixedClock, OrderPolicy};
use attraction_ticketing_server::state::AppState;
use attraction_ticketing_server::store::MemoryStore;

const SECRET: &[u8] = b"integration-secret";

struct TestApp {
    router: Router,
    keys: JwtKeys,
    attraction: Attraction,
    admin: AuthUser,
    user: AuthUser,
}

impl TestApp {
    async fn new() -> Self {
        let store = MemoryStore::new();
        let attraction = store.add_attraction(Attraction::new("Old Town Museum")).await;
        let keys = JwtKeys::new(SECRET);
        let today = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();

        let state = AppState::new(
            Arc::new(store),
            Arc::new(FixedClock(today)),
            OrderPolicy::default(),
            keys.clone(),
        );
        let config = Config::from_lookup(|key| match key {
            "JWT_SECRET" => Some("integration-secret".to_string()),
            _ => None,
        })
        .unwrap();

        Self {
            router: create_routes(state, &config),
            keys,
            attraction,
            admin: AuthUser::admin(Uuid::new_v4()),
            user: AuthUser::user(Uuid::new_v4()),
        }
    }

    fn token(&self, user: AuthUser) -> String {
        self.keys.issue(user, Duration::hours(1)).unwrap()
    }

    async fn send(&self, uri: &str, auth: Option<AuthUser>, body: String) -> (StatusCode, Value) {
        let mut request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(user) = auth {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", self.token(user)));
        }

        let response = self
            .router
            .clone()
            .oneshot(request.body(Body::from(body)).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn post(&self, uri: &str, auth: Option<AuthUser>, body: Value) -> Value {
        let (status, value) = self.send(uri, auth, body.to_string()).await;
        assert_eq!(status, StatusCode::OK, "{value}");
        value
    }

    async fn add_ticket(&self, name: &str, capacity: i64, price: &str) -> Value {
        let body = json!({
            "attraction_id": self.attraction.id,
            "name": name,
            "daily_capacity": capacity,
            "unit_price": price,
        });
        let response = self.post("/api/ticket/add", Some(self.admin), body).await;
        assert_eq!(response["code"], 0, "{response}");
        response["data"]["ticket"].clone()
    }
}

#[tokio::test]
async fn health_check_is_public() {
    let app = TestApp::new().await;
    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["code"], 0);
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn order_routes_require_a_token() {
    let app = TestApp::new().await;
    let body = app.post("/api/order/query", None, json!({})).await;
    assert_eq!(body["code"], 2001);
    assert_eq!(body["data"], Value::Null);

    let forged = JwtKeys::new(b"someone-else")
        .issue(app.user, Duration::hours(1))
        .unwrap();
    let request = Request::builder()
        .method("POST")
        .uri("/api/order/query")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {forged}"))
        .body(Body::from("{}"))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["code"], 2001);
}

#[tokio::test]
async fn ticket_admin_routes_reject_regular_users() {
    let app = TestApp::new().await;
    let body = json!({
        "attraction_id": app.attraction.id,
        "name": "Adult",
        "daily_capacity": 10,
        "unit_price": "20.00",
    });

    let response = app.post("/api/ticket/add", Some(app.user), body).await;
    assert_eq!(response["code"], 2001);
}

#[tokio::test]
async fn malformed_json_is_a_validation_error() {
    let app = TestApp::new().await;
    let (status, body) = app
        .send("/api/order/create", Some(app.user), "{\"quantity\": ".to_string())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 1001);

    let (_, body) = app
        .send(
            "/api/order/create",
            Some(app.user),
            json!({ "ticket_id": Uuid::new_v4(), "quantity": "two", "date": "2099-01-01" })
                .to_string(),
        )
        .await;
    assert_eq!(body["code"], 1001);
}

#[tokio::test]
async fn duplicate_ticket_name_conflicts() {
    let app = TestApp::new().await;
    app.add_ticket("Adult", 10, "20.00").await;

    let body = json!({
        "attraction_id": app.attraction.id,
        "name": "Adult",
        "daily_capacity": 5,
        "unit_price": "10.00",
    });
    let response = app.post("/api/ticket/add", Some(app.admin), body).await;
    assert_eq!(response["code"], 1002);
}

#[tokio::test]
async fn capacity_is_shared_until_an_order_is_cancelled() {
    let app = TestApp::new().await;
    let ticket = app.add_ticket("Adult", 2, "50.00").await;
    let ticket_id = ticket["id"].clone();
    let other = AuthUser::user(Uuid::new_v4());

    let first = app
        .post(
            "/api/order/create",
            Some(app.user),
            json!({ "ticket_id": ticket_id, "quantity": 2, "date": "2099-01-01" }),
        )
        .await;
    assert_eq!(first["code"], 0, "{first}");
    assert_eq!(first["data"]["ticket"]["total_price"], "100.00");
    assert_eq!(first["data"]["ticket"]["status"], "success");
    assert_eq!(first["data"]["ticket"]["attraction_name"], "Old Town Museum");
    let order_id = first["data"]["ticket"]["order_id"].clone();

    let sold_out = app
        .post(
            "/api/order/create",
            Some(other),
            json!({ "ticket_id": ticket_id, "quantity": 1, "date": "2099-01-01" }),
        )
        .await;
    assert_eq!(sold_out["code"], 1005);

    let check = app
        .post(
            "/api/ticket/check",
            None,
            json!({ "ticket_id": ticket_id, "date": "2099-01-01" }),
        )
        .await;
    assert_eq!(check["data"]["ticket"]["available"], 0);

    let cancelled = app
        .post(
            "/api/order/update",
            Some(app.user),
            json!({ "order_id": order_id, "status": "cancelled" }),
        )
        .await;
    assert_eq!(cancelled["code"], 0, "{cancelled}");
    assert_eq!(cancelled["data"]["ticket"]["status"], "cancelled");
    assert_eq!(cancelled["data"]["ticket"]["total_price"], "0.00");

    let retry = app
        .post(
            "/api/order/create",
            Some(other),
            json!({ "ticket_id": ticket_id, "quantity": 1, "date": "2099-01-01" }),
        )
        .await;
    assert_eq!(retry["code"], 0, "{retry}");
    assert_eq!(retry["data"]["ticket"]["total_price"], "50.00");

    let again = app
        .post(
            "/api/order/update",
            Some(app.user),
            json!({ "order_id": order_id, "quantity": 1 }),
        )
        .await;
    assert_eq!(again["code"], 1007);
}

#[tokio::test]
async fn past_and_impossible_dates_are_rejected() {
    let app = TestApp::new().await;
    let ticket = app.add_ticket("Child", 5, "12.50").await;

    for date in ["2026-05-31", "2025-02-30", "2026/07/01"] {
        let response = app
            .post(
                "/api/order/create",
                Some(app.user),
                json!({ "ticket_id": ticket["id"], "quantity": 1, "date": date }),
            )
            .await;
        assert_eq!(response["code"], 1001, "{date}");
    }
}

#[tokio::test]
async fn users_only_see_and_edit_their_own_orders() {
    let app = TestApp::new().await;
    let ticket = app.add_ticket("Adult", 10, "20.00").await;
    let order = app
        .post(
            "/api/order/create",
            Some(app.user),
            json!({ "ticket_id": ticket["id"], "quantity": 1, "date": "2026-06-10" }),
        )
        .await;
    let order_id = order["data"]["ticket"]["order_id"].clone();

    let stranger = AuthUser::user(Uuid::new_v4());
    let listed = app.post("/api/order/query", Some(stranger), json!({})).await;
    assert_eq!(listed["data"]["total"], 0);

    let edit = app
        .post(
            "/api/order/update",
            Some(stranger),
            json!({ "order_id": order_id, "quantity": 2 }),
        )
        .await;
    assert_eq!(edit["code"], 2001);

    let admin_view = app.post("/api/order/query", Some(app.admin), json!({})).await;
    assert_eq!(admin_view["data"]["total"], 1);
    assert_eq!(admin_view["data"]["page_size"], 10);
}

#[tokio::test]
async fn referenced_ticket_types_are_retired_not_deleted() {
    let app = TestApp::new().await;
    let used = app.add_ticket("Adult", 10, "20.00").await;
    let unused = app.add_ticket("Senior", 10, "15.00").await;
    app.post(
        "/api/order/create",
        Some(app.user),
        json!({ "ticket_id": used["id"], "quantity": 1, "date": "2026-06-10" }),
    )
    .await;

    let retired = app
        .post("/api/ticket/delete", Some(app.admin), json!({ "id": used["id"] }))
        .await;
    assert_eq!(retired["data"]["outcome"], "retired");
    assert_eq!(retired["data"]["ticket"]["status"], "inactive");

    let deleted = app
        .post("/api/ticket/delete", Some(app.admin), json!({ "id": unused["id"] }))
        .await;
    assert_eq!(deleted["data"]["outcome"], "deleted");

    let listed = app
        .post(
            "/api/ticket/query",
            None,
            json!({ "attraction_id": app.attraction.id }),
        )
        .await;
    assert_eq!(listed["data"]["total"], 1);
}
