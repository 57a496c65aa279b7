use std::net::SocketAddr;
use std::sync::Arc;

use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use attraction_ticketing_server::auth::JwtKeys;
use attraction_ticketing_server::config::Config;
use attraction_ticketing_server::models::Attraction;
use attraction_ticketing_server::routes::create_routes;
use attraction_ticketing_server::services::SystemClock;
use attraction_ticketing_server::state::AppState;
use attraction_ticketing_server::store::{MemoryStore, PgStore, Store};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

async fn open_store(config: &Config) -> Result<Arc<dyn Store>, BoxError> {
    match &config.database_url {
        Some(url) => {
            let store = PgStore::connect(url, config.max_connections).await?;
            tracing::info!("Successfully connected to database");

            store.migrate().await?;
            tracing::info!("Migrations run successfully");
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store; data is lost on restart");
            let store = MemoryStore::new();
            for name in &config.seed_attractions {
                let attraction = store.add_attraction(Attraction::new(name.as_str())).await;
                tracing::info!(attraction_id = %attraction.id, name = %attraction.name, "Seeded attraction");
            }
            Ok(Arc::new(store))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    let store = open_store(&config).await?;

    let state = AppState::new(
        store,
        Arc::new(SystemClock),
        config.order_policy(),
        JwtKeys::new(config.jwt_secret.as_bytes()),
    );
    let app = create_routes(state, &config);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server running at http://{}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
