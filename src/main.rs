mod db;
mod event;
mod rooms;
mod routes;
mod services;
mod state;
mod store;

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::store::BoardStore;

/// Current time as milliseconds since Unix epoch.
pub(crate) fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()
        .expect("invalid PORT");

    // Postgres when configured, in-memory otherwise (non-durable dev mode).
    let store: Arc<dyn BoardStore> = match std::env::var("DATABASE_URL") {
        Ok(url) => {
            let pool = db::init_pool(&url).await.expect("database init failed");
            tracing::info!("using postgres store");
            Arc::new(store::pg::PgStore::new(pool))
        }
        Err(_) => {
            tracing::warn!("DATABASE_URL not set; using in-memory store, boards will not survive restart");
            Arc::new(store::memory::MemoryStore::new())
        }
    };

    let state = state::AppState::new(store);
    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "chalkboard listening");
    axum::serve(listener, app).await.expect("server failed");
}
