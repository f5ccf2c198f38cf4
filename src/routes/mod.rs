//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Binds the REST board surface and the websocket endpoint under one Axum
//! router. The websocket path mirrors the client's connection target:
//! `/ws/whiteboard/{board_id}`.

pub mod boards;
pub mod ws;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/board", get(boards::list_boards).post(boards::create_board))
        .route("/api/board/{id}", get(boards::get_board).delete(boards::delete_board))
        .route("/ws/whiteboard/{board_id}", get(ws::handle_ws))
        .route("/healthz", get(healthz))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
