//! REST board CRUD: the external collaborator surface.
//!
//! The sync engine treats boards as pre-existing; these handlers are how they
//! come to exist. Auth is out of scope, so `owner` is taken at face value.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use uuid::Uuid;

use crate::services::board::{self, BoardError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateBoard {
    pub name: String,
    #[serde(default)]
    pub owner: String,
}

fn error_response(err: &BoardError) -> Response {
    match err {
        BoardError::NotFound(_) => (StatusCode::NOT_FOUND, "board not found").into_response(),
        BoardError::Store(e) => {
            tracing::error!(error = %e, "board request failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "store failure").into_response()
        }
    }
}

pub async fn list_boards(State(state): State<AppState>) -> Response {
    match board::list_boards(state.store.as_ref()).await {
        Ok(boards) => Json(boards).into_response(),
        Err(e) => error_response(&e),
    }
}

pub async fn create_board(State(state): State<AppState>, Json(req): Json<CreateBoard>) -> Response {
    match board::create_board(state.store.as_ref(), &req.name, &req.owner).await {
        Ok(created) => (StatusCode::CREATED, Json(created)).into_response(),
        Err(e) => error_response(&e),
    }
}

pub async fn get_board(State(state): State<AppState>, Path(board_id): Path<Uuid>) -> Response {
    match board::get_board_detail(state.store.as_ref(), board_id).await {
        Ok(detail) => Json(detail).into_response(),
        Err(e) => error_response(&e),
    }
}

pub async fn delete_board(State(state): State<AppState>, Path(board_id): Path<Uuid>) -> Response {
    match board::delete_board(state.store.as_ref(), board_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(&e),
    }
}
