//! Board service: the thin external-collaborator CRUD surface.
//!
//! The sync engine only ever reads boards (existence checks at join time);
//! creation, listing, and deletion are here for the REST routes.

use uuid::Uuid;

use crate::store::{Board, BoardStore, Element, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error("board not found: {0}")]
    NotFound(Uuid),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Board row plus its current element set and stack depths, mirroring the
/// client's initial detail fetch before the websocket connects.
#[derive(Debug, serde::Serialize)]
pub struct BoardDetail {
    #[serde(flatten)]
    pub board: Board,
    pub elements: Vec<Element>,
    pub undo_depth: usize,
    pub redo_depth: usize,
}

/// Create a new board.
///
/// # Errors
///
/// Returns a store error if the insert fails.
pub async fn create_board(store: &dyn BoardStore, name: &str, owner: &str) -> Result<Board, BoardError> {
    Ok(store.create_board(name, owner).await?)
}

/// List all boards, newest first.
///
/// # Errors
///
/// Returns a store error if the query fails.
pub async fn list_boards(store: &dyn BoardStore) -> Result<Vec<Board>, BoardError> {
    Ok(store.list_boards().await?)
}

/// Fetch one board with its live elements.
///
/// # Errors
///
/// `NotFound` if no such board, or a store error.
pub async fn get_board_detail(store: &dyn BoardStore, board_id: Uuid) -> Result<BoardDetail, BoardError> {
    let Some(board) = store.get_board(board_id).await? else {
        return Err(BoardError::NotFound(board_id));
    };
    let elements = store.list_elements(board_id).await?;
    let undo_depth = store.action_depth(board_id).await?;
    let redo_depth = store.redo_depth(board_id).await?;
    Ok(BoardDetail { board, elements, undo_depth, redo_depth })
}

/// Delete a board and everything scoped to it.
///
/// # Errors
///
/// `NotFound` if no such board, or a store error.
pub async fn delete_board(store: &dyn BoardStore, board_id: Uuid) -> Result<(), BoardError> {
    if !store.delete_board(board_id).await? {
        return Err(BoardError::NotFound(board_id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_helpers;

    #[tokio::test]
    async fn board_crud_round_trip() {
        let state = test_helpers::test_app_state();
        let board = create_board(state.store.as_ref(), "retro", "alice").await.unwrap();
        assert_eq!(board.name, "retro");

        let boards = list_boards(state.store.as_ref()).await.unwrap();
        assert!(boards.iter().any(|b| b.id == board.id));

        let detail = get_board_detail(state.store.as_ref(), board.id).await.unwrap();
        assert!(detail.elements.is_empty());
        assert_eq!(detail.undo_depth, 0);
        assert_eq!(detail.redo_depth, 0);

        delete_board(state.store.as_ref(), board.id).await.unwrap();
        let result = get_board_detail(state.store.as_ref(), board.id).await;
        assert!(matches!(result, Err(BoardError::NotFound(_))));
    }

    #[tokio::test]
    async fn delete_missing_board_is_not_found() {
        let state = test_helpers::test_app_state();
        let result = delete_board(state.store.as_ref(), Uuid::new_v4()).await;
        assert!(matches!(result, Err(BoardError::NotFound(_))));
    }
}
