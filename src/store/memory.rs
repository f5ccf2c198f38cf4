//! In-memory `BoardStore`.
//!
//! DESIGN
//! ======
//! Plain maps and vectors behind one `RwLock`. Elements keep insertion order
//! so `list_elements` is deterministic per call, stacks are `Vec` with push
//! and pop at the tail. Used by the test suite and as the dev-mode store when
//! `DATABASE_URL` is not set; contents vanish on shutdown.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Board, BoardStore, ChatMessage, Element, HistoryEntry, StoreError};

struct BoardRecords {
    board: Board,
    elements: Vec<Element>,
    chat: Vec<ChatMessage>,
    actions: Vec<HistoryEntry>,
    redo: Vec<HistoryEntry>,
}

impl BoardRecords {
    fn new(board: Board) -> Self {
        Self { board, elements: Vec::new(), chat: Vec::new(), actions: Vec::new(), redo: Vec::new() }
    }
}

/// Non-durable store backed by process memory.
#[derive(Default)]
pub struct MemoryStore {
    boards: RwLock<HashMap<Uuid, BoardRecords>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BoardStore for MemoryStore {
    async fn get_board(&self, board_id: Uuid) -> Result<Option<Board>, StoreError> {
        let boards = self.boards.read().await;
        Ok(boards.get(&board_id).map(|r| r.board.clone()))
    }

    async fn create_board(&self, name: &str, owner: &str) -> Result<Board, StoreError> {
        let board = Board {
            id: Uuid::new_v4(),
            name: name.to_owned(),
            owner: owner.to_owned(),
            created_at: crate::now_ms(),
        };
        let mut boards = self.boards.write().await;
        boards.insert(board.id, BoardRecords::new(board.clone()));
        Ok(board)
    }

    async fn list_boards(&self) -> Result<Vec<Board>, StoreError> {
        let boards = self.boards.read().await;
        let mut rows: Vec<Board> = boards.values().map(|r| r.board.clone()).collect();
        rows.sort_by_key(|b| std::cmp::Reverse(b.created_at));
        Ok(rows)
    }

    async fn delete_board(&self, board_id: Uuid) -> Result<bool, StoreError> {
        let mut boards = self.boards.write().await;
        Ok(boards.remove(&board_id).is_some())
    }

    async fn create_element(&self, board_id: Uuid, element: &Element) -> Result<(), StoreError> {
        let mut boards = self.boards.write().await;
        if let Some(records) = boards.get_mut(&board_id) {
            if records.elements.iter().any(|e| e.element_id == element.element_id) {
                return Err(StoreError::DuplicateElement(element.element_id.clone()));
            }
            records.elements.push(element.clone());
        }
        Ok(())
    }

    async fn get_element(&self, board_id: Uuid, element_id: &str) -> Result<Option<Element>, StoreError> {
        let boards = self.boards.read().await;
        Ok(boards
            .get(&board_id)
            .and_then(|r| r.elements.iter().find(|e| e.element_id == element_id).cloned()))
    }

    async fn update_element_data(
        &self,
        board_id: Uuid,
        element_id: &str,
        data: &serde_json::Value,
    ) -> Result<bool, StoreError> {
        let mut boards = self.boards.write().await;
        let Some(records) = boards.get_mut(&board_id) else {
            return Ok(false);
        };
        match records.elements.iter_mut().find(|e| e.element_id == element_id) {
            Some(element) => {
                element.data = data.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn upsert_element(&self, board_id: Uuid, element: &Element) -> Result<(), StoreError> {
        let mut boards = self.boards.write().await;
        let Some(records) = boards.get_mut(&board_id) else {
            return Ok(());
        };
        match records.elements.iter_mut().find(|e| e.element_id == element.element_id) {
            Some(existing) => *existing = element.clone(),
            None => records.elements.push(element.clone()),
        }
        Ok(())
    }

    async fn delete_element(&self, board_id: Uuid, element_id: &str) -> Result<bool, StoreError> {
        let mut boards = self.boards.write().await;
        let Some(records) = boards.get_mut(&board_id) else {
            return Ok(false);
        };
        let before = records.elements.len();
        records.elements.retain(|e| e.element_id != element_id);
        Ok(records.elements.len() < before)
    }

    async fn list_elements(&self, board_id: Uuid) -> Result<Vec<Element>, StoreError> {
        let boards = self.boards.read().await;
        Ok(boards.get(&board_id).map(|r| r.elements.clone()).unwrap_or_default())
    }

    async fn append_chat(&self, board_id: Uuid, message: &ChatMessage) -> Result<(), StoreError> {
        let mut boards = self.boards.write().await;
        if let Some(records) = boards.get_mut(&board_id) {
            records.chat.push(message.clone());
        }
        Ok(())
    }

    async fn list_chat(&self, board_id: Uuid) -> Result<Vec<ChatMessage>, StoreError> {
        let boards = self.boards.read().await;
        let mut messages = boards.get(&board_id).map(|r| r.chat.clone()).unwrap_or_default();
        messages.sort_by_key(|m| m.timestamp);
        Ok(messages)
    }

    async fn push_action(&self, board_id: Uuid, entry: &HistoryEntry) -> Result<(), StoreError> {
        let mut boards = self.boards.write().await;
        if let Some(records) = boards.get_mut(&board_id) {
            records.actions.push(entry.clone());
        }
        Ok(())
    }

    async fn pop_action(&self, board_id: Uuid) -> Result<Option<HistoryEntry>, StoreError> {
        let mut boards = self.boards.write().await;
        Ok(boards.get_mut(&board_id).and_then(|r| r.actions.pop()))
    }

    async fn push_redo(&self, board_id: Uuid, entry: &HistoryEntry) -> Result<(), StoreError> {
        let mut boards = self.boards.write().await;
        if let Some(records) = boards.get_mut(&board_id) {
            records.redo.push(entry.clone());
        }
        Ok(())
    }

    async fn pop_redo(&self, board_id: Uuid) -> Result<Option<HistoryEntry>, StoreError> {
        let mut boards = self.boards.write().await;
        Ok(boards.get_mut(&board_id).and_then(|r| r.redo.pop()))
    }

    async fn clear_redo(&self, board_id: Uuid) -> Result<(), StoreError> {
        let mut boards = self.boards.write().await;
        if let Some(records) = boards.get_mut(&board_id) {
            records.redo.clear();
        }
        Ok(())
    }

    async fn action_depth(&self, board_id: Uuid) -> Result<usize, StoreError> {
        let boards = self.boards.read().await;
        Ok(boards.get(&board_id).map_or(0, |r| r.actions.len()))
    }

    async fn redo_depth(&self, board_id: Uuid) -> Result<usize, StoreError> {
        let boards = self.boards.read().await;
        Ok(boards.get(&board_id).map_or(0, |r| r.redo.len()))
    }
}
