//! Persistence collaborator: domain types and the `BoardStore` trait.
//!
//! ARCHITECTURE
//! ============
//! The engine never talks to a database directly. Everything durable goes
//! through `BoardStore`, a board-scoped record store with two implementations:
//! Postgres (`pg`) for production and an in-memory map (`memory`) for tests
//! and DATABASE_URL-less dev mode.
//!
//! The store is deliberately dumb: plain keyed CRUD plus LIFO stack push/pop
//! for the undo and redo logs. Atomicity of the compound undo/redo sequences
//! is provided above the store by the per-board edit lock in `rooms`.

pub mod memory;
pub mod pg;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("duplicate element: {0}")]
    DuplicateElement(String),
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Board row. Created by the REST collaborator, referenced by the core.
#[derive(Debug, Clone, Serialize)]
pub struct Board {
    pub id: Uuid,
    pub name: String,
    pub owner: String,
    /// Milliseconds since Unix epoch.
    pub created_at: i64,
}

/// Drawable element kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Rectangle,
    Text,
    Line,
    #[serde(rename = "freehand-path")]
    FreehandPath,
}

impl ElementKind {
    /// Text form used in wire payloads and database rows.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rectangle => "rectangle",
            Self::Text => "text",
            Self::Line => "line",
            Self::FreehandPath => "freehand-path",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "rectangle" => Some(Self::Rectangle),
            "text" => Some(Self::Text),
            "line" => Some(Self::Line),
            "freehand-path" => Some(Self::FreehandPath),
            _ => None,
        }
    }
}

/// A single drawable object on a board.
///
/// `element_id` is caller-supplied (clients generate their own ids so they
/// can render optimistically before the round trip) or engine-generated.
/// `data` is an open map of kind-specific properties: points, color,
/// position, and whatever else the client renderer understands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Element {
    pub element_id: String,
    #[serde(rename = "type")]
    pub kind: ElementKind,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Append-only chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub user: String,
    pub text: String,
    /// Milliseconds since Unix epoch.
    pub timestamp: i64,
}

/// The mutating operation an undo stack entry inverts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Add,
    Delete,
    Draw,
}

impl ActionKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Delete => "delete",
            Self::Draw => "draw",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "add" => Some(Self::Add),
            "delete" => Some(Self::Delete),
            "draw" => Some(Self::Draw),
            _ => None,
        }
    }
}

/// One entry on the action (undo) or redo stack.
///
/// The snapshot captures the element at action-record time: enough to
/// recreate it (for undoing a delete) or to name it for deletion (for
/// undoing an add or draw).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub kind: ActionKind,
    pub snapshot: Element,
    /// Milliseconds since Unix epoch; stacks are LIFO, newest first.
    pub created_at: i64,
}

// =============================================================================
// STORE TRAIT
// =============================================================================

/// Board-scoped transactional record store.
///
/// All operations are scoped to a single board. `pop_*` operations remove and
/// return the most recent entry, or `None` when the stack is empty.
#[async_trait]
pub trait BoardStore: Send + Sync {
    // Boards (external CRUD collaborator surface).
    async fn get_board(&self, board_id: Uuid) -> Result<Option<Board>, StoreError>;
    async fn create_board(&self, name: &str, owner: &str) -> Result<Board, StoreError>;
    async fn list_boards(&self) -> Result<Vec<Board>, StoreError>;
    /// Returns `false` if no such board existed.
    async fn delete_board(&self, board_id: Uuid) -> Result<bool, StoreError>;

    // Elements.
    /// Fails with `DuplicateElement` if the id is already taken on this board.
    async fn create_element(&self, board_id: Uuid, element: &Element) -> Result<(), StoreError>;
    async fn get_element(&self, board_id: Uuid, element_id: &str) -> Result<Option<Element>, StoreError>;
    /// Replace an element's `data`. Returns `false` if the element is gone.
    async fn update_element_data(
        &self,
        board_id: Uuid,
        element_id: &str,
        data: &serde_json::Value,
    ) -> Result<bool, StoreError>;
    /// Create-or-replace from a snapshot. Used by redo and by undoing a delete.
    async fn upsert_element(&self, board_id: Uuid, element: &Element) -> Result<(), StoreError>;
    /// Returns `false` if the element was already gone.
    async fn delete_element(&self, board_id: Uuid, element_id: &str) -> Result<bool, StoreError>;
    /// Every live element, in a deterministic per-call order.
    async fn list_elements(&self, board_id: Uuid) -> Result<Vec<Element>, StoreError>;

    // Chat.
    async fn append_chat(&self, board_id: Uuid, message: &ChatMessage) -> Result<(), StoreError>;
    /// Full chat history, ascending by timestamp.
    async fn list_chat(&self, board_id: Uuid) -> Result<Vec<ChatMessage>, StoreError>;

    // Undo / redo stacks.
    async fn push_action(&self, board_id: Uuid, entry: &HistoryEntry) -> Result<(), StoreError>;
    async fn pop_action(&self, board_id: Uuid) -> Result<Option<HistoryEntry>, StoreError>;
    async fn push_redo(&self, board_id: Uuid, entry: &HistoryEntry) -> Result<(), StoreError>;
    async fn pop_redo(&self, board_id: Uuid) -> Result<Option<HistoryEntry>, StoreError>;
    async fn clear_redo(&self, board_id: Uuid) -> Result<(), StoreError>;

    // Stack depths, used by tests and the REST board detail view.
    async fn action_depth(&self, board_id: Uuid) -> Result<usize, StoreError>;
    async fn redo_depth(&self, board_id: Uuid) -> Result<usize, StoreError>;
}
