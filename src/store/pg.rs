//! Postgres `BoardStore`.
//!
//! DESIGN
//! ======
//! One table per record family, all board-scoped with `ON DELETE CASCADE`
//! from `boards`. The undo and redo stacks share a single `history_entries`
//! table discriminated by a `stack` column; pop is an atomic
//! `DELETE ... RETURNING` of the newest row, so two concurrent pops can never
//! hand out the same entry even before the per-board edit lock is considered.
//!
//! `list_elements` orders by `(created_at, element_id)`, deterministic per
//! call, as the join snapshot requires.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{ActionKind, Board, BoardStore, ChatMessage, Element, ElementKind, HistoryEntry, StoreError};

const STACK_ACTION: &str = "action";
const STACK_REDO: &str = "redo";

/// Durable store backed by the shared SQLx pool.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn push_entry(&self, board_id: Uuid, stack: &str, entry: &HistoryEntry) -> Result<(), StoreError> {
        let snapshot = serde_json::to_value(&entry.snapshot)
            .map_err(|e| StoreError::Corrupt(format!("unserializable snapshot: {e}")))?;
        sqlx::query(
            "INSERT INTO history_entries (board_id, stack, kind, snapshot, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(board_id)
        .bind(stack)
        .bind(entry.kind.as_str())
        .bind(&snapshot)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn pop_entry(&self, board_id: Uuid, stack: &str) -> Result<Option<HistoryEntry>, StoreError> {
        let row = sqlx::query_as::<_, (String, serde_json::Value, i64)>(
            "DELETE FROM history_entries
             WHERE id = (
                 SELECT id FROM history_entries
                 WHERE board_id = $1 AND stack = $2
                 ORDER BY id DESC
                 LIMIT 1
             )
             RETURNING kind, snapshot, created_at",
        )
        .bind(board_id)
        .bind(stack)
        .fetch_optional(&self.pool)
        .await?;

        let Some((kind, snapshot, created_at)) = row else {
            return Ok(None);
        };
        let kind = ActionKind::parse(&kind)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown action kind: {kind}")))?;
        let snapshot: Element = serde_json::from_value(snapshot)
            .map_err(|e| StoreError::Corrupt(format!("bad snapshot: {e}")))?;
        Ok(Some(HistoryEntry { kind, snapshot, created_at }))
    }

    async fn stack_depth(&self, board_id: Uuid, stack: &str) -> Result<usize, StoreError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM history_entries WHERE board_id = $1 AND stack = $2")
                .bind(board_id)
                .bind(stack)
                .fetch_one(&self.pool)
                .await?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

#[async_trait]
impl BoardStore for PgStore {
    async fn get_board(&self, board_id: Uuid) -> Result<Option<Board>, StoreError> {
        let row = sqlx::query_as::<_, (Uuid, String, String, i64)>(
            "SELECT id, name, owner, created_at FROM boards WHERE id = $1",
        )
        .bind(board_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(id, name, owner, created_at)| Board { id, name, owner, created_at }))
    }

    async fn create_board(&self, name: &str, owner: &str) -> Result<Board, StoreError> {
        let board = Board { id: Uuid::new_v4(), name: name.to_owned(), owner: owner.to_owned(), created_at: crate::now_ms() };
        sqlx::query("INSERT INTO boards (id, name, owner, created_at) VALUES ($1, $2, $3, $4)")
            .bind(board.id)
            .bind(&board.name)
            .bind(&board.owner)
            .bind(board.created_at)
            .execute(&self.pool)
            .await?;
        Ok(board)
    }

    async fn list_boards(&self) -> Result<Vec<Board>, StoreError> {
        let rows = sqlx::query_as::<_, (Uuid, String, String, i64)>(
            "SELECT id, name, owner, created_at FROM boards ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(id, name, owner, created_at)| Board { id, name, owner, created_at })
            .collect())
    }

    async fn delete_board(&self, board_id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM boards WHERE id = $1")
            .bind(board_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_element(&self, board_id: Uuid, element: &Element) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO board_elements (element_id, board_id, kind, data, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&element.element_id)
        .bind(board_id)
        .bind(element.kind.as_str())
        .bind(&element.data)
        .bind(crate::now_ms())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if e.as_database_error().is_some_and(|db| db.is_unique_violation()) {
                StoreError::DuplicateElement(element.element_id.clone())
            } else {
                StoreError::Database(e)
            }
        })?;
        Ok(())
    }

    async fn get_element(&self, board_id: Uuid, element_id: &str) -> Result<Option<Element>, StoreError> {
        let row = sqlx::query_as::<_, (String, String, serde_json::Value)>(
            "SELECT element_id, kind, data FROM board_elements WHERE board_id = $1 AND element_id = $2",
        )
        .bind(board_id)
        .bind(element_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(element_from_row).transpose()
    }

    async fn update_element_data(
        &self,
        board_id: Uuid,
        element_id: &str,
        data: &serde_json::Value,
    ) -> Result<bool, StoreError> {
        let result =
            sqlx::query("UPDATE board_elements SET data = $3 WHERE board_id = $1 AND element_id = $2")
                .bind(board_id)
                .bind(element_id)
                .bind(data)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn upsert_element(&self, board_id: Uuid, element: &Element) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO board_elements (element_id, board_id, kind, data, created_at)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (board_id, element_id) DO UPDATE SET kind = EXCLUDED.kind, data = EXCLUDED.data",
        )
        .bind(&element.element_id)
        .bind(board_id)
        .bind(element.kind.as_str())
        .bind(&element.data)
        .bind(crate::now_ms())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_element(&self, board_id: Uuid, element_id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM board_elements WHERE board_id = $1 AND element_id = $2")
            .bind(board_id)
            .bind(element_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_elements(&self, board_id: Uuid) -> Result<Vec<Element>, StoreError> {
        let rows = sqlx::query_as::<_, (String, String, serde_json::Value)>(
            "SELECT element_id, kind, data FROM board_elements
             WHERE board_id = $1
             ORDER BY created_at ASC, element_id ASC",
        )
        .bind(board_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(element_from_row).collect()
    }

    async fn append_chat(&self, board_id: Uuid, message: &ChatMessage) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO chat_messages (board_id, author, body, ts) VALUES ($1, $2, $3, $4)")
            .bind(board_id)
            .bind(&message.user)
            .bind(&message.text)
            .bind(message.timestamp)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_chat(&self, board_id: Uuid) -> Result<Vec<ChatMessage>, StoreError> {
        let rows = sqlx::query_as::<_, (String, String, i64)>(
            "SELECT author, body, ts FROM chat_messages WHERE board_id = $1 ORDER BY ts ASC, id ASC",
        )
        .bind(board_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(user, text, timestamp)| ChatMessage { user, text, timestamp })
            .collect())
    }

    async fn push_action(&self, board_id: Uuid, entry: &HistoryEntry) -> Result<(), StoreError> {
        self.push_entry(board_id, STACK_ACTION, entry).await
    }

    async fn pop_action(&self, board_id: Uuid) -> Result<Option<HistoryEntry>, StoreError> {
        self.pop_entry(board_id, STACK_ACTION).await
    }

    async fn push_redo(&self, board_id: Uuid, entry: &HistoryEntry) -> Result<(), StoreError> {
        self.push_entry(board_id, STACK_REDO, entry).await
    }

    async fn pop_redo(&self, board_id: Uuid) -> Result<Option<HistoryEntry>, StoreError> {
        self.pop_entry(board_id, STACK_REDO).await
    }

    async fn clear_redo(&self, board_id: Uuid) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM history_entries WHERE board_id = $1 AND stack = $2")
            .bind(board_id)
            .bind(STACK_REDO)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn action_depth(&self, board_id: Uuid) -> Result<usize, StoreError> {
        self.stack_depth(board_id, STACK_ACTION).await
    }

    async fn redo_depth(&self, board_id: Uuid) -> Result<usize, StoreError> {
        self.stack_depth(board_id, STACK_REDO).await
    }
}

fn element_from_row((element_id, kind, data): (String, String, serde_json::Value)) -> Result<Element, StoreError> {
    let kind =
        ElementKind::parse(&kind).ok_or_else(|| StoreError::Corrupt(format!("unknown element kind: {kind}")))?;
    Ok(Element { element_id, kind, data })
}
