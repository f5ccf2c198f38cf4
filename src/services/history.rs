//! Undo/redo: pop, invert or reapply, and the stack bookkeeping around it.
//!
//! DESIGN
//! ======
//! `undo` pops the action log, parks the entry on the redo log unchanged, and
//! applies the structural inverse. `redo` pops the redo log, reapplies the
//! forward effect, and pushes an equivalent entry back onto the action log.
//! Both return the payload to broadcast, or `None` when their stack is empty
//! (in which case nothing happened and nothing is broadcast).
//!
//! Redo uses create-or-update where undo always deletes: a redone add must
//! tolerate the element having been removed by the undo that preceded it.
//! That asymmetry is intentional.
//!
//! The caller holds the board's edit lock across each call, so two concurrent
//! undos can never pop the same top-of-stack entry and the element mutation
//! is atomic with the stack operation.

use serde_json::Value;
use uuid::Uuid;

use crate::store::{ActionKind, BoardStore, HistoryEntry, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Inverse payload: what the room is told to apply locally.
fn delete_payload(element_id: &str) -> Value {
    serde_json::json!({"type": "delete", "element_id": element_id})
}

fn add_payload(entry: &HistoryEntry) -> Value {
    serde_json::json!({
        "type": "add",
        "element": serde_json::to_value(&entry.snapshot).unwrap_or(Value::Null),
    })
}

/// Undo the most recent action on a board.
///
/// # Errors
///
/// Returns a store error; an empty action log is `Ok(None)`, not an error.
pub async fn undo(store: &dyn BoardStore, board_id: Uuid) -> Result<Option<Value>, HistoryError> {
    let Some(entry) = store.pop_action(board_id).await? else {
        return Ok(None);
    };
    store.push_redo(board_id, &entry).await?;

    match entry.kind {
        // The snapshot names what the add/draw produced; remove it. A target
        // that already vanished is a no-op, the broadcast still goes out so
        // clients converge.
        ActionKind::Add | ActionKind::Draw => {
            store.delete_element(board_id, &entry.snapshot.element_id).await?;
            Ok(Some(delete_payload(&entry.snapshot.element_id)))
        }
        ActionKind::Delete => {
            store.upsert_element(board_id, &entry.snapshot).await?;
            Ok(Some(add_payload(&entry)))
        }
    }
}

/// Redo the most recently undone action on a board.
///
/// # Errors
///
/// Returns a store error; an empty redo log is `Ok(None)`, not an error.
pub async fn redo(store: &dyn BoardStore, board_id: Uuid) -> Result<Option<Value>, HistoryError> {
    let Some(entry) = store.pop_redo(board_id).await? else {
        return Ok(None);
    };

    let replayed = HistoryEntry { kind: entry.kind, snapshot: entry.snapshot.clone(), created_at: crate::now_ms() };

    match entry.kind {
        ActionKind::Add | ActionKind::Draw => {
            store.upsert_element(board_id, &entry.snapshot).await?;
            store.push_action(board_id, &replayed).await?;
            Ok(Some(add_payload(&entry)))
        }
        ActionKind::Delete => {
            store.delete_element(board_id, &entry.snapshot.element_id).await?;
            store.push_action(board_id, &replayed).await?;
            Ok(Some(delete_payload(&entry.snapshot.element_id)))
        }
    }
}

#[cfg(test)]
#[path = "history_test.rs"]
mod tests;
