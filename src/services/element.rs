//! Element service: add, draw, delete, and action-log recording.
//!
//! DESIGN
//! ======
//! Every successful element mutation pushes an invertible snapshot onto the
//! board's action log and clears its redo log, in that order. Functions
//! return the payload to broadcast verbatim, or `None` for the silent no-op
//! cases (draw/delete against an element that no longer exists).
//!
//! The caller must hold the board's edit lock; see `services` module docs.

use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::store::{ActionKind, BoardStore, Element, HistoryEntry, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum ElementError {
    #[error("malformed payload: {0}")]
    Malformed(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Push an action-log entry snapshotting `element` and invalidate redo
/// history. Called by every mutating element operation.
async fn record(
    store: &dyn BoardStore,
    board_id: Uuid,
    kind: ActionKind,
    element: &Element,
) -> Result<(), StoreError> {
    let entry = HistoryEntry { kind, snapshot: element.clone(), created_at: crate::now_ms() };
    store.push_action(board_id, &entry).await?;
    store.clear_redo(board_id).await
}

// =============================================================================
// ADD
// =============================================================================

/// Create a new element from an `add_element` payload.
///
/// The payload must describe an element; `element_id` may be omitted, in
/// which case one is generated and injected into the returned payload so the
/// broadcast carries the authoritative id.
///
/// # Errors
///
/// `Malformed` if the payload is not a valid element, or a store error.
pub async fn add_element(
    store: &dyn BoardStore,
    board_id: Uuid,
    payload: &Value,
) -> Result<Value, ElementError> {
    let mut payload = payload.clone();
    let map = payload
        .as_object_mut()
        .ok_or_else(|| ElementError::Malformed("add_element payload must be an object".into()))?;
    if !map.get("element_id").is_some_and(Value::is_string) {
        map.insert("element_id".into(), Value::String(Uuid::new_v4().to_string()));
    }

    let element: Element = serde_json::from_value(payload.clone())
        .map_err(|e| ElementError::Malformed(format!("not a valid element: {e}")))?;

    store.create_element(board_id, &element).await?;
    record(store, board_id, ActionKind::Add, &element).await?;
    Ok(payload)
}

// =============================================================================
// DRAW
// =============================================================================

/// Append stroke points to an existing element's `data.points`.
///
/// Returns `None` (no mutation, nothing to broadcast) when the target element
/// has vanished: a concurrent delete racing a draw is expected, not an error.
///
/// # Errors
///
/// `Malformed` if `element_id` or `points` is missing, or a store error.
pub async fn draw(store: &dyn BoardStore, board_id: Uuid, payload: &Value) -> Result<Option<Value>, ElementError> {
    let element_id = payload
        .get("element_id")
        .and_then(Value::as_str)
        .ok_or_else(|| ElementError::Malformed("draw payload requires element_id".into()))?;
    let points = payload
        .get("points")
        .and_then(Value::as_array)
        .ok_or_else(|| ElementError::Malformed("draw payload requires a points array".into()))?;

    let Some(mut element) = store.get_element(board_id, element_id).await? else {
        debug!(%board_id, element_id, "draw target missing; ignoring");
        return Ok(None);
    };

    // Read-modify-write: extend data.points with the new segment.
    if !element.data.is_object() {
        element.data = serde_json::json!({});
    }
    if let Some(data) = element.data.as_object_mut() {
        match data.get_mut("points").and_then(Value::as_array_mut) {
            Some(existing) => existing.extend(points.iter().cloned()),
            None => {
                data.insert("points".into(), Value::Array(points.clone()));
            }
        }
    }

    if !store.update_element_data(board_id, element_id, &element.data).await? {
        return Ok(None);
    }

    // Snapshot is the post-append state: undoing a draw removes the whole
    // element, not just this stroke segment.
    record(store, board_id, ActionKind::Draw, &element).await?;
    Ok(Some(payload.clone()))
}

// =============================================================================
// DELETE
// =============================================================================

/// Delete an element, recording its full snapshot first so undo can
/// recreate it. Missing target is a silent no-op.
///
/// # Errors
///
/// `Malformed` if `element_id` is missing, or a store error.
pub async fn delete_element(
    store: &dyn BoardStore,
    board_id: Uuid,
    payload: &Value,
) -> Result<Option<Value>, ElementError> {
    let element_id = payload
        .get("element_id")
        .and_then(Value::as_str)
        .ok_or_else(|| ElementError::Malformed("delete_element payload requires element_id".into()))?;

    let Some(element) = store.get_element(board_id, element_id).await? else {
        debug!(%board_id, element_id, "delete target missing; ignoring");
        return Ok(None);
    };

    record(store, board_id, ActionKind::Delete, &element).await?;
    store.delete_element(board_id, element_id).await?;
    Ok(Some(payload.clone()))
}

#[cfg(test)]
#[path = "element_test.rs"]
mod tests;
