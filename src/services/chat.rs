//! Chat service: append-only messages per board.

use serde_json::Value;
use uuid::Uuid;

use crate::store::{BoardStore, ChatMessage, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("malformed payload: {0}")]
    Malformed(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Append a chat message from a `chat` payload.
///
/// Accepts either a bare string payload or an object carrying `text`.
///
/// # Errors
///
/// `Malformed` if no text can be extracted, or a store error.
pub async fn append(
    store: &dyn BoardStore,
    board_id: Uuid,
    user: &str,
    payload: &Value,
) -> Result<ChatMessage, ChatError> {
    let text = payload
        .as_str()
        .or_else(|| payload.get("text").and_then(Value::as_str))
        .ok_or_else(|| ChatError::Malformed("chat payload carries no text".into()))?;

    let message = ChatMessage { user: user.to_owned(), text: text.to_owned(), timestamp: crate::now_ms() };
    store.append_chat(board_id, &message).await?;
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_helpers;

    #[tokio::test]
    async fn append_accepts_string_and_object_payloads() {
        let state = test_helpers::test_app_state();
        let board_id = test_helpers::seed_board(&state).await;

        append(state.store.as_ref(), board_id, "alice", &serde_json::json!("hello"))
            .await
            .expect("string payload");
        append(state.store.as_ref(), board_id, "bob", &serde_json::json!({"text": "hi"}))
            .await
            .expect("text field");

        let history = state.store.list_chat(board_id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].user, "alice");
        assert_eq!(history[1].text, "hi");
    }

    #[tokio::test]
    async fn append_does_not_honor_message_field() {
        let state = test_helpers::test_app_state();
        let board_id = test_helpers::seed_board(&state).await;
        let result = append(state.store.as_ref(), board_id, "alice", &serde_json::json!({"message": "hey"})).await;
        assert!(matches!(result, Err(ChatError::Malformed(_))));
    }

    #[tokio::test]
    async fn append_rejects_textless_payload() {
        let state = test_helpers::test_app_state();
        let board_id = test_helpers::seed_board(&state).await;
        let result = append(state.store.as_ref(), board_id, "alice", &serde_json::json!({"nope": 1})).await;
        assert!(matches!(result, Err(ChatError::Malformed(_))));
    }
}
