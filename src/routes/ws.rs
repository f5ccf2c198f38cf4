//! WebSocket handler: the per-connection session protocol state machine.
//!
//! LIFECYCLE
//! =========
//! Connecting -> Joined -> Closed.
//! 1. Upgrade at `/ws/whiteboard/{board_id}`; unknown board closes the socket
//!    before anything is registered.
//! 2. Joined: register with the room registry, send the two snapshot events
//!    (chat history, then element history), then enter the `select!` loop:
//!    - inbound text -> parse + dispatch, broadcast the resulting event
//!    - broadcast events from room peers -> forward to this socket
//! 3. Close (client-initiated or error): deregister; committed mutations and
//!    other sessions are untouched.
//!
//! ERROR HANDLING
//! ==============
//! Per-message failures never close the connection. `process_message` returns
//! an explicit `Result` and the loop matches on the error kind: malformed
//! JSON, unknown actions, and store failures are all logged and the message
//! dropped. Only the board lookup at join time is connection-fatal.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::event::{Action, Event, Inbound};
use crate::rooms::{Room, RoomError, SESSION_CHANNEL_CAPACITY};
use crate::services::chat::ChatError;
use crate::services::element::ElementError;
use crate::services::history::HistoryError;
use crate::services::{chat, element, history};
use crate::state::AppState;
use crate::store::BoardStore;

// =============================================================================
// ERRORS
// =============================================================================

/// Per-message handler failure. None of these close the connection.
#[derive(Debug, thiserror::Error)]
enum HandlerError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unknown action: {0}")]
    UnknownAction(String),
    #[error(transparent)]
    Element(#[from] ElementError),
    #[error(transparent)]
    Chat(#[from] ChatError),
    #[error(transparent)]
    History(#[from] HistoryError),
}

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(
    State(state): State<AppState>,
    Path(board_id): Path<Uuid>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| run_session(socket, state, board_id))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_session(mut socket: WebSocket, state: AppState, board_id: Uuid) {
    let session_id = Uuid::new_v4();
    let (tx, mut rx) = mpsc::channel::<Event>(SESSION_CHANNEL_CAPACITY);

    // Connecting -> Joined: validate the board and register as a broadcast
    // target. Rejection happens before any resource is registered.
    let room = match state.rooms.join(state.store.as_ref(), board_id, session_id, tx).await {
        Ok(room) => room,
        Err(RoomError::BoardNotFound(_)) => {
            info!(%board_id, %session_id, "rejecting session: board not found");
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
        Err(RoomError::Store(e)) => {
            error!(%board_id, error = %e, "board lookup failed; rejecting session");
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    };

    if send_snapshots(&mut socket, &state, board_id).await.is_err() {
        state.rooms.leave(board_id, session_id).await;
        return;
    }

    info!(%board_id, %session_id, "session joined");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                match msg {
                    Message::Text(text) => handle_text(&state, &room, session_id, &text).await,
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            maybe_event = rx.recv() => {
                // None means the registry dropped us (slow consumer).
                let Some(event) = maybe_event else { break };
                if send_event(&mut socket, &event).await.is_err() {
                    break;
                }
            }
        }
    }

    // Joined -> Closed: no further deliveries to this session.
    state.rooms.leave(board_id, session_id).await;
    info!(%board_id, %session_id, "session closed");
}

// =============================================================================
// DISPATCH
// =============================================================================

/// Handle one inbound text message end-to-end: dispatch, then broadcast the
/// resulting event to the whole room (sender included). The board's edit lock
/// is held across both steps, so events go out in commit order and a member
/// replaying its inbox always converges on the store's state. Delivery itself
/// is non-blocking `try_send`, so holding the lock never stalls on a slow
/// socket. Split from the socket loop so tests can exercise dispatch and
/// fan-out without a live socket.
async fn handle_text(state: &AppState, room: &Room, session_id: Uuid, text: &str) {
    let _edits = room.edits.lock().await;
    match process_message(state, room, text).await {
        Ok(Some(event)) => state.rooms.broadcast(room.board_id, &event, None).await,
        Ok(None) => {}
        Err(e) => log_handler_error(session_id, &e),
    }
}

/// Parse and apply one inbound message, returning the event to broadcast to
/// the whole room (sender included), or `None` when nothing is broadcast
/// (empty-stack undo/redo, vanished draw/delete targets).
///
/// The caller holds the board's edit lock across this call and the broadcast
/// that follows, which serializes every mutation on this board.
async fn process_message(state: &AppState, room: &Room, text: &str) -> Result<Option<Event>, HandlerError> {
    let inbound: Inbound = serde_json::from_str(text)?;
    let user = inbound.user_or_anonymous().to_owned();
    let Some(action) = Action::parse(&inbound.action) else {
        return Err(HandlerError::UnknownAction(inbound.action));
    };

    let store = state.store.as_ref();
    let board_id = room.board_id;

    match action {
        Action::AddElement => {
            let payload = element::add_element(store, board_id, &inbound.payload).await?;
            Ok(Some(Event::live(action.as_str(), payload, user)))
        }
        Action::Draw => {
            let applied = element::draw(store, board_id, &inbound.payload).await?;
            Ok(applied.map(|payload| Event::live(action.as_str(), payload, user)))
        }
        Action::DeleteElement => {
            let applied = element::delete_element(store, board_id, &inbound.payload).await?;
            Ok(applied.map(|payload| Event::live(action.as_str(), payload, user)))
        }
        // Stroke completion marker: no store mutation, peers finalize the
        // in-progress stroke locally.
        Action::DrawEnd => Ok(Some(Event::live(action.as_str(), inbound.payload, user))),
        Action::Chat => {
            chat::append(store, board_id, &user, &inbound.payload).await?;
            Ok(Some(Event::live(action.as_str(), inbound.payload, user)))
        }
        Action::Undo => {
            let inverse = history::undo(store, board_id).await?;
            Ok(inverse.map(|payload| Event::live(action.as_str(), payload, user)))
        }
        Action::Redo => {
            let replay = history::redo(store, board_id).await?;
            Ok(replay.map(|payload| Event::live(action.as_str(), payload, user)))
        }
    }
}

fn log_handler_error(session_id: Uuid, err: &HandlerError) {
    match err {
        HandlerError::UnknownAction(action) => {
            info!(%session_id, action, "ignoring unknown action");
        }
        HandlerError::Malformed(e) => {
            warn!(%session_id, error = %e, "ignoring malformed message");
        }
        HandlerError::Element(ElementError::Malformed(m)) | HandlerError::Chat(ChatError::Malformed(m)) => {
            warn!(%session_id, reason = %m, "ignoring malformed payload");
        }
        HandlerError::Element(ElementError::Store(e))
        | HandlerError::Chat(ChatError::Store(e))
        | HandlerError::History(HistoryError::Store(e)) => {
            error!(%session_id, error = %e, "store failure; message dropped");
        }
    }
}

// =============================================================================
// OUTBOUND
// =============================================================================

/// Send the two join-time snapshots: chat history, then element history.
async fn send_snapshots(socket: &mut WebSocket, state: &AppState, board_id: Uuid) -> Result<(), ()> {
    let store = state.store.as_ref();

    let chat = match store.list_chat(board_id).await {
        Ok(chat) => chat,
        Err(e) => {
            error!(%board_id, error = %e, "chat history fetch failed");
            return Err(());
        }
    };
    send_event(socket, &Event::chat_history(&chat)).await?;

    let elements = match store.list_elements(board_id).await {
        Ok(elements) => elements,
        Err(e) => {
            error!(%board_id, error = %e, "element history fetch failed");
            return Err(());
        }
    };
    send_event(socket, &Event::elements_history(&elements)).await
}

async fn send_event(socket: &mut WebSocket, event: &Event) -> Result<(), ()> {
    let json = match serde_json::to_string(event) {
        Ok(j) => j,
        Err(e) => {
            warn!(error = %e, "failed to serialize event");
            return Err(());
        }
    };
    socket.send(Message::Text(json.into())).await.map_err(|_| ())
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
