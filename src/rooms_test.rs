use tokio::sync::mpsc;
use tokio::time::{Duration, timeout};
use uuid::Uuid;

use super::*;
use crate::state::test_helpers;

async fn recv_event(rx: &mut mpsc::Receiver<Event>) -> Event {
    timeout(Duration::from_millis(200), rx.recv())
        .await
        .expect("event receive timed out")
        .expect("event channel closed")
}

async fn assert_no_event(rx: &mut mpsc::Receiver<Event>) {
    assert!(
        timeout(Duration::from_millis(80), rx.recv()).await.is_err(),
        "expected no event"
    );
}

fn test_event(action: &str) -> Event {
    Event::live(action, serde_json::json!({}), "tester")
}

#[tokio::test]
async fn join_unknown_board_fails() {
    let state = test_helpers::test_app_state();
    let (tx, _rx) = mpsc::channel(8);
    let result = state
        .rooms
        .join(state.store.as_ref(), Uuid::new_v4(), Uuid::new_v4(), tx)
        .await;
    assert!(matches!(result, Err(RoomError::BoardNotFound(_))));
}

#[tokio::test]
async fn broadcast_reaches_all_sessions() {
    let state = test_helpers::test_app_state();
    let board_id = test_helpers::seed_board(&state).await;
    let (_, mut rx_a) = test_helpers::join_session(&state, board_id).await;
    let (_, mut rx_b) = test_helpers::join_session(&state, board_id).await;

    state.rooms.broadcast(board_id, &test_event("chat"), None).await;

    assert_eq!(recv_event(&mut rx_a).await.action, "chat");
    assert_eq!(recv_event(&mut rx_b).await.action, "chat");
}

#[tokio::test]
async fn broadcast_excludes_given_session() {
    let state = test_helpers::test_app_state();
    let board_id = test_helpers::seed_board(&state).await;
    let (_, mut rx_a) = test_helpers::join_session(&state, board_id).await;
    let (session_b, mut rx_b) = test_helpers::join_session(&state, board_id).await;

    state.rooms.broadcast(board_id, &test_event("draw"), Some(session_b)).await;

    assert_eq!(recv_event(&mut rx_a).await.action, "draw");
    assert_no_event(&mut rx_b).await;
}

#[tokio::test]
async fn broadcast_is_scoped_to_one_board() {
    let state = test_helpers::test_app_state();
    let board_a = test_helpers::seed_board(&state).await;
    let board_b = test_helpers::seed_board(&state).await;
    let (_, mut rx_a) = test_helpers::join_session(&state, board_a).await;
    let (_, mut rx_b) = test_helpers::join_session(&state, board_b).await;

    state.rooms.broadcast(board_a, &test_event("add_element"), None).await;

    assert_eq!(recv_event(&mut rx_a).await.action, "add_element");
    assert_no_event(&mut rx_b).await;
}

#[tokio::test]
async fn leave_evicts_empty_room() {
    let state = test_helpers::test_app_state();
    let board_id = test_helpers::seed_board(&state).await;
    let (session_a, _rx_a) = test_helpers::join_session(&state, board_id).await;
    let (session_b, _rx_b) = test_helpers::join_session(&state, board_id).await;
    assert_eq!(state.rooms.session_count(board_id).await, 2);

    state.rooms.leave(board_id, session_a).await;
    assert_eq!(state.rooms.session_count(board_id).await, 1);
    assert!(state.rooms.get(board_id).await.is_some());

    state.rooms.leave(board_id, session_b).await;
    assert!(state.rooms.get(board_id).await.is_none());
}

#[tokio::test]
async fn leave_unknown_session_is_noop() {
    let state = test_helpers::test_app_state();
    let board_id = test_helpers::seed_board(&state).await;
    let (_, _rx) = test_helpers::join_session(&state, board_id).await;

    state.rooms.leave(board_id, Uuid::new_v4()).await;
    assert_eq!(state.rooms.session_count(board_id).await, 1);
}

#[tokio::test]
async fn broadcast_drops_disconnected_session() {
    let state = test_helpers::test_app_state();
    let board_id = test_helpers::seed_board(&state).await;
    let (_, rx_gone) = test_helpers::join_session(&state, board_id).await;
    let (_, mut rx_live) = test_helpers::join_session(&state, board_id).await;

    drop(rx_gone);
    state.rooms.broadcast(board_id, &test_event("chat"), None).await;

    assert_eq!(recv_event(&mut rx_live).await.action, "chat");
    assert_eq!(state.rooms.session_count(board_id).await, 1);
}

#[tokio::test]
async fn broadcast_drops_session_with_full_channel() {
    let state = test_helpers::test_app_state();
    let board_id = test_helpers::seed_board(&state).await;

    // Join with a single-slot channel so the second broadcast overflows it.
    let slow_session = Uuid::new_v4();
    let (tx, mut _slow_rx) = mpsc::channel(1);
    state
        .rooms
        .join(state.store.as_ref(), board_id, slow_session, tx)
        .await
        .expect("join");
    let (_, mut rx_live) = test_helpers::join_session(&state, board_id).await;

    state.rooms.broadcast(board_id, &test_event("draw"), None).await;
    state.rooms.broadcast(board_id, &test_event("draw"), None).await;

    // The healthy session saw both; the laggard was dropped, not stalled.
    assert_eq!(recv_event(&mut rx_live).await.action, "draw");
    assert_eq!(recv_event(&mut rx_live).await.action, "draw");
    assert_eq!(state.rooms.session_count(board_id).await, 1);
}
