//! Room Registry: live session sets and broadcast fan-out, keyed by board.
//!
//! DESIGN
//! ======
//! A room is the set of sessions currently joined to one board. The registry
//! owns the `board_id -> Room` map; rooms are created on first join and
//! evicted when the last session leaves. Sessions are kept in registration
//! order and broadcasts deliver in that order.
//!
//! Each room also carries the `edits` mutex: the per-board lock held across
//! every mutating store sequence (element mutations, chat appends, and the
//! compound undo/redo operations). Boards never share a lock, so unrelated
//! boards proceed independently.
//!
//! ERROR HANDLING
//! ==============
//! Broadcast is best-effort per target: a session whose outbound channel is
//! full or closed is removed from the room on the spot rather than stalling
//! the board. Dropping its sender ends that session's receive loop, which
//! closes the socket and deregisters normally.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock, mpsc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::event::Event;
use crate::store::{BoardStore, StoreError};

/// Outbound channel capacity per session. A session this far behind is
/// considered dead and gets disconnected by the next broadcast.
pub const SESSION_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("board not found: {0}")]
    BoardNotFound(Uuid),
    #[error(transparent)]
    Store(#[from] StoreError),
}

struct SessionEntry {
    session_id: Uuid,
    tx: mpsc::Sender<Event>,
}

/// Live state for one board: its joined sessions and its edit lock.
pub struct Room {
    pub board_id: Uuid,
    sessions: Mutex<Vec<SessionEntry>>,
    /// Serializes all mutating store sequences for this board.
    pub edits: Mutex<()>,
}

impl Room {
    fn new(board_id: Uuid) -> Self {
        Self { board_id, sessions: Mutex::new(Vec::new()), edits: Mutex::new(()) }
    }
}

/// Registry of all live rooms.
#[derive(Default)]
pub struct Rooms {
    rooms: RwLock<HashMap<Uuid, Arc<Room>>>,
}

impl Rooms {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Join a board. Validates the board against the store; on success the
    /// session is a broadcast target until [`Rooms::leave`] or disconnect.
    ///
    /// # Errors
    ///
    /// `BoardNotFound` if the store has no such board, or a store error if
    /// the lookup itself fails.
    pub async fn join(
        &self,
        store: &dyn BoardStore,
        board_id: Uuid,
        session_id: Uuid,
        tx: mpsc::Sender<Event>,
    ) -> Result<Arc<Room>, RoomError> {
        if store.get_board(board_id).await?.is_none() {
            return Err(RoomError::BoardNotFound(board_id));
        }

        // Register while still holding the registry lock, so a concurrent
        // last-session leave cannot evict the room between creation and
        // registration.
        let mut rooms = self.rooms.write().await;
        let room = Arc::clone(rooms.entry(board_id).or_insert_with(|| Arc::new(Room::new(board_id))));
        let mut sessions = room.sessions.lock().await;
        sessions.push(SessionEntry { session_id, tx });
        info!(%board_id, %session_id, sessions = sessions.len(), "session joined room");
        drop(sessions);
        Ok(room)
    }

    /// Leave a board. A no-op if the session was never registered. Evicts the
    /// room when its last session leaves.
    pub async fn leave(&self, board_id: Uuid, session_id: Uuid) {
        let mut rooms = self.rooms.write().await;
        let Some(room) = rooms.get(&board_id) else {
            return;
        };

        let remaining = {
            let mut sessions = room.sessions.lock().await;
            sessions.retain(|s| s.session_id != session_id);
            sessions.len()
        };
        info!(%board_id, %session_id, remaining, "session left room");

        if remaining == 0 {
            rooms.remove(&board_id);
            info!(%board_id, "evicted empty room");
        }
    }

    /// Deliver an event to every joined session in registration order,
    /// except `exclude`. Delivery to a vanished session is a no-op.
    pub async fn broadcast(&self, board_id: Uuid, event: &Event, exclude: Option<Uuid>) {
        let room = {
            let rooms = self.rooms.read().await;
            let Some(room) = rooms.get(&board_id) else {
                return;
            };
            Arc::clone(room)
        };

        let mut sessions = room.sessions.lock().await;
        sessions.retain(|entry| {
            if exclude == Some(entry.session_id) {
                return true;
            }
            match entry.tx.try_send(event.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(%board_id, session_id = %entry.session_id, "outbound channel full; dropping session");
                    false
                }
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            }
        });
    }

    /// Look up a live room without joining.
    pub async fn get(&self, board_id: Uuid) -> Option<Arc<Room>> {
        let rooms = self.rooms.read().await;
        rooms.get(&board_id).cloned()
    }

    /// Number of sessions currently joined to a board.
    pub async fn session_count(&self, board_id: Uuid) -> usize {
        let room = {
            let rooms = self.rooms.read().await;
            rooms.get(&board_id).cloned()
        };
        match room {
            Some(room) => room.sessions.lock().await.len(),
            None => 0,
        }
    }
}

#[cfg(test)]
#[path = "rooms_test.rs"]
mod tests;
