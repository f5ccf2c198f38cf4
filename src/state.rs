//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the persistence collaborator behind the `BoardStore` trait and the
//! room registry. Both are Arc-wrapped so the state clones cheaply.

use std::sync::Arc;

use crate::rooms::Rooms;
use crate::store::BoardStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn BoardStore>,
    pub rooms: Arc<Rooms>,
}

impl AppState {
    #[must_use]
    pub fn new(store: Arc<dyn BoardStore>) -> Self {
        Self { store, rooms: Arc::new(Rooms::new()) }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use tokio::sync::mpsc;
    use uuid::Uuid;

    use super::*;
    use crate::event::Event;
    use crate::store::memory::MemoryStore;
    use crate::store::{Element, ElementKind};

    /// `AppState` on the in-memory store. No database required.
    #[must_use]
    pub fn test_app_state() -> AppState {
        AppState::new(Arc::new(MemoryStore::new()))
    }

    /// Create an empty board in the store and return its ID.
    pub async fn seed_board(state: &AppState) -> Uuid {
        state
            .store
            .create_board("test board", "tester")
            .await
            .expect("memory store create_board")
            .id
    }

    /// Join a board with a fresh session and return its id and event receiver.
    pub async fn join_session(state: &AppState, board_id: Uuid) -> (Uuid, mpsc::Receiver<Event>) {
        let session_id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(crate::rooms::SESSION_CHANNEL_CAPACITY);
        state
            .rooms
            .join(state.store.as_ref(), board_id, session_id, tx)
            .await
            .expect("join should succeed for seeded board");
        (session_id, rx)
    }

    /// A minimal rectangle element for seeding.
    #[must_use]
    pub fn dummy_element(element_id: &str) -> Element {
        Element {
            element_id: element_id.into(),
            kind: ElementKind::Rectangle,
            data: serde_json::json!({"x": 10.0, "y": 20.0, "width": 100.0, "height": 50.0}),
        }
    }
}
