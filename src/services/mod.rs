//! Domain services used by the websocket and HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own business logic against the `BoardStore` collaborator
//! so route handlers stay focused on protocol translation. None of them lock:
//! the caller holds the per-board edit mutex around every mutating call, which
//! is what makes the multi-step undo/redo sequences atomic.

pub mod board;
pub mod chat;
pub mod element;
pub mod history;
