//! Wire protocol types: inbound messages and outbound events.
//!
//! DESIGN
//! ======
//! Every client-to-server message is an `Inbound` envelope:
//! `{action, payload, user?}`. Every server-to-client message is an `Event`
//! with the same shape, `user` serialized as null when absent. The action
//! string is parsed once into the `Action` enum; unrecognized values are kept
//! as strings so the dispatch loop can log them before ignoring.
//!
//! The two join-time snapshots (`chat_history`, `elements_history`) are built
//! through dedicated constructors so their shape lives in exactly one place.

use serde::{Deserialize, Serialize};

use crate::store::{ChatMessage, Element};

/// Default author attributed to messages that carry no `user` field.
pub const ANONYMOUS_USER: &str = "Anonymous";

// =============================================================================
// ACTIONS
// =============================================================================

/// Recognized protocol actions. Anything else is logged and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    AddElement,
    Draw,
    DrawEnd,
    DeleteElement,
    Chat,
    Undo,
    Redo,
}

impl Action {
    /// Parse a wire action string. Returns `None` for unknown actions.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "add_element" => Some(Self::AddElement),
            "draw" => Some(Self::Draw),
            "draw_end" => Some(Self::DrawEnd),
            "delete_element" => Some(Self::DeleteElement),
            "chat" => Some(Self::Chat),
            "undo" => Some(Self::Undo),
            "redo" => Some(Self::Redo),
            _ => None,
        }
    }

    /// Wire name of this action.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AddElement => "add_element",
            Self::Draw => "draw",
            Self::DrawEnd => "draw_end",
            Self::DeleteElement => "delete_element",
            Self::Chat => "chat",
            Self::Undo => "undo",
            Self::Redo => "redo",
        }
    }
}

// =============================================================================
// ENVELOPES
// =============================================================================

/// Inbound message envelope as sent by clients.
#[derive(Debug, Clone, Deserialize)]
pub struct Inbound {
    pub action: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    pub user: Option<String>,
}

impl Inbound {
    /// The author of this message, defaulting to [`ANONYMOUS_USER`].
    #[must_use]
    pub fn user_or_anonymous(&self) -> &str {
        self.user.as_deref().unwrap_or(ANONYMOUS_USER)
    }
}

/// Outbound event envelope delivered to room members.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub action: String,
    pub payload: serde_json::Value,
    pub user: Option<String>,
}

impl Event {
    /// Event for a live action, attributed to the originating user.
    pub fn live(action: impl Into<String>, payload: serde_json::Value, user: impl Into<String>) -> Self {
        Self { action: action.into(), payload, user: Some(user.into()) }
    }

    /// Join-time chat snapshot, ordered ascending by timestamp by the store.
    #[must_use]
    pub fn chat_history(messages: &[ChatMessage]) -> Self {
        Self {
            action: "chat_history".into(),
            payload: serde_json::to_value(messages).unwrap_or_else(|_| serde_json::json!([])),
            user: None,
        }
    }

    /// Join-time element snapshot containing every live element exactly once.
    #[must_use]
    pub fn elements_history(elements: &[Element]) -> Self {
        Self {
            action: "elements_history".into(),
            payload: serde_json::to_value(elements).unwrap_or_else(|_| serde_json::json!([])),
            user: None,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ElementKind;

    #[test]
    fn action_parse_round_trip() {
        for action in [
            Action::AddElement,
            Action::Draw,
            Action::DrawEnd,
            Action::DeleteElement,
            Action::Chat,
            Action::Undo,
            Action::Redo,
        ] {
            assert_eq!(Action::parse(action.as_str()), Some(action));
        }
        assert_eq!(Action::parse("move_element"), None);
        assert_eq!(Action::parse(""), None);
    }

    #[test]
    fn inbound_user_defaults_to_anonymous() {
        let msg: Inbound = serde_json::from_str(r#"{"action":"undo"}"#).expect("parse");
        assert_eq!(msg.user_or_anonymous(), ANONYMOUS_USER);
        assert!(msg.payload.is_null());

        let msg: Inbound =
            serde_json::from_str(r#"{"action":"chat","payload":{"text":"hi"},"user":"alice"}"#).expect("parse");
        assert_eq!(msg.user_or_anonymous(), "alice");
    }

    #[test]
    fn event_serializes_null_user() {
        let event = Event::chat_history(&[]);
        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(json["action"], "chat_history");
        assert!(json["user"].is_null());
        assert_eq!(json["payload"], serde_json::json!([]));
    }

    #[test]
    fn elements_history_carries_full_elements() {
        let element = Element {
            element_id: "e1".into(),
            kind: ElementKind::Rectangle,
            data: serde_json::json!({"x": 1.0}),
        };
        let event = Event::elements_history(std::slice::from_ref(&element));
        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(json["payload"][0]["element_id"], "e1");
        assert_eq!(json["payload"][0]["type"], "rectangle");
        assert_eq!(json["payload"][0]["data"]["x"], 1.0);
    }

    #[test]
    fn live_event_preserves_user() {
        let event = Event::live("add_element", serde_json::json!({"element_id": "e1"}), "alice");
        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(json["user"], "alice");
        assert_eq!(json["action"], "add_element");
    }
}
