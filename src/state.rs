//! Transcript data types shared by the store, the session and the UI.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable identity of a transcript entry, assigned at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageId(Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// How an assistant entry should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageKind {
    #[default]
    Chat,
    /// Confirmation synthesized locally (e.g. after an upload).
    Notice,
    /// A failed exchange or upload.
    Error,
}

/// A retrieval source the service used to build an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub score: f64,
}

/// One transcript entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: MessageId,
    pub role: ChatRole,
    pub kind: MessageKind,
    pub content: String,
    pub is_loading: bool,
    pub is_typing: bool,
    pub sources: Vec<Source>,
}

impl Message {
    fn new(role: ChatRole, kind: MessageKind, content: String) -> Self {
        Self {
            id: MessageId::new(),
            role,
            kind,
            content,
            is_loading: false,
            is_typing: false,
            sources: Vec::new(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, MessageKind::Chat, content.into())
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, MessageKind::Chat, content.into())
    }

    /// Assistant entry marking an exchange as in flight.
    pub fn placeholder() -> Self {
        Self {
            is_loading: true,
            ..Self::assistant(String::new())
        }
    }

    /// Empty assistant entry about to be filled by a reveal.
    pub fn typing(sources: Vec<Source>) -> Self {
        Self {
            is_typing: true,
            sources,
            ..Self::assistant(String::new())
        }
    }

    pub fn notice(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, MessageKind::Notice, content.into())
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, MessageKind::Error, content.into())
    }

    pub fn is_in_flight(&self) -> bool {
        self.is_loading || self.is_typing
    }
}

/// Partial update applied by [`crate::conversation::Conversation::update`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessagePatch {
    pub content: Option<String>,
    pub is_typing: Option<bool>,
}

impl MessagePatch {
    pub fn reveal(content: String) -> Self {
        Self {
            content: Some(content),
            is_typing: Some(true),
        }
    }

    pub fn finished() -> Self {
        Self {
            content: None,
            is_typing: Some(false),
        }
    }

    pub(crate) fn apply(&self, message: &mut Message) {
        if let Some(content) = &self.content {
            message.content.clone_from(content);
        }
        if let Some(is_typing) = self.is_typing {
            message.is_typing = is_typing;
        }
    }
}

/// `{role, content}` pair as sent to the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: ChatRole,
    pub content: String,
}

impl WireMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_is_loading_and_empty() {
        let msg = Message::placeholder();
        assert_eq!(msg.role, ChatRole::Assistant);
        assert!(msg.is_loading);
        assert!(!msg.is_typing);
        assert!(msg.content.is_empty());
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(Message::user("a").id, Message::user("a").id);
    }

    #[test]
    fn test_patch_leaves_unset_fields() {
        let mut msg = Message::typing(Vec::new());
        MessagePatch::reveal("Hi ".to_string()).apply(&mut msg);
        assert_eq!(msg.content, "Hi ");
        assert!(msg.is_typing);

        MessagePatch::finished().apply(&mut msg);
        assert_eq!(msg.content, "Hi ");
        assert!(!msg.is_typing);
    }

    #[test]
    fn test_wire_role_is_lowercase() {
        let json = serde_json::to_value(WireMessage::user("Hello")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "user", "content": "Hello"}));
    }
}
