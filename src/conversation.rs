//! In-memory transcript.
//!
//! Entries are only ever appended; the one amendment allowed is replacing or
//! patching an existing entry, addressed by its [`MessageId`]. Every
//! successful mutation bumps [`Conversation::revision`] by exactly one.

use crate::error::{ChatError, Result};
use crate::state::{ChatRole, Message, MessageId, MessageKind, MessagePatch, WireMessage};

#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    revision: u64,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Number of mutations applied so far.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn contains(&self, id: MessageId) -> bool {
        self.get(id).is_some()
    }

    fn position(&self, id: MessageId) -> Option<usize> {
        self.messages.iter().position(|m| m.id == id)
    }

    /// The entry currently loading or typing, if any.
    pub fn in_flight(&self) -> Option<&Message> {
        self.messages.iter().find(|m| m.is_in_flight())
    }

    /// Add a message at the end, returning its index.
    pub fn append(&mut self, message: Message) -> usize {
        self.messages.push(message);
        self.touch();
        self.messages.len() - 1
    }

    /// Overwrite the newest entry. The replacement keeps the id and role of
    /// the entry it replaces.
    pub fn replace_last(&mut self, message: Message) -> Result<MessageId> {
        let last = self
            .messages
            .last_mut()
            .ok_or_else(|| ChatError::Precondition("cannot replace in an empty conversation".to_string()))?;
        let (id, role) = (last.id, last.role);
        *last = Message { id, role, ..message };
        self.touch();
        Ok(id)
    }

    /// Overwrite the entry with `id`, keeping its id and role.
    pub fn replace(&mut self, id: MessageId, message: Message) -> Result<()> {
        let idx = self
            .position(id)
            .ok_or_else(|| ChatError::Precondition(format!("no message with id {id}")))?;
        let role = self.messages[idx].role;
        self.messages[idx] = Message { id, role, ..message };
        self.touch();
        Ok(())
    }

    /// Apply a partial update to the entry with `id`. Returns false, without
    /// touching anything, when no such entry exists.
    pub fn update(&mut self, id: MessageId, patch: &MessagePatch) -> bool {
        match self.position(id) {
            Some(idx) => self.patch_index(idx, patch),
            None => false,
        }
    }

    /// Positional form of [`Conversation::update`]; out of range is a no-op.
    pub fn update_at(&mut self, index: usize, patch: &MessagePatch) -> bool {
        if index >= self.messages.len() {
            return false;
        }
        self.patch_index(index, patch)
    }

    fn patch_index(&mut self, idx: usize, patch: &MessagePatch) -> bool {
        patch.apply(&mut self.messages[idx]);
        self.touch();
        true
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.touch();
    }

    /// Resolved chat turns, in order, as sent to the service. Placeholders,
    /// local notices and error entries are left out.
    pub fn history(&self) -> Vec<WireMessage> {
        self.messages
            .iter()
            .filter(|m| m.kind == MessageKind::Chat && !m.is_in_flight())
            .filter(|m| m.role == ChatRole::User || !m.content.is_empty())
            .map(|m| WireMessage {
                role: m.role,
                content: m.content.clone(),
            })
            .collect()
    }

    fn touch(&mut self) {
        self.revision += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_append_returns_index() {
        let mut conv = Conversation::new();
        assert_eq!(conv.append(Message::user("a")), 0);
        assert_eq!(conv.append(Message::placeholder()), 1);
        assert_eq!(conv.len(), 2);
        assert_eq!(conv.revision(), 2);
    }

    #[test]
    fn test_replace_last_on_empty_fails() {
        let mut conv = Conversation::new();
        let err = conv.replace_last(Message::assistant("x")).unwrap_err();
        assert!(matches!(err, ChatError::Precondition(_)));
        assert_eq!(conv.revision(), 0);
    }

    #[test]
    fn test_replace_last_keeps_id() {
        let mut conv = Conversation::new();
        conv.append(Message::user("q"));
        conv.append(Message::placeholder());
        let placeholder_id = conv.messages()[1].id;

        let id = conv.replace_last(Message::typing(Vec::new())).unwrap();
        assert_eq!(id, placeholder_id);
        let last = &conv.messages()[1];
        assert!(last.is_typing);
        assert!(!last.is_loading);
    }

    #[test]
    fn test_replace_last_keeps_role() {
        let mut conv = Conversation::new();
        conv.append(Message::placeholder());

        let id = conv.replace_last(Message::user("hijack")).unwrap();
        let msg = conv.get(id).unwrap();
        assert_eq!(msg.role, ChatRole::Assistant);
        assert_eq!(msg.content, "hijack");
    }

    #[test]
    fn test_update_targets_by_id_after_append() {
        let mut conv = Conversation::new();
        conv.append(Message::user("q"));
        conv.append(Message::typing(Vec::new()));
        let target = conv.messages()[1].id;

        // Something lands after the target; the patch must still hit it.
        conv.append(Message::notice("uploaded"));
        assert!(conv.update(target, &MessagePatch::reveal("abc".to_string())));

        assert_eq!(conv.messages()[1].content, "abc");
        assert_eq!(conv.messages()[2].content, "uploaded");
    }

    #[test]
    fn test_update_unknown_id_is_noop() {
        let mut conv = Conversation::new();
        conv.append(Message::user("q"));
        let before = conv.revision();
        assert!(!conv.update(MessageId::new(), &MessagePatch::finished()));
        assert_eq!(conv.revision(), before);
    }

    #[test]
    fn test_update_at_out_of_bounds_is_noop() {
        let mut conv = Conversation::new();
        assert!(!conv.update_at(3, &MessagePatch::finished()));
        conv.append(Message::typing(Vec::new()));
        assert!(conv.update_at(0, &MessagePatch::finished()));
        assert!(!conv.messages()[0].is_typing);
    }

    #[test]
    fn test_replace_keeps_role() {
        let mut conv = Conversation::new();
        conv.append(Message::placeholder());
        let id = conv.messages()[0].id;
        conv.replace(id, Message::error("failed")).unwrap();

        let msg = conv.get(id).unwrap();
        assert_eq!(msg.role, ChatRole::Assistant);
        assert_eq!(msg.kind, MessageKind::Error);
        assert!(!msg.is_loading);
    }

    #[test]
    fn test_history_skips_in_flight_and_notices() {
        let mut conv = Conversation::new();
        conv.append(Message::user("Hello"));
        conv.append(Message::assistant("Hi there"));
        conv.append(Message::notice("Processed file: a.pdf"));
        conv.append(Message::user("Next"));
        conv.append(Message::placeholder());

        assert_eq!(
            conv.history(),
            vec![
                WireMessage { role: ChatRole::User, content: "Hello".to_string() },
                WireMessage { role: ChatRole::Assistant, content: "Hi there".to_string() },
                WireMessage { role: ChatRole::User, content: "Next".to_string() },
            ]
        );
    }
}
