//! Derived, read-only views over an [`InboxState`]

use std::collections::BTreeSet;

use crate::state::InboxState;
use crate::types::{Conversation, MessageBody, Message, MessageId};

impl InboxState {
    /// All conversations, in load order
    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn conversation(&self, id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    /// Messages of a conversation in chronological order (empty if not loaded)
    pub fn messages(&self, conversation_id: &str) -> &[Message] {
        self.messages
            .get(conversation_id)
            .map(|list| list.as_slice())
            .unwrap_or(&[])
    }

    /// Whether messages have been loaded for a conversation
    pub fn has_messages(&self, conversation_id: &str) -> bool {
        self.messages.contains_key(conversation_id)
    }

    pub fn active_conversation_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn active_conversation(&self) -> Option<&Conversation> {
        self.active.as_deref().and_then(|id| self.conversation(id))
    }

    pub fn active_messages(&self) -> &[Message] {
        self.active.as_deref().map(|id| self.messages(id)).unwrap_or(&[])
    }

    pub fn selection(&self) -> &BTreeSet<MessageId> {
        &self.selection
    }

    pub fn is_selected(&self, message_id: &str) -> bool {
        self.selection.contains(message_id)
    }

    /// Selected messages of the active conversation, oldest first
    pub fn selected_messages(&self) -> Vec<&Message> {
        self.active_messages()
            .iter()
            .filter(|m| self.selection.contains(&m.id))
            .collect()
    }

    pub fn search_query(&self) -> &str {
        &self.search
    }

    /// Conversations whose name contains the search query (case-insensitive)
    pub fn filtered_conversations(&self) -> Vec<&Conversation> {
        let query = self.search.to_lowercase();
        self.conversations
            .iter()
            .filter(|c| query.is_empty() || c.name.to_lowercase().contains(&query))
            .collect()
    }

    /// Look a message up by id across all conversations
    pub fn find_message(&self, message_id: &str) -> Option<(&str, &Message)> {
        let location = self.index.get(message_id)?;
        let message = self
            .messages
            .get(&location.conversation_id)?
            .get(location.position)?;
        Some((location.conversation_id.as_str(), message))
    }

    pub fn unread_messages(&self, conversation_id: &str) -> Vec<&Message> {
        self.messages(conversation_id)
            .iter()
            .filter(|m| m.is_unread())
            .collect()
    }

    /// Ids of unread messages, computed from the live message list
    pub fn unread_ids(&self, conversation_id: &str) -> Vec<&str> {
        self.messages(conversation_id)
            .iter()
            .filter(|m| m.is_unread())
            .map(|m| m.id.as_str())
            .collect()
    }

    /// Oldest unread message, the scroll target when opening a conversation
    pub fn first_unread(&self, conversation_id: &str) -> Option<&Message> {
        self.messages(conversation_id).iter().find(|m| m.is_unread())
    }

    /// Sum of the cached unread counters
    pub fn total_unread(&self) -> usize {
        self.conversations.iter().map(|c| c.unread_count).sum()
    }

    /// Whether every conversation's cached counter matches its live unread
    /// count
    pub fn unread_consistent(&self) -> bool {
        self.conversations
            .iter()
            .all(|c| self.unread_messages(&c.id).len() == c.unread_count)
    }

    /// Image messages of a conversation
    pub fn media(&self, conversation_id: &str) -> Vec<&Message> {
        self.messages(conversation_id)
            .iter()
            .filter(|m| matches!(m.body, MessageBody::Image { .. }))
            .collect()
    }

    /// Document messages of a conversation
    pub fn documents(&self, conversation_id: &str) -> Vec<&Message> {
        self.messages(conversation_id)
            .iter()
            .filter(|m| matches!(m.body, MessageBody::Document { .. }))
            .collect()
    }

    /// Bookmarked messages across all conversations, in conversation order
    pub fn bookmarked(&self) -> Vec<(&str, &Message)> {
        self.conversations
            .iter()
            .flat_map(|c| {
                self.messages(&c.id)
                    .iter()
                    .filter(|m| m.is_bookmarked)
                    .map(move |m| (c.id.as_str(), m))
            })
            .collect()
    }
}
