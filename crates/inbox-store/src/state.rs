//! Inbox state snapshots and the command reducer
//!
//! [`InboxState`] is an immutable snapshot. [`InboxState::apply`] computes the
//! next snapshot from the current one and a [`Command`], sharing every
//! collection the command did not touch. Commands that target unknown or
//! stale identifiers return `None` and leave the state unchanged.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use crate::types::{Conversation, ConversationId, Message, MessageId, MessageStatus};

/// Position of a message inside its conversation's ordered list
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MessageRef {
    pub(crate) conversation_id: ConversationId,
    pub(crate) position: usize,
}

/// The full inbox state at one point in time
#[derive(Debug, Clone, Default)]
pub struct InboxState {
    pub(crate) conversations: Arc<Vec<Conversation>>,
    pub(crate) messages: HashMap<ConversationId, Arc<Vec<Message>>>,
    /// Global message id -> location, kept in step with `messages`
    pub(crate) index: Arc<HashMap<MessageId, MessageRef>>,
    pub(crate) active: Option<ConversationId>,
    pub(crate) selection: Arc<BTreeSet<MessageId>>,
    pub(crate) search: String,
}

/// The closed set of state mutations
#[derive(Debug, Clone)]
pub enum Command {
    /// Replace the conversation list wholesale
    SetConversations(Vec<Conversation>),
    /// Replace one conversation's messages (sorted by timestamp on entry)
    SetMessages {
        conversation_id: ConversationId,
        messages: Vec<Message>,
    },
    /// Make a conversation active and clear the selection
    SelectConversation(ConversationId),
    /// Append a message to the active conversation
    AppendMessage(Message),
    /// Deliver a message to a named conversation
    ReceiveMessage {
        conversation_id: ConversationId,
        message: Message,
    },
    /// Mark the given messages of a conversation as read
    MarkRead {
        conversation_id: ConversationId,
        message_ids: Vec<MessageId>,
    },
    /// Mark every message of a conversation as read
    MarkAllRead(ConversationId),
    /// Add or remove a message from the selection
    ToggleSelection(MessageId),
    ClearSelection,
    UpdateStatus {
        message_id: MessageId,
        status: MessageStatus,
    },
    ToggleBookmark(MessageId),
    AddReaction {
        message_id: MessageId,
        label: String,
    },
    SetPresence {
        conversation_id: ConversationId,
        online: bool,
        typing: bool,
    },
    /// Set the conversation list filter
    SetSearch(String),
}

impl Command {
    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Command::SetConversations(_) => "set_conversations",
            Command::SetMessages { .. } => "set_messages",
            Command::SelectConversation(_) => "select_conversation",
            Command::AppendMessage(_) => "append_message",
            Command::ReceiveMessage { .. } => "receive_message",
            Command::MarkRead { .. } => "mark_read",
            Command::MarkAllRead(_) => "mark_all_read",
            Command::ToggleSelection(_) => "toggle_selection",
            Command::ClearSelection => "clear_selection",
            Command::UpdateStatus { .. } => "update_status",
            Command::ToggleBookmark(_) => "toggle_bookmark",
            Command::AddReaction { .. } => "add_reaction",
            Command::SetPresence { .. } => "set_presence",
            Command::SetSearch(_) => "set_search",
        }
    }
}

impl InboxState {
    /// Create an empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the state that results from applying `command`.
    ///
    /// Returns `None` when the command does not change anything, including
    /// when it targets an unknown conversation or message.
    pub fn apply(&self, command: Command) -> Option<InboxState> {
        match command {
            Command::SetConversations(list) => Some(self.set_conversations(list)),
            Command::SetMessages {
                conversation_id,
                messages,
            } => Some(self.set_messages(conversation_id, messages)),
            Command::SelectConversation(id) => self.select_conversation(&id),
            Command::AppendMessage(message) => {
                let target = self.active.clone()?;
                self.insert_message(&target, message)
            }
            Command::ReceiveMessage {
                conversation_id,
                message,
            } => self.insert_message(&conversation_id, message),
            Command::MarkRead {
                conversation_id,
                message_ids,
            } => self.mark_read(&conversation_id, &message_ids),
            Command::MarkAllRead(conversation_id) => {
                let ids: Vec<MessageId> = self
                    .messages(&conversation_id)
                    .iter()
                    .filter(|m| m.is_unread())
                    .map(|m| m.id.clone())
                    .collect();
                self.mark_read(&conversation_id, &ids)
            }
            Command::ToggleSelection(id) => self.toggle_selection(id),
            Command::ClearSelection => {
                if self.selection.is_empty() {
                    return None;
                }
                let mut next = self.clone();
                next.selection = Arc::default();
                Some(next)
            }
            Command::UpdateStatus { message_id, status } => {
                self.update_message(&message_id, |m| {
                    if m.status == status {
                        return false;
                    }
                    m.status = status;
                    true
                })
            }
            Command::ToggleBookmark(message_id) => self.update_message(&message_id, |m| {
                m.is_bookmarked = !m.is_bookmarked;
                true
            }),
            Command::AddReaction { message_id, label } => {
                if label.trim().is_empty() {
                    return None;
                }
                self.update_message(&message_id, |m| {
                    m.reactions.push(label);
                    true
                })
            }
            Command::SetPresence {
                conversation_id,
                online,
                typing,
            } => {
                let current = self.conversation(&conversation_id)?;
                if current.is_online == online && current.is_typing == typing {
                    return None;
                }
                let mut next = self.clone();
                let conversation = next.conversation_mut(&conversation_id)?;
                conversation.is_online = online;
                conversation.is_typing = typing;
                Some(next)
            }
            Command::SetSearch(query) => {
                if self.search == query {
                    return None;
                }
                let mut next = self.clone();
                next.search = query;
                Some(next)
            }
        }
    }

    fn set_conversations(&self, list: Vec<Conversation>) -> InboxState {
        let mut next = self.clone();
        next.conversations = Arc::new(list);
        next.reconcile_unread_counts();
        next
    }

    fn set_messages(&self, conversation_id: ConversationId, mut messages: Vec<Message>) -> InboxState {
        messages.sort_by_key(|m| m.timestamp);
        for message in &mut messages {
            message.normalize();
        }

        let mut seen = HashSet::new();
        messages.retain(|m| {
            let owner = self.index.get(&m.id).map(|r| r.conversation_id.as_str());
            if owner.is_some_and(|owner| owner != conversation_id) || !seen.insert(m.id.clone()) {
                tracing::warn!(
                    message_id = %m.id,
                    conversation_id = %conversation_id,
                    "Skipping message with an id already in use"
                );
                return false;
            }
            true
        });

        let mut next = self.clone();
        let index = Arc::make_mut(&mut next.index);
        index.retain(|_, r| r.conversation_id != conversation_id);
        for (position, message) in messages.iter().enumerate() {
            index.insert(
                message.id.clone(),
                MessageRef {
                    conversation_id: conversation_id.clone(),
                    position,
                },
            );
        }

        let unread = messages.iter().filter(|m| m.is_unread()).count();
        let last = messages.last().map(|m| (m.timestamp, m.body.preview()));
        next.messages.insert(conversation_id.clone(), Arc::new(messages));

        if let Some(conversation) = next.conversation_mut(&conversation_id) {
            conversation.unread_count = unread;
            if let Some((timestamp, preview)) = last {
                if timestamp >= conversation.last_activity {
                    conversation.last_activity = timestamp;
                    conversation.last_message = preview;
                }
            }
        }

        if next.active.as_deref() == Some(conversation_id.as_str()) {
            next.prune_selection();
        }
        next
    }

    fn select_conversation(&self, id: &str) -> Option<InboxState> {
        self.conversation(id)?;
        let mut next = self.clone();
        next.active = Some(id.to_string());
        next.selection = Arc::default();
        Some(next)
    }

    fn insert_message(&self, conversation_id: &str, mut message: Message) -> Option<InboxState> {
        self.conversation(conversation_id)?;
        if self.index.contains_key(&message.id) {
            tracing::debug!(message_id = %message.id, "Ignoring duplicate message id");
            return None;
        }
        message.normalize();

        let mut next = self.clone();
        let list = Arc::make_mut(next.messages.entry(conversation_id.to_string()).or_default());
        Arc::make_mut(&mut next.index).insert(
            message.id.clone(),
            MessageRef {
                conversation_id: conversation_id.to_string(),
                position: list.len(),
            },
        );

        let unread = message.is_unread();
        let timestamp = message.timestamp;
        let preview = message.body.preview();
        list.push(message);

        let conversation = next.conversation_mut(conversation_id)?;
        if unread {
            conversation.unread_count += 1;
        }
        if timestamp >= conversation.last_activity {
            conversation.last_activity = timestamp;
        }
        conversation.last_message = preview;
        Some(next)
    }

    fn mark_read(&self, conversation_id: &str, message_ids: &[MessageId]) -> Option<InboxState> {
        let wanted: HashSet<&str> = message_ids.iter().map(String::as_str).collect();
        let pending = self
            .messages(conversation_id)
            .iter()
            .any(|m| m.is_unread() && wanted.contains(m.id.as_str()));
        if !pending {
            return None;
        }

        let mut next = self.clone();
        let list = Arc::make_mut(next.messages.get_mut(conversation_id)?);
        let mut flipped = 0;
        for message in list.iter_mut() {
            if message.is_unread() && wanted.contains(message.id.as_str()) {
                message.is_read = true;
                flipped += 1;
            }
        }

        if let Some(conversation) = next.conversation_mut(conversation_id) {
            conversation.unread_count = conversation.unread_count.saturating_sub(flipped);
        }
        tracing::debug!(conversation_id, flipped, "Marked messages read");
        Some(next)
    }

    fn toggle_selection(&self, id: MessageId) -> Option<InboxState> {
        let active = self.active.as_deref()?;
        let location = self.index.get(&id)?;
        if location.conversation_id != active {
            return None;
        }

        let mut next = self.clone();
        let selection = Arc::make_mut(&mut next.selection);
        if !selection.remove(&id) {
            selection.insert(id);
        }
        Some(next)
    }

    fn update_message(&self, id: &str, f: impl FnOnce(&mut Message) -> bool) -> Option<InboxState> {
        let location = self.index.get(id)?.clone();
        let mut next = self.clone();
        let list = Arc::make_mut(next.messages.get_mut(&location.conversation_id)?);
        let message = list.get_mut(location.position)?;
        if !f(message) {
            return None;
        }
        Some(next)
    }

    pub(crate) fn conversation_mut(&mut self, id: &str) -> Option<&mut Conversation> {
        Arc::make_mut(&mut self.conversations)
            .iter_mut()
            .find(|c| c.id == id)
    }

    /// Recompute every cached unread counter from the live message lists;
    /// a conversation with no loaded messages has nothing unread
    pub(crate) fn reconcile_unread_counts(&mut self) {
        let messages = &self.messages;
        for conversation in Arc::make_mut(&mut self.conversations).iter_mut() {
            let unread = messages
                .get(&conversation.id)
                .map_or(0, |list| list.iter().filter(|m| m.is_unread()).count());
            if conversation.unread_count != unread {
                conversation.unread_count = unread;
            }
        }
    }

    /// Drop selected ids that are not in the active conversation
    pub(crate) fn prune_selection(&mut self) {
        let active = self.active.clone();
        let index = Arc::clone(&self.index);
        let keep = |id: &MessageId| {
            index
                .get(id)
                .is_some_and(|r| Some(&r.conversation_id) == active.as_ref())
        };
        if self.selection.iter().all(keep) {
            return;
        }
        let kept: BTreeSet<MessageId> = self.selection.iter().filter(|id| keep(id)).cloned().collect();
        self.selection = Arc::new(kept);
    }

    /// Rebuild the global message index from the per-conversation lists
    pub(crate) fn rebuild_index(&mut self) {
        let mut index = HashMap::new();
        for (conversation_id, list) in &self.messages {
            for (position, message) in list.iter().enumerate() {
                index.insert(
                    message.id.clone(),
                    MessageRef {
                        conversation_id: conversation_id.clone(),
                        position,
                    },
                );
            }
        }
        self.index = Arc::new(index);
    }
}
