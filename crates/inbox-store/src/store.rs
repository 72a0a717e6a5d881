//! The conversation store: the single owner of inbox state

use crate::persistence::{Persister, StateSlot, load_or_default};
use crate::state::{Command, InboxState};
use crate::types::{Conversation, ConversationId, Message, MessageId, MessageStatus};

/// Observer notified after each command that changed the state
pub trait Subscriber: Send {
    fn on_commit(&mut self, state: &InboxState);
}

/// Owns the current [`InboxState`] and applies commands to it in order.
///
/// Commands are the only way to change state. A command either produces a
/// new snapshot, which replaces the current one and is handed to every
/// subscriber, or is a no-op.
pub struct Store {
    state: InboxState,
    subscribers: Vec<Box<dyn Subscriber>>,
    revision: u64,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    /// Create a store with an empty state and no subscribers
    pub fn new() -> Self {
        Self::with_state(InboxState::default())
    }

    pub fn with_state(state: InboxState) -> Self {
        Self {
            state,
            subscribers: Vec::new(),
            revision: 0,
        }
    }

    /// Load state from `slot` (or start empty) and persist every later
    /// change back to it
    pub fn open(slot: impl StateSlot + 'static) -> Self {
        let state = load_or_default(&slot);
        let mut store = Self::with_state(state);
        store.subscribe(Persister::new(slot));
        store
    }

    pub fn subscribe(&mut self, subscriber: impl Subscriber + 'static) {
        self.subscribers.push(Box::new(subscriber));
    }

    /// Current state
    pub fn state(&self) -> &InboxState {
        &self.state
    }

    /// An owned copy of the current state; cheap, shares message lists
    pub fn snapshot(&self) -> InboxState {
        self.state.clone()
    }

    /// Number of committed state changes since the store was created
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Apply a command. Returns whether the state changed.
    pub fn dispatch(&mut self, command: Command) -> bool {
        let name = command.name();
        let Some(next) = self.state.apply(command) else {
            tracing::debug!(command = name, "Command was a no-op");
            return false;
        };
        debug_assert!(next.unread_consistent());

        self.state = next;
        self.revision += 1;
        tracing::debug!(command = name, revision = self.revision, "Command applied");
        for subscriber in &mut self.subscribers {
            subscriber.on_commit(&self.state);
        }
        true
    }

    pub fn set_conversations(&mut self, conversations: Vec<Conversation>) -> bool {
        self.dispatch(Command::SetConversations(conversations))
    }

    pub fn set_messages(
        &mut self,
        conversation_id: impl Into<ConversationId>,
        messages: Vec<Message>,
    ) -> bool {
        self.dispatch(Command::SetMessages {
            conversation_id: conversation_id.into(),
            messages,
        })
    }

    pub fn select_conversation(&mut self, conversation_id: impl Into<ConversationId>) -> bool {
        self.dispatch(Command::SelectConversation(conversation_id.into()))
    }

    pub fn append_message(&mut self, message: Message) -> bool {
        self.dispatch(Command::AppendMessage(message))
    }

    pub fn receive_message(
        &mut self,
        conversation_id: impl Into<ConversationId>,
        message: Message,
    ) -> bool {
        self.dispatch(Command::ReceiveMessage {
            conversation_id: conversation_id.into(),
            message,
        })
    }

    pub fn mark_read(
        &mut self,
        conversation_id: impl Into<ConversationId>,
        message_ids: Vec<MessageId>,
    ) -> bool {
        self.dispatch(Command::MarkRead {
            conversation_id: conversation_id.into(),
            message_ids,
        })
    }

    pub fn mark_all_read(&mut self, conversation_id: impl Into<ConversationId>) -> bool {
        self.dispatch(Command::MarkAllRead(conversation_id.into()))
    }

    pub fn toggle_selection(&mut self, message_id: impl Into<MessageId>) -> bool {
        self.dispatch(Command::ToggleSelection(message_id.into()))
    }

    pub fn clear_selection(&mut self) -> bool {
        self.dispatch(Command::ClearSelection)
    }

    pub fn update_status(&mut self, message_id: impl Into<MessageId>, status: MessageStatus) -> bool {
        self.dispatch(Command::UpdateStatus {
            message_id: message_id.into(),
            status,
        })
    }

    pub fn toggle_bookmark(&mut self, message_id: impl Into<MessageId>) -> bool {
        self.dispatch(Command::ToggleBookmark(message_id.into()))
    }

    pub fn add_reaction(&mut self, message_id: impl Into<MessageId>, label: impl Into<String>) -> bool {
        self.dispatch(Command::AddReaction {
            message_id: message_id.into(),
            label: label.into(),
        })
    }

    pub fn set_presence(
        &mut self,
        conversation_id: impl Into<ConversationId>,
        online: bool,
        typing: bool,
    ) -> bool {
        self.dispatch(Command::SetPresence {
            conversation_id: conversation_id.into(),
            online,
            typing,
        })
    }

    pub fn set_search(&mut self, query: impl Into<String>) -> bool {
        self.dispatch(Command::SetSearch(query.into()))
    }
}
