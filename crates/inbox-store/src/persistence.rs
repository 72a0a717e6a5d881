//! Local persistence of the inbox state
//!
//! The whole state is serialized as one JSON record into a [`StateSlot`]
//! after every committed command, and read back once at startup. A missing
//! or unreadable record is treated as first run.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::Result;
use crate::state::InboxState;
use crate::store::Subscriber;
use crate::types::{Conversation, ConversationId, Message, MessageId};

/// Serialized form of [`InboxState`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedState {
    pub conversations: Vec<Conversation>,
    pub messages: BTreeMap<ConversationId, Vec<Message>>,
    pub active_conversation_id: Option<ConversationId>,
    /// Selection set, as a sorted list
    pub selected_message_ids: Vec<MessageId>,
    pub search_query: String,
}

impl From<&InboxState> for PersistedState {
    fn from(state: &InboxState) -> Self {
        Self {
            conversations: state.conversations().to_vec(),
            messages: state
                .messages
                .iter()
                .map(|(id, list)| (id.clone(), list.to_vec()))
                .collect(),
            active_conversation_id: state.active.clone(),
            selected_message_ids: state.selection.iter().cloned().collect(),
            search_query: state.search.clone(),
        }
    }
}

impl From<PersistedState> for InboxState {
    fn from(persisted: PersistedState) -> Self {
        let mut state = InboxState {
            conversations: Arc::new(persisted.conversations),
            messages: persisted
                .messages
                .into_iter()
                .map(|(id, mut list)| {
                    list.sort_by_key(|m| m.timestamp);
                    for message in &mut list {
                        message.normalize();
                    }
                    (id, Arc::new(list))
                })
                .collect(),
            active: None,
            selection: Arc::new(persisted.selected_message_ids.into_iter().collect::<BTreeSet<_>>()),
            search: persisted.search_query,
            ..Default::default()
        };

        state.active = persisted
            .active_conversation_id
            .filter(|id| state.conversation(id).is_some());
        state.rebuild_index();
        state.reconcile_unread_counts();
        state.prune_selection();
        state
    }
}

/// A durable key-value slot holding one serialized record
pub trait StateSlot: Send {
    /// Read the record; `Ok(None)` when nothing has been stored yet
    fn load(&self) -> Result<Option<String>>;

    /// Replace the record
    fn store(&self, contents: &str) -> Result<()>;
}

/// A slot backed by a single JSON file
#[derive(Debug, Clone)]
pub struct FileSlot {
    path: PathBuf,
}

impl FileSlot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default location: `<data_local_dir>/inbox/state.json`
    pub fn default_path(data_dir: &Path) -> PathBuf {
        data_dir.join("inbox").join("state.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateSlot for FileSlot {
    fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(&self.path)?))
    }

    fn store(&self, contents: &str) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        // Write then rename so a crash never leaves a half-written record
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Load state from a slot, falling back to an empty state on any failure
pub fn load_or_default(slot: &dyn StateSlot) -> InboxState {
    let contents = match slot.load() {
        Ok(Some(contents)) => contents,
        Ok(None) => return InboxState::default(),
        Err(e) => {
            tracing::warn!("Failed to read saved inbox state: {}", e);
            return InboxState::default();
        }
    };

    match serde_json::from_str::<PersistedState>(&contents) {
        Ok(persisted) => persisted.into(),
        Err(e) => {
            tracing::warn!("Saved inbox state is corrupt, starting empty: {}", e);
            InboxState::default()
        }
    }
}

/// Serialize a state for storage
pub fn serialize(state: &InboxState) -> Result<String> {
    Ok(serde_json::to_string(&PersistedState::from(state))?)
}

/// Store subscriber that writes every committed state through to a slot
pub struct Persister {
    slot: Box<dyn StateSlot>,
}

impl Persister {
    pub fn new(slot: impl StateSlot + 'static) -> Self {
        Self {
            slot: Box::new(slot),
        }
    }
}

impl Subscriber for Persister {
    fn on_commit(&mut self, state: &InboxState) {
        let result = serialize(state).and_then(|contents| self.slot.store(&contents));
        if let Err(e) = result {
            // The command has already been applied in memory
            tracing::warn!("Failed to persist inbox state: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Command;
    use crate::types::MessageBody;
    use chrono::Utc;

    fn sample() -> InboxState {
        let now = Utc::now();
        InboxState::new()
            .apply(Command::SetConversations(vec![
                Conversation::new("c1", "Alpha", now),
                Conversation::new("c2", "Bravo", now),
            ]))
            .unwrap()
            .apply(Command::SetMessages {
                conversation_id: "c1".into(),
                messages: vec![
                    Message::incoming("m1", MessageBody::text("one"), now),
                    Message::incoming("m2", MessageBody::text("two"), now),
                ],
            })
            .unwrap()
            .apply(Command::SelectConversation("c1".into()))
            .unwrap()
            .apply(Command::ToggleSelection("m2".into()))
            .unwrap()
    }

    #[test]
    fn test_file_slot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let slot = FileSlot::new(dir.path().join("nested").join("state.json"));

        let state = sample();
        slot.store(&serialize(&state).unwrap()).unwrap();
        let restored = load_or_default(&slot);

        assert_eq!(restored.active_conversation_id(), Some("c1"));
        assert!(restored.is_selected("m2"));
        assert_eq!(restored.messages("c1").len(), 2);
        assert_eq!(restored.conversation("c1").unwrap().unread_count, 2);
        assert_eq!(restored.find_message("m2").unwrap().0, "c1");
    }

    #[test]
    fn test_selection_is_stored_as_list() {
        let json: serde_json::Value = serde_json::from_str(&serialize(&sample()).unwrap()).unwrap();
        assert_eq!(json["selected_message_ids"], serde_json::json!(["m2"]));
    }

    #[test]
    fn test_missing_file_is_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let state = load_or_default(&FileSlot::new(dir.path().join("absent.json")));
        assert!(state.conversations().is_empty());
        assert!(state.active_conversation_id().is_none());
    }

    #[test]
    fn test_corrupt_file_is_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{ not json").unwrap();
        let state = load_or_default(&FileSlot::new(path));
        assert!(state.conversations().is_empty());
    }

    #[test]
    fn test_restore_repairs_counters_and_selection() {
        let now = Utc::now();
        let mut conversation = Conversation::new("c1", "Alpha", now);
        conversation.unread_count = 7;
        let persisted = PersistedState {
            conversations: vec![conversation],
            messages: BTreeMap::from([(
                "c1".to_string(),
                vec![Message::incoming("m1", MessageBody::text("one"), now)],
            )]),
            active_conversation_id: Some("c1".into()),
            selected_message_ids: vec!["m1".into(), "elsewhere".into()],
            search_query: String::new(),
        };
        let state: InboxState = persisted.into();
        assert_eq!(state.conversation("c1").unwrap().unread_count, 1);
        assert_eq!(state.selection().len(), 1);
    }
}
