//! Store commands. Each returns the text to print.

use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, Utc};
use inbox_store::{Message, MessageBody, MessageStatus, Store};

use crate::{seed, ui};

/// Replace the inbox with generated demo data
pub fn seed(store: &mut Store, conversations: usize, per_conversation: usize, now: DateTime<Utc>) -> String {
    let seeded = seed::generate(conversations, per_conversation, now);
    store.set_conversations(seeded.iter().map(|s| s.conversation.clone()).collect());
    for entry in seeded {
        store.set_messages(entry.conversation.id.clone(), entry.messages);
    }
    format!(
        "Seeded {} conversations with {} unread messages.",
        store.state().conversations().len(),
        store.state().total_unread()
    )
}

pub fn list(store: &mut Store, search: Option<String>) -> String {
    if let Some(query) = search {
        store.set_search(query);
    }
    ui::conversation_list(store.state())
}

pub fn show(store: &Store, conversation_id: &str) -> Result<String> {
    let state = store.state();
    let conversation = state
        .conversation(conversation_id)
        .ok_or_else(|| anyhow!("Unknown conversation: {}", conversation_id))?;
    Ok(ui::conversation_view(state, conversation))
}

pub fn select(store: &mut Store, conversation_id: &str) -> Result<String> {
    if store.state().conversation(conversation_id).is_none() {
        bail!("Unknown conversation: {}", conversation_id);
    }
    store.select_conversation(conversation_id);
    show(store, conversation_id)
}

pub fn read(store: &mut Store, conversation_id: &str, ids: Vec<String>, all: bool) -> Result<String> {
    let before = store
        .state()
        .conversation(conversation_id)
        .map(|c| c.unread_count)
        .ok_or_else(|| anyhow!("Unknown conversation: {}", conversation_id))?;

    if all {
        store.mark_all_read(conversation_id);
    } else if !ids.is_empty() {
        store.mark_read(conversation_id, ids);
    } else {
        bail!("Give message ids to mark as read, or --all");
    }

    let after = store
        .state()
        .conversation(conversation_id)
        .map(|c| c.unread_count)
        .unwrap_or(0);
    Ok(format!(
        "Marked {} messages as read ({} unread left).",
        before.saturating_sub(after),
        after
    ))
}

pub fn toggle(store: &mut Store, message_id: &str) -> Result<String> {
    let (conversation_id, _) = store
        .state()
        .find_message(message_id)
        .ok_or_else(|| anyhow!("Unknown message: {}", message_id))?;
    if store.state().active_conversation_id() != Some(conversation_id) {
        bail!("Message {} is not in the active conversation", message_id);
    }

    store.toggle_selection(message_id);
    let count = store.state().selection().len();
    Ok(if store.state().is_selected(message_id) {
        format!("Selected {} ({} selected).", message_id, count)
    } else {
        format!("Deselected {} ({} selected).", message_id, count)
    })
}

pub fn clear_selection(store: &mut Store) -> String {
    if store.clear_selection() {
        "Selection cleared.".to_string()
    } else {
        "Nothing was selected.".to_string()
    }
}

pub fn status(store: &mut Store, message_id: &str, status: MessageStatus) -> Result<String> {
    ensure_message(store, message_id)?;
    store.update_status(message_id, status);
    Ok(format!("{} is now {}.", message_id, status))
}

pub fn bookmark(store: &mut Store, message_id: &str) -> Result<String> {
    ensure_message(store, message_id)?;
    store.toggle_bookmark(message_id);
    let bookmarked = store
        .state()
        .find_message(message_id)
        .is_some_and(|(_, m)| m.is_bookmarked);
    Ok(if bookmarked {
        format!("Bookmarked {}.", message_id)
    } else {
        format!("Removed bookmark from {}.", message_id)
    })
}

pub fn react(store: &mut Store, message_id: &str, label: &str) -> Result<String> {
    ensure_message(store, message_id)?;
    let label = label.trim();
    if label.is_empty() {
        bail!("Reaction label is empty");
    }
    store.add_reaction(message_id, label);
    let count = store
        .state()
        .find_message(message_id)
        .map_or(0, |(_, m)| m.reactions.iter().filter(|r| r.as_str() == label).count());
    Ok(format!("Reacted {} to {} ({} total).", label, message_id, count))
}

/// Append an outgoing text message to the active conversation
pub fn send(store: &mut Store, text: &str, now: DateTime<Utc>) -> Result<String> {
    let text = text.trim();
    if text.is_empty() {
        bail!("Message text is empty");
    }
    let conversation = store
        .state()
        .active_conversation()
        .map(|c| c.name.clone())
        .context("No conversation selected; run `inbox select <conversation>` first")?;

    let mut id = format!("out-{}", now.timestamp_millis());
    let mut n = 1;
    while store.state().find_message(&id).is_some() {
        n += 1;
        id = format!("out-{}-{}", now.timestamp_millis(), n);
    }

    store.append_message(Message::outgoing(id.clone(), MessageBody::text(text), now));
    Ok(format!("Sent {} to {}.", id, conversation))
}

fn ensure_message(store: &Store, message_id: &str) -> Result<()> {
    match store.state().find_message(message_id) {
        Some(_) => Ok(()),
        None => bail!("Unknown message: {}", message_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use inbox_store::FileSlot;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn seeded() -> Store {
        let mut store = Store::new();
        seed(&mut store, 3, 12, now());
        store
    }

    #[test]
    fn test_seed_reports_counts() {
        let mut store = Store::new();
        assert_eq!(
            seed(&mut store, 3, 12, now()),
            "Seeded 3 conversations with 3 unread messages."
        );
        assert!(store.state().unread_consistent());
    }

    #[test]
    fn test_list_applies_search() {
        let mut store = seeded();
        let out = list(&mut store, Some("bob".into()));
        assert_eq!(out.lines().count(), 1);
        assert!(out.contains("Bob Keller"));

        let out = list(&mut store, None);
        assert_eq!(out.lines().count(), 1);

        let out = list(&mut store, Some(String::new()));
        assert_eq!(out.lines().count(), 3);
    }

    #[test]
    fn test_read_updates_counter() {
        let mut store = seeded();
        let out = read(&mut store, "c3", vec!["c3-m012".into()], false).unwrap();
        assert_eq!(out, "Marked 1 messages as read (1 unread left).");

        let out = read(&mut store, "c3", vec![], true).unwrap();
        assert_eq!(out, "Marked 1 messages as read (0 unread left).");

        assert!(read(&mut store, "c3", vec![], false).is_err());
        assert!(read(&mut store, "nope", vec![], true).is_err());
    }

    #[test]
    fn test_toggle_requires_active_conversation() {
        let mut store = seeded();
        assert!(toggle(&mut store, "c1-m001").is_err());

        select(&mut store, "c1").unwrap();
        assert_eq!(toggle(&mut store, "c1-m001").unwrap(), "Selected c1-m001 (1 selected).");
        assert!(toggle(&mut store, "c2-m001").is_err());
        assert_eq!(toggle(&mut store, "c1-m001").unwrap(), "Deselected c1-m001 (0 selected).");
        assert!(toggle(&mut store, "missing").is_err());
    }

    #[test]
    fn test_message_annotations() {
        let mut store = seeded();
        assert_eq!(
            status(&mut store, "c2-m003", MessageStatus::Prepared).unwrap(),
            "c2-m003 is now prepared."
        );
        assert_eq!(bookmark(&mut store, "c2-m003").unwrap(), "Bookmarked c2-m003.");
        assert_eq!(store.state().bookmarked().len(), 1);
        assert_eq!(bookmark(&mut store, "c2-m003").unwrap(), "Removed bookmark from c2-m003.");
        assert!(react(&mut store, "c2-m003", "  ").is_err());
        assert_eq!(
            react(&mut store, "c2-m003", "👍").unwrap(),
            "Reacted 👍 to c2-m003 (1 total)."
        );
        assert_eq!(
            react(&mut store, "c2-m003", " 👍 ").unwrap(),
            "Reacted 👍 to c2-m003 (2 total)."
        );
    }

    #[test]
    fn test_send_needs_selection() {
        let mut store = seeded();
        assert!(send(&mut store, "hello", now()).is_err());

        select(&mut store, "c2").unwrap();
        let first = send(&mut store, "hello", now()).unwrap();
        let second = send(&mut store, "again", now()).unwrap();
        assert_ne!(first, second);

        let messages = store.state().active_messages();
        assert_eq!(messages.len(), 14);
        assert!(messages.iter().rev().take(2).all(|m| m.is_outgoing && m.is_read));
        assert!(send(&mut store, "   ", now()).is_err());
    }

    #[test]
    fn test_changes_persist_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        {
            let mut store = Store::open(FileSlot::new(&path));
            seed(&mut store, 2, 5, now());
            select(&mut store, "c2").unwrap();
            toggle(&mut store, "c2-m002").unwrap();
            bookmark(&mut store, "c1-m001").unwrap();
        }

        let store = Store::open(FileSlot::new(&path));
        let state = store.state();
        assert_eq!(state.active_conversation_id(), Some("c2"));
        assert!(state.is_selected("c2-m002"));
        assert_eq!(state.bookmarked().len(), 1);
        assert_eq!(state.conversation("c2").unwrap().unread_count, 1);
    }
}
