//! Plain-text rendering of inbox state

use chrono::{DateTime, Utc};
use inbox_store::{Conversation, InboxState, Message, MessageStatus};

fn format_time(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M").to_string()
}

/// One line per conversation matching the current search
pub fn conversation_list(state: &InboxState) -> String {
    let conversations = state.filtered_conversations();
    if conversations.is_empty() {
        return if state.search_query().is_empty() {
            "No conversations. Run `inbox seed` to create some.".to_string()
        } else {
            format!("No conversations match {:?}.", state.search_query())
        };
    }

    let active = state.active_conversation_id();
    conversations
        .iter()
        .map(|c| conversation_row(c, active == Some(c.id.as_str())))
        .collect::<Vec<_>>()
        .join("\n")
}

fn conversation_row(conversation: &Conversation, active: bool) -> String {
    let marker = if active { '>' } else { ' ' };
    let presence = if conversation.is_online { "online" } else { "" };
    let unread = if conversation.unread_count > 0 {
        format!("({} unread)", conversation.unread_count)
    } else {
        String::new()
    };
    format!(
        "{} {:<4} {:<16} {}  {:<12} {:<6} {}",
        marker,
        conversation.id,
        conversation.name,
        format_time(&conversation.last_activity),
        unread,
        presence,
        conversation.last_message
    )
    .trim_end()
    .to_string()
}

/// Header plus every message of a conversation
pub fn conversation_view(state: &InboxState, conversation: &Conversation) -> String {
    let mut lines = vec![format!(
        "{} [{}] {} unread",
        conversation.name, conversation.id, conversation.unread_count
    )];

    let messages = state.messages(&conversation.id);
    if messages.is_empty() {
        lines.push("  (no messages)".to_string());
    }
    let first_unread = state.first_unread(&conversation.id).map(|m| m.id.as_str());
    for message in messages {
        if first_unread == Some(message.id.as_str()) {
            lines.push("  ---- unread ----".to_string());
        }
        lines.push(message_row(state, message));
    }
    lines.join("\n")
}

fn message_row(state: &InboxState, message: &Message) -> String {
    let mut flags = String::new();
    flags.push(if state.is_selected(&message.id) { '*' } else { ' ' });
    flags.push(if message.is_unread() { '!' } else { ' ' });
    flags.push(if message.is_bookmarked { '#' } else { ' ' });

    let author = if message.is_outgoing { "me" } else { "them" };
    let mut line = format!(
        "{} {} {} {:>4}: {}",
        flags,
        message.id,
        format_time(&message.timestamp),
        author,
        message.body.preview()
    );
    if message.status != MessageStatus::None {
        line.push_str(&format!(" <{}>", message.status));
    }
    if !message.reactions.is_empty() {
        line.push_str(&format!(" [{}]", message.reactions.join(" ")));
    }
    line
}
